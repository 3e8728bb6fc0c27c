use anyhow::Error;
use log::info;

#[cfg(feature = "pi")]
use std::thread;
#[cfg(feature = "pi")]
use std::time::{Duration, Instant};

#[cfg(feature = "pi")]
use log::warn;
#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::config::Config;

use super::DistanceSensor;

#[cfg(feature = "pi")]
const SPEED_OF_SOUND_M_S: f64 = 343.0;

/// Longest echo pulse worth waiting for. The HC-SR04 tops out around 4 m,
/// which is well under this.
#[cfg(feature = "pi")]
const ECHO_TIMEOUT: Duration = Duration::from_millis(40);

/// HC-SR04 ultrasonic ranger on a trigger/echo pin pair.
#[cfg(feature = "pi")]
pub struct Ultrasonic {
    trigger: OutputPin,
    echo: InputPin,
}

#[cfg(not(feature = "pi"))]
pub struct Ultrasonic {}

impl Ultrasonic {
    #[cfg(feature = "pi")]
    pub fn init(config: &Config) -> Result<Self, Error> {
        info!(
            "Ultrasonic: trigger={:?} echo={:?}",
            config.pins.trigger.bcm(),
            config.pins.echo.bcm()
        );

        let gpio = Gpio::new()?;
        let mut trigger = gpio.get(config.pins.trigger.bcm().0)?.into_output();
        let echo = gpio.get(config.pins.echo.bcm().0)?.into_input();
        trigger.set_low();

        Ok(Self { trigger, echo })
    }

    #[cfg(not(feature = "pi"))]
    pub fn init(config: &Config) -> Result<Self, Error> {
        info!(
            "Ultrasonic: trigger={:?} echo={:?} (no GPIO on this build, reads will be absent)",
            config.pins.trigger.bcm(),
            config.pins.echo.bcm()
        );
        Ok(Self {})
    }
}

#[cfg(feature = "pi")]
impl DistanceSensor for Ultrasonic {
    fn read_m(&mut self) -> Option<f64> {
        // 10 us trigger pulse starts a measurement
        self.trigger.set_high();
        thread::sleep(Duration::from_micros(10));
        self.trigger.set_low();

        let started = Instant::now();
        while self.echo.is_low() {
            if started.elapsed() > ECHO_TIMEOUT {
                warn!("Ultrasonic: no echo pulse, sensor missing or out of range");
                return None;
            }
        }

        let pulse_started = Instant::now();
        while self.echo.is_high() {
            if pulse_started.elapsed() > ECHO_TIMEOUT {
                warn!("Ultrasonic: echo pulse never ended");
                return None;
            }
        }

        // Sound travels out and back, so halve the round trip
        let round_trip = pulse_started.elapsed().as_secs_f64();
        Some(round_trip * SPEED_OF_SOUND_M_S / 2.0)
    }
}

#[cfg(not(feature = "pi"))]
impl DistanceSensor for Ultrasonic {
    fn read_m(&mut self) -> Option<f64> {
        None
    }
}
