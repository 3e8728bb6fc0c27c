use anyhow::Error;
use log::{debug, info};
use tokio::sync::mpsc;

#[cfg(feature = "pi")]
use log::error;
#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, OutputPin};

use crate::config::Config;
use crate::state::LightState;

/// Passive buzzer tone when driven
#[cfg(feature = "pi")]
const BUZZER_HZ: f64 = 1000.0;

/// Lamp and buzzer outputs for one light state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LampLevels {
    pub green: bool,
    pub amber: bool,
    pub red: bool,
    /// Buzzer duty cycle in percent
    pub buzzer_duty: u8,
}

impl LampLevels {
    /// The fixed output table. The buzzer only sounds on Red.
    pub fn for_state(state: LightState) -> Self {
        match state {
            LightState::Green => LampLevels {
                green: true,
                amber: false,
                red: false,
                buzzer_duty: 0,
            },
            LightState::GreenYellow => LampLevels {
                green: true,
                amber: true,
                red: false,
                buzzer_duty: 0,
            },
            LightState::RedYellow => LampLevels {
                green: false,
                amber: true,
                red: true,
                buzzer_duty: 0,
            },
            LightState::Red => LampLevels {
                green: false,
                amber: false,
                red: true,
                buzzer_duty: 50,
            },
        }
    }
}

#[cfg(feature = "pi")]
pub struct LightController {
    green: OutputPin,
    amber: OutputPin,
    red: OutputPin,
    buzzer: OutputPin,
}

#[cfg(not(feature = "pi"))]
pub struct LightController {}

impl LightController {
    #[cfg(feature = "pi")]
    pub fn init(config: &Config) -> Result<Self, Error> {
        log_wiring(config);

        let gpio = Gpio::new()?;
        let mut green = gpio.get(config.pins.green.bcm().0)?.into_output();
        let mut amber = gpio.get(config.pins.amber.bcm().0)?.into_output();
        let mut red = gpio.get(config.pins.red.bcm().0)?.into_output();
        let buzzer = gpio.get(config.pins.buzzer.bcm().0)?.into_output();

        // Everything off until the first state comes through
        green.set_low();
        amber.set_low();
        red.set_low();

        Ok(Self {
            green,
            amber,
            red,
            buzzer,
        })
    }

    #[cfg(not(feature = "pi"))]
    pub fn init(config: &Config) -> Result<Self, Error> {
        log_wiring(config);
        Ok(Self {})
    }

    /// Drive the lamps and buzzer for the given state. Safe to call with
    /// the same state repeatedly.
    pub fn apply(&mut self, state: LightState) {
        let levels = LampLevels::for_state(state);
        debug!("Lights: applying {:?} -> {:?}", state, levels);

        #[cfg(feature = "pi")]
        {
            set_lamp(&mut self.green, levels.green);
            set_lamp(&mut self.amber, levels.amber);
            set_lamp(&mut self.red, levels.red);

            let result = if levels.buzzer_duty == 0 {
                self.buzzer.clear_pwm()
            } else {
                self.buzzer
                    .set_pwm_frequency(BUZZER_HZ, f64::from(levels.buzzer_duty) / 100.0)
            };
            if let Err(e) = result {
                error!("Lights: failed to drive buzzer: {}", e);
            }
        }
    }
}

fn log_wiring(config: &Config) {
    info!(
        "Lights: green={:?} amber={:?} red={:?} buzzer={:?}",
        config.pins.green.bcm(),
        config.pins.amber.bcm(),
        config.pins.red.bcm(),
        config.pins.buzzer.bcm()
    );
}

#[cfg(feature = "pi")]
fn set_lamp(pin: &mut OutputPin, on: bool) {
    if on {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

/// Worker that owns the GPIO pins and applies every state pushed onto the
/// queue. Repeats are dropped, so reapplying the current state is a no-op.
pub async fn run_light_driver(mut rx: mpsc::Receiver<LightState>, mut controller: LightController) {
    let mut last = None;
    while let Some(state) = rx.recv().await {
        if last == Some(state) {
            continue;
        }
        controller.apply(state);
        last = Some(state);
    }
    debug!("Lights: queue closed, driver exiting");
}
