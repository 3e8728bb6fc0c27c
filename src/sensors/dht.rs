use anyhow::Error;
use log::info;

#[cfg(feature = "pi")]
use std::thread;
#[cfg(feature = "pi")]
use std::time::{Duration, Instant};

#[cfg(feature = "pi")]
use log::warn;
#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, IoPin, Level, Mode};

use crate::config::Config;

use super::{ClimateReading, ClimateSensor};

/// DHT11 temperature/humidity sensor, bit-banged on a single data line.
#[cfg(feature = "pi")]
pub struct Dht11 {
    pin: IoPin,
}

#[cfg(not(feature = "pi"))]
pub struct Dht11 {}

impl Dht11 {
    #[cfg(feature = "pi")]
    pub fn init(config: &Config) -> Result<Self, Error> {
        info!("DHT11: data={:?}", config.pins.dht.bcm());

        let gpio = Gpio::new()?;
        let mut pin = gpio.get(config.pins.dht.bcm().0)?.into_io(Mode::Output);
        // Idle high between reads
        pin.set_high();

        Ok(Self { pin })
    }

    #[cfg(not(feature = "pi"))]
    pub fn init(config: &Config) -> Result<Self, Error> {
        info!(
            "DHT11: data={:?} (no GPIO on this build, reads will be absent)",
            config.pins.dht.bcm()
        );
        Ok(Self {})
    }

    /// Busy-wait until the line leaves `level`, returning how long it held.
    /// The whole frame is over in under 5 ms, so spinning is fine.
    #[cfg(feature = "pi")]
    fn wait_while(&self, level: Level, timeout: Duration) -> Option<Duration> {
        let started = Instant::now();
        while self.pin.read() == level {
            if started.elapsed() > timeout {
                return None;
            }
        }
        Some(started.elapsed())
    }

    #[cfg(feature = "pi")]
    fn read_frame(&mut self) -> Option<[u8; 5]> {
        let timeout = Duration::from_micros(200);

        // Host start signal: hold the line low for 18 ms, then release
        self.pin.set_mode(Mode::Output);
        self.pin.set_low();
        thread::sleep(Duration::from_millis(18));
        self.pin.set_high();
        self.pin.set_mode(Mode::Input);

        // Sensor response: ~80 us low, ~80 us high, then 40 bits
        self.wait_while(Level::High, timeout)?;
        self.wait_while(Level::Low, timeout)?;
        self.wait_while(Level::High, timeout)?;

        let mut bytes = [0u8; 5];
        for bit in 0..40 {
            // Each bit is a ~50 us low gap followed by a high pulse whose
            // length encodes the value (~27 us for 0, ~70 us for 1)
            self.wait_while(Level::Low, timeout)?;
            let pulse = self.wait_while(Level::High, timeout)?;
            if pulse > Duration::from_micros(48) {
                bytes[bit / 8] |= 1 << (7 - (bit % 8));
            }
        }

        Some(bytes)
    }
}

#[cfg(feature = "pi")]
impl ClimateSensor for Dht11 {
    fn read(&mut self) -> Option<ClimateReading> {
        let bytes = match self.read_frame() {
            Some(bytes) => bytes,
            None => {
                warn!("DHT11: read timed out");
                return None;
            }
        };

        let sum = bytes[0]
            .wrapping_add(bytes[1])
            .wrapping_add(bytes[2])
            .wrapping_add(bytes[3]);
        if sum != bytes[4] {
            warn!("DHT11: checksum mismatch, dropping frame");
            return None;
        }

        // The DHT11 only reports integer values; the fractional bytes are
        // always zero on this part
        Some(ClimateReading {
            humidity_pct: f64::from(bytes[0]),
            temperature_c: f64::from(bytes[2]),
        })
    }
}

#[cfg(not(feature = "pi"))]
impl ClimateSensor for Dht11 {
    fn read(&mut self) -> Option<ClimateReading> {
        None
    }
}
