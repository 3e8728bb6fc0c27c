use anyhow::Error;
use log::info;
use pi_pinout::{GpioPin, PhysicalPin, WiringPiPin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub listen: Listen,
    pub pins: Pins,
    /// Automatic loop sampling period, in milliseconds
    pub poll_interval_ms: u64,
    /// How long the button must stay down to count as a hold
    pub hold_time_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Listen {
    pub host: String,
    pub port: u16,
}

/// Pin assignments for the whole rig. The defaults match the reference
/// wiring; any pin can be given in physical, BCM or WiringPi numbering.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Pins {
    pub green: Pin,
    pub amber: Pin,
    pub red: Pin,
    pub buzzer: Pin,
    pub button: Pin,
    pub trigger: Pin,
    pub echo: Pin,
    pub dht: Pin,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum Pin {
    Physical(PhysicalPin),
    Gpio(GpioPin),
    WiringPi(WiringPiPin),
}

impl Pin {
    /// Resolve to BCM numbering, which is what rppal wants.
    pub fn bcm(self) -> GpioPin {
        match self {
            Pin::Physical(pin) => pin.into(),
            Pin::Gpio(pin) => pin,
            Pin::WiringPi(pin) => pin.into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        if std::path::Path::new("config.ron").exists() {
            let config = std::fs::read_to_string("config.ron")?;
            let config: Config = ron::from_str(&config)?;
            Ok(config)
        } else {
            info!("No config.ron found, using the default rig wiring");
            Ok(Config::default())
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen.host, self.listen.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: Listen {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            pins: Pins {
                green: Pin::Gpio(GpioPin(25)),
                amber: Pin::Gpio(GpioPin(8)),
                red: Pin::Gpio(GpioPin(7)),
                buzzer: Pin::Gpio(GpioPin(26)),
                button: Pin::Gpio(GpioPin(21)),
                trigger: Pin::Gpio(GpioPin(4)),
                echo: Pin::Gpio(GpioPin(17)),
                dht: Pin::Gpio(GpioPin(18)),
            },
            poll_interval_ms: 500,
            hold_time_secs: 3,
        }
    }
}
