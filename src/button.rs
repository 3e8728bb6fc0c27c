use std::time::Duration;

use anyhow::Error;
use log::info;
use rppal::gpio::{Gpio, InputPin};
use tokio::time::{interval, Instant};

use crate::config::Config;
use crate::controller::{on_button_held, on_button_pressed, AppState};

const POLL: Duration = Duration::from_millis(10);

/// Push-button on a pull-up input, pressed when the line reads low.
pub struct ButtonWatcher {
    pin: InputPin,
    hold_time: Duration,
}

impl ButtonWatcher {
    pub fn init(config: &Config) -> Result<Self, Error> {
        info!("Button: input={:?}", config.pins.button.bcm());

        let gpio = Gpio::new()?;
        let pin = gpio.get(config.pins.button.bcm().0)?.into_input_pullup();

        Ok(Self {
            pin,
            hold_time: Duration::from_secs(config.hold_time_secs),
        })
    }

    /// Poll the pin and fire the handlers the way the rig expects: pressed
    /// fires on the falling edge, held fires once more if the button is
    /// still down after the hold time.
    pub async fn run(self, app: AppState) {
        let mut tick = interval(POLL);
        let mut pressed_at: Option<Instant> = None;
        let mut held_fired = false;

        loop {
            tick.tick().await;
            let down = self.pin.is_low();

            match (down, pressed_at) {
                (true, None) => {
                    pressed_at = Some(Instant::now());
                    held_fired = false;
                    on_button_pressed(&app).await;
                }
                (true, Some(since)) => {
                    if !held_fired && since.elapsed() >= self.hold_time {
                        held_fired = true;
                        on_button_held(&app).await;
                    }
                }
                (false, Some(_)) => {
                    pressed_at = None;
                }
                (false, None) => {}
            }
        }
    }
}
