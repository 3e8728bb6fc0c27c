use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::interval;

use crate::sensors::{ClimateSensor, DistanceSensor};
use crate::state::{ControllerState, LightState, Mode};

/// Everything the control paths share: the state blob, the queue into the
/// light driver and the climate probe. Cheap to clone into each task.
#[derive(Clone)]
pub struct AppState {
    state: Arc<RwLock<ControllerState>>,
    lights: mpsc::Sender<LightState>,
    climate: Arc<Mutex<Box<dyn ClimateSensor>>>,
}

impl AppState {
    pub fn new(lights: mpsc::Sender<LightState>, climate: Box<dyn ClimateSensor>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ControllerState::default())),
            lights,
            climate: Arc::new(Mutex::new(climate)),
        }
    }

    pub async fn snapshot(&self) -> ControllerState {
        *self.state.read().await
    }

    /// Flip between automatic and manual. Always allowed, from the button
    /// hold or the web form alike.
    pub async fn toggle_mode(&self) -> Mode {
        let mut state = self.state.write().await;
        state.mode = state.mode.toggle();
        info!("Switched to {} mode", state.mode.label());
        state.mode
    }

    /// Step to the next state in the cycle. Only honored in manual mode.
    pub async fn advance_light(&self) {
        let next = {
            let mut state = self.state.write().await;
            if state.mode != Mode::Manual {
                debug!("Advance request ignored, rig is in automatic mode");
                return;
            }
            state.light = state.light.advance();
            state.light
        };
        info!("Manual advance to {:?}", next);
        self.push_light(next).await;
    }

    /// Jump straight to a state. Only honored in manual mode; the caller
    /// has already validated the value.
    pub async fn set_light(&self, requested: LightState) {
        {
            let mut state = self.state.write().await;
            if state.mode != Mode::Manual {
                debug!("Set request ignored, rig is in automatic mode");
                return;
            }
            state.light = requested;
        }
        info!("Manual set to {:?}", requested);
        self.push_light(requested).await;
    }

    /// Take a fresh temperature/humidity reading and store it. A failed
    /// read clears both fields rather than keeping old values around.
    pub async fn refresh_climate(&self) {
        // The DHT read bit-bangs the line for tens of milliseconds, so it
        // runs on the blocking pool instead of a tokio worker
        let climate = Arc::clone(&self.climate);
        let reading =
            match tokio::task::spawn_blocking(move || climate.blocking_lock().read()).await {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("Climate read task failed: {}", e);
                    None
                }
            };
        let mut state = self.state.write().await;
        match reading {
            Some(r) => {
                debug!(
                    "Climate: {:.1} C, {:.1}% humidity",
                    r.temperature_c, r.humidity_pct
                );
                state.reading.temperature_c = Some(r.temperature_c);
                state.reading.humidity_pct = Some(r.humidity_pct);
            }
            None => {
                warn!("Climate read failed");
                state.reading.temperature_c = None;
                state.reading.humidity_pct = None;
            }
        }
    }

    async fn push_light(&self, state: LightState) {
        if self.lights.send(state).await.is_err() {
            error!("Light driver queue closed, dropping {:?}", state);
        }
    }
}

/// One pass of the automatic loop. In manual mode nothing happens, not
/// even a sensor read. A failed read records an absent distance and keeps
/// whatever state the lights are in.
pub async fn automatic_tick(app: &AppState, sensor: &mut dyn DistanceSensor) {
    if app.snapshot().await.mode != Mode::Automatic {
        return;
    }

    match sensor.read_m() {
        Some(meters) => {
            let cm = meters * 100.0;
            debug!("Distance measured: {:.1} cm", cm);
            let next = LightState::for_distance(cm);
            {
                let mut state = app.state.write().await;
                state.reading.distance_cm = Some(cm);
                state.light = next;
            }
            app.push_light(next).await;
        }
        None => {
            warn!("Distance read failed, holding the current state");
            app.state.write().await.reading.distance_cm = None;
        }
    }
}

/// Background sampling loop, one tick per poll interval for the life of
/// the process.
pub async fn run_automatic_loop(
    app: AppState,
    mut sensor: Box<dyn DistanceSensor>,
    period: Duration,
) {
    let mut tick = interval(period);
    loop {
        tick.tick().await;
        automatic_tick(&app, sensor.as_mut()).await;
    }
}

/// Short press: step the lights (manual mode only).
pub async fn on_button_pressed(app: &AppState) {
    app.advance_light().await;
}

/// Hold: flip between automatic and manual control.
pub async fn on_button_held(app: &AppState) {
    let _ = app.toggle_mode().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ClimateReading;

    struct FixedDistance(Option<f64>);

    impl DistanceSensor for FixedDistance {
        fn read_m(&mut self) -> Option<f64> {
            self.0
        }
    }

    struct NoClimate;

    impl ClimateSensor for NoClimate {
        fn read(&mut self) -> Option<ClimateReading> {
            None
        }
    }

    struct FixedClimate(ClimateReading);

    impl ClimateSensor for FixedClimate {
        fn read(&mut self) -> Option<ClimateReading> {
            Some(self.0)
        }
    }

    fn app() -> (AppState, mpsc::Receiver<LightState>) {
        let (tx, rx) = mpsc::channel(16);
        (AppState::new(tx, Box::new(NoClimate)), rx)
    }

    fn app_with_climate(
        climate: Box<dyn ClimateSensor>,
    ) -> (AppState, mpsc::Receiver<LightState>) {
        let (tx, rx) = mpsc::channel(16);
        (AppState::new(tx, climate), rx)
    }

    #[tokio::test]
    async fn test_starts_green_and_automatic() {
        let (app, _rx) = app();
        let snap = app.snapshot().await;
        assert_eq!(LightState::Green, snap.light);
        assert_eq!(Mode::Automatic, snap.mode);
        assert_eq!(None, snap.reading.distance_cm);
    }

    #[tokio::test]
    async fn test_tick_close_object_goes_red() {
        let (app, mut rx) = app();
        automatic_tick(&app, &mut FixedDistance(Some(0.05))).await;

        let snap = app.snapshot().await;
        assert_eq!(LightState::Red, snap.light);
        assert_eq!(Some(5.0), snap.reading.distance_cm);
        assert_eq!(LightState::Red, rx.try_recv().unwrap());
    }

    #[tokio::test]
    async fn test_tick_far_object_goes_green() {
        let (app, mut rx) = app();
        automatic_tick(&app, &mut FixedDistance(Some(0.45))).await;

        let snap = app.snapshot().await;
        assert_eq!(LightState::Green, snap.light);
        assert_eq!(Some(45.0), snap.reading.distance_cm);
        assert_eq!(LightState::Green, rx.try_recv().unwrap());
    }

    #[tokio::test]
    async fn test_tick_does_nothing_in_manual_mode() {
        let (app, mut rx) = app();
        app.toggle_mode().await;

        automatic_tick(&app, &mut FixedDistance(Some(0.05))).await;

        let snap = app.snapshot().await;
        assert_eq!(LightState::Green, snap.light);
        // Not even the reading is taken
        assert_eq!(None, snap.reading.distance_cm);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tick_holds_state_on_sensor_failure() {
        let (app, mut rx) = app();
        automatic_tick(&app, &mut FixedDistance(Some(0.05))).await;
        assert_eq!(LightState::Red, rx.try_recv().unwrap());

        automatic_tick(&app, &mut FixedDistance(None)).await;

        let snap = app.snapshot().await;
        assert_eq!(LightState::Red, snap.light);
        assert_eq!(None, snap.reading.distance_cm);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_toggle_mode_round_trip() {
        let (app, _rx) = app();
        assert_eq!(Mode::Manual, app.toggle_mode().await);
        assert_eq!(Mode::Automatic, app.toggle_mode().await);
    }

    #[tokio::test]
    async fn test_advance_ignored_in_automatic_mode() {
        let (app, mut rx) = app();
        app.advance_light().await;

        assert_eq!(LightState::Green, app.snapshot().await.light);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_advance_cycles_in_manual_mode() {
        let (app, mut rx) = app();
        app.toggle_mode().await;

        app.advance_light().await;
        assert_eq!(LightState::GreenYellow, app.snapshot().await.light);
        assert_eq!(LightState::GreenYellow, rx.try_recv().unwrap());

        app.advance_light().await;
        app.advance_light().await;
        app.advance_light().await;
        assert_eq!(LightState::Green, app.snapshot().await.light);
    }

    #[tokio::test]
    async fn test_set_light_ignored_in_automatic_mode() {
        let (app, mut rx) = app();
        app.set_light(LightState::Red).await;

        assert_eq!(LightState::Green, app.snapshot().await.light);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_set_light_in_manual_mode() {
        let (app, mut rx) = app();
        app.toggle_mode().await;
        app.set_light(LightState::Red).await;

        assert_eq!(LightState::Red, app.snapshot().await.light);
        assert_eq!(LightState::Red, rx.try_recv().unwrap());
    }

    #[tokio::test]
    async fn test_button_handlers() {
        let (app, _rx) = app();

        // Pressed does nothing while automatic
        on_button_pressed(&app).await;
        assert_eq!(LightState::Green, app.snapshot().await.light);

        // Hold flips to manual, then a press advances
        on_button_held(&app).await;
        assert_eq!(Mode::Manual, app.snapshot().await.mode);
        on_button_pressed(&app).await;
        assert_eq!(LightState::GreenYellow, app.snapshot().await.light);
    }

    #[tokio::test]
    async fn test_refresh_climate_stores_reading() {
        let (app, _rx) = app_with_climate(Box::new(FixedClimate(ClimateReading {
            humidity_pct: 40.0,
            temperature_c: 21.0,
        })));

        app.refresh_climate().await;

        let snap = app.snapshot().await;
        assert_eq!(Some(21.0), snap.reading.temperature_c);
        assert_eq!(Some(40.0), snap.reading.humidity_pct);
    }

    /// A probe that delivers one good frame and then nothing.
    struct DyingClimate {
        remaining: u32,
    }

    impl ClimateSensor for DyingClimate {
        fn read(&mut self) -> Option<ClimateReading> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            Some(ClimateReading {
                humidity_pct: 40.0,
                temperature_c: 21.0,
            })
        }
    }

    #[tokio::test]
    async fn test_failed_climate_read_clears_previous_values() {
        let (app, _rx) = app_with_climate(Box::new(DyingClimate { remaining: 1 }));

        app.refresh_climate().await;
        assert_eq!(Some(21.0), app.snapshot().await.reading.temperature_c);

        // The failure wipes the old values instead of keeping them
        app.refresh_climate().await;
        let snap = app.snapshot().await;
        assert_eq!(None, snap.reading.temperature_c);
        assert_eq!(None, snap.reading.humidity_pct);
    }
}
