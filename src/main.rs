use std::time::Duration;

use anyhow::Error;
use log::info;
use tokio::sync::mpsc;

use semafor::prelude::*;
use semafor::web;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    info!("Starting config...");
    let config = Config::load()?;

    info!("Starting lights...");
    let (light_tx, light_rx) = mpsc::channel(16);
    let light_controller = LightController::init(&config)?;
    tokio::spawn(run_light_driver(light_rx, light_controller));

    info!("Starting sensors...");
    let climate: Box<dyn ClimateSensor> = Box::new(Dht11::init(&config)?);
    let distance: Box<dyn DistanceSensor> = Box::new(Ultrasonic::init(&config)?);

    let app = AppState::new(light_tx, climate);

    info!("Starting automatic control loop...");
    tokio::spawn(run_automatic_loop(
        app.clone(),
        distance,
        Duration::from_millis(config.poll_interval_ms),
    ));

    #[cfg(feature = "pi")]
    {
        info!("Starting button watcher...");
        let watcher = semafor::button::ButtonWatcher::init(&config)?;
        tokio::spawn(watcher.run(app.clone()));
    }

    web::serve(app, &config.listen_addr()).await
}
