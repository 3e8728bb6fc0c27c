pub mod dht;
pub mod ultrasonic;

pub use dht::Dht11;
pub use ultrasonic::Ultrasonic;

/// Ultrasonic ranging. Returns meters; the control loop works in
/// centimeters and converts.
pub trait DistanceSensor: Send {
    fn read_m(&mut self) -> Option<f64>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClimateReading {
    pub humidity_pct: f64,
    pub temperature_c: f64,
}

/// Temperature/humidity probe. A read either yields both values or
/// nothing, matching how the DHT11 delivers its frame.
pub trait ClimateSensor: Send {
    fn read(&mut self) -> Option<ClimateReading>;
}
