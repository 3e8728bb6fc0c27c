use serde::Serialize;

/// The four states of the rig, in the order they appear on the web form
/// (0 = Green .. 3 = Red) and in the manual advance cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LightState {
    Green,
    GreenYellow,
    RedYellow,
    Red,
}

impl LightState {
    pub fn from_index(value: u8) -> Option<Self> {
        match value {
            0 => Some(LightState::Green),
            1 => Some(LightState::GreenYellow),
            2 => Some(LightState::RedYellow),
            3 => Some(LightState::Red),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            LightState::Green => 0,
            LightState::GreenYellow => 1,
            LightState::RedYellow => 2,
            LightState::Red => 3,
        }
    }

    /// Next state in the manual cycle, wrapping Red back to Green.
    pub fn advance(self) -> Self {
        match self {
            LightState::Green => LightState::GreenYellow,
            LightState::GreenYellow => LightState::RedYellow,
            LightState::RedYellow => LightState::Red,
            LightState::Red => LightState::Green,
        }
    }

    /// Distance ladder for automatic mode. The bounds are strict, so an
    /// object at exactly 40 cm already drops out of Green.
    pub fn for_distance(cm: f64) -> Self {
        if cm > 40.0 {
            LightState::Green
        } else if cm > 20.0 {
            LightState::GreenYellow
        } else if cm > 10.0 {
            LightState::RedYellow
        } else {
            LightState::Red
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LightState::Green => "Green",
            LightState::GreenYellow => "Green + Yellow",
            LightState::RedYellow => "Red + Yellow",
            LightState::Red => "Red",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
    Automatic,
    Manual,
}

impl Mode {
    /// Mode changes are always toggles, never direct sets.
    pub fn toggle(self) -> Self {
        match self {
            Mode::Automatic => Mode::Manual,
            Mode::Manual => Mode::Automatic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Automatic => "Automatic",
            Mode::Manual => "Manual",
        }
    }
}

/// Last sensor values. A failed read leaves the fields absent rather than
/// carrying an old value forward, so the page never shows stale numbers
/// as if they were fresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SensorReading {
    pub distance_cm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

/// The one process-wide state blob, shared between the automatic loop, the
/// button handlers and the web handlers.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ControllerState {
    pub light: LightState,
    pub mode: Mode,
    pub reading: SensorReading,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            light: LightState::Green,
            mode: Mode::Automatic,
            reading: SensorReading::default(),
        }
    }
}
