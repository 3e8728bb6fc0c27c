#[cfg(feature = "pi")]
pub mod button;
pub mod config;
pub mod controller;
pub mod lights;
pub mod sensors;
pub mod state;
pub mod web;

pub mod prelude {
    pub use crate::{config::*, controller::*, lights::*, sensors::*, state::*};
}
