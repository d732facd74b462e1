//! Intake of decoded payloads from the camera side.

mod controller;
mod gate;
mod loop_worker;

pub use controller::ScanIntake;
pub use gate::ScanGate;
