pub mod engine;
pub mod model;
pub mod simulator;
pub mod utils;

pub use engine::executor::{Engine, EngineConfig, EngineError};
pub use simulator::mode::{SimConfig, StepMode};
pub use simulator::Simulator;
pub use utils::log;
