pub mod config;
pub mod frames;
pub mod mode;
pub mod shell;
pub mod simulator;

pub use mode::StepMode;
pub use simulator::Simulator;
