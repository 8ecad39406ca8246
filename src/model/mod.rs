// DEVS models wrapping the engine core and the memory bus for the cycle
// simulator.

pub mod bus_model;
pub mod engine_model;

pub use bus_model::BusModel;
pub use engine_model::EngineModel;
