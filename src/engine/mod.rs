// Memory command execution engine: frame decode, opcode dispatch, bus
// transaction sequencing and response construction.

pub mod buffer;
pub mod bus;
pub mod executor;
pub mod frame;
pub mod opcode;

pub use executor::{Engine, EngineConfig, EngineError};
pub use frame::SeqRef;
