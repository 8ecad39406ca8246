pub mod config;

pub use config::{load_and_merge_configs, AppConfig, EngineSection, SimulationSection};
