use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::executor::EngineConfig;

/// Engine geometry and feature switches
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
  #[serde(default = "default_cmd_addr_bits")]
  pub cmd_addr_bits: u32,
  #[serde(default = "default_resp_addr_bits")]
  pub resp_addr_bits: u32,
  #[serde(default = "default_bus_addr_bits")]
  pub bus_addr_bits: u32,
  #[serde(default = "default_true")]
  pub seq_check: bool,
  #[serde(default = "default_true")]
  pub len_check: bool,
  #[serde(default)]
  pub start_addr_en: bool,
  #[serde(default)]
  pub wait_states: u32,
}

fn default_cmd_addr_bits() -> u32 {
  10
}

fn default_resp_addr_bits() -> u32 {
  10
}

fn default_bus_addr_bits() -> u32 {
  12
}

fn default_true() -> bool {
  true
}

impl Default for EngineSection {
  fn default() -> Self {
    Self {
      cmd_addr_bits: default_cmd_addr_bits(),
      resp_addr_bits: default_resp_addr_bits(),
      bus_addr_bits: default_bus_addr_bits(),
      seq_check: true,
      len_check: true,
      start_addr_en: false,
      wait_states: 0,
    }
  }
}

/// Simulation run controls
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSection {
  #[serde(default)]
  pub quiet: bool,
  #[serde(default)]
  pub step_mode: bool,
}

impl Default for SimulationSection {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: false,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
  #[serde(default)]
  pub engine: EngineSection,
  #[serde(default)]
  pub simulation: SimulationSection,
}

impl AppConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      cmd_addr_bits: self.engine.cmd_addr_bits,
      resp_addr_bits: self.engine.resp_addr_bits,
      bus_addr_bits: self.engine.bus_addr_bits,
      seq_check: self.engine.seq_check,
      len_check: self.engine.len_check,
      start_addr_en: self.engine.start_addr_en,
    }
  }
}

/// Load the built-in default.toml
pub fn load_default_config() -> io::Result<AppConfig> {
  let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  let config_path = manifest_dir
    .join("src")
    .join("simulator")
    .join("config")
    .join("default.toml");

  load_config_file(&config_path)
}

/// Load a configuration from a specific file
pub fn load_config_file(path: &Path) -> io::Result<AppConfig> {
  let content = fs::read_to_string(path)
    .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("cannot read config file {:?}: {}", path, e)))?;

  toml::from_str::<AppConfig>(&content)
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("failed to parse TOML config: {}", e)))
}

/// Apply CLI argument overrides
pub fn apply_cli_overrides(config: &mut AppConfig, quiet: bool, step: bool, wait_states: Option<u32>) {
  if quiet {
    config.simulation.quiet = true;
  }
  if step {
    config.simulation.step_mode = true;
  }
  if let Some(ws) = wait_states {
    config.engine.wait_states = ws;
  }
}

/// Validate configuration
pub fn validate_config(config: &AppConfig) -> io::Result<()> {
  for (name, bits) in [
    ("cmd_addr_bits", config.engine.cmd_addr_bits),
    ("resp_addr_bits", config.engine.resp_addr_bits),
  ] {
    if !(1..=16).contains(&bits) {
      return Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{} must be between 1 and 16, got {}", name, bits),
      ));
    }
  }

  if !(1..=30).contains(&config.engine.bus_addr_bits) {
    return Err(io::Error::new(
      io::ErrorKind::InvalidData,
      format!("bus_addr_bits must be between 1 and 30, got {}", config.engine.bus_addr_bits),
    ));
  }

  Ok(())
}

/// Load and merge configurations
///
/// Order:
/// 1. Built-in defaults (default.toml, falling back to hardcoded values)
/// 2. Custom config file, if provided
/// 3. CLI argument overrides
/// 4. Validation
pub fn load_and_merge_configs(
  custom_config_path: Option<&str>,
  quiet: bool,
  step: bool,
  wait_states: Option<u32>,
) -> io::Result<AppConfig> {
  let mut config = match load_default_config() {
    Ok(cfg) => cfg,
    Err(e) if e.kind() == io::ErrorKind::NotFound => AppConfig::default(),
    Err(e) => return Err(e),
  };

  if let Some(custom_path) = custom_config_path {
    config = load_config_file(Path::new(custom_path))?;
  }

  apply_cli_overrides(&mut config, quiet, step, wait_states);

  validate_config(&config)?;

  Ok(config)
}
