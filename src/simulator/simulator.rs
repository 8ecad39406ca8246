use sim::models::{Model, Reportable};
use sim::simulator::{Connector, Message, Simulation};
use std::io::{self, Result};

use super::config::AppConfig;
use super::mode::{SimConfig, StepMode};
use super::shell::{Command, Shell};
use crate::model::{BusModel, EngineModel};

/// Result of one executed command frame: the engine's error flag and the
/// 16-bit response words it produced (header, results, terminator).
#[derive(Debug, Clone)]
pub struct FrameResult {
  pub error: bool,
  pub words: Vec<u16>,
}

pub struct Simulator {
  config: SimConfig,
  frames: Vec<Vec<u16>>,
  next_frame: usize,
  simulation: Simulation,
}

impl Simulator {
  pub fn new(app_config: &AppConfig, frames: Vec<Vec<u16>>) -> Self {
    let models = vec![
      Model::new(
        "engine".to_string(),
        Box::new(EngineModel::new(app_config.engine_config())),
      ),
      Model::new(
        "bus".to_string(),
        Box::new(BusModel::new(app_config.engine.bus_addr_bits, app_config.engine.wait_states)),
      ),
    ];

    let connectors = vec![
      Connector::new(
        "read_req".to_string(),
        "engine".to_string(),
        "bus".to_string(),
        "bus_read_req".to_string(),
        "read_req".to_string(),
      ),
      Connector::new(
        "write_req".to_string(),
        "engine".to_string(),
        "bus".to_string(),
        "bus_write_req".to_string(),
        "write_req".to_string(),
      ),
      Connector::new(
        "read_resp".to_string(),
        "bus".to_string(),
        "engine".to_string(),
        "read_resp".to_string(),
        "bus_read_resp".to_string(),
      ),
      Connector::new(
        "write_ack".to_string(),
        "bus".to_string(),
        "engine".to_string(),
        "write_ack".to_string(),
        "bus_write_ack".to_string(),
      ),
      // step() only surfaces messages whose source port is connected, so
      // frame_done needs a route even though the bus ignores it.
      Connector::new(
        "frame_done".to_string(),
        "engine".to_string(),
        "bus".to_string(),
        "frame_done".to_string(),
        "frame_done".to_string(),
      ),
    ];

    let config = SimConfig {
      quiet: app_config.simulation.quiet,
      step_mode: if app_config.simulation.step_mode {
        StepMode::Step
      } else {
        StepMode::Continuous
      },
    };

    Self {
      config,
      frames,
      next_frame: 0,
      simulation: Simulation::post(models, connectors),
    }
  }

  pub fn run(&mut self) -> Result<()> {
    match self.config.step_mode {
      StepMode::Continuous => self.run_continuous(),
      StepMode::Step => self.run_step_mode(),
    }
  }

  fn run_continuous(&mut self) -> Result<()> {
    while self.next_frame < self.frames.len() {
      self.run_next_frame()?;
    }
    if !self.config.quiet {
      self.print_records();
    }
    Ok(())
  }

  fn run_step_mode(&mut self) -> Result<()> {
    println!("Step mode - Enter to run one frame, 'si N' to run N, 'c' to continue, 'q' to quit\n");
    let mut shell = Shell::new()?;
    while self.next_frame < self.frames.len() {
      match shell.read_command()? {
        Command::Quit => break,
        Command::Continue => {
          while self.next_frame < self.frames.len() {
            self.run_next_frame()?;
          }
        }
        Command::Step(n) => {
          for _ in 0..n {
            if self.next_frame >= self.frames.len() {
              break;
            }
            self.run_next_frame()?;
          }
        }
      }
    }
    if !self.config.quiet {
      self.print_records();
    }
    Ok(())
  }

  fn run_next_frame(&mut self) -> Result<()> {
    let words = self.frames[self.next_frame].clone();
    let index = self.next_frame;
    self.next_frame += 1;

    let result = self.run_frame(&words)?;
    if !self.config.quiet {
      let rendered: Vec<String> = result.words.iter().map(|w| format!("{:04x}", w)).collect();
      println!(
        "frame {}: error={} response=[{}]",
        index,
        result.error,
        rendered.join(" ")
      );
    }
    Ok(())
  }

  /// Execute one command frame to completion and collect its response.
  pub fn run_frame(&mut self, words: &[u16]) -> Result<FrameResult> {
    let content =
      serde_json::to_string(words).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let time = self.simulation.get_global_time();
    self.simulation.inject_input(Message::new(
      "host".to_string(),
      "default".to_string(),
      "engine".to_string(),
      "execute".to_string(),
      time,
      content,
    ));

    // The DEVS scheduler always has a next event while the frame is in
    // flight; the cap only trips if the models deadlock.
    for _ in 0..1_000_000 {
      let messages = self
        .simulation
        .step()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("simulation error: {:?}", e)))?;
      for message in messages {
        if message.source_id() == "engine" && message.source_port() == "frame_done" {
          let (error, words): (bool, Vec<u16>) = serde_json::from_str(message.content())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
          return Ok(FrameResult { error, words });
        }
      }
    }

    Err(io::Error::new(io::ErrorKind::TimedOut, "frame did not complete"))
  }

  fn print_records(&mut self) {
    println!("\n--- Simulation Records ---");
    for model in self.simulation.models().iter() {
      let records = model.records();
      if !records.is_empty() {
        println!("\n[{}]", model.id());
        for record in records {
          println!("  Time {:.1}: {} {}", record.time, record.action, record.subject);
        }
      }
    }
    println!("--- End Records ---\n");
  }
}
