use sim::models::model_trait::{DevsModel, Reportable, ReportableModel, SerializableModel};
use sim::models::{ModelMessage, ModelRecord};
use sim::simulator::Services;
use sim::utils::errors::SimulationError;
use std::f64::INFINITY;

use crate::engine::buffer::{CmdBuffer, RespBuffer};
use crate::engine::bus::{BusPort, LaneStrobe};
use crate::engine::executor::{Engine, EngineConfig};
use crate::engine::frame::SeqRef;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum WriteLane {
  #[default]
  Idle,
  Pending { addr: u32, data: u32, both: bool },
  Waiting,
  Acked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ReadLane {
  #[default]
  Idle,
  Pending { addr: u32 },
  Waiting,
  Valid { data: u32 },
}

/// Port adapter between the tick-level core and the message-passing bus
/// model: the core re-presents its held request every tick, the adapter
/// forwards it once and completes it when the acknowledgement arrives.
#[derive(Debug, Clone, Default)]
struct MessageBusPort {
  write: WriteLane,
  read: ReadLane,
}

impl MessageBusPort {
  fn take_write_req(&mut self) -> Option<(u32, u32, bool)> {
    if let WriteLane::Pending { addr, data, both } = self.write {
      self.write = WriteLane::Waiting;
      return Some((addr, data, both));
    }
    None
  }

  fn take_read_req(&mut self) -> Option<u32> {
    if let ReadLane::Pending { addr } = self.read {
      self.read = ReadLane::Waiting;
      return Some(addr);
    }
    None
  }

  fn ack_write(&mut self) {
    self.write = WriteLane::Acked;
  }

  fn complete_read(&mut self, data: u32) {
    self.read = ReadLane::Valid { data };
  }

  fn waiting(&self) -> bool {
    self.write == WriteLane::Waiting || matches!(self.read, ReadLane::Waiting)
  }
}

impl BusPort for MessageBusPort {
  fn write(&mut self, addr: u32, data: u32, strobe: LaneStrobe) -> bool {
    match self.write {
      WriteLane::Acked => {
        self.write = WriteLane::Idle;
        true
      }
      WriteLane::Idle => {
        self.write = WriteLane::Pending {
          addr,
          data,
          both: strobe == LaneStrobe::Both,
        };
        false
      }
      _ => false,
    }
  }

  fn read(&mut self, addr: u32) -> Option<u32> {
    match self.read {
      ReadLane::Valid { data } => {
        self.read = ReadLane::Idle;
        Some(data)
      }
      ReadLane::Idle => {
        self.read = ReadLane::Pending { addr };
        None
      }
      _ => None,
    }
  }
}

/// DEVS wrapper around the execution engine. Owns the command/response
/// buffers and the sequence reference on behalf of the transport, ticks the
/// core once per cycle and parks while a bus request is outstanding.
#[derive(Debug, Clone)]
pub struct EngineModel {
  // PortsIn
  execute_port: String,
  read_resp_port: String,
  write_ack_port: String,
  // PortsOut
  read_req_port: String,
  write_req_port: String,
  done_port: String,

  engine: Engine,
  cmd: CmdBuffer,
  resp: RespBuffer,
  seq: SeqRef,
  port: MessageBusPort,
  until_next_event: f64,
  records: Vec<ModelRecord>,
}

impl EngineModel {
  pub fn new(cfg: EngineConfig) -> Self {
    Self {
      execute_port: "execute".to_string(),
      read_resp_port: "bus_read_resp".to_string(),
      write_ack_port: "bus_write_ack".to_string(),
      read_req_port: "bus_read_req".to_string(),
      write_req_port: "bus_write_req".to_string(),
      done_port: "frame_done".to_string(),
      cmd: CmdBuffer::new(cfg.cmd_addr_bits),
      resp: RespBuffer::new(cfg.resp_addr_bits),
      engine: Engine::new(cfg),
      seq: SeqRef::new(0),
      port: MessageBusPort::default(),
      until_next_event: INFINITY,
      records: Vec::new(),
    }
  }
}

impl DevsModel for EngineModel {
  fn events_ext(&mut self, incoming_message: &ModelMessage, services: &mut Services) -> Result<(), SimulationError> {
    if incoming_message.port_name == self.execute_port {
      let words: Vec<u16> =
        serde_json::from_str(&incoming_message.content).map_err(|_| SimulationError::InvalidModelState)?;
      if !self.cmd.load(&words) {
        log::error!("command frame truncated to buffer capacity");
      }
      self.resp.clear();
      if !self.engine.execute() {
        // Transport violated the one-frame-in-flight contract.
        return Err(SimulationError::InvalidModelState);
      }
      self.records.push(ModelRecord {
        time: services.global_time(),
        action: "execute".to_string(),
        subject: format!("{} words", words.len()),
      });
      self.until_next_event = 1.0;
      return Ok(());
    }

    if incoming_message.port_name == self.read_resp_port {
      let data: u32 = serde_json::from_str(&incoming_message.content).map_err(|_| SimulationError::InvalidModelState)?;
      self.port.complete_read(data);
      self.until_next_event = 1.0;
      return Ok(());
    }

    if incoming_message.port_name == self.write_ack_port {
      self.port.ack_write();
      self.until_next_event = 1.0;
      return Ok(());
    }

    Ok(())
  }

  fn events_int(&mut self, services: &mut Services) -> Result<Vec<ModelMessage>, SimulationError> {
    let mut messages = Vec::new();

    if self.engine.busy() {
      self.engine.tick(&self.cmd, &mut self.resp, &mut self.port, &mut self.seq);
    }

    if let Some((addr, data, both)) = self.port.take_write_req() {
      messages.push(ModelMessage {
        content: serde_json::to_string(&(addr, data, both)).map_err(|_| SimulationError::InvalidModelState)?,
        port_name: self.write_req_port.clone(),
      });
      self.records.push(ModelRecord {
        time: services.global_time(),
        action: "bus_write_req".to_string(),
        subject: format!("addr={:#x}", addr),
      });
    }

    if let Some(addr) = self.port.take_read_req() {
      messages.push(ModelMessage {
        content: serde_json::to_string(&addr).map_err(|_| SimulationError::InvalidModelState)?,
        port_name: self.read_req_port.clone(),
      });
      self.records.push(ModelRecord {
        time: services.global_time(),
        action: "bus_read_req".to_string(),
        subject: format!("addr={:#x}", addr),
      });
    }

    if self.engine.finished() {
      let result = (self.engine.error(), self.resp.words().to_vec());
      messages.push(ModelMessage {
        content: serde_json::to_string(&result).map_err(|_| SimulationError::InvalidModelState)?,
        port_name: self.done_port.clone(),
      });
      self.records.push(ModelRecord {
        time: services.global_time(),
        action: "frame_done".to_string(),
        subject: format!("error={} words={}", self.engine.error(), self.resp.words().len()),
      });
    }

    // Self-schedule while running; park while the bus owes us an answer.
    self.until_next_event = if self.engine.busy() && !self.port.waiting() {
      1.0
    } else {
      INFINITY
    };

    Ok(messages)
  }

  fn time_advance(&mut self, time_delta: f64) {
    self.until_next_event -= time_delta;
  }

  fn until_next_event(&self) -> f64 {
    self.until_next_event
  }
}

impl Reportable for EngineModel {
  fn status(&self) -> String {
    if self.engine.busy() {
      "busy".to_string()
    } else {
      "idle".to_string()
    }
  }

  fn records(&self) -> &Vec<ModelRecord> {
    &self.records
  }
}

impl ReportableModel for EngineModel {}

impl SerializableModel for EngineModel {
  fn get_type(&self) -> &'static str {
    "EngineModel"
  }
}
