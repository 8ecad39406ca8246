use sim::models::model_trait::{DevsModel, Reportable, ReportableModel, SerializableModel};
use sim::models::{ModelMessage, ModelRecord};
use sim::simulator::Services;
use sim::utils::errors::SimulationError;
use std::collections::HashMap;
use std::f64::INFINITY;

/// One request in flight. The engine never pipelines bus operations.
#[derive(Debug, Clone)]
enum BusReq {
  Read { addr: u32 },
  Write { addr: u32, data: u32, both: bool },
}

/// 32-bit word memory behind the ready/valid bus. Wait states delay both the
/// write-accept and the read-valid path by whole cycles.
#[derive(Debug, Clone)]
pub struct BusModel {
  // PortsIn
  read_req_port: String,
  write_req_port: String,
  // PortsOut
  read_resp_port: String,
  write_ack_port: String,

  mem: HashMap<u32, u32>,
  addr_mask: u32,
  wait_states: u32,
  pending: Option<BusReq>,
  until_next_event: f64,
  records: Vec<ModelRecord>,
}

impl BusModel {
  pub fn new(addr_bits: u32, wait_states: u32) -> Self {
    Self {
      read_req_port: "read_req".to_string(),
      write_req_port: "write_req".to_string(),
      read_resp_port: "read_resp".to_string(),
      write_ack_port: "write_ack".to_string(),
      mem: HashMap::new(),
      addr_mask: (1u32 << addr_bits) - 1,
      wait_states,
      pending: None,
      until_next_event: INFINITY,
      records: Vec::new(),
    }
  }

  pub fn poke(&mut self, addr: u32, data: u32) {
    self.mem.insert(addr & self.addr_mask, data);
  }
}

impl DevsModel for BusModel {
  fn events_ext(&mut self, incoming_message: &ModelMessage, services: &mut Services) -> Result<(), SimulationError> {
    if incoming_message.port_name == self.read_req_port {
      let addr: u32 = serde_json::from_str(&incoming_message.content).map_err(|_| SimulationError::InvalidModelState)?;
      self.pending = Some(BusReq::Read { addr });
      self.records.push(ModelRecord {
        time: services.global_time(),
        action: "read_req".to_string(),
        subject: format!("addr={:#x}", addr),
      });
      self.until_next_event = 1.0 + self.wait_states as f64;
      return Ok(());
    }

    if incoming_message.port_name == self.write_req_port {
      let (addr, data, both): (u32, u32, bool) =
        serde_json::from_str(&incoming_message.content).map_err(|_| SimulationError::InvalidModelState)?;
      self.pending = Some(BusReq::Write { addr, data, both });
      self.records.push(ModelRecord {
        time: services.global_time(),
        action: "write_req".to_string(),
        subject: format!("addr={:#x} data={:#010x} both={}", addr, data, both),
      });
      self.until_next_event = 1.0 + self.wait_states as f64;
      return Ok(());
    }

    Ok(())
  }

  fn events_int(&mut self, services: &mut Services) -> Result<Vec<ModelMessage>, SimulationError> {
    let mut messages = Vec::new();

    if let Some(req) = self.pending.take() {
      match req {
        BusReq::Read { addr } => {
          let data = self.mem.get(&(addr & self.addr_mask)).copied().unwrap_or(0);
          messages.push(ModelMessage {
            content: serde_json::to_string(&data).map_err(|_| SimulationError::InvalidModelState)?,
            port_name: self.read_resp_port.clone(),
          });
          self.records.push(ModelRecord {
            time: services.global_time(),
            action: "read_resp".to_string(),
            subject: format!("addr={:#x} data={:#010x}", addr, data),
          });
        }
        BusReq::Write { addr, data, both } => {
          let addr = addr & self.addr_mask;
          let current = self.mem.get(&addr).copied().unwrap_or(0);
          let merged = if both {
            data
          } else {
            (current & 0xFFFF_0000) | (data & 0xFFFF)
          };
          self.mem.insert(addr, merged);
          messages.push(ModelMessage {
            content: serde_json::to_string(&addr).map_err(|_| SimulationError::InvalidModelState)?,
            port_name: self.write_ack_port.clone(),
          });
          self.records.push(ModelRecord {
            time: services.global_time(),
            action: "write_ack".to_string(),
            subject: format!("addr={:#x} data={:#010x}", addr, merged),
          });
        }
      }
    }

    self.until_next_event = INFINITY;
    Ok(messages)
  }

  fn time_advance(&mut self, time_delta: f64) {
    self.until_next_event -= time_delta;
  }

  fn until_next_event(&self) -> f64 {
    self.until_next_event
  }
}

impl Reportable for BusModel {
  fn status(&self) -> String {
    match &self.pending {
      Some(BusReq::Read { addr }) => format!("read pending @{:#x}", addr),
      Some(BusReq::Write { addr, .. }) => format!("write pending @{:#x}", addr),
      None => "idle".to_string(),
    }
  }

  fn records(&self) -> &Vec<ModelRecord> {
    &self.records
  }
}

impl ReportableModel for BusModel {}

impl SerializableModel for BusModel {
  fn get_type(&self) -> &'static str {
    "BusModel"
  }
}
