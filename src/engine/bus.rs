// Ready/valid bus seen by the executor. The bus is 32 bits wide; command and
// response words are 16 bits, so writes carry a lane strobe.

use std::collections::HashMap;

/// Valid 16-bit lanes of a 32-bit bus write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneStrobe {
  Lower,
  Both,
}

/// One tick-level port onto the memory bus.
///
/// The executor presents the same request every tick until the port reports
/// acceptance: `write` returning true, `read` returning data. The repeated
/// presentation is one held request; an accepted request is never presented
/// again and a held one is never dropped.
pub trait BusPort {
  fn write(&mut self, addr: u32, data: u32, strobe: LaneStrobe) -> bool;
  fn read(&mut self, addr: u32) -> Option<u32>;
}

/// Accepted bus transactions, in order. Tests assert against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
  Write { addr: u32, data: u32, strobe: LaneStrobe },
  Read { addr: u32 },
}

/// In-process bus backed by a sparse word store, with configurable wait
/// states on both the write-accept and read-valid paths.
#[derive(Debug, Clone)]
pub struct SramBus {
  mem: HashMap<u32, u32>,
  addr_mask: u32,
  wait_states: u32,
  wait: u32,
  journal: Vec<BusEvent>,
}

impl SramBus {
  pub fn new(addr_bits: u32, wait_states: u32) -> Self {
    Self {
      mem: HashMap::new(),
      addr_mask: (1u32 << addr_bits) - 1,
      wait_states,
      wait: 0,
      journal: Vec::new(),
    }
  }

  pub fn poke(&mut self, addr: u32, data: u32) {
    self.mem.insert(addr & self.addr_mask, data);
  }

  pub fn peek(&self, addr: u32) -> u32 {
    self.mem.get(&(addr & self.addr_mask)).copied().unwrap_or(0)
  }

  pub fn journal(&self) -> &[BusEvent] {
    &self.journal
  }

  // One wait counter is enough: the executor holds at most one request.
  fn settle(&mut self) -> bool {
    if self.wait < self.wait_states {
      self.wait += 1;
      return false;
    }
    self.wait = 0;
    true
  }
}

impl BusPort for SramBus {
  fn write(&mut self, addr: u32, data: u32, strobe: LaneStrobe) -> bool {
    if !self.settle() {
      return false;
    }
    let addr = addr & self.addr_mask;
    let current = self.mem.get(&addr).copied().unwrap_or(0);
    let merged = match strobe {
      LaneStrobe::Both => data,
      LaneStrobe::Lower => (current & 0xFFFF_0000) | (data & 0xFFFF),
    };
    self.mem.insert(addr, merged);
    self.journal.push(BusEvent::Write { addr, data, strobe });
    true
  }

  fn read(&mut self, addr: u32) -> Option<u32> {
    if !self.settle() {
      return None;
    }
    let addr = addr & self.addr_mask;
    let data = self.mem.get(&addr).copied().unwrap_or(0);
    self.journal.push(BusEvent::Read { addr });
    Some(data)
  }
}

/// ------------------------------------------------------------
/// --- Test Functions ---
/// ------------------------------------------------------------
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lower_strobe_keeps_upper_half() {
    let mut bus = SramBus::new(8, 0);
    bus.poke(3, 0xDEAD_BEEF);
    assert!(bus.write(3, 0x0000_1234, LaneStrobe::Lower));
    assert_eq!(bus.peek(3), 0xDEAD_1234);
  }

  #[test]
  fn test_wait_states_hold_request() {
    let mut bus = SramBus::new(8, 2);
    assert!(!bus.write(0, 1, LaneStrobe::Both));
    assert!(!bus.write(0, 1, LaneStrobe::Both));
    assert!(bus.write(0, 1, LaneStrobe::Both));
    // Exactly one accepted transaction in the journal.
    assert_eq!(bus.journal().len(), 1);

    assert!(bus.read(0).is_none());
    assert!(bus.read(0).is_none());
    assert_eq!(bus.read(0), Some(1));
  }
}
