// Memory command execution engine. Interprets one command frame at a time
// against a back-pressured 32-bit bus and emits a response frame. The
// hardware's independently clocked processes collapse into one explicit state
// enum plus a per-frame execution context; tick() performs at most one
// externally visible action (command fetch, bus operation or response write).

use super::buffer::{CmdBuffer, RespBuffer};
use super::bus::{BusPort, LaneStrobe};
use super::frame::{response_header, FrameHeader, SeqRef, TERMINATOR};
use super::opcode::{self, CmdOp};

/// Construction-time configuration. Never changes at runtime.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
  /// Address width of the command buffer, in 16-bit words.
  pub cmd_addr_bits: u32,
  /// Address width of the response buffer, in 16-bit words.
  pub resp_addr_bits: u32,
  /// Address width of the bus, in 32-bit words.
  pub bus_addr_bits: u32,
  /// Enable sequence-number deduplication.
  pub seq_check: bool,
  /// Allow execute_at() with non-zero start addresses.
  pub start_addr_en: bool,
  /// Enable frame-length budget enforcement.
  pub len_check: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      cmd_addr_bits: 10,
      resp_addr_bits: 10,
      bus_addr_bits: 12,
      seq_check: true,
      start_addr_en: false,
      len_check: true,
    }
  }
}

/// Frame-local failure classes. Only the aggregate flag reaches the response
/// header; the kind itself is a debug accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
  InvalidOpcode,
  FrameLengthExceeded,
  CommandAddressOverflow,
  ResponseAddressOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Idle,
  ReadHeader,
  FetchCmd,
  ExecRead,
  ExecWrite,
  WriteResponse,
  Fin,
}

/// What the next fetched command word means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cont {
  Opcode,
  Write1Data { addr: u16 },
  BurstAddr { read: bool },
  BurstData,
}

/// Half-word phase: which 16-bit lane of the pending 32-bit bus word the next
/// command word occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Even,
  Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RespStep {
  Header,
  Data(usize),
  Terminator,
}

/// Volatile per-frame state. Reset on execute, dead after FIN.
#[derive(Debug, Clone)]
struct ExecContext {
  cmd_ptr: usize,
  resp_ptr: usize,
  header: FrameHeader,
  cont: Cont,
  phase: Phase,
  bus_addr: u32,
  /// Transfer words left in the current burst.
  remaining: u32,
  /// Latched even-phase half of the pending bus write.
  pending_low: u16,
  /// Armed bus write, held unchanged across wait cycles.
  pending_data: u32,
  pending_strobe: LaneStrobe,
  /// Current write op is a burst (more data words may follow the bus write).
  burst: bool,
  /// Frame-length budget: declared words left, terminator included.
  budget: u32,
  error: Option<EngineError>,
  /// Read results staged for the response writer.
  staged: Vec<u16>,
  /// Sequence dedup hit: acknowledge without executing.
  skip: bool,
  resp_step: RespStep,
}

impl ExecContext {
  fn new(cmd_start: usize, resp_start: usize) -> Self {
    Self {
      cmd_ptr: cmd_start,
      resp_ptr: resp_start,
      header: FrameHeader {
        seq: 0,
        force: false,
        len_m1: 0,
      },
      cont: Cont::Opcode,
      phase: Phase::Even,
      bus_addr: 0,
      remaining: 0,
      pending_low: 0,
      pending_data: 0,
      pending_strobe: LaneStrobe::Lower,
      burst: false,
      budget: 0,
      error: None,
      staged: Vec::new(),
      skip: false,
      resp_step: RespStep::Header,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Engine {
  cfg: EngineConfig,
  state: State,
  ctx: ExecContext,
  finished: bool,
  error_flag: bool,
  last_error: Option<EngineError>,
}

impl Engine {
  pub fn new(cfg: EngineConfig) -> Self {
    Self {
      cfg,
      state: State::Idle,
      ctx: ExecContext::new(0, 0),
      finished: false,
      error_flag: false,
      last_error: None,
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.cfg
  }

  pub fn busy(&self) -> bool {
    self.state != State::Idle
  }

  /// One-shot: true only between the tick that finished a frame and the next
  /// tick (or the next execute request).
  pub fn finished(&self) -> bool {
    self.finished
  }

  /// Aggregate error flag of the last frame; valid when finished.
  pub fn error(&self) -> bool {
    self.error_flag
  }

  /// Which failure class fired, if any. Debug only; not part of the protocol.
  pub fn last_error(&self) -> Option<EngineError> {
    self.last_error
  }

  /// Discard all in-flight context and return to idle.
  pub fn reset(&mut self) {
    self.state = State::Idle;
    self.ctx = ExecContext::new(0, 0);
    self.finished = false;
  }

  /// Request execution of the frame at address 0. Accepted only while idle.
  pub fn execute(&mut self) -> bool {
    self.execute_at(0, 0)
  }

  /// Request execution with explicit start addresses. Non-zero starts are
  /// accepted only when configured with start_addr_en.
  pub fn execute_at(&mut self, cmd_start: u32, resp_start: u32) -> bool {
    if self.busy() {
      return false;
    }
    if !self.cfg.start_addr_en && (cmd_start != 0 || resp_start != 0) {
      return false;
    }
    self.ctx = ExecContext::new(cmd_start as usize, resp_start as usize);
    self.finished = false;
    self.error_flag = false;
    self.last_error = None;
    self.state = State::ReadHeader;
    log::debug!("execute accepted: cmd_start={} resp_start={}", cmd_start, resp_start);
    true
  }

  /// Advance the engine by one tick. Suspension points are the bus handshake
  /// waits; the engine holds state there and resumes on a later tick.
  pub fn tick(&mut self, cmd: &CmdBuffer, resp: &mut RespBuffer, bus: &mut dyn BusPort, seq: &mut SeqRef) {
    self.finished = false;
    match self.state {
      State::Idle => {}
      State::ReadHeader => self.read_header(cmd, seq.get()),
      State::FetchCmd => self.fetch_cmd(cmd),
      State::ExecWrite => self.exec_write(bus),
      State::ExecRead => self.exec_read(bus),
      State::WriteResponse => self.write_response(resp),
      State::Fin => self.fin(seq),
    }
  }

  fn bus_mask(&self) -> u32 {
    (1u32 << self.cfg.bus_addr_bits) - 1
  }

  fn latch(&mut self, err: EngineError) {
    if self.ctx.error.is_none() {
      log::debug!("frame error: {:?}", err);
      self.ctx.error = Some(err);
    }
  }

  /// Abandon the frame: latch the error and go finalize the response.
  fn fail(&mut self, err: EngineError) {
    self.latch(err);
    self.state = State::WriteResponse;
  }

  /// Spend from the declared frame-length budget.
  fn spend(&mut self, words: u32) -> bool {
    if !self.cfg.len_check {
      return true;
    }
    if self.ctx.budget < words {
      self.ctx.budget = 0;
      self.fail(EngineError::FrameLengthExceeded);
      return false;
    }
    self.ctx.budget -= words;
    true
  }

  fn read_header(&mut self, cmd: &CmdBuffer, reference: u8) {
    let word = match cmd.fetch(self.ctx.cmd_ptr) {
      Some(word) => word,
      None => return self.fail(EngineError::CommandAddressOverflow),
    };
    self.ctx.cmd_ptr += 1;
    let header = FrameHeader::decode(word);
    self.ctx.budget = header.len_m1 as u32 + 1;
    self.ctx.header = header;
    if self.cfg.seq_check && !header.force && header.seq == reference {
      // Retransmission of the last executed frame: acknowledge, don't re-run.
      log::debug!("seq {} matches reference, replaying ack", header.seq);
      self.ctx.skip = true;
      self.state = State::WriteResponse;
    } else {
      self.state = State::FetchCmd;
    }
  }

  fn fetch_cmd(&mut self, cmd: &CmdBuffer) {
    let word = match cmd.fetch(self.ctx.cmd_ptr) {
      Some(word) => word,
      None => return self.fail(EngineError::CommandAddressOverflow),
    };
    self.ctx.cmd_ptr += 1;
    if !self.spend(1) {
      return;
    }
    match self.ctx.cont {
      Cont::Opcode => self.dispatch(word),
      Cont::Write1Data { addr } => {
        // Single write: one lower-lane bus word.
        self.ctx.bus_addr = addr as u32;
        self.ctx.pending_data = word as u32;
        self.ctx.pending_strobe = LaneStrobe::Lower;
        self.ctx.burst = false;
        self.ctx.cont = Cont::Opcode;
        self.state = State::ExecWrite;
      }
      Cont::BurstAddr { read } => {
        self.ctx.bus_addr = word as u32;
        self.ctx.phase = Phase::Even;
        if read {
          self.state = State::ExecRead;
        } else {
          self.ctx.cont = Cont::BurstData;
        }
      }
      Cont::BurstData => self.pack_write(word),
    }
  }

  fn dispatch(&mut self, word: u16) {
    match opcode::decode(word) {
      CmdOp::Write1 { addr } => {
        self.ctx.cont = Cont::Write1Data { addr };
      }
      CmdOp::Read1 { addr } => {
        self.ctx.bus_addr = addr as u32;
        self.ctx.remaining = 1;
        self.ctx.phase = Phase::Even;
        self.state = State::ExecRead;
      }
      CmdOp::WriteN { len_m1 } => {
        self.ctx.remaining = len_m1 as u32 + 1;
        self.ctx.burst = true;
        self.ctx.cont = Cont::BurstAddr { read: false };
      }
      CmdOp::ReadN { len_m1 } => {
        self.ctx.remaining = len_m1 as u32 + 1;
        self.ctx.cont = Cont::BurstAddr { read: true };
      }
      CmdOp::Nop => {}
      CmdOp::Terminate => {
        if self.cfg.len_check && self.ctx.budget != 0 {
          // Declared more words than the frame carried.
          self.fail(EngineError::FrameLengthExceeded);
        } else {
          self.state = State::WriteResponse;
        }
      }
      CmdOp::Invalid => self.fail(EngineError::InvalidOpcode),
    }
  }

  /// Pack one burst-write data word into the pending bus word. An even-phase
  /// word occupies bits 0-15; an odd-phase word fills bits 16-31 and arms the
  /// write. A burst ending on the even half flushes a lower-lane write.
  fn pack_write(&mut self, word: u16) {
    match self.ctx.phase {
      Phase::Even => {
        self.ctx.pending_low = word;
        self.ctx.phase = Phase::Odd;
        self.ctx.remaining -= 1;
        if self.ctx.remaining == 0 {
          self.ctx.pending_data = word as u32;
          self.ctx.pending_strobe = LaneStrobe::Lower;
          self.state = State::ExecWrite;
        }
      }
      Phase::Odd => {
        self.ctx.pending_data = (word as u32) << 16 | self.ctx.pending_low as u32;
        self.ctx.pending_strobe = LaneStrobe::Both;
        self.ctx.remaining -= 1;
        self.state = State::ExecWrite;
      }
    }
  }

  fn exec_write(&mut self, bus: &mut dyn BusPort) {
    let addr = self.ctx.bus_addr & self.bus_mask();
    if !bus.write(addr, self.ctx.pending_data, self.ctx.pending_strobe) {
      return; // held until accepted
    }
    log::debug!(
      "bus write @{:#x} = {:#010x} ({:?})",
      addr,
      self.ctx.pending_data,
      self.ctx.pending_strobe
    );
    self.ctx.bus_addr = self.ctx.bus_addr.wrapping_add(1);
    self.ctx.phase = Phase::Even;
    if !self.ctx.burst || self.ctx.remaining == 0 {
      self.ctx.burst = false;
      self.ctx.cont = Cont::Opcode;
    }
    self.state = State::FetchCmd;
  }

  fn exec_read(&mut self, bus: &mut dyn BusPort) {
    let addr = self.ctx.bus_addr & self.bus_mask();
    let data = match bus.read(addr) {
      Some(data) => data,
      None => return, // held until valid
    };
    log::debug!("bus read @{:#x} -> {:#010x}", addr, data);
    self.ctx.bus_addr = self.ctx.bus_addr.wrapping_add(1);
    let take = if self.ctx.remaining >= 2 { 2 } else { 1 };
    if !self.spend(take) {
      return;
    }
    self.ctx.staged.push((data & 0xFFFF) as u16);
    if take == 2 {
      self.ctx.staged.push((data >> 16) as u16);
    }
    self.ctx.remaining -= take;
    if self.ctx.remaining == 0 {
      self.ctx.cont = Cont::Opcode;
      self.state = State::FetchCmd;
    }
  }

  /// One response word per tick: header, then (success only) each staged read
  /// result, then the terminator. A response-space overflow forces the error
  /// flag, drops the remaining data words and suppresses the terminator when
  /// it too is out of range.
  fn write_response(&mut self, resp: &mut RespBuffer) {
    match self.ctx.resp_step {
      RespStep::Header => {
        let error = self.ctx.error.is_some();
        // Wraps past 2047 staged words (reachable only without length
        // checking); response_header masks to the 11-bit field.
        let count = if error || self.ctx.skip {
          0
        } else {
          self.ctx.staged.len() as u16
        };
        let word = response_header(self.ctx.header.seq, error, count);
        if !resp.write(self.ctx.resp_ptr, word) {
          self.latch(EngineError::ResponseAddressOverflow);
          self.state = State::Fin;
          return;
        }
        self.ctx.resp_ptr += 1;
        self.ctx.resp_step = if error || self.ctx.skip || self.ctx.staged.is_empty() {
          RespStep::Terminator
        } else {
          RespStep::Data(0)
        };
      }
      RespStep::Data(index) => {
        if !resp.write(self.ctx.resp_ptr, self.ctx.staged[index]) {
          self.latch(EngineError::ResponseAddressOverflow);
          self.ctx.resp_step = RespStep::Terminator;
          return;
        }
        self.ctx.resp_ptr += 1;
        self.ctx.resp_step = if index + 1 < self.ctx.staged.len() {
          RespStep::Data(index + 1)
        } else {
          RespStep::Terminator
        };
      }
      RespStep::Terminator => {
        if resp.write(self.ctx.resp_ptr, TERMINATOR) {
          self.ctx.resp_ptr += 1;
        } else {
          self.latch(EngineError::ResponseAddressOverflow);
        }
        self.state = State::Fin;
      }
    }
  }

  fn fin(&mut self, seq: &mut SeqRef) {
    self.error_flag = self.ctx.error.is_some();
    self.last_error = self.ctx.error;
    if !self.ctx.skip && self.ctx.error.is_none() {
      // One-cycle strobe: propose the new reference value. Not asserted on
      // skip/replay, not on error.
      seq.set(self.ctx.header.seq);
    }
    log::info!(
      "frame done: seq={} skip={} error={:?} results={}",
      self.ctx.header.seq,
      self.ctx.skip,
      self.ctx.error,
      self.ctx.staged.len()
    );
    self.finished = true;
    self.state = State::Idle;
  }
}

/// ------------------------------------------------------------
/// --- Test Functions ---
/// ------------------------------------------------------------
#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::bus::SramBus;
  use crate::engine::frame::FrameHeader;

  fn drive(engine: &mut Engine, cmd: &CmdBuffer, resp: &mut RespBuffer, bus: &mut SramBus, seq: &mut SeqRef) {
    assert!(engine.execute());
    for _ in 0..10_000 {
      engine.tick(cmd, resp, bus, seq);
      if engine.finished() {
        return;
      }
    }
    panic!("engine did not finish");
  }

  fn header(seq: u8, force: bool, len_m1: u16) -> u16 {
    FrameHeader { seq, force, len_m1 }.encode()
  }

  #[test]
  fn test_empty_frame() {
    let mut engine = Engine::new(EngineConfig::default());
    let mut cmd = CmdBuffer::new(10);
    let mut resp = RespBuffer::new(10);
    let mut bus = SramBus::new(12, 0);
    let mut seq = SeqRef::new(0);

    // Frame is just header + terminator; one word follows the header.
    cmd.load(&[header(1, false, 0), TERMINATOR]);
    drive(&mut engine, &cmd, &mut resp, &mut bus, &mut seq);

    assert!(!engine.error());
    assert_eq!(resp.words(), &[response_header(1, false, 0), TERMINATOR]);
    assert_eq!(seq.get(), 1);
    assert!(!engine.busy());
  }

  #[test]
  fn test_nop_consumes_budget() {
    let mut engine = Engine::new(EngineConfig::default());
    let mut cmd = CmdBuffer::new(10);
    let mut resp = RespBuffer::new(10);
    let mut bus = SramBus::new(12, 0);
    let mut seq = SeqRef::new(0);

    cmd.load(&[header(1, false, 2), 0xE000, 0xE000, TERMINATOR]);
    drive(&mut engine, &cmd, &mut resp, &mut bus, &mut seq);

    assert!(!engine.error());
    assert!(bus.journal().is_empty());
  }

  #[test]
  fn test_execute_rejected_while_busy() {
    let mut engine = Engine::new(EngineConfig::default());
    let mut cmd = CmdBuffer::new(10);
    let mut resp = RespBuffer::new(10);
    let mut bus = SramBus::new(12, 0);
    let mut seq = SeqRef::new(0);

    cmd.load(&[header(1, false, 0), TERMINATOR]);
    assert!(engine.execute());
    assert!(!engine.execute());
    engine.tick(&cmd, &mut resp, &mut bus, &mut seq);
    assert!(engine.busy());
  }

  #[test]
  fn test_start_addr_gated_by_config() {
    let mut engine = Engine::new(EngineConfig::default());
    assert!(!engine.execute_at(4, 0));

    let mut engine = Engine::new(EngineConfig {
      start_addr_en: true,
      ..EngineConfig::default()
    });
    assert!(engine.execute_at(4, 2));
  }

  #[test]
  fn test_reset_discards_frame() {
    let mut engine = Engine::new(EngineConfig::default());
    assert!(engine.execute());
    assert!(engine.busy());
    engine.reset();
    assert!(!engine.busy());
    assert!(engine.execute());
  }
}
