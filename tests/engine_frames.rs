use memexec::engine::buffer::{CmdBuffer, RespBuffer};
use memexec::engine::bus::{BusEvent, LaneStrobe, SramBus};
use memexec::engine::frame::{response_header, FrameHeader, SeqRef, TERMINATOR};
use memexec::engine::{Engine, EngineConfig, EngineError};
use memexec::utils::log::init_log;

fn header(seq: u8, force: bool, len_m1: u16) -> u16 {
  FrameHeader { seq, force, len_m1 }.encode()
}

struct Rig {
  engine: Engine,
  cmd: CmdBuffer,
  resp: RespBuffer,
  bus: SramBus,
  seq: SeqRef,
}

impl Rig {
  fn new(cfg: EngineConfig, wait_states: u32) -> Self {
    init_log();
    Self {
      cmd: CmdBuffer::new(cfg.cmd_addr_bits),
      resp: RespBuffer::new(cfg.resp_addr_bits),
      bus: SramBus::new(cfg.bus_addr_bits, wait_states),
      engine: Engine::new(cfg),
      seq: SeqRef::new(0),
    }
  }

  fn run(&mut self, frame: &[u16]) {
    self.cmd.load(frame);
    self.resp.clear();
    assert!(self.engine.execute());
    for _ in 0..100_000 {
      self
        .engine
        .tick(&self.cmd, &mut self.resp, &mut self.bus, &mut self.seq);
      if self.engine.finished() {
        return;
      }
    }
    panic!("frame did not complete");
  }
}

#[test]
fn single_write_hits_the_bus_once() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  // opcode 0x0005: write one word at bus address 5
  rig.run(&[header(1, false, 2), 0x0005, 0x00AB, TERMINATOR]);

  assert!(!rig.engine.error());
  assert_eq!(
    rig.bus.journal(),
    &[BusEvent::Write {
      addr: 5,
      data: 0x00AB,
      strobe: LaneStrobe::Lower,
    }]
  );
  assert_eq!(rig.bus.peek(5), 0x00AB);
  assert_eq!(rig.resp.words(), &[response_header(1, false, 0), TERMINATOR]);
  assert_eq!(rig.seq.get(), 1);
}

#[test]
fn single_read_returns_one_result_word() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  rig.bus.poke(5, 0xCAFE_1234);
  // opcode 0x4005: read one word at bus address 5
  rig.run(&[header(1, false, 2), 0x4005, TERMINATOR]);

  assert!(!rig.engine.error());
  assert_eq!(rig.bus.journal(), &[BusEvent::Read { addr: 5 }]);
  assert_eq!(rig.resp.words(), &[response_header(1, false, 1), 0x1234, TERMINATOR]);
}

#[test]
fn burst_write_packs_half_words() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  // Three 16-bit data words pack into one full bus word plus a lower-lane
  // tail write at the next address.
  rig.run(&[
    header(1, false, 5),
    0x8002,
    0x0003,
    0x1111,
    0x2222,
    0x3333,
    TERMINATOR,
  ]);

  assert!(!rig.engine.error());
  assert_eq!(
    rig.bus.journal(),
    &[
      BusEvent::Write {
        addr: 3,
        data: 0x2222_1111,
        strobe: LaneStrobe::Both,
      },
      BusEvent::Write {
        addr: 4,
        data: 0x3333,
        strobe: LaneStrobe::Lower,
      },
    ]
  );
  assert_eq!(rig.bus.peek(3), 0x2222_1111);
  assert_eq!(rig.bus.peek(4), 0x0000_3333);
  assert_eq!(rig.resp.words(), &[response_header(1, false, 0), TERMINATOR]);
}

#[test]
fn burst_read_unpacks_half_words() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  rig.bus.poke(3, 0x2222_1111);
  rig.bus.poke(4, 0x9999_3333);
  rig.run(&[header(1, false, 5), 0xA002, 0x0003, TERMINATOR]);

  assert!(!rig.engine.error());
  assert_eq!(rig.bus.journal(), &[BusEvent::Read { addr: 3 }, BusEvent::Read { addr: 4 }]);
  // Odd transfer count: the upper half of the last bus word is discarded.
  assert_eq!(
    rig.resp.words(),
    &[response_header(1, false, 3), 0x1111, 0x2222, 0x3333, TERMINATOR]
  );
}

#[test]
fn duplicate_sequence_is_acknowledged_without_execution() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  let frame = [header(1, false, 2), 0x0005, 0x00AB, TERMINATOR];
  rig.run(&frame);
  assert_eq!(rig.bus.journal().len(), 1);
  assert_eq!(rig.seq.get(), 1);

  // Same sequence number again: ack replayed, no bus traffic, reference kept.
  rig.run(&frame);
  assert!(!rig.engine.error());
  assert_eq!(rig.bus.journal().len(), 1);
  assert_eq!(rig.resp.words(), &[response_header(1, false, 0), TERMINATOR]);
  assert_eq!(rig.seq.get(), 1);
}

#[test]
fn force_bit_overrides_sequence_dedup() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  let frame = [header(1, true, 2), 0x0005, 0x00AB, TERMINATOR];
  rig.run(&frame);
  rig.run(&frame);

  assert_eq!(rig.bus.journal().len(), 2);
}

#[test]
fn seq_check_disabled_executes_every_frame() {
  let cfg = EngineConfig {
    seq_check: false,
    ..EngineConfig::default()
  };
  let mut rig = Rig::new(cfg, 0);
  let frame = [header(1, false, 2), 0x0005, 0x00AB, TERMINATOR];
  rig.run(&frame);
  rig.run(&frame);

  assert_eq!(rig.bus.journal().len(), 2);
}

#[test]
fn invalid_opcode_aborts_the_frame() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  rig.run(&[header(1, false, 3), 0xC000, 0x0005, TERMINATOR]);

  assert!(rig.engine.error());
  assert_eq!(rig.engine.last_error(), Some(EngineError::InvalidOpcode));
  assert!(rig.bus.journal().is_empty());
  assert_eq!(rig.resp.words(), &[response_header(1, true, 0), TERMINATOR]);
  // A failed frame must not advance the sequence reference.
  assert_eq!(rig.seq.get(), 0);
}

#[test]
fn frame_longer_than_declared_is_rejected() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  // Header declares one word, but opcode + data + terminator follow.
  rig.run(&[header(1, false, 0), 0x0005, 0x00AB, TERMINATOR]);

  assert!(rig.engine.error());
  assert_eq!(rig.engine.last_error(), Some(EngineError::FrameLengthExceeded));
  assert_eq!(rig.resp.words(), &[response_header(1, true, 0), TERMINATOR]);
}

#[test]
fn frame_shorter_than_declared_is_rejected() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  // Header declares six words, but the terminator comes first.
  rig.run(&[header(1, false, 5), TERMINATOR]);

  assert!(rig.engine.error());
  assert_eq!(rig.engine.last_error(), Some(EngineError::FrameLengthExceeded));
}

#[test]
fn len_check_disabled_ignores_declared_length() {
  let cfg = EngineConfig {
    len_check: false,
    ..EngineConfig::default()
  };
  let mut rig = Rig::new(cfg, 0);
  rig.run(&[header(1, false, 0), 0x0005, 0x00AB, TERMINATOR]);

  assert!(!rig.engine.error());
  assert_eq!(rig.bus.journal().len(), 1);
}

#[test]
fn oversized_burst_read_wraps_the_count_field() {
  let cfg = EngineConfig {
    resp_addr_bits: 13,
    len_check: false,
    ..EngineConfig::default()
  };
  let mut rig = Rig::new(cfg, 0);
  // 4096 result words overflow the 11-bit count field; the header wraps to 0
  // but every data word is still delivered.
  rig.run(&[header(1, false, 0), 0xAFFF, 0x0000, TERMINATOR]);

  assert!(!rig.engine.error());
  let words = rig.resp.words();
  assert_eq!(words.len(), 4098);
  assert_eq!(words[0], response_header(1, false, 4096));
  assert_eq!(words[0] & 0x07FF, 0);
  assert_eq!(words[words.len() - 1], TERMINATOR);
}

#[test]
fn missing_terminator_overflows_the_command_space() {
  let cfg = EngineConfig {
    cmd_addr_bits: 2,
    ..EngineConfig::default()
  };
  let mut rig = Rig::new(cfg, 0);
  // No terminator anywhere in the four-word command space.
  rig.run(&[header(1, false, 0x7FF), 0xE000, 0xE000, 0xE000]);

  assert!(rig.engine.error());
  assert_eq!(rig.engine.last_error(), Some(EngineError::CommandAddressOverflow));
}

#[test]
fn response_overflow_latches_error() {
  let cfg = EngineConfig {
    resp_addr_bits: 1,
    ..EngineConfig::default()
  };
  let mut rig = Rig::new(cfg, 0);
  // Three result words cannot fit a two-word response space.
  rig.run(&[header(1, false, 5), 0xA002, 0x0003, TERMINATOR]);

  assert!(rig.engine.error());
  assert_eq!(rig.engine.last_error(), Some(EngineError::ResponseAddressOverflow));
  assert_eq!(rig.seq.get(), 0);
}

#[test]
fn wait_states_do_not_change_the_transaction_stream() {
  let frame = [
    header(1, false, 5),
    0x8002,
    0x0003,
    0x1111,
    0x2222,
    0x3333,
    TERMINATOR,
  ];

  let mut fast = Rig::new(EngineConfig::default(), 0);
  fast.run(&frame);

  let mut slow = Rig::new(EngineConfig::default(), 3);
  slow.run(&frame);

  // Held requests are re-presented, never duplicated or dropped.
  assert_eq!(fast.bus.journal(), slow.bus.journal());
  assert_eq!(fast.bus.peek(3), slow.bus.peek(3));
  assert_eq!(fast.bus.peek(4), slow.bus.peek(4));
  assert_eq!(fast.resp.words(), slow.resp.words());
}

#[test]
fn mixed_frame_executes_commands_in_order() {
  let mut rig = Rig::new(EngineConfig::default(), 0);
  rig.bus.poke(7, 0xBEEF_0042);
  // nop, single write, single read, nop
  rig.run(&[
    header(2, false, 6),
    0xE000,
    0x0005,
    0x1234,
    0x4007,
    0xE000,
    TERMINATOR,
  ]);

  assert!(!rig.engine.error());
  assert_eq!(
    rig.bus.journal(),
    &[
      BusEvent::Write {
        addr: 5,
        data: 0x1234,
        strobe: LaneStrobe::Lower,
      },
      BusEvent::Read { addr: 7 },
    ]
  );
  assert_eq!(rig.resp.words(), &[response_header(2, false, 1), 0x0042, TERMINATOR]);
  assert_eq!(rig.seq.get(), 2);
}
