// Combinational decode of one 16-bit command word. The executor consults this
// once per fetched word.

/// Command word variants, selected by the top bits (MSB first):
///
/// | Pattern   | Meaning            | Operand words             |
/// |-----------|--------------------|---------------------------|
/// | 00 + a14  | single write       | next word = data          |
/// | 01 + a14  | single read        | none                      |
/// | 100 + l13 | burst write header | address word, then N data |
/// | 101 + l13 | burst read header  | address word              |
/// | 1110      | no-op              | none                      |
/// | 1111      | terminator         | none                      |
/// | 1100/1101 | invalid            | raises error              |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdOp {
  Write1 { addr: u16 },
  Read1 { addr: u16 },
  WriteN { len_m1: u16 },
  ReadN { len_m1: u16 },
  Nop,
  Terminate,
  Invalid,
}

pub fn decode(word: u16) -> CmdOp {
  match word >> 14 {
    0b00 => CmdOp::Write1 { addr: word & 0x3FFF },
    0b01 => CmdOp::Read1 { addr: word & 0x3FFF },
    _ => match word >> 13 {
      0b100 => CmdOp::WriteN { len_m1: word & 0x1FFF },
      0b101 => CmdOp::ReadN { len_m1: word & 0x1FFF },
      _ => match word >> 12 {
        0b1110 => CmdOp::Nop,
        0b1111 => CmdOp::Terminate,
        _ => CmdOp::Invalid,
      },
    },
  }
}

/// ------------------------------------------------------------
/// --- Test Functions ---
/// ------------------------------------------------------------
#[test]
fn test_decode_single_ops() {
  assert_eq!(decode(0x0005), CmdOp::Write1 { addr: 5 });
  assert_eq!(decode(0x3FFF), CmdOp::Write1 { addr: 0x3FFF });
  assert_eq!(decode(0x4005), CmdOp::Read1 { addr: 5 });
  assert_eq!(decode(0x7FFF), CmdOp::Read1 { addr: 0x3FFF });
}

#[test]
fn test_decode_burst_ops() {
  assert_eq!(decode(0x8002), CmdOp::WriteN { len_m1: 2 });
  assert_eq!(decode(0x9FFF), CmdOp::WriteN { len_m1: 0x1FFF });
  assert_eq!(decode(0xA002), CmdOp::ReadN { len_m1: 2 });
  assert_eq!(decode(0xBFFF), CmdOp::ReadN { len_m1: 0x1FFF });
}

#[test]
fn test_decode_control_ops() {
  assert_eq!(decode(0xE000), CmdOp::Nop);
  assert_eq!(decode(0xE123), CmdOp::Nop);
  assert_eq!(decode(0xFFFF), CmdOp::Terminate);
  assert_eq!(decode(0xF000), CmdOp::Terminate);
  assert_eq!(decode(0xC000), CmdOp::Invalid);
  assert_eq!(decode(0xD1A5), CmdOp::Invalid);
}
