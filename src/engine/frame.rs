// Frame header words shared by the executor and the response writer.

/// Frame terminator sentinel, last word of every command and response frame.
pub const TERMINATOR: u16 = 0xFFFF;

/// Width mask of the 4-bit sequence number.
pub const SEQ_MASK: u8 = 0x0F;

/// Width mask of the 11-bit length field.
pub const LEN_MASK: u16 = 0x07FF;

/// Decoded word 0 of a command frame.
///
/// Layout (MSB first): seq[15:12] | force[11] | len_m1[10:0].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
  pub seq: u8,
  pub force: bool,
  pub len_m1: u16,
}

impl FrameHeader {
  pub fn decode(word: u16) -> Self {
    Self {
      seq: ((word >> 12) & SEQ_MASK as u16) as u8,
      force: word & 0x0800 != 0,
      len_m1: word & LEN_MASK,
    }
  }

  pub fn encode(&self) -> u16 {
    ((self.seq & SEQ_MASK) as u16) << 12 | (self.force as u16) << 11 | (self.len_m1 & LEN_MASK)
  }
}

/// Response header word: echoed sequence number, aggregate error flag and the
/// count of result data words between the header and the terminator.
///
/// Layout mirrors the command header: seq[15:12] | error[11] | count[10:0].
/// The count is truncated to its 11 bits. A frame can only stage more than
/// 2047 result words with length checking disabled; the field then wraps
/// while the data words still follow in full.
pub fn response_header(seq: u8, error: bool, count: u16) -> u16 {
  ((seq & SEQ_MASK) as u16) << 12 | (error as u16) << 11 | (count & LEN_MASK)
}

/// Sequence reference held by the caller, not by the engine. A single engine
/// instance may service interleaved frame classes with independent sequence
/// histories, so the engine only reads this during header decode and proposes
/// a write when a frame executes without error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeqRef {
  value: u8,
}

impl SeqRef {
  pub fn new(value: u8) -> Self {
    Self {
      value: value & SEQ_MASK,
    }
  }

  pub fn get(&self) -> u8 {
    self.value
  }

  pub fn set(&mut self, value: u8) {
    self.value = value & SEQ_MASK;
  }
}

/// ------------------------------------------------------------
/// --- Test Functions ---
/// ------------------------------------------------------------
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_decode() {
    // seq=5, force=1, len_m1=3
    let header = FrameHeader::decode(0x5803);
    assert_eq!(header.seq, 5);
    assert!(header.force);
    assert_eq!(header.len_m1, 3);

    // seq=0xF, force=0, len_m1=0x7FF
    let header = FrameHeader::decode(0xF7FF);
    assert_eq!(header.seq, 0xF);
    assert!(!header.force);
    assert_eq!(header.len_m1, 0x7FF);
  }

  #[test]
  fn test_header_encode() {
    let header = FrameHeader {
      seq: 2,
      force: false,
      len_m1: 7,
    };
    assert_eq!(header.encode(), 0x2007);
  }

  #[test]
  fn test_response_header() {
    assert_eq!(response_header(3, false, 0), 0x3000);
    assert_eq!(response_header(3, true, 0), 0x3800);
    assert_eq!(response_header(0xA, false, 5), 0xA005);
  }

  #[test]
  fn test_seq_ref_masks_to_four_bits() {
    let mut seq = SeqRef::new(0x1F);
    assert_eq!(seq.get(), 0xF);
    seq.set(0x12);
    assert_eq!(seq.get(), 2);
  }
}
