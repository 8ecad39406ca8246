// 16-bit word buffers behind the command and response interfaces. Capacity is
// fixed by the configured address width; accesses past it surface as overflow
// to the executor.

/// Command buffer: loaded by the transport, consumed word-by-word. The
/// external owner must not mutate it while a frame is in flight.
#[derive(Debug, Clone)]
pub struct CmdBuffer {
  words: Vec<u16>,
  addr_bits: u32,
}

impl CmdBuffer {
  pub fn new(addr_bits: u32) -> Self {
    Self {
      words: Vec::new(),
      addr_bits,
    }
  }

  pub fn capacity(&self) -> usize {
    1usize << self.addr_bits
  }

  /// Replace the buffer content. Returns false when the frame was truncated
  /// to the address space.
  pub fn load(&mut self, words: &[u16]) -> bool {
    let fits = words.len() <= self.capacity();
    let take = words.len().min(self.capacity());
    self.words.clear();
    self.words.extend_from_slice(&words[..take]);
    fits
  }

  /// Word fetch; None past the end of the address space. Unwritten words
  /// inside the address space read as zero.
  pub fn fetch(&self, addr: usize) -> Option<u16> {
    if addr >= self.capacity() {
      return None;
    }
    Some(self.words.get(addr).copied().unwrap_or(0))
  }
}

/// Response buffer: written one word at a time by the response writer.
#[derive(Debug, Clone)]
pub struct RespBuffer {
  words: Vec<u16>,
  addr_bits: u32,
}

impl RespBuffer {
  pub fn new(addr_bits: u32) -> Self {
    Self {
      words: Vec::new(),
      addr_bits,
    }
  }

  pub fn capacity(&self) -> usize {
    1usize << self.addr_bits
  }

  /// Word write; false past the end of the address space.
  pub fn write(&mut self, addr: usize, word: u16) -> bool {
    if addr >= self.capacity() {
      return false;
    }
    if self.words.len() <= addr {
      self.words.resize(addr + 1, 0);
    }
    self.words[addr] = word;
    true
  }

  pub fn words(&self) -> &[u16] {
    &self.words
  }

  pub fn clear(&mut self) {
    self.words.clear();
  }
}

/// ------------------------------------------------------------
/// --- Test Functions ---
/// ------------------------------------------------------------
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cmd_fetch_bounds() {
    let mut cmd = CmdBuffer::new(2);
    assert!(cmd.load(&[0x1111, 0x2222]));
    assert_eq!(cmd.fetch(0), Some(0x1111));
    assert_eq!(cmd.fetch(2), Some(0)); // in range, unwritten
    assert_eq!(cmd.fetch(4), None); // past the address space
  }

  #[test]
  fn test_cmd_load_truncates() {
    let mut cmd = CmdBuffer::new(1);
    assert!(!cmd.load(&[1, 2, 3]));
    assert_eq!(cmd.fetch(1), Some(2));
  }

  #[test]
  fn test_resp_write_bounds() {
    let mut resp = RespBuffer::new(1);
    assert!(resp.write(0, 0xAAAA));
    assert!(resp.write(1, 0xBBBB));
    assert!(!resp.write(2, 0xCCCC));
    assert_eq!(resp.words(), &[0xAAAA, 0xBBBB]);
  }
}
