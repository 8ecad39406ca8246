// Command frame input format: one frame per line, whitespace-separated hex
// words, `#` starts a comment. Stands in for the byte transports that deliver
// command buffers on the real device.

use std::fs;
use std::io::{self, Result};
use std::path::Path;

pub fn parse_frame_file(path: &Path) -> Result<Vec<Vec<u16>>> {
  let content = fs::read_to_string(path)
    .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("cannot read frame file {:?}: {}", path, e)))?;
  parse_frames(&content)
}

pub fn parse_frames(content: &str) -> Result<Vec<Vec<u16>>> {
  let mut frames = Vec::new();
  for (lineno, line) in content.lines().enumerate() {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
      continue;
    }
    let mut words = Vec::new();
    for token in line.split_whitespace() {
      let token = token.trim_start_matches("0x");
      let word = u16::from_str_radix(token, 16).map_err(|e| {
        io::Error::new(
          io::ErrorKind::InvalidData,
          format!("line {}: bad word '{}': {}", lineno + 1, token, e),
        )
      })?;
      words.push(word);
    }
    frames.push(words);
  }
  Ok(frames)
}

/// ------------------------------------------------------------
/// --- Test Functions ---
/// ------------------------------------------------------------
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_frames() {
    let frames = parse_frames("# demo\n1000 0005 00AB FFFF\n\n0x2000 0xFFFF # trailing comment\n").unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], vec![0x1000, 0x0005, 0x00AB, 0xFFFF]);
    assert_eq!(frames[1], vec![0x2000, 0xFFFF]);
  }

  #[test]
  fn test_parse_rejects_bad_word() {
    assert!(parse_frames("xyzw\n").is_err());
  }
}
