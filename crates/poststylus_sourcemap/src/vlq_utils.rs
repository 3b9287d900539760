use std::iter::Peekable;

use crate::sourcemap_error::{SourceMapError, SourceMapErrorType};

pub fn is_mapping_separator(byte: u8) -> bool {
  byte == b';' || byte == b','
}

/// Reads a single VLQ value and adds it to `previous`, mappings are stored
/// relative to the previous segment
pub fn read_relative_vlq<B>(previous: &mut i64, input: &mut Peekable<B>) -> Result<(), SourceMapError>
where
  B: Iterator<Item = u8>,
{
  let decoded = vlq::decode(input)?;
  let (new, overflowed) = previous.overflowing_add(decoded);
  if overflowed || new > (u32::MAX as i64) {
    return Err(SourceMapError::new_with_reason(
      SourceMapErrorType::UnexpectedlyBigNumber,
      "read_relative_vlq",
    ));
  }

  if new < 0 {
    return Err(SourceMapError::new_with_reason(
      SourceMapErrorType::UnexpectedNegativeNumber,
      "read_relative_vlq",
    ));
  }

  *previous = new;
  Ok(())
}
