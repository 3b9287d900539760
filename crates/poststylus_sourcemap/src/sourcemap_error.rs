use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceMapErrorType {
  /// A VLQ segment ended before its last digit
  VlqUnexpectedEof,
  /// A VLQ segment contained a character outside the base64 alphabet
  VlqInvalidBase64,
  /// A VLQ value did not fit into 64 bits
  VlqOverflow,
  /// A mapping referenced a source that is not in `sources`
  SourceOutOfRange,
  /// A mapping referenced a name that is not in `names`
  NameOutOfRange,
  UnexpectedNegativeNumber,
  UnexpectedlyBigNumber,
  /// The input was not a JSON source map
  InvalidJson,
  /// The data url could not be decoded, or did not hold JSON
  DataUrlError,
  IoError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMapError {
  pub error_type: SourceMapErrorType,
  pub reason: Option<String>,
}

impl SourceMapError {
  pub fn new(error_type: SourceMapErrorType) -> Self {
    Self {
      error_type,
      reason: None,
    }
  }

  pub fn new_with_reason(error_type: SourceMapErrorType, reason: &str) -> Self {
    Self {
      error_type,
      reason: Some(String::from(reason)),
    }
  }
}

impl fmt::Display for SourceMapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let message = match self.error_type {
      SourceMapErrorType::VlqUnexpectedEof => "Unexpected end of VLQ segment",
      SourceMapErrorType::VlqInvalidBase64 => "Invalid base64 character in VLQ segment",
      SourceMapErrorType::VlqOverflow => "VLQ value overflowed",
      SourceMapErrorType::SourceOutOfRange => "Source index out of range",
      SourceMapErrorType::NameOutOfRange => "Name index out of range",
      SourceMapErrorType::UnexpectedNegativeNumber => "Unexpected negative number",
      SourceMapErrorType::UnexpectedlyBigNumber => "Unexpectedly big number",
      SourceMapErrorType::InvalidJson => "Invalid source map JSON",
      SourceMapErrorType::DataUrlError => "Invalid source map data url",
      SourceMapErrorType::IoError => "Failed to write source map",
    };

    write!(f, "{message}")?;

    if let Some(reason) = &self.reason {
      write!(f, ": {reason}")?;
    }

    Ok(())
  }
}

impl std::error::Error for SourceMapError {}

impl From<vlq::Error> for SourceMapError {
  fn from(err: vlq::Error) -> Self {
    match err {
      vlq::Error::UnexpectedEof => SourceMapError::new(SourceMapErrorType::VlqUnexpectedEof),
      vlq::Error::InvalidBase64(_) => SourceMapError::new(SourceMapErrorType::VlqInvalidBase64),
      vlq::Error::Overflow => SourceMapError::new(SourceMapErrorType::VlqOverflow),
    }
  }
}

impl From<serde_json::Error> for SourceMapError {
  fn from(err: serde_json::Error) -> Self {
    SourceMapError::new_with_reason(SourceMapErrorType::InvalidJson, &err.to_string())
  }
}

impl From<std::io::Error> for SourceMapError {
  fn from(err: std::io::Error) -> Self {
    SourceMapError::new_with_reason(SourceMapErrorType::IoError, &err.to_string())
  }
}
