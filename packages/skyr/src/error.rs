use thiserror::Error;

/// Errors produced by the alignment core.
///
/// `Overflow` is the only retryable variant: the caller is expected to widen
/// the lane type (u8 -> u16 -> u32) and run the alignment again. Everything
/// else indicates a misuse that retrying cannot fix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignError {
  /// Scoring parameters cannot be represented in the requested lane width.
  #[error("invalid alignment configuration: {0}")]
  InvalidConfig(String),

  /// A score row saturated the lane encoding and could not be rescaled.
  #[error("alignment scores overflowed the {bits}-bit lane encoding")]
  Overflow { bits: u32 },

  /// Multi-sequence operations need at least two sequences.
  #[error("at least 2 sequences are required, but {0} provided")]
  EmptyInput(usize),

  /// A reconstruction artefact was requested but traceback was disabled.
  #[error("traceback is disabled, alignment cannot be reconstructed")]
  TracebackUnavailable,

  /// Strict-alphabet mode rejected a sequence byte.
  #[error("unsupported byte {0:#04x} in sequence (strict alphabet is enabled)")]
  UnsupportedAlphabet(u8),
}
