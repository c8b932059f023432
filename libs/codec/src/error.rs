//! Codec error types

use thiserror::Error;

/// Result alias for decode operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Errors produced while decoding a wire frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("frame truncated: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("frame length mismatch: header declares {declared} bytes, frame has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("invalid priority byte: {0}")]
    InvalidPriority(u8),

    #[error("invalid response status byte: {0}")]
    InvalidStatus(u8),

    #[error("negative {field} section size: {size}")]
    NegativeSectionSize { field: &'static str, size: i32 },

    #[error("{field} section too large: {size} bytes > {max} bytes")]
    SectionTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },

    #[error("creation date out of range: {ticks} ticks")]
    InvalidTimestamp { ticks: i64 },

    #[error("message text is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),
}

/// Errors produced while encoding a work item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{field} section too large to encode: {size} bytes > {max} bytes")]
    SectionTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },
}
