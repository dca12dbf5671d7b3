//! Fast file container reader
//!
//! Fast files (`TAff0000`) are block-compressed asset containers.
//!
//! # Format Overview
//!
//! ## Header (2112 bytes)
//! - Bytes 0-7: `TAff0000` magic
//! - Bytes 8-11: Version (0x27E)
//! - Bytes 12-15: Compression tag, algorithm in bits 8+
//! - Bytes 16+: Reserved
//!
//! ## Blocks
//! Each block is an 18-byte descriptor followed by a raw deflate payload:
//! - Bytes 0-3: Declared size (0 ends the stream)
//! - Bytes 4-7: Decoded size
//! - Bytes 8-11: Secondary size (payload length + 2)
//! - Bytes 12-15: Position of this descriptor in the file
//! - Bytes 16-17: Sentinel `48 0D`
//!
//! The inflated blocks concatenate into the decoded stream, which holds a
//! string table followed by the serialized assets.

mod block;
mod decode;
mod header;
pub mod scan;
mod strings;

pub use block::{BlockDescriptor, DATA_BLOCK_SENTINEL, DESCRIPTOR_SIZE};
pub use decode::{decode, DecodeSummary};
pub use header::{Compression, Header, HEADER_SIZE, MAGIC, VERSION};
pub use scan::{scan, Candidate, HeaderKind};
pub use strings::StringTable;

/// Errors from fast file decoding
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid fast file magic: expected 'TAff0000', got {0:02x?}")]
    InvalidMagic([u8; 8]),

    #[error("Unsupported fast file version: expected 0x{expected:x}, got 0x{actual:x}")]
    UnsupportedVersion { expected: i32, actual: i32 },

    #[error("Unsupported compression: {0:?}")]
    UnsupportedCompression(Compression),

    #[error("Data too short: need {needed} bytes, got {actual}")]
    DataTooShort { needed: usize, actual: usize },

    #[error("Block at offset {offset:#x} declares a payload of {len} bytes past end of input")]
    TruncatedBlock { offset: usize, len: i64 },

    #[error("Failed to inflate block at offset {offset:#x}: {source}")]
    Inflate {
        offset: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for header rejections, which happen before any block is read.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::InvalidMagic(_)
                | Error::UnsupportedVersion { .. }
                | Error::UnsupportedCompression(_)
                | Error::DataTooShort { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
