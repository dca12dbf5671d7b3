//! Memory Source Abstraction
//!
//! Byte-level readers shared by both backing stores:
//! - Live processes, implemented outside this crate
//! - Decoded containers via `BufferSource`
//! - Mock images for testing

mod buffer;
#[cfg(test)]
mod mock;
mod region;
mod traits;

pub use buffer::{BufferSource, StreamData};
#[cfg(test)]
pub use mock::MockMemorySource;
pub use region::MemoryRegion;
pub use traits::{MemorySource, MAX_CSTRING_LEN};
