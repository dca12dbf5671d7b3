//! Asset extraction engine
//!
//! Lists and exports assets from two kinds of backing store:
//!
//! - A live game process, where asset pools are located by signature scan
//!   and entries are walked in place.
//! - A decoded fast file container, where assets are discovered inline by
//!   the placeholder-pointer heuristic in [`hydra_ff::scan`].
//!
//! Both stores share record layouts; the differences (string index bias,
//! pointer presence, index block padding) are carried by [`Session`] and
//! [`Backing`].
//!
//! # Example
//!
//! ```no_run
//! use hydra::{export_all, ContainerOptions, ExportTarget, Session};
//!
//! let session = Session::open_container(
//!     "zm_tomb.ff".as_ref(),
//!     &ContainerOptions::default(),
//!     |_| true,
//! )?;
//! let assets = session.enumerate(|_| true, || false)?;
//! let summary = export_all(&session, &assets, &ExportTarget::new("exported_files"), |_, _| {}, || false);
//! println!("{}", summary.message());
//! # Ok::<(), hydra::Error>(())
//! ```

pub mod asset;
pub mod cursor;
pub mod export;
pub mod gdt;
pub mod json;
pub mod kinds;
pub mod pattern;
pub mod pool;
pub mod profile;
pub mod session;
pub mod source;
pub mod strings;

pub use asset::{Asset, AssetHeader, AssetKind, Backing};
pub use cursor::{Cursor, Record};
pub use export::{export_all, ExportFailure, ExportSummary, ExportTarget};
pub use pattern::Pattern;
pub use pool::{PoolDescriptor, PoolIndex};
pub use profile::Profile;
pub use session::{decoded_path_for, ContainerOptions, Session};
pub use source::{BufferSource, MemoryRegion, MemorySource, StreamData};
#[cfg(test)]
pub use source::MockMemorySource;
pub use strings::StringPool;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] hydra_ff::Error),

    #[error("Could not locate {what}")]
    NotFound { what: String },

    #[error("Read of {len} bytes at {address:#x} is out of bounds")]
    OutOfBounds { address: u64, len: usize },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
