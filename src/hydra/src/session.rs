//! Extraction sessions
//!
//! A session owns exactly one backing store, either a process image with
//! its located pools or a decoded container, and releases it on drop.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hydra_ff::{DecodeSummary, Header, StringTable};
use memmap2::Mmap;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::asset::{sort_by_kind, Asset, AssetKind, Backing};
use crate::kinds;
use crate::pool::PoolIndex;
use crate::profile::Profile;
use crate::source::{BufferSource, MemorySource, StreamData};
use crate::{Error, Result};

/// Options for opening a container
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Keep the decoded stream next to the input as `<file>.decoded.dat`
    pub keep_decoded: bool,
}

pub struct Session {
    store: Store,
}

enum Store {
    Process {
        source: Box<dyn MemorySource>,
        index: PoolIndex,
    },
    Container(Container),
}

struct Container {
    header: Header,
    summary: DecodeSummary,
    strings: StringTable,
    // Declared before `file`: the mapping must be released before the
    // temporary file is deleted.
    source: BufferSource<StreamData>,
    file: DecodedFile,
}

enum DecodedFile {
    Temporary(NamedTempFile),
    Kept(PathBuf),
    InMemory,
}

impl DecodedFile {
    fn path(&self) -> Option<&Path> {
        match self {
            DecodedFile::Temporary(temp) => Some(temp.path()),
            DecodedFile::Kept(path) => Some(path),
            DecodedFile::InMemory => None,
        }
    }
}

/// Where a kept decoded stream is written for `input`
pub fn decoded_path_for(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".decoded.dat");
    PathBuf::from(name)
}

impl Session {
    /// Locate pools in a process image and start a session over it
    pub fn attach(source: Box<dyn MemorySource>, profile: &'static Profile, start: u64) -> Result<Self> {
        let index = PoolIndex::locate(source.as_ref(), profile, start)?;
        Ok(Self::from_index(source, index))
    }

    /// Start a process session with an already located pool index
    pub fn from_index(source: Box<dyn MemorySource>, index: PoolIndex) -> Self {
        Self {
            store: Store::Process { source, index },
        }
    }

    /// Decode a container file and map the decoded stream.
    ///
    /// The stream goes to a temporary file that is deleted with the session
    /// unless `keep_decoded` is set. `progress` follows `hydra_ff::decode`.
    pub fn open_container<P>(path: &Path, options: &ContainerOptions, progress: P) -> Result<Self>
    where
        P: FnMut(f32) -> bool,
    {
        let input = File::open(path)?;
        // SAFETY: the input is only read while this function runs.
        let input = unsafe { Mmap::map(&input) }?;

        let (file, handle) = if options.keep_decoded {
            let kept = decoded_path_for(path);
            let handle = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&kept)?;
            (DecodedFile::Kept(kept), handle)
        } else {
            let temp = NamedTempFile::new()?;
            let handle = temp.reopen()?;
            (DecodedFile::Temporary(temp), handle)
        };

        let (header, summary) = match write_decoded(&input, &handle, progress) {
            Ok(decoded) => decoded,
            Err(e) => {
                if let DecodedFile::Kept(kept) = &file {
                    let _ = std::fs::remove_file(kept);
                }
                return Err(e);
            }
        };

        let data = if summary.bytes_out == 0 {
            StreamData::Owned(Vec::new())
        } else {
            // SAFETY: the decoded file is owned by this session and not
            // written again after this point.
            StreamData::Mapped(unsafe { Mmap::map(&handle) }?)
        };

        info!(
            input = %path.display(),
            blocks = summary.blocks,
            skipped = summary.skipped,
            bytes = summary.bytes_out,
            "Decoded container"
        );

        Self::container(header, summary, data, file)
    }

    /// Decode container bytes into memory
    pub fn from_container_bytes(input: &[u8]) -> Result<Self> {
        let mut stream = Vec::new();
        let (header, summary) = hydra_ff::decode(input, &mut stream, |_| true)?;
        Self::container(header, summary, StreamData::Owned(stream), DecodedFile::InMemory)
    }

    /// Start a container session over an already decoded stream
    pub fn from_decoded(stream: Vec<u8>) -> Result<Self> {
        let summary = DecodeSummary {
            bytes_out: stream.len() as u64,
            ..Default::default()
        };
        Self::container(
            Header::default(),
            summary,
            StreamData::Owned(stream),
            DecodedFile::InMemory,
        )
    }

    fn container(header: Header, summary: DecodeSummary, data: StreamData, file: DecodedFile) -> Result<Self> {
        let strings = if data.as_ref().len() < 4 {
            StringTable::default()
        } else {
            StringTable::parse(data.as_ref())?
        };
        debug!(strings = strings.len(), "Loaded container string table");

        Ok(Self {
            store: Store::Container(Container {
                header,
                summary,
                strings,
                source: BufferSource::new(data, 0),
                file,
            }),
        })
    }

    pub fn backing(&self) -> Backing {
        match self.store {
            Store::Process { .. } => Backing::Process,
            Store::Container(_) => Backing::Container,
        }
    }

    pub fn source(&self) -> &dyn MemorySource {
        match &self.store {
            Store::Process { source, .. } => source.as_ref(),
            Store::Container(container) => &container.source,
        }
    }

    pub fn pool_index(&self) -> Option<&PoolIndex> {
        match &self.store {
            Store::Process { index, .. } => Some(index),
            Store::Container(_) => None,
        }
    }

    pub fn container_header(&self) -> Option<&Header> {
        match &self.store {
            Store::Container(container) => Some(&container.header),
            Store::Process { .. } => None,
        }
    }

    pub fn decode_summary(&self) -> Option<&DecodeSummary> {
        match &self.store {
            Store::Container(container) => Some(&container.summary),
            Store::Process { .. } => None,
        }
    }

    /// Location of the decoded stream on disk, if it has one
    pub fn decoded_path(&self) -> Option<&Path> {
        match &self.store {
            Store::Container(container) => container.file.path(),
            Store::Process { .. } => None,
        }
    }

    /// Resolve a string index stored in a record.
    ///
    /// Each store applies its own bias: the process pool uses the index
    /// as-is, the container table is 1-based.
    pub fn string(&self, raw: i32) -> Option<String> {
        match &self.store {
            Store::Process { source, index } => index.strings.get(source.as_ref(), raw),
            Store::Container(container) => container.strings.resolve(raw).map(str::to_string),
        }
    }

    /// Read a C string that must exist
    pub fn cstring(&self, address: u64) -> Result<String> {
        self.source()
            .read_cstring(address)
            .ok_or(Error::OutOfBounds { address, len: 1 })
    }

    /// Name of the asset whose header starts at `ptr`
    pub fn asset_name(&self, ptr: u64) -> Option<String> {
        let name_ptr = self.source().read_u64(ptr)?;
        self.source().read_cstring(name_ptr)
    }

    /// Name of the image whose header starts at `ptr`
    pub fn image_name(&self, ptr: u64) -> Option<String> {
        let name_ptr = self.source().read_u64(ptr.checked_add(0xF8)?)?;
        self.source().read_cstring(name_ptr)
    }

    /// List assets of the enabled kinds, sorted by kind name.
    ///
    /// Pools or candidates that fail to decode are logged and skipped.
    /// `cancelled` is polled between pools and between candidates.
    pub fn enumerate<F, C>(&self, enabled: F, cancelled: C) -> Result<Vec<Asset>>
    where
        F: Fn(AssetKind) -> bool,
        C: Fn() -> bool,
    {
        let mut assets = match &self.store {
            Store::Process { source, index } => {
                self.enumerate_pools(source.as_ref(), index, &enabled, &cancelled)
            }
            Store::Container(container) => {
                self.enumerate_container(container, &enabled, &cancelled)
            }
        };

        sort_by_kind(&mut assets);
        info!(count = assets.len(), "Enumerated assets");
        Ok(assets)
    }

    fn enumerate_pools(
        &self,
        source: &dyn MemorySource,
        index: &PoolIndex,
        enabled: &dyn Fn(AssetKind) -> bool,
        cancelled: &dyn Fn() -> bool,
    ) -> Vec<Asset> {
        let mut assets = Vec::new();

        for (slot, &name) in index.profile.pools.iter().enumerate() {
            if cancelled() {
                break;
            }
            let Some(kind) = AssetKind::from_pool_name(name).filter(|&k| enabled(k)) else {
                continue;
            };
            let Some(pool) = index.descriptor(source, slot) else {
                warn!(pool = name, "Unreadable pool descriptor");
                continue;
            };

            match kind.enumerate(self, &pool) {
                Ok(found) => {
                    debug!(pool = name, count = found.len(), "Enumerated pool");
                    assets.extend(found);
                }
                Err(e) => warn!(pool = name, "Failed to enumerate pool: {}", e),
            }
        }

        assets
    }

    fn enumerate_container(
        &self,
        container: &Container,
        enabled: &dyn Fn(AssetKind) -> bool,
        cancelled: &dyn Fn() -> bool,
    ) -> Vec<Asset> {
        let mut paths = HashSet::new();
        let mut assets = Vec::new();

        for candidate in hydra_ff::scan(container.source.bytes(), cancelled) {
            let kind = kinds::container_kind(&candidate);
            if !enabled(kind) {
                continue;
            }

            match kinds::from_container(self, kind, &candidate) {
                Ok(asset) => {
                    if paths.insert(asset.path.clone()) {
                        assets.push(asset);
                    }
                }
                Err(e) => debug!(name = %candidate.name, "Skipping candidate: {}", e),
            }
        }

        assets
    }
}

fn write_decoded<P>(input: &[u8], handle: &File, progress: P) -> Result<(Header, DecodeSummary)>
where
    P: FnMut(f32) -> bool,
{
    let mut out = BufWriter::new(handle);
    let decoded = hydra_ff::decode(input, &mut out, progress)?;
    out.flush()?;
    Ok(decoded)
}
