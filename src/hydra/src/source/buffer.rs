//! In-memory byte buffers exposed as a memory source

use memmap2::Mmap;

use super::{MemoryRegion, MemorySource};

/// Backing bytes of a decoded container
pub enum StreamData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for StreamData {
    fn as_ref(&self) -> &[u8] {
        match self {
            StreamData::Mapped(map) => &map[..],
            StreamData::Owned(bytes) => &bytes[..],
        }
    }
}

/// A contiguous byte buffer addressed from `base`
pub struct BufferSource<T> {
    data: T,
    base: u64,
    regions: Vec<MemoryRegion>,
}

impl<T: AsRef<[u8]>> BufferSource<T> {
    pub fn new(data: T, base: u64) -> Self {
        let end = base + data.as_ref().len() as u64;
        Self {
            data,
            base,
            regions: vec![MemoryRegion::anonymous(base, end)],
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Borrow `size` bytes at `address` without copying
    pub fn slice(&self, address: u64, size: usize) -> Option<&[u8]> {
        let offset = usize::try_from(address.checked_sub(self.base)?).ok()?;
        self.data.as_ref().get(offset..offset.checked_add(size)?)
    }
}

impl<T: AsRef<[u8]> + Send + Sync> MemorySource for BufferSource<T> {
    fn read_bytes(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        self.slice(address, size).map(<[u8]>::to_vec)
    }

    fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    fn is_live(&self) -> bool {
        false
    }
}
