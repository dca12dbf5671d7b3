//! Mock Memory Source
//!
//! A writable memory image for building pools and records in tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{MemoryRegion, MemorySource};

/// A zero-filled image at a fixed base address
pub struct MockMemorySource {
    /// Raw memory data (contiguous, starting at base_address)
    pub data: Vec<u8>,
    /// Base virtual address for the data
    pub base_address: u64,
    regions: Vec<MemoryRegion>,
    reads: AtomicUsize,
}

impl MockMemorySource {
    /// Create a zeroed image of `size` bytes at `base_address`
    pub fn new(size: usize, base_address: u64) -> Self {
        Self::from_bytes(vec![0; size], base_address)
    }

    pub fn from_bytes(data: Vec<u8>, base_address: u64) -> Self {
        let end = base_address + data.len() as u64;
        Self {
            data,
            base_address,
            regions: vec![MemoryRegion {
                perms: "rw-p".to_string(),
                ..MemoryRegion::anonymous(base_address, end)
            }],
            reads: AtomicUsize::new(0),
        }
    }

    pub fn end(&self) -> u64 {
        self.base_address + self.data.len() as u64
    }

    /// Number of `read_bytes` calls served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Write bytes into the image.
    ///
    /// Panics if the range is outside the image, since that is a broken
    /// test fixture.
    pub fn put_bytes(&mut self, address: u64, bytes: &[u8]) -> &mut Self {
        let offset = (address - self.base_address) as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn put_u8(&mut self, address: u64, value: u8) -> &mut Self {
        self.put_bytes(address, &[value])
    }

    pub fn put_i32(&mut self, address: u64, value: i32) -> &mut Self {
        self.put_bytes(address, &value.to_le_bytes())
    }

    pub fn put_i64(&mut self, address: u64, value: i64) -> &mut Self {
        self.put_bytes(address, &value.to_le_bytes())
    }

    pub fn put_u64(&mut self, address: u64, value: u64) -> &mut Self {
        self.put_bytes(address, &value.to_le_bytes())
    }

    pub fn put_f32(&mut self, address: u64, value: f32) -> &mut Self {
        self.put_bytes(address, &value.to_le_bytes())
    }

    /// Write a string followed by a NUL terminator
    pub fn put_cstring(&mut self, address: u64, value: &str) -> &mut Self {
        self.put_bytes(address, value.as_bytes());
        self.put_u8(address + value.len() as u64, 0)
    }
}

impl MemorySource for MockMemorySource {
    fn read_bytes(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let offset = usize::try_from(address.checked_sub(self.base_address)?).ok()?;
        self.data
            .get(offset..offset.checked_add(size)?)
            .map(<[u8]>::to_vec)
    }

    fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    fn is_live(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_read_bytes() {
        let source = MockMemorySource::from_bytes(vec![0x41, 0x42, 0x43, 0x44], 0x1000);

        assert_eq!(source.read_bytes(0x1000, 4), Some(vec![0x41, 0x42, 0x43, 0x44]));
        assert_eq!(source.read_bytes(0x1001, 2), Some(vec![0x42, 0x43]));
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn test_mock_source_scalars() {
        let mut source = MockMemorySource::new(32, 0x1000);
        source
            .put_i32(0x1000, -7)
            .put_u64(0x1008, 0x0807_0605_0403_0201)
            .put_f32(0x1010, 1.5);

        assert_eq!(source.read_i32(0x1000), Some(-7));
        assert_eq!(source.read_u64(0x1008), Some(0x0807_0605_0403_0201));
        assert_eq!(source.read_u8(0x1008), Some(0x01));
        assert_eq!(source.read_f32(0x1010), Some(1.5));
    }

    #[test]
    fn test_mock_source_read_cstring() {
        let mut source = MockMemorySource::new(64, 0x1000);
        source.put_cstring(0x1000, "Hello").put_cstring(0x1006, "World");

        assert_eq!(source.read_cstring(0x1000).as_deref(), Some("Hello"));
        assert_eq!(source.read_cstring(0x1006).as_deref(), Some("World"));
        assert_eq!(source.read_cstring(0x100C).as_deref(), Some(""));
    }

    #[test]
    fn test_mock_source_read_out_of_bounds() {
        let source = MockMemorySource::new(4, 0x1000);

        assert!(source.read_bytes(0x1002, 10).is_none());
        assert!(source.read_bytes(0x500, 4).is_none());
        assert!(source.read_i64(u64::MAX - 2).is_none());
    }

    #[test]
    fn test_mock_source_find_region() {
        let source = MockMemorySource::new(0x1000, 0x1000);
        assert_eq!(source.find_region(0x1500).map(|r| r.start), Some(0x1000));
        assert!(source.find_region(0x5000).is_none());
    }
}
