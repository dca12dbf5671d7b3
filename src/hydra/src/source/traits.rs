//! Memory Source Trait
//!
//! Core abstraction for reading bytes from an address space.

use byteorder::{ByteOrder, LE};

use super::MemoryRegion;
use crate::pattern::scan_pattern_fast;

/// Longest C string returned by `read_cstring`
pub const MAX_CSTRING_LEN: usize = 4096;

/// C strings are fetched in chunks of this size
const CSTRING_CHUNK: usize = 128;

/// Pattern scans read regions in chunks of this size
const SCAN_CHUNK: usize = 16 * 1024 * 1024;

/// Trait for reading memory from a live process or a decoded container.
///
/// Reads that miss return `None`; callers decide whether that is fatal.
pub trait MemorySource: Send + Sync {
    /// Read bytes from a virtual address
    fn read_bytes(&self, address: u64, size: usize) -> Option<Vec<u8>>;

    /// Get the list of memory regions
    fn regions(&self) -> &[MemoryRegion];

    /// Check if this is a live process
    fn is_live(&self) -> bool;

    fn read_u8(&self, address: u64) -> Option<u8> {
        self.read_bytes(address, 1).map(|b| b[0])
    }

    fn read_i16(&self, address: u64) -> Option<i16> {
        self.read_bytes(address, 2).map(|b| LE::read_i16(&b))
    }

    fn read_i32(&self, address: u64) -> Option<i32> {
        self.read_bytes(address, 4).map(|b| LE::read_i32(&b))
    }

    fn read_u32(&self, address: u64) -> Option<u32> {
        self.read_bytes(address, 4).map(|b| LE::read_u32(&b))
    }

    fn read_i64(&self, address: u64) -> Option<i64> {
        self.read_bytes(address, 8).map(|b| LE::read_i64(&b))
    }

    fn read_u64(&self, address: u64) -> Option<u64> {
        self.read_bytes(address, 8).map(|b| LE::read_u64(&b))
    }

    fn read_f32(&self, address: u64) -> Option<f32> {
        self.read_bytes(address, 4).map(|b| LE::read_f32(&b))
    }

    /// Read raw bytes up to (not including) a NUL terminator.
    ///
    /// Falls back to single-byte reads when a chunk crosses the end of
    /// readable memory, so strings at the very end of a region still read.
    fn read_cstring_bytes(&self, address: u64) -> Option<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut cursor = address;

        while bytes.len() < MAX_CSTRING_LEN {
            let want = CSTRING_CHUNK.min(MAX_CSTRING_LEN - bytes.len());
            let chunk = match self.read_bytes(cursor, want) {
                Some(chunk) => chunk,
                None => match self.read_bytes(cursor, 1) {
                    Some(byte) => byte,
                    None if cursor == address => return None,
                    None => break,
                },
            };

            if let Some(end) = memchr::memchr(0, &chunk) {
                bytes.extend_from_slice(&chunk[..end]);
                return Some(bytes);
            }
            bytes.extend_from_slice(&chunk);
            cursor += chunk.len() as u64;
        }

        Some(bytes)
    }

    /// Read a null-terminated string (lossy UTF-8)
    fn read_cstring(&self, address: u64) -> Option<String> {
        self.read_cstring_bytes(address)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Find a region containing the given address
    fn find_region(&self, address: u64) -> Option<&MemoryRegion> {
        self.regions().iter().find(|r| r.contains(address))
    }

    /// Scan readable regions at or after `start` for a masked pattern.
    ///
    /// Regions are read in chunks that overlap by `pattern.len() - 1` bytes
    /// so no match straddling a chunk boundary is lost. Only hits accepted
    /// by `validator` are returned, in address order.
    fn find_pattern(
        &self,
        pattern: &[u8],
        mask: &[u8],
        start: u64,
        validator: &dyn Fn(u64) -> bool,
    ) -> Vec<u64> {
        let mut hits = Vec::new();
        if pattern.is_empty() {
            return hits;
        }

        for region in self.regions() {
            if !region.is_readable() || region.end <= start {
                continue;
            }

            let mut base = region.start.max(start);
            while base < region.end {
                let remaining = usize::try_from(region.end - base).unwrap_or(usize::MAX);
                let len = remaining.min(SCAN_CHUNK + pattern.len() - 1);

                if let Some(data) = self.read_bytes(base, len) {
                    for offset in scan_pattern_fast(&data, pattern, mask) {
                        // Hits in the overlap are reported by the next chunk
                        if offset >= SCAN_CHUNK {
                            continue;
                        }
                        let hit = base + offset as u64;
                        if validator(hit) {
                            hits.push(hit);
                        }
                    }
                }

                base = base.saturating_add(SCAN_CHUNK as u64);
            }
        }

        hits
    }
}
