//! Process string pool

use crate::source::MemorySource;

/// Inline strings stored at fixed strides from an anchor.
///
/// Indices are used as-is: string `i` lives at `anchor + stride * i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringPool {
    pub anchor: u64,
    pub end: u64,
    pub stride: u64,
}

impl StringPool {
    pub fn new(anchor: u64, extent: u64, stride: u64) -> Self {
        Self {
            anchor,
            end: anchor.saturating_add(extent),
            stride,
        }
    }

    /// Number of addressable entries
    pub fn entry_count(&self) -> u64 {
        if self.stride == 0 {
            return 0;
        }
        (self.end - self.anchor).div_ceil(self.stride)
    }

    /// Address of entry `index`, or None outside the pool
    pub fn address_of(&self, index: i32) -> Option<u64> {
        let index = u64::try_from(index).ok()?;
        let address = self
            .stride
            .checked_mul(index)
            .and_then(|offset| self.anchor.checked_add(offset))?;
        (address < self.end).then_some(address)
    }

    /// Read string `index`; out-of-range indices never touch the source
    pub fn get(&self, source: &dyn MemorySource, index: i32) -> Option<String> {
        source.read_cstring(self.address_of(index)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockMemorySource;

    fn pool_image() -> (MockMemorySource, StringPool) {
        let mut source = MockMemorySource::new(0x200, 0x1000);
        source
            .put_cstring(0x1000, "idle")
            .put_cstring(0x101C, "run")
            .put_cstring(0x1038, "sprint");
        (source, StringPool::new(0x1000, 0x1C * 3, 0x1C))
    }

    #[test]
    fn test_string_pool_get() {
        let (source, pool) = pool_image();
        assert_eq!(pool.entry_count(), 3);
        assert_eq!(pool.get(&source, 0).as_deref(), Some("idle"));
        assert_eq!(pool.get(&source, 1).as_deref(), Some("run"));
        assert_eq!(pool.get(&source, 2).as_deref(), Some("sprint"));
    }

    #[test]
    fn test_string_pool_bounds_do_not_read() {
        let (source, pool) = pool_image();

        for index in [-1, 3, 1000, i32::MAX, i32::MIN] {
            assert_eq!(pool.get(&source, index), None);
        }
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_string_pool_address_of() {
        let pool = StringPool::new(0x1000, 1_811_796, 0x1C);
        assert_eq!(pool.entry_count(), 64_707);
        assert_eq!(pool.address_of(0), Some(0x1000));
        assert_eq!(pool.address_of(64_706), Some(0x1000 + 0x1C * 64_706));
        assert_eq!(pool.address_of(64_707), None);
    }
}
