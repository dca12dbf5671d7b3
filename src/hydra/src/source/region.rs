//! Memory Region Types

/// A readable span of an address space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub perms: String,
    pub offset: u64,
    pub path: Option<String>,
}

impl MemoryRegion {
    /// Readable region without a backing path
    pub fn anonymous(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            perms: "r--p".to_string(),
            offset: 0,
            path: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }

    pub fn is_readable(&self) -> bool {
        self.perms.starts_with('r')
    }

    pub fn is_executable(&self) -> bool {
        self.perms.chars().nth(2) == Some('x')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_region_size() {
        let region = MemoryRegion::anonymous(0x1000, 0x2000);
        assert_eq!(region.size(), 0x1000);

        let inverted = MemoryRegion::anonymous(0x2000, 0x1000);
        assert_eq!(inverted.size(), 0);
    }

    #[test]
    fn test_memory_region_contains() {
        let region = MemoryRegion::anonymous(0x1000, 0x2000);
        assert!(region.contains(0x1000));
        assert!(region.contains(0x1FFF));
        assert!(!region.contains(0x2000));
        assert!(!region.contains(0xFFF));
    }

    #[test]
    fn test_memory_region_perms() {
        let readable = MemoryRegion::anonymous(0, 0x1000);
        assert!(readable.is_readable());
        assert!(!readable.is_executable());

        let code = MemoryRegion {
            perms: "r-xp".to_string(),
            path: Some("BlackOps3.exe".to_string()),
            ..MemoryRegion::anonymous(0, 0x1000)
        };
        assert!(code.is_executable());

        let guard = MemoryRegion {
            perms: "---p".to_string(),
            ..MemoryRegion::anonymous(0, 0x1000)
        };
        assert!(!guard.is_readable());
    }
}
