//! Masked byte pattern scanning
//!
//! Searches for the longest fixed run of a pattern with memchr's `memmem`
//! finder and checks the wildcard positions around each hit.

/// A byte pattern where mask 0 marks a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<u8>,
}

impl Pattern {
    /// A pattern with no wildcards
    pub fn exact(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            mask: vec![1; bytes.len()],
        }
    }

    /// Parse space separated hex bytes, with `?` or `??` as wildcards
    pub fn parse(text: &str) -> Option<Self> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for token in text.split_whitespace() {
            if token.chars().all(|c| c == '?') {
                bytes.push(0);
                mask.push(0);
            } else {
                bytes.push(u8::from_str_radix(token, 16).ok()?);
                mask.push(1);
            }
        }

        (!bytes.is_empty()).then_some(Self { bytes, mask })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Longest run of fixed bytes as (offset, length)
fn longest_fixed_run(mask: &[u8]) -> (usize, usize) {
    let mut best = (0, 0);
    let mut run_start = 0;

    for (i, &m) in mask.iter().chain(std::iter::once(&0)).enumerate() {
        if m == 0 {
            let len = i - run_start;
            if len > best.1 {
                best = (run_start, len);
            }
            run_start = i + 1;
        }
    }

    best
}

#[inline]
fn matches_at(window: &[u8], pattern: &[u8], mask: &[u8]) -> bool {
    window.len() >= pattern.len()
        && pattern
            .iter()
            .zip(mask)
            .zip(window)
            .all(|((&p, &m), &w)| m == 0 || p == w)
}

/// Offsets in `data` where the masked pattern matches
pub fn scan_pattern_fast(data: &[u8], pattern: &[u8], mask: &[u8]) -> Vec<usize> {
    if pattern.is_empty() || data.len() < pattern.len() {
        return vec![];
    }

    let (anchor_offset, anchor_len) = longest_fixed_run(mask);
    let last_start = data.len() - pattern.len();

    if anchor_len == 0 {
        return (0..=last_start)
            .filter(|&i| matches_at(&data[i..], pattern, mask))
            .collect();
    }

    let anchor = &pattern[anchor_offset..anchor_offset + anchor_len];
    memchr::memmem::find_iter(data, anchor)
        .filter_map(|pos| pos.checked_sub(anchor_offset))
        .filter(|&start| start <= last_start && matches_at(&data[start..], pattern, mask))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_pattern_exact_match() {
        let pattern = Pattern::exact(b"hydra");
        let results = scan_pattern_fast(b"hydra and hydra", pattern.bytes(), pattern.mask());
        assert_eq!(results, vec![0, 10]);
    }

    #[test]
    fn test_scan_pattern_with_wildcards() {
        let pattern = Pattern::parse("78 00 00 00 ?? ?? 00 00").unwrap();
        let mut data = vec![0xAAu8; 4];
        data.extend_from_slice(&[0x78, 0, 0, 0, 0x13, 0x01, 0, 0]);
        data.extend_from_slice(&[0x78, 0, 0, 0, 0x99, 0x02, 0, 0]);
        data.extend_from_slice(&[0x78, 0, 0, 0, 0x13, 0x01, 0, 1]);

        let results = scan_pattern_fast(&data, pattern.bytes(), pattern.mask());
        assert_eq!(results, vec![4, 12]);
    }

    #[test]
    fn test_scan_pattern_anchor_not_at_start() {
        let pattern = Pattern::parse("? 65 6E 5F").unwrap();
        let results = scan_pattern_fast(b"en_xen_", pattern.bytes(), pattern.mask());
        assert_eq!(results, vec![3]);
    }

    #[test]
    fn test_scan_pattern_no_match() {
        let pattern = Pattern::exact(b"xyz");
        assert!(scan_pattern_fast(b"hello world", pattern.bytes(), pattern.mask()).is_empty());
        assert!(scan_pattern_fast(b"xy", pattern.bytes(), pattern.mask()).is_empty());
        assert!(scan_pattern_fast(b"hello", b"", b"").is_empty());
    }

    #[test]
    fn test_scan_pattern_all_wildcards() {
        let pattern = Pattern::parse("?? ??").unwrap();
        assert_eq!(
            scan_pattern_fast(b"abc", pattern.bytes(), pattern.mask()),
            vec![0, 1]
        );
    }

    #[test]
    fn test_longest_fixed_run() {
        assert_eq!(longest_fixed_run(&[1, 1, 0, 0, 1, 1, 1, 1]), (4, 4));
        assert_eq!(longest_fixed_run(&[1, 1, 1, 0]), (0, 3));
        assert_eq!(longest_fixed_run(&[0, 0]), (0, 0));
    }

    #[test]
    fn test_pattern_parse() {
        let pattern = Pattern::parse("01 00 00 04 65 6E 5F").unwrap();
        assert_eq!(pattern.bytes(), &[0x01, 0x00, 0x00, 0x04, 0x65, 0x6E, 0x5F]);
        assert!(pattern.mask().iter().all(|&m| m == 1));
        assert!(Pattern::parse("zz").is_none());
        assert!(Pattern::parse("").is_none());
    }
}
