//! String table at the start of the decoded stream

use byteorder::{ByteOrder, LE};
use memchr::memchr;

use crate::{Error, Result};

/// Offset of the first string when the table holds a single entry
const STRINGS_BASE: usize = 56;

/// Each additional entry adds one 8-byte slot before the string data
const SLOT_SIZE: usize = 8;

/// Strings referenced by index from serialized assets.
///
/// Records store 1-based indices; `resolve` applies that bias and `get`
/// takes a plain 0-based position.
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    /// Parse the table from the start of a decoded stream.
    ///
    /// The declared count is an upper bound; reading stops at the end of
    /// the stream.
    pub fn parse(stream: &[u8]) -> Result<Self> {
        if stream.len() < 4 {
            return Err(Error::DataTooShort {
                needed: 4,
                actual: stream.len(),
            });
        }

        let count = LE::read_i32(&stream[0..4]);
        if count <= 0 {
            return Ok(Self::default());
        }
        let count = count as usize;

        let mut strings = Vec::new();
        let mut pos = (count - 1)
            .checked_mul(SLOT_SIZE)
            .and_then(|n| n.checked_add(STRINGS_BASE))
            .unwrap_or(usize::MAX);

        while strings.len() < count && pos < stream.len() {
            let rest = &stream[pos..];
            let len = memchr(0, rest).unwrap_or(rest.len());
            strings.push(String::from_utf8_lossy(&rest[..len]).into_owned());
            pos += len + 1;
        }

        Ok(Self { strings })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// String at a 0-based position
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    /// String for a 1-based index stored in a record
    pub fn resolve(&self, raw: i32) -> Option<&str> {
        let index = usize::try_from(raw).ok()?.checked_sub(1)?;
        self.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(strings: &[&str]) -> Vec<u8> {
        let mut data = vec![0u8; STRINGS_BASE + (strings.len() - 1) * SLOT_SIZE];
        data[0..4].copy_from_slice(&(strings.len() as i32).to_le_bytes());
        for s in strings {
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        }
        data
    }

    #[test]
    fn test_parse_strings() {
        let table = StringTable::parse(&stream(&["idle", "run", "sprint"])).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some("idle"));
        assert_eq!(table.get(2), Some("sprint"));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_resolve_is_one_based() {
        let table = StringTable::parse(&stream(&["idle", "run"])).unwrap();
        assert_eq!(table.resolve(1), Some("idle"));
        assert_eq!(table.resolve(2), Some("run"));
        assert_eq!(table.resolve(0), None);
        assert_eq!(table.resolve(-1), None);
        assert_eq!(table.resolve(3), None);
    }

    #[test]
    fn test_parse_single_string_at_base() {
        let data = stream(&["only"]);
        assert_eq!(&data[STRINGS_BASE..STRINGS_BASE + 4], b"only");
        let table = StringTable::parse(&data).unwrap();
        assert_eq!(table.get(0), Some("only"));
    }

    #[test]
    fn test_parse_stops_at_end_of_stream() {
        let mut data = stream(&["a", "b"]);
        data.truncate(data.len() - 2);
        let table = StringTable::parse(&data).unwrap();
        assert_eq!(table.len(), 1);

        let mut huge = vec![0u8; 8];
        huge[0..4].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(StringTable::parse(&huge).unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_and_short() {
        assert!(StringTable::parse(&[0, 0, 0, 0]).unwrap().is_empty());
        assert!(StringTable::parse(&[1, 0]).is_err());
    }
}
