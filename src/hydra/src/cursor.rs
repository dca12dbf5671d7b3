//! Sequential and fixed-layout readers over a memory source

use byteorder::{ByteOrder, LE};

use crate::source::MemorySource;
use crate::{Error, Result};

/// Reads consecutive values, advancing its position
pub struct Cursor<'a> {
    source: &'a dyn MemorySource,
    position: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a dyn MemorySource, position: u64) -> Self {
        Self { source, position }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    pub fn skip(&mut self, bytes: u64) {
        self.position = self.position.saturating_add(bytes);
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let bytes = self
            .source
            .read_bytes(self.position, len)
            .ok_or(Error::OutOfBounds {
                address: self.position,
                len,
            })?;
        self.position += len as u64;
        Ok(bytes)
    }

    /// Read a fixed-size record and advance past it
    pub fn read_record(&mut self, len: usize) -> Result<Record> {
        let address = self.position;
        let bytes = self.read_bytes(len)?;
        Ok(Record { address, bytes })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_bytes(4).map(|b| LE::read_i32(&b))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_bytes(8).map(|b| LE::read_i64(&b))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_bytes(4).map(|b| LE::read_f32(&b))
    }

    /// Read a null-terminated string and move past its terminator
    pub fn read_cstring(&mut self) -> Result<String> {
        let bytes = self
            .source
            .read_cstring_bytes(self.position)
            .ok_or(Error::OutOfBounds {
                address: self.position,
                len: 1,
            })?;
        self.position += bytes.len() as u64 + 1;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A fixed-size record read in one piece, accessed by field offset
#[derive(Debug, Clone)]
pub struct Record {
    address: u64,
    bytes: Vec<u8>,
}

impl Record {
    pub fn read(source: &dyn MemorySource, address: u64, len: usize) -> Result<Self> {
        let bytes = source
            .read_bytes(address, len)
            .ok_or(Error::OutOfBounds { address, len })?;
        Ok(Self { address, bytes })
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn field(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(Error::OutOfBounds {
                address: self.address + offset as u64,
                len,
            })
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        self.field(offset, 1).map(|b| b[0])
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32> {
        self.field(offset, 4).map(LE::read_i32)
    }

    pub fn i64_at(&self, offset: usize) -> Result<i64> {
        self.field(offset, 8).map(LE::read_i64)
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64> {
        self.field(offset, 8).map(LE::read_u64)
    }

    pub fn f32_at(&self, offset: usize) -> Result<f32> {
        self.field(offset, 4).map(LE::read_f32)
    }

    /// A pointer field, or None when it is null or negative
    pub fn ptr_at(&self, offset: usize) -> Result<Option<u64>> {
        self.i64_at(offset)
            .map(|raw| u64::try_from(raw).ok().filter(|&p| p != 0))
    }

    /// A count field that must not be negative
    pub fn count_at(&self, offset: usize) -> Result<usize> {
        let raw = self.i32_at(offset)?;
        usize::try_from(raw).map_err(|_| {
            Error::Decode(format!(
                "negative count {} at {:#x}",
                raw,
                self.address + offset as u64
            ))
        })
    }
}
