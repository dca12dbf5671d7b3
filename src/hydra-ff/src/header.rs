//! Fast file header parsing

use byteorder::{ByteOrder, LE};

use crate::{Error, Result};

/// Magic bytes at the start of every fast file
pub const MAGIC: [u8; 8] = *b"TAff0000";

/// The only supported container version
pub const VERSION: i32 = 0x27E;

/// Header size in bytes, including the reserved area
pub const HEADER_SIZE: usize = 2112;

/// Compression algorithm, taken from bits 8+ of the compression tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
    Unknown,
    Lz4,
    Other(i32),
}

impl Compression {
    pub fn from_tag(tag: i32) -> Self {
        match tag >> 8 {
            0 => Compression::None,
            1 => Compression::Zlib,
            2 => Compression::Unknown,
            3 => Compression::Lz4,
            other => Compression::Other(other),
        }
    }
}

/// Parsed fast file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub version: i32,
    pub compression: Compression,
}

impl Header {
    /// Parse and validate a header.
    ///
    /// Fails on short input, a wrong magic, an unsupported version, or any
    /// compression other than zlib.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = Self::parse(data)?;
        header.validate()?;
        Ok(header)
    }

    /// Read header fields without validating them
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::DataTooShort {
                needed: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[0..8]);

        Ok(Self {
            magic,
            version: LE::read_i32(&data[8..12]),
            compression: Compression::from_tag(LE::read_i32(&data[12..16])),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(Error::InvalidMagic(self.magic));
        }
        if self.version != VERSION {
            return Err(Error::UnsupportedVersion {
                expected: VERSION,
                actual: self.version,
            });
        }
        if self.compression != Compression::Zlib {
            return Err(Error::UnsupportedCompression(self.compression));
        }
        Ok(())
    }

    /// Serialize a header followed by a zeroed reserved area
    pub fn to_bytes(&self) -> Vec<u8> {
        let tag = match self.compression {
            Compression::None => 0,
            Compression::Zlib => 1,
            Compression::Unknown => 2,
            Compression::Lz4 => 3,
            Compression::Other(n) => n,
        };

        let mut data = vec![0u8; HEADER_SIZE];
        data[0..8].copy_from_slice(&self.magic);
        LE::write_i32(&mut data[8..12], self.version);
        LE::write_i32(&mut data[12..16], tag << 8);
        data
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            compression: Compression::Zlib,
        }
    }
}
