//! Block descriptors

use byteorder::{ByteOrder, LE};

/// Size of a block descriptor in bytes
pub const DESCRIPTOR_SIZE: usize = 18;

/// Sentinel marking a data block (bytes `48 0D` on disk)
pub const DATA_BLOCK_SENTINEL: i16 = 0x0D48;

/// The sentinel as it appears in the file, used when resynchronizing
pub(crate) const SENTINEL_BYTES: [u8; 2] = DATA_BLOCK_SENTINEL.to_le_bytes();

/// Descriptor preceding each compressed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub declared_size: i32,
    pub decoded_size: i32,
    pub secondary_size: i32,
    pub position: i32,
    pub sentinel: i16,
}

impl BlockDescriptor {
    /// Read a descriptor, or None if fewer than 18 bytes remain
    pub fn read(data: &[u8]) -> Option<Self> {
        let data = data.get(..DESCRIPTOR_SIZE)?;
        Some(Self {
            declared_size: LE::read_i32(&data[0..4]),
            decoded_size: LE::read_i32(&data[4..8]),
            secondary_size: LE::read_i32(&data[8..12]),
            position: LE::read_i32(&data[12..16]),
            sentinel: LE::read_i16(&data[16..18]),
        })
    }

    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut out = [0u8; DESCRIPTOR_SIZE];
        LE::write_i32(&mut out[0..4], self.declared_size);
        LE::write_i32(&mut out[4..8], self.decoded_size);
        LE::write_i32(&mut out[8..12], self.secondary_size);
        LE::write_i32(&mut out[12..16], self.position);
        LE::write_i16(&mut out[16..18], self.sentinel);
        out
    }

    pub fn is_data(&self) -> bool {
        self.sentinel == DATA_BLOCK_SENTINEL
    }

    /// A zero declared size marks the last block of the stream
    pub fn is_terminal(&self) -> bool {
        self.declared_size == 0
    }

    /// Length of the deflate payload following the descriptor.
    ///
    /// The secondary size counts the two sentinel bytes, which are the
    /// zlib header of the payload.
    pub fn payload_len(&self) -> i64 {
        i64::from(self.secondary_size) - 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_bytes() {
        assert_eq!(SENTINEL_BYTES, [0x48, 0x0D]);
    }

    #[test]
    fn test_descriptor_read() {
        let descriptor = BlockDescriptor {
            declared_size: 0x10000,
            decoded_size: 0x10000,
            secondary_size: 0x2345,
            position: 2112,
            sentinel: DATA_BLOCK_SENTINEL,
        };
        let bytes = descriptor.to_bytes();
        assert_eq!(&bytes[16..], &[0x48, 0x0D]);
        assert_eq!(&bytes[12..16], &2112i32.to_le_bytes());

        let parsed = BlockDescriptor::read(&bytes).unwrap();
        assert_eq!(parsed, descriptor);
        assert!(parsed.is_data());
        assert!(!parsed.is_terminal());
        assert_eq!(parsed.payload_len(), 0x2343);
    }

    #[test]
    fn test_descriptor_short_input() {
        assert!(BlockDescriptor::read(&[0u8; 17]).is_none());
        assert!(BlockDescriptor::read(&[0u8; 18]).is_some());
    }

    #[test]
    fn test_terminal_descriptor() {
        let parsed = BlockDescriptor::read(&[0u8; 18]).unwrap();
        assert!(parsed.is_terminal());
        assert!(!parsed.is_data());
    }
}
