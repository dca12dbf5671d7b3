//! Block decompression with resynchronization

use std::io::{Read, Write};

use byteorder::{ByteOrder, LE};
use flate2::read::DeflateDecoder;
use memchr::memmem;
use tracing::{debug, warn};

use crate::block::{BlockDescriptor, DESCRIPTOR_SIZE, SENTINEL_BYTES};
use crate::header::{Header, HEADER_SIZE};
use crate::{Error, Result};

/// Outcome of decoding a fast file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Data blocks inflated into the output
    pub blocks: usize,
    /// Descriptors without a data sentinel that triggered a resync
    pub skipped: usize,
    /// Total decoded bytes written
    pub bytes_out: u64,
    /// Set when the progress callback asked to stop
    pub stopped_early: bool,
}

/// Decode a fast file into `output`.
///
/// The header is validated before any block is read, so a rejected file
/// writes nothing. `progress` receives the percentage of input consumed
/// before each block; returning false stops decoding between blocks.
///
/// A descriptor without the data sentinel is skipped by searching forward
/// for the next descriptor whose position field matches its own offset. If
/// none is found, decoding ends with whatever was produced so far.
pub fn decode<W, P>(input: &[u8], output: &mut W, mut progress: P) -> Result<(Header, DecodeSummary)>
where
    W: Write,
    P: FnMut(f32) -> bool,
{
    let header = Header::from_bytes(input)?;
    let mut summary = DecodeSummary::default();
    let mut pos = HEADER_SIZE;

    loop {
        if !progress(percent(pos, input.len())) {
            debug!(offset = pos, "Decode stopped by caller");
            summary.stopped_early = true;
            break;
        }

        let Some(block) = BlockDescriptor::read(&input[pos..]) else {
            break;
        };
        let payload_start = pos + DESCRIPTOR_SIZE;

        if !block.is_data() {
            if block.is_terminal() {
                break;
            }

            summary.skipped += 1;
            match resync(input, payload_start) {
                Some(next) => {
                    warn!(
                        offset = pos,
                        next, "Block without data sentinel, resynchronized"
                    );
                    pos = next;
                    continue;
                }
                None => {
                    warn!(offset = pos, "Block without data sentinel and no later block found");
                    break;
                }
            }
        }

        let len = block.payload_len();
        let payload_end = usize::try_from(len)
            .ok()
            .and_then(|len| payload_start.checked_add(len))
            .filter(|&end| end <= input.len())
            .ok_or(Error::TruncatedBlock { offset: pos, len })?;

        let decoded = inflate(&input[payload_start..payload_end], block.decoded_size)
            .map_err(|source| Error::Inflate {
                offset: pos,
                source,
            })?;
        output.write_all(&decoded)?;

        debug!(
            offset = pos,
            compressed = len,
            decoded = decoded.len(),
            "Inflated block"
        );

        summary.blocks += 1;
        summary.bytes_out += decoded.len() as u64;
        pos = payload_end;

        if block.is_terminal() {
            break;
        }
    }

    Ok((header, summary))
}

fn inflate(payload: &[u8], size_hint: i32) -> std::io::Result<Vec<u8>> {
    let capacity = usize::try_from(size_hint).unwrap_or(0).min(1 << 24);
    let mut decoded = Vec::with_capacity(capacity);
    DeflateDecoder::new(payload).read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Find the next plausible descriptor at or after `from`.
///
/// A sentinel at `s` belongs to a descriptor starting at `s - 16`, which is
/// accepted only if its position field (at `s - 4`) records that offset.
fn resync(input: &[u8], from: usize) -> Option<usize> {
    let haystack = input.get(from..)?;

    memmem::find_iter(haystack, &SENTINEL_BYTES)
        .map(|hit| from + hit)
        .filter(|&s| s >= 16)
        .find(|&s| {
            let position = LE::read_i32(&input[s - 4..s]);
            i64::from(position) == (s - 16) as i64
        })
        .map(|s| s - 16)
}

fn percent(consumed: usize, total: usize) -> f32 {
    if total == 0 {
        return 100.0;
    }
    (consumed as f64 / total as f64 * 100.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DATA_BLOCK_SENTINEL;
    use flate2::write::DeflateEncoder;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Append a data block for `plain` at the current end of `file`
    fn push_block(file: &mut Vec<u8>, plain: &[u8]) {
        let payload = deflate(plain);
        let descriptor = BlockDescriptor {
            declared_size: payload.len() as i32 + 2,
            decoded_size: plain.len() as i32,
            secondary_size: payload.len() as i32 + 2,
            position: file.len() as i32,
            sentinel: DATA_BLOCK_SENTINEL,
        };
        file.extend_from_slice(&descriptor.to_bytes());
        file.extend_from_slice(&payload);
    }

    fn push_terminator(file: &mut Vec<u8>) {
        file.extend_from_slice(&[0u8; DESCRIPTOR_SIZE]);
    }

    fn container(blocks: &[&[u8]]) -> Vec<u8> {
        let mut file = Header::default().to_bytes();
        for block in blocks {
            push_block(&mut file, block);
        }
        push_terminator(&mut file);
        file
    }

    #[test]
    fn test_decode_round_trip() {
        let first: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let second = b"the second block carries plain text".repeat(40);
        let file = container(&[&first, &second]);

        let mut out = Vec::new();
        let (header, summary) = decode(&file, &mut out, |_| true).unwrap();

        assert_eq!(header, Header::default());
        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.bytes_out, (first.len() + second.len()) as u64);
        assert_eq!(&out[..first.len()], &first[..]);
        assert_eq!(&out[first.len()..], &second[..]);
    }

    #[test]
    fn test_decode_resyncs_past_corrupt_block() {
        let first = b"alpha block".repeat(20);
        let second = b"omega block".repeat(20);

        let mut file = Header::default().to_bytes();
        push_block(&mut file, &first);

        let corrupt = BlockDescriptor {
            declared_size: 64,
            decoded_size: 64,
            secondary_size: 64,
            position: file.len() as i32,
            sentinel: 0x7777,
        };
        file.extend_from_slice(&corrupt.to_bytes());
        file.extend_from_slice(&[0xAB; 37]);

        push_block(&mut file, &second);
        push_terminator(&mut file);

        let mut out = Vec::new();
        let (_, summary) = decode(&file, &mut out, |_| true).unwrap();

        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.skipped, 1);
        let mut expected = first.clone();
        expected.extend_from_slice(&second);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_resync_ignores_sentinel_with_wrong_position() {
        let mut data = vec![0u8; 64];
        // Sentinel at 40 claims position 7, which is not 40 - 16
        data[36..40].copy_from_slice(&7i32.to_le_bytes());
        data[40..42].copy_from_slice(&SENTINEL_BYTES);
        assert_eq!(resync(&data, 0), None);

        data[36..40].copy_from_slice(&24i32.to_le_bytes());
        assert_eq!(resync(&data, 0), Some(24));
    }

    #[test]
    fn test_decode_without_later_block_keeps_partial_output() {
        let first = b"kept".repeat(50);

        let mut file = Header::default().to_bytes();
        push_block(&mut file, &first);
        let corrupt = BlockDescriptor {
            declared_size: 9,
            decoded_size: 9,
            secondary_size: 9,
            position: 0,
            sentinel: 0,
        };
        file.extend_from_slice(&corrupt.to_bytes());
        file.extend_from_slice(&[0x11; 100]);

        let mut out = Vec::new();
        let (_, summary) = decode(&file, &mut out, |_| true).unwrap();
        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(out, first);
    }

    #[test]
    fn test_decode_rejects_header_before_blocks() {
        let mut file = container(&[b"payload"]);
        file[8..12].copy_from_slice(&0x251i32.to_le_bytes());

        let mut out = Vec::new();
        let mut calls = 0;
        let err = decode(&file, &mut out, |_| {
            calls += 1;
            true
        })
        .unwrap_err();

        assert!(err.is_format());
        assert!(out.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_decode_truncated_payload() {
        let mut file = container(&[&b"x".repeat(300)]);
        // Cut into the first payload
        file.truncate(HEADER_SIZE + DESCRIPTOR_SIZE + 3);

        let err = decode(&file, &mut Vec::new(), |_| true).unwrap_err();
        assert!(matches!(err, Error::TruncatedBlock { offset: HEADER_SIZE, .. }));
    }

    #[test]
    fn test_decode_corrupt_deflate() {
        let mut file = Header::default().to_bytes();
        let descriptor = BlockDescriptor {
            declared_size: 10,
            decoded_size: 10,
            secondary_size: 10,
            position: file.len() as i32,
            sentinel: DATA_BLOCK_SENTINEL,
        };
        file.extend_from_slice(&descriptor.to_bytes());
        // Reserved block type 3 is invalid deflate
        file.extend_from_slice(&[0xFF; 8]);

        let err = decode(&file, &mut Vec::new(), |_| true).unwrap_err();
        assert!(matches!(err, Error::Inflate { .. }));
    }

    #[test]
    fn test_decode_progress_and_cancel() {
        let file = container(&[b"one", b"two", b"three"]);

        let mut seen = Vec::new();
        let mut out = Vec::new();
        let (_, summary) = decode(&file, &mut out, |pct| {
            seen.push(pct);
            seen.len() < 2
        })
        .unwrap();

        assert!(summary.stopped_early);
        assert_eq!(summary.blocks, 1);
        assert_eq!(out, b"one");
        assert!(seen[0] < seen[1]);
        assert!(seen.iter().all(|p| (0.0..=100.0).contains(p)));
    }
}
