//! Asset discovery in a decoded stream
//!
//! Serialized assets are preceded by runs of `0xFF` placeholder pointers.
//! After each run a short window is inspected for a file name, and the
//! name's extension decides which header layout surrounds it.

use std::collections::HashSet;

use byteorder::{ByteOrder, LE};
use memchr::memmem;
use tracing::debug;

/// Placeholder run that precedes inline asset data
pub const NEEDLE: [u8; 8] = [0xFF; 8];

/// Bytes inspected after each needle
const WINDOW: usize = 384;

/// Names are read up to this many bytes
const MAX_NAME: usize = 255;

/// Header layouts that can be discovered inline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    RawFile,
    StateMachine,
    SelectorTable,
    MappingTable,
    BehaviorTree,
}

impl HeaderKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "script" | "lua" | "gsc" | "csc" | "gsh" | "vision" | "cfg" | "graph" | "txt"
            | "atr" => Some(HeaderKind::RawFile),
            "ai_asm" => Some(HeaderKind::StateMachine),
            "ai_ast" => Some(HeaderKind::SelectorTable),
            "ai_am" => Some(HeaderKind::MappingTable),
            "ai_bt" => Some(HeaderKind::BehaviorTree),
            _ => None,
        }
    }

    /// Distance from the end of the needle to the start of the header
    pub fn header_delta(self) -> i64 {
        match self {
            HeaderKind::RawFile | HeaderKind::BehaviorTree => -16,
            HeaderKind::StateMachine => -32,
            HeaderKind::SelectorTable | HeaderKind::MappingTable => 8,
        }
    }
}

/// A named asset found in the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub kind: HeaderKind,
    /// End of the needle run that led to this candidate
    pub offset: usize,
    /// Start of the asset header
    pub header: usize,
}

/// Scan a decoded stream for inline assets.
///
/// Candidates are returned in stream order with duplicate names dropped.
/// `cancelled` is polled between needle hits.
pub fn scan<C>(stream: &[u8], cancelled: C) -> Vec<Candidate>
where
    C: Fn() -> bool,
{
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for hit in memmem::find_iter(stream, &NEEDLE) {
        if cancelled() {
            debug!(offset = hit, "Scan cancelled");
            break;
        }

        let offset = hit + NEEDLE.len();
        let window = &stream[offset..stream.len().min(offset + WINDOW)];

        let Some(name) = candidate_name(window) else {
            continue;
        };
        let Some(kind) = extension(&name).and_then(HeaderKind::from_extension) else {
            continue;
        };
        let Some(header) = usize::try_from(offset as i64 + kind.header_delta())
            .ok()
            .filter(|&h| h < stream.len())
        else {
            continue;
        };

        if !seen.insert(name.clone()) {
            continue;
        }

        debug!(name = %name, ?kind, header, "Found candidate");
        candidates.push(Candidate {
            name,
            kind,
            offset,
            header,
        });
    }

    candidates
}

/// Pick the name inside a window, if it looks like a file path
pub fn candidate_name(window: &[u8]) -> Option<String> {
    let start = name_offset(window);
    let name = read_name(window.get(start..)?);
    is_valid_name(&name).then_some(name)
}

fn name_offset(window: &[u8]) -> usize {
    let lead = window.get(0..8).map(LE::read_i64);
    let at_11 = window.get(11..15).map(LE::read_i32);
    let at_3 = window.get(3..7).map(LE::read_i32);

    match (lead, at_11, at_3) {
        (Some(-1), Some(0), _) => 16,
        (Some(-1), _, _) => 8,
        (_, _, Some(0)) => 8,
        _ => 0,
    }
}

fn read_name(data: &[u8]) -> String {
    let data = &data[..data.len().min(MAX_NAME)];
    let len = memchr::memchr(0, data).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..len]).into_owned()
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'\\' | b'/' | b'_' | b'.'))
}

fn extension(name: &str) -> Option<&str> {
    name.rsplit('.').next()
}
