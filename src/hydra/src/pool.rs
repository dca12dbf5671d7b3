//! Asset pool table and descriptors

use byteorder::{ByteOrder, LE};
use tracing::{debug, info};

use crate::pattern::Pattern;
use crate::profile::Profile;
use crate::source::MemorySource;
use crate::strings::StringPool;
use crate::{Error, Result};

/// One pool of fixed-stride asset entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDescriptor {
    pub name: &'static str,
    /// Address of this descriptor in the pool table
    pub address: u64,
    pub start: u64,
    pub last: u64,
    pub stride: u32,
    pub count: u32,
    pub capacity: u32,
}

impl PoolDescriptor {
    /// Size of a serialized descriptor
    pub const SIZE: usize = 32;

    /// Parse a 32-byte descriptor; negative counts read as zero
    pub fn parse(name: &'static str, address: u64, data: &[u8]) -> Option<Self> {
        let data = data.get(..Self::SIZE)?;
        let unsigned = |v: i32| u32::try_from(v).unwrap_or(0);

        Some(Self {
            name,
            address,
            start: LE::read_u64(&data[0..8]),
            stride: unsigned(LE::read_i32(&data[8..12])),
            capacity: unsigned(LE::read_i32(&data[12..16])),
            count: unsigned(LE::read_i32(&data[20..24])),
            last: LE::read_u64(&data[24..32]),
        })
    }

    pub fn read(source: &dyn MemorySource, name: &'static str, address: u64) -> Result<Self> {
        source
            .read_bytes(address, Self::SIZE)
            .and_then(|data| Self::parse(name, address, &data))
            .ok_or(Error::OutOfBounds {
                address,
                len: Self::SIZE,
            })
    }

    /// End of the pool's slot storage
    pub fn max_end(&self) -> u64 {
        self.start
            .saturating_add(u64::from(self.stride) * u64::from(self.capacity))
    }

    /// Address of slot `index`
    pub fn entry_address(&self, index: u32) -> u64 {
        self.start + u64::from(self.stride) * u64::from(index)
    }

    /// Free slots link to other slots, so their name pointer points back
    /// into the pool itself.
    pub fn is_null_slot(&self, name_ptr: u64) -> bool {
        name_ptr >= self.start && name_ptr < self.max_end()
    }
}

/// Located pool table and string pool of a process image
#[derive(Debug, Clone)]
pub struct PoolIndex {
    pub profile: &'static Profile,
    pub table: u64,
    pub strings: StringPool,
}

impl PoolIndex {
    pub fn new(profile: &'static Profile, table: u64, strings: StringPool) -> Self {
        Self {
            profile,
            table,
            strings,
        }
    }

    /// Scan for the pool table and string pool from `start`.
    ///
    /// Fails with `NotFound` when either anchor has no validated hit.
    pub fn locate(source: &dyn MemorySource, profile: &'static Profile, start: u64) -> Result<Self> {
        let table = locate_pool_table(source, profile, start)?;
        let strings = locate_string_pool(source, profile, start)?;

        info!(
            table = format_args!("{:#x}", table),
            strings = format_args!("{:#x}", strings.anchor),
            profile = profile.name,
            "Located asset pools"
        );

        Ok(Self::new(profile, table, strings))
    }

    pub fn descriptor_address(&self, slot: usize) -> u64 {
        self.table + self.profile.descriptor_size * slot as u64
    }

    /// Descriptor for pool `slot`, or None past the table or on a failed read
    pub fn descriptor(&self, source: &dyn MemorySource, slot: usize) -> Option<PoolDescriptor> {
        let name = *self.profile.pools.get(slot)?;
        PoolDescriptor::read(source, name, self.descriptor_address(slot)).ok()
    }

    pub fn descriptor_by_name(&self, source: &dyn MemorySource, name: &str) -> Option<PoolDescriptor> {
        self.descriptor(source, self.profile.pool_slot(name)?)
    }
}

fn offset(address: u64, delta: i64) -> Option<u64> {
    address.checked_add_signed(delta)
}

fn locate_pool_table(source: &dyn MemorySource, profile: &Profile, start: u64) -> Result<u64> {
    let locator = &profile.pool_table;
    let pattern = parse_pattern(locator.pattern)?;

    let validator = |hit: u64| {
        offset(hit, locator.window_offset)
            .and_then(|window| source.read_bytes(window, locator.window_len))
            .is_some_and(|window| {
                locator.checks.iter().all(|check| {
                    window
                        .get(check.offset..check.offset + 4)
                        .is_some_and(|field| LE::read_i32(field) == check.value)
                })
            })
    };

    let hit = source
        .find_pattern(pattern.bytes(), pattern.mask(), start, &validator)
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound {
            what: "asset pool table".to_string(),
        })?;

    debug!(hit = format_args!("{:#x}", hit), "Pool table pattern hit");
    offset(hit, locator.anchor_offset).ok_or_else(|| Error::NotFound {
        what: "asset pool table".to_string(),
    })
}

fn locate_string_pool(source: &dyn MemorySource, profile: &Profile, start: u64) -> Result<StringPool> {
    let locator = &profile.string_pool;
    let pattern = parse_pattern(locator.pattern)?;

    let validator = |hit: u64| {
        let pointer = offset(hit, locator.backref_offset).and_then(|at| source.read_u64(at));
        let expected = offset(hit, locator.backref_target);
        pointer.is_some() && pointer == expected
    };

    let hit = source
        .find_pattern(pattern.bytes(), pattern.mask(), start, &validator)
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound {
            what: "string pool".to_string(),
        })?;

    debug!(hit = format_args!("{:#x}", hit), "String pool pattern hit");
    let anchor = offset(hit, locator.anchor_offset).ok_or_else(|| Error::NotFound {
        what: "string pool".to_string(),
    })?;

    Ok(StringPool::new(anchor, locator.extent, locator.stride))
}

fn parse_pattern(text: &str) -> Result<Pattern> {
    Pattern::parse(text).ok_or_else(|| Error::Decode(format!("invalid pattern '{}'", text)))
}
