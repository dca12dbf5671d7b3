//! Per-kind decoders and exporters
//!
//! Every kind is listed from a pool (process images) and exported from an
//! `Asset`. Kinds that also appear inline in containers parse a header
//! found by discovery.

pub mod behaviortree;
pub mod localize;
pub mod mapents;
pub mod mappingtable;
pub mod physpreset;
pub mod rawfile;
pub mod rumble;
pub mod selectortable;
pub mod statemachine;
pub mod stringtable;
pub mod structuredtable;
pub mod weaponcamo;
pub mod xcam;

use hydra_ff::{Candidate, HeaderKind};
use tracing::debug;

use crate::asset::{Asset, AssetKind};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

impl AssetKind {
    /// List the live assets in a pool
    pub fn enumerate(self, session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
        match self {
            AssetKind::PhysPreset => physpreset::enumerate(session, pool),
            AssetKind::MapEnts => mapents::enumerate(session, pool),
            AssetKind::Localize => localize::enumerate(session, pool),
            AssetKind::WeaponCamo => weaponcamo::enumerate(session, pool),
            AssetKind::RawFile | AssetKind::ScriptParseTree => {
                rawfile::enumerate(session, pool, self)
            }
            AssetKind::StringTable => stringtable::enumerate(session, pool),
            AssetKind::StructuredTable => structuredtable::enumerate(session, pool),
            AssetKind::Rumble => rumble::enumerate(session, pool),
            AssetKind::AnimSelectorTable => selectortable::enumerate(session, pool),
            AssetKind::AnimMappingTable => mappingtable::enumerate(session, pool),
            AssetKind::AnimStateMachine => statemachine::enumerate(session, pool),
            AssetKind::BehaviorTree => behaviortree::enumerate(session, pool),
            AssetKind::XCam => xcam::enumerate(session, pool),
        }
    }

    /// Decode an asset and write its files under `target`
    pub fn export(self, session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
        match self {
            AssetKind::PhysPreset => physpreset::export(session, asset, target),
            AssetKind::MapEnts => mapents::export(session, asset, target),
            AssetKind::Localize => localize::export(session, asset, target),
            AssetKind::WeaponCamo => weaponcamo::export(session, asset, target),
            AssetKind::RawFile | AssetKind::ScriptParseTree => {
                rawfile::export(session, asset, target)
            }
            AssetKind::StringTable => stringtable::export(session, asset, target),
            AssetKind::StructuredTable => structuredtable::export(session, asset, target),
            AssetKind::Rumble => rumble::export(session, asset, target),
            AssetKind::AnimSelectorTable => selectortable::export(session, asset, target),
            AssetKind::AnimMappingTable => mappingtable::export(session, asset, target),
            AssetKind::AnimStateMachine => statemachine::export(session, asset, target),
            AssetKind::BehaviorTree => behaviortree::export(session, asset, target),
            AssetKind::XCam => xcam::export(session, asset, target),
        }
    }
}

/// Kind of a discovered container candidate
pub fn container_kind(candidate: &Candidate) -> AssetKind {
    match candidate.kind {
        HeaderKind::RawFile => rawfile::kind_for_path(&candidate.name),
        HeaderKind::StateMachine => AssetKind::AnimStateMachine,
        HeaderKind::SelectorTable => AssetKind::AnimSelectorTable,
        HeaderKind::MappingTable => AssetKind::AnimMappingTable,
        HeaderKind::BehaviorTree => AssetKind::BehaviorTree,
    }
}

/// Parse the header of a discovered candidate into an asset
pub fn from_container(session: &Session, kind: AssetKind, candidate: &Candidate) -> Result<Asset> {
    let header = candidate.header as u64;
    match kind {
        AssetKind::RawFile | AssetKind::ScriptParseTree => rawfile::from_container(session, header),
        AssetKind::AnimStateMachine => statemachine::from_container(session, header),
        AssetKind::AnimSelectorTable => selectortable::from_container(session, header),
        AssetKind::AnimMappingTable => mappingtable::from_container(session, header),
        AssetKind::BehaviorTree => behaviortree::from_container(session, header),
        other => Err(Error::Decode(format!("{} is not stored inline", other))),
    }
}

/// Walk the slots of a pool, building an asset for each live entry.
///
/// Slots are read `stride` bytes at a time. Walking stops after `count`
/// assets or at `capacity` slots. Unreadable slots, null slots and entries
/// whose name cannot be read are skipped, as are entries `build` rejects.
pub(crate) fn walk_pool<F>(session: &Session, pool: &PoolDescriptor, mut build: F) -> Result<Vec<Asset>>
where
    F: FnMut(&Record, String) -> Result<Asset>,
{
    let source = session.source();
    let mut assets = Vec::new();

    for slot in 0..pool.capacity {
        if assets.len() >= pool.count as usize {
            break;
        }

        let address = pool.entry_address(slot);
        let Ok(record) = Record::read(source, address, pool.stride as usize) else {
            debug!(pool = pool.name, slot, address = format_args!("{:#x}", address), "Unreadable pool slot");
            continue;
        };
        let Ok(name_ptr) = record.u64_at(0) else {
            debug!(pool = pool.name, slot, "Pool slot too short for a name pointer");
            continue;
        };
        if pool.is_null_slot(name_ptr) {
            continue;
        }
        let Some(name) = source.read_cstring(name_ptr) else {
            debug!(pool = pool.name, slot, "Unreadable asset name");
            continue;
        };

        match build(&record, name) {
            Ok(asset) => assets.push(asset),
            Err(e) => debug!(pool = pool.name, slot, "Skipping entry: {}", e),
        }
    }

    Ok(assets)
}

/// Name of the asset referenced by a pointer field, or empty when unset
pub(crate) fn referenced_name(session: &Session, record: &Record, offset: usize) -> Result<String> {
    Ok(record
        .ptr_at(offset)?
        .and_then(|ptr| session.asset_name(ptr))
        .unwrap_or_default())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::tests::{put_descriptor, t7_image, BASE};
    use crate::pool::PoolIndex;
    use crate::profile::T7_PC;
    use crate::source::MockMemorySource;

    /// Start a process session over a mock image
    pub fn process_session(source: MockMemorySource) -> Session {
        let index = PoolIndex::locate(&source, &T7_PC, BASE).unwrap();
        Session::from_index(Box::new(source), index)
    }

    /// Decoded stream that opens with a string table; `strings[i]` has
    /// record index `i + 1`
    pub fn stream_with_strings(strings: &[&str]) -> Vec<u8> {
        let mut stream = (strings.len() as i32).to_le_bytes().to_vec();
        stream.resize(56 + strings.len().saturating_sub(1) * 8, 0);
        for s in strings {
            stream.extend_from_slice(s.as_bytes());
            stream.push(0);
        }
        stream
    }

    pub fn pool(session: &Session, name: &str) -> PoolDescriptor {
        session
            .pool_index()
            .unwrap()
            .descriptor_by_name(session.source(), name)
            .unwrap()
    }

    #[test]
    fn test_walk_pool_skips_null_slots() {
        const POOL: u64 = BASE + 0x2000;
        const NAMES: u64 = BASE + 0x3000;

        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "rawfile", POOL, 0x18, 4, 2);

        // slot 0 is free and links to slot 2, slot 3 is never reached
        source
            .put_u64(POOL, POOL + 0x30)
            .put_u64(POOL + 0x18, NAMES)
            .put_i32(POOL + 0x18 + 8, 5)
            .put_u64(POOL + 0x18 + 16, NAMES + 0x100)
            .put_u64(POOL + 0x30, NAMES + 0x20)
            .put_i32(POOL + 0x30 + 8, 3)
            .put_u64(POOL + 0x30 + 16, NAMES + 0x100)
            .put_u64(POOL + 0x48, NAMES + 0x40)
            .put_cstring(NAMES, "scripts/a.gsc")
            .put_cstring(NAMES + 0x20, "b.txt")
            .put_cstring(NAMES + 0x40, "never.txt");

        let session = process_session(source);
        let rawfiles = pool(&session, "rawfile");
        let assets = AssetKind::RawFile.enumerate(&session, &rawfiles).unwrap();

        let paths: Vec<_> = assets.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["scripts/a.gsc", "b.txt"]);
        assert_eq!(assets[0].size, 5);
        assert_eq!(assets[0].name, "a.gsc");
    }

    #[test]
    fn test_walk_pool_skips_unreadable_slot() {
        const NAMES: u64 = BASE + 0x3000;
        // the image ends at BASE + 0x4000, so slot 1 is out of range
        const POOL: u64 = BASE + 0x4000 - 0x18;

        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "rawfile", POOL, 0x18, 2, 2);
        source
            .put_u64(POOL, NAMES)
            .put_i32(POOL + 8, 4)
            .put_u64(POOL + 16, NAMES + 0x100)
            .put_cstring(NAMES, "scripts/ok.gsc");

        let session = process_session(source);
        let rawfiles = pool(&session, "rawfile");
        let assets = AssetKind::RawFile.enumerate(&session, &rawfiles).unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].path, "scripts/ok.gsc");
    }

    #[test]
    fn test_walk_pool_empty() {
        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "rumble", BASE + 0x2000, 64, 8, 0);

        let session = process_session(source);
        let rumbles = pool(&session, "rumble");
        assert!(AssetKind::Rumble.enumerate(&session, &rumbles).unwrap().is_empty());
    }

    #[test]
    fn test_container_kind_by_extension() {
        let candidate = |name: &str, kind| Candidate {
            name: name.to_string(),
            kind,
            offset: 0,
            header: 0,
        };

        assert_eq!(
            container_kind(&candidate("scripts/zm/_zm.gsc", HeaderKind::RawFile)),
            AssetKind::ScriptParseTree
        );
        assert_eq!(
            container_kind(&candidate("ui/t7/menu.lua", HeaderKind::RawFile)),
            AssetKind::RawFile
        );
        assert_eq!(
            container_kind(&candidate("zombie.ai_bt", HeaderKind::BehaviorTree)),
            AssetKind::BehaviorTree
        );
    }
}
