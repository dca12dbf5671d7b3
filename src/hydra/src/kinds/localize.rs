//! Localized strings
//!
//! The whole pool is exported as a single StringEd file. Entries are
//! pairs of text and reference pointers.

use std::fmt::Write;

use tracing::debug;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::Result;

pub const EXPORT_PATH: &str = "localizedstrings.str";

const ENTRY_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedString {
    pub reference: String,
    pub text: String,
}

/// Text and reference pointers of every live entry
fn entries(session: &Session, pool: &PoolDescriptor) -> Result<Vec<(u64, u64)>> {
    let mut found = Vec::new();
    for slot in 0..pool.capacity {
        if found.len() >= pool.count as usize {
            break;
        }
        let record = Record::read(session.source(), pool.entry_address(slot), ENTRY_SIZE)?;
        let text = record.u64_at(0)?;
        if pool.is_null_slot(text) {
            continue;
        }
        found.push((text, record.u64_at(8)?));
    }
    Ok(found)
}

/// Read every string in the pool; unreadable pairs are skipped
pub fn read_all(session: &Session, pool: &PoolDescriptor) -> Result<Vec<LocalizedString>> {
    let source = session.source();
    Ok(entries(session, pool)?
        .into_iter()
        .filter_map(|(text, reference)| {
            let pair = source.read_cstring(reference).zip(source.read_cstring(text));
            if pair.is_none() {
                debug!(text, reference, "Unreadable localized string");
            }
            pair.map(|(reference, text)| LocalizedString { reference, text })
        })
        .collect())
}

pub fn to_string_ed(strings: &[LocalizedString]) -> String {
    let mut out = String::new();
    out.push_str("VERSION\t\t\t\t\"1\"\n");
    out.push_str("CONFIG\t\t\t\t\"C:\\projects\\cod\\t7\\bin\\StringEd.cfg\"\n");
    out.push_str("FILENOTES\t\t    \"Dumped via hydra\"\n\n");
    for string in strings {
        let _ = writeln!(out, "REFERENCE            {}", string.reference);
        let _ = writeln!(out, "LANG_ENGLISH         \"{}\"", string.text);
        out.push('\n');
    }
    out.push_str("ENDMARKER\n");
    out
}

/// One asset for the whole pool, located by its descriptor
pub fn enumerate(_session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    if pool.count == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![Asset::new(
        AssetKind::Localize,
        Backing::Process,
        EXPORT_PATH.to_string(),
        pool.address,
        AssetHeader::Strings(pool.count),
    )])
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let pool = PoolDescriptor::read(session.source(), AssetKind::Localize.name(), asset.record)?;
    let strings = read_all(session, &pool)?;
    target.write(&asset.path, to_string_ed(&strings))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::tests::{pool, process_session};
    use crate::pool::tests::{put_descriptor, t7_image, BASE};

    #[test]
    fn test_localize_pool_is_one_asset() {
        const POOL: u64 = BASE + 0x2000;
        const NAMES: u64 = BASE + 0x3000;

        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "localize", POOL, 16, 4, 2);

        // slot 0 is free
        source
            .put_u64(POOL, POOL + 32)
            .put_u64(POOL + 16, NAMES)
            .put_u64(POOL + 24, NAMES + 0x40)
            .put_u64(POOL + 32, NAMES + 0x80)
            .put_u64(POOL + 40, NAMES + 0xC0)
            .put_cstring(NAMES, "Der Riese")
            .put_cstring(NAMES + 0x40, "ZM_FACTORY_NAME")
            .put_cstring(NAMES + 0x80, "Power is required")
            .put_cstring(NAMES + 0xC0, "ZM_FACTORY_POWER");

        let session = process_session(source);
        let strings = pool(&session, "localize");
        let assets = AssetKind::Localize.enumerate(&session, &strings).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].path, "localizedstrings.str");
        assert_eq!(assets[0].info(), "Strings - 2");

        let dir = tempfile::tempdir().unwrap();
        export(&session, &assets[0], &ExportTarget::new(dir.path())).unwrap();
        let text = std::fs::read_to_string(dir.path().join("localizedstrings.str")).unwrap();

        assert!(text.starts_with("VERSION\t\t\t\t\"1\"\n"));
        assert!(text.contains(
            "REFERENCE            ZM_FACTORY_NAME\nLANG_ENGLISH         \"Der Riese\"\n\n"
        ));
        assert!(text.contains("REFERENCE            ZM_FACTORY_POWER\n"));
        assert!(text.ends_with("\nENDMARKER\n"));
    }

    #[test]
    fn test_empty_localize_pool() {
        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "localize", BASE + 0x2000, 16, 4, 0);

        let session = process_session(source);
        let strings = pool(&session, "localize");
        assert!(AssetKind::Localize.enumerate(&session, &strings).unwrap().is_empty());
    }
}
