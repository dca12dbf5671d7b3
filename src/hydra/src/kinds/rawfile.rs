//! Raw files and script parse trees
//!
//! Both share one entry layout: name pointer, size at 8, data pointer at
//! 16. Animation trees (`.atr`) hold a 4-byte prefix before a raw deflate
//! stream.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Cursor;
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

/// Extensions rewritten on export, as the game expects compiled names
const COMPILED_EXTENSIONS: [(&str, &str); 4] = [
    (".gsc", ".gscc"),
    (".csc", ".cscc"),
    (".gsh", ".gshc"),
    (".lua", ".luac"),
];

/// Script sources live in the scriptparsetree pool
pub fn kind_for_path(path: &str) -> AssetKind {
    match path.rsplit('.').next() {
        Some("gsc" | "csc" | "gsh") => AssetKind::ScriptParseTree,
        _ => AssetKind::RawFile,
    }
}

fn is_anim_tree(path: &str) -> bool {
    path.ends_with(".atr")
}

/// Path a raw file is written to, with its extension rewritten
pub fn compiled_path(path: &str) -> String {
    for (from, to) in COMPILED_EXTENSIONS {
        if let Some(stem) = path.strip_suffix(from) {
            return format!("{}{}", stem, to);
        }
    }
    path.to_string()
}

/// Animation trees skip their 4-byte prefix
fn payload(path: &str, start: u64, size: u64) -> (u64, u64) {
    if is_anim_tree(path) {
        (start + 4, size.saturating_sub(4))
    } else {
        (start, size)
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor, kind: AssetKind) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        let size = record.count_at(8)? as u64;
        let (start, size) = payload(&path, record.u64_at(16)?, size);

        Ok(Asset::new(
            kind,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Size(size),
        )
        .with_payload(start, size))
    })
}

/// Container header: size, 12 bytes, then the name with the data after it
pub fn from_container(session: &Session, header: u64) -> Result<Asset> {
    let mut cursor = Cursor::new(session.source(), header);
    let size = cursor.read_i32()?;
    let size = u64::try_from(size).map_err(|_| Error::Decode(format!("negative raw file size {}", size)))?;
    cursor.skip(12);
    let path = cursor.read_cstring()?;
    let (start, size) = payload(&path, cursor.position(), size);

    Ok(Asset::new(
        kind_for_path(&path),
        Backing::Container,
        path,
        header,
        AssetHeader::Size(size),
    )
    .with_payload(start, size))
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let len = asset.size as usize;
    let data = session
        .source()
        .read_bytes(asset.start, len)
        .ok_or(Error::OutOfBounds {
            address: asset.start,
            len,
        })?;

    if is_anim_tree(&asset.path) {
        let mut inflated = Vec::new();
        DeflateDecoder::new(data.as_slice()).read_to_end(&mut inflated)?;
        target.write(&asset.path, inflated)?;
    } else {
        target.write(&compiled_path(&asset.path), data)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_compiled_path() {
        assert_eq!(compiled_path("scripts/zm/_zm.gsc"), "scripts/zm/_zm.gscc");
        assert_eq!(compiled_path("scripts/zm/_zm.csc"), "scripts/zm/_zm.cscc");
        assert_eq!(compiled_path("scripts/shared/x.gsh"), "scripts/shared/x.gshc");
        assert_eq!(compiled_path("ui/menu.lua"), "ui/menu.luac");
        assert_eq!(compiled_path("ui.lua/readme.txt"), "ui.lua/readme.txt");
        assert_eq!(compiled_path("vision/zm.vision"), "vision/zm.vision");
    }

    #[test]
    fn test_kind_for_path() {
        assert_eq!(kind_for_path("a.gsc"), AssetKind::ScriptParseTree);
        assert_eq!(kind_for_path("a.gsh"), AssetKind::ScriptParseTree);
        assert_eq!(kind_for_path("a.lua"), AssetKind::RawFile);
        assert_eq!(kind_for_path("a.atr"), AssetKind::RawFile);
    }

    fn container_rawfile(stream: &mut Vec<u8>, name: &str, data: &[u8]) -> u64 {
        let header = stream.len() as u64;
        stream.extend_from_slice(&(data.len() as i32).to_le_bytes());
        stream.extend_from_slice(&[0xFF; 12]);
        stream.extend_from_slice(name.as_bytes());
        stream.push(0);
        stream.extend_from_slice(data);
        header
    }

    #[test]
    fn test_container_script_export() {
        let mut stream = vec![0u8; 4];
        let header = container_rawfile(&mut stream, "scripts/zm/_load.gsc", b"\x80GSC");

        let session = Session::from_decoded(stream).unwrap();
        let asset = from_container(&session, header).unwrap();
        assert_eq!(asset.kind, AssetKind::ScriptParseTree);
        assert_eq!(asset.name, "_load.gsc");
        assert_eq!(asset.info(), "Size - 0.00KB");

        let dir = tempfile::tempdir().unwrap();
        let target = ExportTarget::new(dir.path());
        export(&session, &asset, &target).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("scripts/zm/_load.gscc")).unwrap(),
            b"\x80GSC"
        );
    }

    #[test]
    fn test_container_anim_tree_inflates() {
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"animtree contents").unwrap();
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&encoder.finish().unwrap());

        let mut stream = vec![0u8; 4];
        let header = container_rawfile(&mut stream, "animtrees/zm.atr", &data);

        let session = Session::from_decoded(stream).unwrap();
        let asset = from_container(&session, header).unwrap();
        assert_eq!(asset.kind, AssetKind::RawFile);
        assert_eq!(asset.size, data.len() as u64 - 4);

        let dir = tempfile::tempdir().unwrap();
        export(&session, &asset, &ExportTarget::new(dir.path())).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("animtrees/zm.atr")).unwrap(),
            b"animtree contents"
        );
    }

    #[test]
    fn test_container_negative_size() {
        let mut stream = vec![0u8; 4];
        stream.extend_from_slice(&(-5i32).to_le_bytes());
        stream.extend_from_slice(&[0u8; 12]);
        stream.extend_from_slice(b"bad.txt\0");

        let session = Session::from_decoded(stream).unwrap();
        assert!(matches!(from_container(&session, 4), Err(Error::Decode(_))));
    }
}
