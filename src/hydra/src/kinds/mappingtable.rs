//! Animation mapping tables
//!
//! Rows are 24 bytes (name index at 0, entry count at 16), followed by
//! every row's entries as consecutive string indices.

use std::fmt::Write;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Cursor;
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const ROW_SIZE: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationMap {
    pub name: String,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    pub rows: Vec<AnimationMap>,
}

impl MappingTable {
    pub fn read(session: &Session, start: u64, rows: usize) -> Result<Self> {
        let mut cursor = Cursor::new(session.source(), start);

        let mut counts = Vec::new();
        for _ in 0..rows {
            let row = cursor.read_record(ROW_SIZE)?;
            let name = session.string(row.i32_at(0)?).unwrap_or_default();
            counts.push((name, row.count_at(16)?));
        }

        let mut table = Vec::new();
        for (name, count) in counts {
            let mut entries = Vec::new();
            for _ in 0..count {
                entries.push(session.string(cursor.read_i32()?).unwrap_or_default());
            }
            table.push(AnimationMap { name, entries });
        }

        Ok(Self { rows: table })
    }

    pub fn to_text(&self) -> String {
        let mut out = String::from("#\n");
        for row in &self.rows {
            out.push_str(&row.name);
            for entry in &row.entries {
                let _ = write!(out, ",{}", entry);
            }
            out.push('\n');
        }
        out
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::AnimMappingTable,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Entries(record.i64_at(16)?),
        )
        .with_payload(record.u64_at(8)?, 0))
    })
}

/// Container header: row count, 4 bytes, then the name with rows after it
pub fn from_container(session: &Session, header: u64) -> Result<Asset> {
    let mut cursor = Cursor::new(session.source(), header);
    let rows = cursor.read_i32()?;
    cursor.skip(4);
    let path = cursor.read_cstring()?;

    Ok(Asset::new(
        AssetKind::AnimMappingTable,
        Backing::Container,
        path,
        header,
        AssetHeader::Entries(rows as i64),
    )
    .with_payload(cursor.position(), 0))
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let AssetHeader::Entries(rows) = asset.header else {
        return Err(Error::Decode(format!("{} has no row count", asset.path)));
    };
    let rows = usize::try_from(rows)
        .map_err(|_| Error::Decode(format!("negative row count {}", rows)))?;

    let table = MappingTable::read(session, asset.start, rows)?;
    target.write(&format!("animtables/{}", asset.path), table.to_text())?;
    Ok(())
}
