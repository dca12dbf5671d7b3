//! String tables, exported as comma separated text

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::Result;

const ENTRY_SIZE: usize = 32;
const CELL_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    pub columns: usize,
    pub rows: Vec<Vec<String>>,
}

impl StringTable {
    pub fn read(session: &Session, record: &Record) -> Result<Self> {
        let columns = record.count_at(8)?;
        let rows = record.count_at(12)?;
        let Some(cells) = record.ptr_at(16)? else {
            return Ok(Self {
                columns,
                rows: Vec::new(),
            });
        };

        let source = session.source();
        let data = Record::read(source, cells, rows * columns * CELL_SIZE)?;

        let mut table = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut fields = Vec::with_capacity(columns);
            for column in 0..columns {
                let at = (row * columns + column) * CELL_SIZE;
                let text = data
                    .ptr_at(at)?
                    .and_then(|ptr| source.read_cstring(ptr))
                    .unwrap_or_default();
                fields.push(text);
            }
            table.push(fields);
        }

        Ok(Self {
            columns,
            rows: table,
        })
    }

    /// One line per row, fields joined by commas
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        let start = record.u64_at(16)?;
        let end = record.u64_at(24)?;

        Ok(Asset::new(
            AssetKind::StringTable,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Table {
                columns: record.i32_at(8)?,
                rows: record.i32_at(12)?,
            },
        )
        .with_payload(start, end.saturating_sub(start)))
    })
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let record = Record::read(session.source(), asset.record, ENTRY_SIZE)?;
    let table = StringTable::read(session, &record)?;
    target.write(&asset.path, table.to_csv())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::tests::{pool, process_session};
    use crate::pool::tests::{put_descriptor, t7_image, BASE};

    #[test]
    fn test_string_table_end_to_end() {
        const POOL: u64 = BASE + 0x2000;
        const CELLS: u64 = BASE + 0x2400;
        const NAMES: u64 = BASE + 0x3000;

        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "stringtable", POOL, 32, 4, 1);

        source
            .put_u64(POOL, NAMES)
            .put_i32(POOL + 8, 3)
            .put_i32(POOL + 12, 2)
            .put_u64(POOL + 16, CELLS)
            .put_u64(POOL + 24, CELLS + 6 * 16)
            .put_cstring(NAMES, "gamedata/tables/zm/levels.csv");

        let cells = ["id", "name", "size", "1", "zm_tomb", ""];
        for (i, text) in cells.iter().enumerate() {
            let at = CELLS + i as u64 * 16;
            if text.is_empty() {
                continue;
            }
            let string = NAMES + 0x100 + i as u64 * 0x20;
            source.put_u64(at, string).put_cstring(string, text);
        }

        let session = process_session(source);
        let tables = pool(&session, "stringtable");
        let assets = AssetKind::StringTable.enumerate(&session, &tables).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].info(), "Columns - 3 Rows - 2");
        assert_eq!(assets[0].size, 96);

        let dir = tempfile::tempdir().unwrap();
        export(&session, &assets[0], &ExportTarget::new(dir.path())).unwrap();

        let text = std::fs::read_to_string(dir.path().join("gamedata/tables/zm/levels.csv")).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.split(',').count() == 3));
        assert_eq!(lines, vec!["id,name,size", "1,zm_tomb,"]);
    }
}
