//! Structured tables, exported as JSON documents

use serde::Serialize;
use serde_json::Value;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::json::{to_pretty_string, OrderedMap};
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::Result;

const ENTRY_SIZE: usize = 48;
const CELL_SIZE: usize = 24;
const PROPERTY_SIZE: usize = 16;

const CELL_STRING: i32 = 1;
const CELL_INT: i32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct StructuredTable {
    #[serde(rename = "_meta")]
    pub meta: OrderedMap<&'static str>,
    pub data: Vec<OrderedMap<Value>>,
}

fn read_properties(session: &Session, address: Option<u64>, count: usize) -> Result<Vec<String>> {
    let Some(address) = address else {
        return Ok(vec![String::new(); count]);
    };
    let data = Record::read(session.source(), address, count * PROPERTY_SIZE)?;
    (0..count)
        .map(|i| {
            Ok(data
                .ptr_at(i * PROPERTY_SIZE)?
                .and_then(|ptr| session.source().read_cstring(ptr))
                .unwrap_or_default())
        })
        .collect()
}

impl StructuredTable {
    /// Every entry holds one cell per property; cells of other types are
    /// left out of the entry.
    pub fn read(session: &Session, record: &Record) -> Result<Self> {
        let data_count = record.count_at(8)?;
        let property_count = record.count_at(12)?;
        let entry_count = record.count_at(16)?;
        let properties = read_properties(session, record.ptr_at(40)?, property_count)?;

        let cells = match record.ptr_at(24)? {
            Some(ptr) => Some(Record::read(session.source(), ptr, data_count * CELL_SIZE)?),
            None => None,
        };

        let mut data = Vec::with_capacity(entry_count);
        let mut cell = 0;
        for _ in 0..entry_count {
            let mut entry = OrderedMap::new();
            for property in &properties {
                let at = cell * CELL_SIZE;
                cell += 1;
                let Some(cells) = cells.as_ref().filter(|c| at < c.len()) else {
                    continue;
                };

                match cells.i32_at(at)? {
                    CELL_STRING => {
                        let text = cells
                            .ptr_at(at + 8)?
                            .and_then(|ptr| session.source().read_cstring(ptr))
                            .unwrap_or_default();
                        entry.insert(property.clone(), Value::from(text));
                    }
                    CELL_INT => entry.insert(property.clone(), Value::from(cells.i32_at(at + 16)?)),
                    _ => {}
                }
            }
            data.push(entry);
        }

        let mut meta = OrderedMap::new();
        meta.insert("Exported via".to_string(), "hydra");

        Ok(Self { meta, data })
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::StructuredTable,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Structured {
                entries: record.i32_at(16)?,
                properties: record.i32_at(12)?,
            },
        ))
    })
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let record = Record::read(session.source(), asset.record, ENTRY_SIZE)?;
    let table = StructuredTable::read(session, &record)?;
    target.write(&asset.path, to_pretty_string(&table)?)?;
    Ok(())
}
