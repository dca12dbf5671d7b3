//! Map entity strings, written out as raw bytes

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        let size = record.count_at(16)? as u64;
        Ok(Asset::new(
            AssetKind::MapEnts,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Size(size),
        )
        .with_payload(record.u64_at(8)?, size))
    })
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
    target.write(&asset.path, data)?;
    Ok(())
}
