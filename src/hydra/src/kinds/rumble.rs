//! Rumble definitions and their graph files

use std::fmt::Write;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::gdt::GdtWriter;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const ENTRY_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct Rumble {
    /// Seconds
    pub duration: f32,
    pub range: f32,
    pub high_graph: Option<u64>,
    pub low_graph: Option<u64>,
    pub fade_with_distance: i32,
    pub broadcast: i32,
    pub cam_shake_range: f32,
    /// Seconds
    pub cam_shake_duration: f32,
    pub cam_shake_scale: f32,
    pub pulse_radius_outer: f32,
    pub pulse_scale: f32,
}

impl Rumble {
    pub fn read(record: &Record) -> Result<Self> {
        Ok(Self {
            duration: record.i32_at(8)? as f32 / 1000.0,
            range: record.f32_at(12)?,
            high_graph: record.ptr_at(16)?,
            low_graph: record.ptr_at(24)?,
            fade_with_distance: record.i32_at(32)?,
            broadcast: record.i32_at(36)?,
            cam_shake_range: record.f32_at(40)?,
            cam_shake_duration: record.i32_at(44)? as f32 / 1000.0,
            cam_shake_scale: record.f32_at(48)?,
            pulse_radius_outer: record.f32_at(52)?,
            pulse_scale: record.f32_at(56)?,
        })
    }

    pub fn to_gdt(&self, name: &str, high: &str, low: &str) -> String {
        let mut gdt = GdtWriter::new();
        gdt.begin_entry(name, "rumble.gdf")
            .field("configstringFileType", "RUMBLE")
            .field("highRumbleFile", high)
            .field("lowRumbleFile", low)
            .field("duration", self.duration)
            .field("range", self.range)
            .field("fadeWithDistance", self.fade_with_distance)
            .field("broadcast", self.broadcast)
            .field("camShakeRange", self.cam_shake_range)
            .field("camShakeScale", self.cam_shake_scale)
            .field("camShakeDuration", self.cam_shake_duration)
            .field("pulseScale", self.pulse_scale)
            .field("pulseRadiusOuter", self.pulse_radius_outer)
            .end_entry();
        gdt.finish()
    }
}

/// A rumble graph: name pointer, point count, then (x, y) pairs
#[derive(Debug, Clone, PartialEq)]
pub struct RumbleGraph {
    pub name: String,
    pub points: Vec<(f32, f32)>,
}

impl RumbleGraph {
    pub fn read(session: &Session, address: u64) -> Result<Self> {
        let header = Record::read(session.source(), address, 12)?;
        let name = session
            .asset_name(address)
            .ok_or(Error::OutOfBounds { address, len: 8 })?;
        let count = header.count_at(8)?;

        let points = Record::read(session.source(), address + 12, count * 8)?;
        let points = (0..count)
            .map(|i| Ok((points.f32_at(i * 8)?, points.f32_at(i * 8 + 4)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { name, points })
    }

    pub fn to_file(&self) -> String {
        let mut out = format!("RUMBLEGRAPHFILE\n\n{}\n", self.points.len());
        for (x, y) in &self.points {
            let _ = writeln!(out, "{:.4} {:.4}", x, y);
        }
        out
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::Rumble,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Rumble {
                duration_ms: record.i32_at(8)?,
            },
        ))
    })
}

fn export_graph(session: &Session, address: Option<u64>, target: &ExportTarget) -> Result<String> {
    let Some(address) = address else {
        return Ok(String::new());
    };
    let graph = RumbleGraph::read(session, address)?;
    target.write(&format!("rumble/{}", graph.name), graph.to_file())?;
    Ok(graph.name)
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let record = Record::read(session.source(), asset.record, ENTRY_SIZE)?;
    let rumble = Rumble::read(&record)?;

    let high = export_graph(session, rumble.high_graph, target)?;
    let low = export_graph(session, rumble.low_graph, target)?;

    target.write(
        &format!("source_data/rumble_gdts/{}_gdt.gdt", asset.path),
        rumble.to_gdt(&asset.path, &high, &low),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::tests::{pool, process_session};
    use crate::pool::tests::{put_descriptor, t7_image, BASE};

    #[test]
    fn test_rumble_export() {
        const POOL: u64 = BASE + 0x2000;
        const GRAPH: u64 = BASE + 0x2800;
        const NAMES: u64 = BASE + 0x3000;

        let mut source = t7_image(0x4000);
        put_descriptor(&mut source, "rumble", POOL, 64, 4, 1);

        source
            .put_u64(POOL, NAMES)
            .put_i32(POOL + 8, 500)
            .put_f32(POOL + 12, 256.0)
            .put_u64(POOL + 16, GRAPH)
            .put_i32(POOL + 36, 1)
            .put_i32(POOL + 44, 1500)
            .put_cstring(NAMES, "damage_heavy")
            .put_cstring(NAMES + 0x40, "heavy.rmb");

        source
            .put_u64(GRAPH, NAMES + 0x40)
            .put_i32(GRAPH + 8, 2)
            .put_f32(GRAPH + 12, 0.0)
            .put_f32(GRAPH + 16, 1.0)
            .put_f32(GRAPH + 20, 0.5)
            .put_f32(GRAPH + 24, 0.25);

        let session = process_session(source);
        let rumbles = pool(&session, "rumble");
        let assets = AssetKind::Rumble.enumerate(&session, &rumbles).unwrap();
        assert_eq!(assets[0].info(), "Duration - 500ms");

        let dir = tempfile::tempdir().unwrap();
        export(&session, &assets[0], &ExportTarget::new(dir.path())).unwrap();

        let graph = std::fs::read_to_string(dir.path().join("rumble/heavy.rmb")).unwrap();
        assert_eq!(graph, "RUMBLEGRAPHFILE\n\n2\n0.0000 1.0000\n0.5000 0.2500\n");

        let gdt = std::fs::read_to_string(
            dir.path().join("source_data/rumble_gdts/damage_heavy_gdt.gdt"),
        )
        .unwrap();
        assert!(gdt.contains("\t\t\"highRumbleFile\" \"heavy.rmb\"\n"));
        assert!(gdt.contains("\t\t\"lowRumbleFile\" \"\"\n"));
        assert!(gdt.contains("\t\t\"duration\" \"0.5\"\n"));
        assert!(gdt.contains("\t\t\"camShakeDuration\" \"1.5\"\n"));
        assert!(gdt.contains("\t\t\"range\" \"256\"\n"));
    }
}
