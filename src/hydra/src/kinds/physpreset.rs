//! Physics presets

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::gdt::GdtWriter;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

/// Entry size covering every field read here
const ENTRY_SIZE: usize = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct PhysPreset {
    pub mass: f64,
    pub bounce: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub bullet_force_scale: f32,
    pub explosive_force_scale: f32,
    pub can_float: i32,
    pub gravity_scale: f32,
    pub mass_offset: [f32; 3],
    pub buoyancy_min: [f32; 3],
    pub buoyancy_max: [f32; 3],
    pub trail_fx: String,
    pub impacts_fx_table: String,
    pub impacts_sound_table: String,
}

fn vec3(record: &Record, offset: usize) -> Result<[f32; 3]> {
    Ok([
        record.f32_at(offset)?,
        record.f32_at(offset + 4)?,
        record.f32_at(offset + 8)?,
    ])
}

impl PhysPreset {
    pub fn read(session: &Session, record: &Record) -> Result<Self> {
        Ok(Self {
            mass: f64::from(record.f32_at(12)?) * 1000.0,
            bounce: record.f32_at(16)?,
            friction: record.f32_at(20)?,
            linear_damping: record.f32_at(24)?,
            angular_damping: record.f32_at(28)?,
            bullet_force_scale: record.f32_at(32)?,
            explosive_force_scale: record.f32_at(36)?,
            can_float: record.i32_at(48)?,
            gravity_scale: record.f32_at(52)?,
            mass_offset: vec3(record, 56)?,
            buoyancy_min: vec3(record, 68)?,
            buoyancy_max: vec3(record, 80)?,
            trail_fx: super::referenced_name(session, record, 96)?,
            impacts_fx_table: super::referenced_name(session, record, 104)?,
            impacts_sound_table: super::referenced_name(session, record, 112)?,
        })
    }

    pub fn to_gdt(&self, name: &str) -> String {
        let mut gdt = GdtWriter::new();
        let fixed = |value: f32| format!("{:.3}", value);

        gdt.begin_entry(name, "physpreset.gdf")
            .field("configstringFileType", "PHYSIC")
            .field("bounce", fixed(self.bounce))
            .field("bulletForceScale", fixed(self.bullet_force_scale))
            .field("explosiveForceScale", fixed(self.explosive_force_scale))
            .field("buoyancyMinX", fixed(self.buoyancy_min[0]))
            .field("buoyancyMinY", fixed(self.buoyancy_min[1]))
            .field("buoyancyMinZ", fixed(self.buoyancy_min[2]))
            .field("buoyancyMaxX", fixed(self.buoyancy_max[0]))
            .field("buoyancyMaxY", fixed(self.buoyancy_max[1]))
            .field("buoyancyMaxZ", fixed(self.buoyancy_max[2]))
            .field("canFloat", self.can_float)
            .field("damping_angular", fixed(self.angular_damping))
            .field("damping_linear", fixed(self.linear_damping))
            .field("friction", fixed(self.friction))
            .field("gravityScale", fixed(self.gravity_scale))
            .field("mass", format!("{:.3}", self.mass))
            .field("massOffsetX", fixed(self.mass_offset[0]))
            .field("massOffsetY", fixed(self.mass_offset[1]))
            .field("massOffsetZ", fixed(self.mass_offset[2]))
            .field("impactsFxTable", &self.impacts_fx_table)
            .field("impactsSoundsTable", &self.impacts_sound_table)
            .field("trailFX", &self.trail_fx)
            .end_entry();

        gdt.finish()
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        let mass = f64::from(record.f32_at(12)?) * 1000.0;
        Ok(Asset::new(
            AssetKind::PhysPreset,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Mass(mass),
        ))
    })
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    if asset.backing != Backing::Process {
        return Err(Error::Decode("physpreset is only read from process memory".to_string()));
    }

    let record = Record::read(session.source(), asset.record, ENTRY_SIZE)?;
    let preset = PhysPreset::read(session, &record)?;

    target.write(
        &format!("source_data/physpreset_gdts/{}_gdt.gdt", asset.path),
        preset.to_gdt(&asset.path),
    )?;
    Ok(())
}
