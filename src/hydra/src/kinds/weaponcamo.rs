//! Weapon camo tables, exported as GDT
//!
//! Camos are written in `weaponcamo.gdf` blocks of at most 75, followed by
//! a `weaponcamotable.gdf` entry that lists the blocks.

use crate::asset::{display_name, Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::gdt::GdtWriter;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const ENTRY_SIZE: usize = 24;
const CAMO_SIZE: usize = 16;
const MATERIAL_SIZE: usize = 312;

/// Camos per `weaponcamo.gdf` block
pub const CAMOS_PER_BLOCK: usize = 75;
/// Blocks a camo table can list
pub const MAX_BLOCKS: usize = 10;
/// Base material slots per camo material
pub const BASE_MATERIALS: usize = 10;

fn round2(value: f32) -> f64 {
    (f64::from(value) * 100.0).round() / 100.0 + 0.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct CamoMaterial {
    pub material: String,
    pub detail_normal_map: String,
    pub translation: [f64; 2],
    pub scale: [f64; 2],
    pub rotation: f64,
    pub gloss_blend: f64,
    pub normal_blend: f64,
    pub normal_height: f64,
    pub normal_scale: [f64; 2],
    pub use_normal_map: u8,
    pub use_gloss_map: u8,
    pub base_material_count: i32,
    pub base_materials: [String; BASE_MATERIALS],
    pub camo_masks: [String; BASE_MATERIALS],
}

impl Default for CamoMaterial {
    fn default() -> Self {
        Self {
            material: String::new(),
            detail_normal_map: String::new(),
            translation: [0.0; 2],
            scale: [0.0; 2],
            rotation: 0.0,
            gloss_blend: 0.0,
            normal_blend: 0.0,
            normal_height: 0.0,
            normal_scale: [0.0; 2],
            use_normal_map: 1,
            use_gloss_map: 1,
            base_material_count: 0,
            base_materials: Default::default(),
            camo_masks: Default::default(),
        }
    }
}

impl CamoMaterial {
    pub fn read(session: &Session, record: &Record) -> Result<Self> {
        let short_name = |name: Option<String>| {
            name.map(|n| display_name(&n).to_string()).unwrap_or_default()
        };
        let flags = record.u8_at(24)?;

        let mut material = Self {
            material: short_name(record.ptr_at(32)?.and_then(|p| session.asset_name(p))),
            detail_normal_map: record
                .ptr_at(72)?
                .and_then(|p| session.image_name(p))
                .unwrap_or_default(),
            translation: [round2(record.f32_at(40)?), round2(record.f32_at(44)?)],
            scale: [round2(record.f32_at(48)?), round2(record.f32_at(52)?)],
            rotation: round2(record.f32_at(56)?),
            gloss_blend: round2(record.f32_at(60)?),
            normal_blend: round2(record.f32_at(64)?),
            normal_height: round2(record.f32_at(80)?),
            normal_scale: [round2(record.f32_at(84)?), round2(record.f32_at(88)?)],
            use_normal_map: (flags >> 1) & 1,
            use_gloss_map: (flags >> 1) & 1,
            base_material_count: record.i32_at(0)?,
            ..Self::default()
        };

        if let Some(names) = record.ptr_at(8)? {
            let count = usize::try_from(material.base_material_count)
                .unwrap_or(0)
                .min(BASE_MATERIALS);
            let pairs = Record::read(session.source(), names, count * 16)?;
            for q in 0..count {
                material.base_materials[q] =
                    short_name(pairs.ptr_at(q * 16)?.and_then(|p| session.asset_name(p)));
                material.camo_masks[q] =
                    short_name(pairs.ptr_at(q * 16 + 8)?.and_then(|p| session.image_name(p)));
            }
        }

        Ok(material)
    }

    fn write_fields(&self, gdt: &mut GdtWriter, slot: usize, camo: usize) {
        let key = |name: &str| format!("material{}_{}_{}", slot, camo, name);

        for (q, name) in self.base_materials.iter().enumerate() {
            gdt.field(&key(&format!("base_material_{}", q + 1)), name);
        }
        for (q, name) in self.camo_masks.iter().enumerate() {
            gdt.field(&key(&format!("camo_mask_{}", q + 1)), name);
        }
        gdt.field(&key("detail_normal_height"), self.normal_height)
            .field(&key("detail_normal_map"), &self.detail_normal_map)
            .field(&key("detail_normal_scale_x"), self.normal_scale[0])
            .field(&key("detail_normal_scale_y"), self.normal_scale[1])
            .field(&key("gloss_blend"), self.gloss_blend)
            .field(&key("material"), &self.material)
            .field(&key("normal_amount"), self.normal_blend)
            .field(&key("numBaseMaterials"), self.base_material_count)
            .field(&key("rotation"), self.rotation)
            .field(&key("scale_x"), self.scale[0])
            .field(&key("scale_y"), self.scale[1])
            .field(&key("trans_x"), self.translation[0])
            .field(&key("trans_y"), self.translation[1])
            .field(&key("useGlossMap"), self.use_gloss_map)
            .field(&key("useNormalMap"), self.use_normal_map);
    }
}

/// One camo; always holds at least one material slot
#[derive(Debug, Clone, PartialEq)]
pub struct Camo {
    pub materials: Vec<CamoMaterial>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponCamo {
    pub camos: Vec<Camo>,
}

impl WeaponCamo {
    pub fn read(session: &Session, record: &Record) -> Result<Self> {
        let count = record.count_at(16)?;
        let Some(start) = record.ptr_at(8)? else {
            return Ok(Self { camos: Vec::new() });
        };
        let entries = Record::read(session.source(), start, count * CAMO_SIZE)?;

        let mut camos = Vec::with_capacity(count);
        for i in 0..count {
            let materials = entries.i32_at(i * CAMO_SIZE)?;
            let location = entries.ptr_at(i * CAMO_SIZE + 8)?;

            let mut camo = Camo {
                materials: Vec::new(),
            };
            match (usize::try_from(materials), location) {
                (Ok(n), Some(location)) if n > 0 => {
                    for j in 0..n {
                        let address = location + (j * MATERIAL_SIZE) as u64;
                        let record = Record::read(session.source(), address, MATERIAL_SIZE)?;
                        camo.materials.push(CamoMaterial::read(session, &record)?);
                    }
                }
                _ => camo.materials.push(CamoMaterial::default()),
            }
            camos.push(camo);
        }

        Ok(Self { camos })
    }

    /// Names of the `weaponcamo.gdf` blocks for `asset`
    pub fn block_names(&self, asset: &str) -> Vec<String> {
        (0..self.camos.len())
            .step_by(CAMOS_PER_BLOCK)
            .map(|first| {
                if first == 0 {
                    format!("{}_ship", asset)
                } else {
                    format!("{}_base{}", asset, first + 1)
                }
            })
            .collect()
    }

    pub fn to_gdt(&self, asset: &str) -> Result<String> {
        let blocks = self.block_names(asset);
        if blocks.len() > MAX_BLOCKS {
            return Err(Error::Decode(format!(
                "{} camos need {} tables, at most {} are supported",
                self.camos.len(),
                blocks.len(),
                MAX_BLOCKS
            )));
        }

        let mut gdt = GdtWriter::new();
        let chunks = blocks.iter().zip(self.camos.chunks(CAMOS_PER_BLOCK));
        for (k, (block, chunk)) in chunks.enumerate() {
            gdt.begin_entry(block, "weaponcamo.gdf")
                .field("baseIndex", k * CAMOS_PER_BLOCK + 1)
                .field("configstringFileType", "WEAPONCAMO");
            for (i, camo) in chunk.iter().enumerate() {
                for (j, material) in camo.materials.iter().enumerate() {
                    material.write_fields(&mut gdt, j + 1, i + 1);
                }
            }
            gdt.field("numCamos", chunk.len()).end_entry();
        }

        gdt.begin_entry(asset, "weaponcamotable.gdf")
            .field("configstringFileType", "WEAPONCAMO")
            .field("numCamoTables", blocks.len());
        for i in 0..MAX_BLOCKS {
            let name = blocks.get(i).map(String::as_str).unwrap_or_default();
            gdt.field(&format!("table_{:02}_name", i + 1), name);
        }
        gdt.end_entry();

        Ok(gdt.finish())
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::WeaponCamo,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Camos(record.i32_at(16)?),
        )
        .with_payload(record.u64_at(8)?, 0))
    })
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let record = Record::read(session.source(), asset.record, ENTRY_SIZE)?;
    let camo = WeaponCamo::read(session, &record)?;
    target.write(
        &format!("source_data/camo_gdts/{}_gdt.gdt", asset.path),
        camo.to_gdt(&asset.path)?,
    )?;
    Ok(())
}
