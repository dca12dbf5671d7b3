//! Animation selector tables
//!
//! A table is a list of selectors. Each selector has named columns and
//! rows of 8-byte cells whose encoding depends on the column name.

use std::fmt::Write;

use phf::phf_map;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Cursor;
use crate::export::ExportTarget;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const SELECTOR_SIZE: usize = 88;
const COLUMN_SIZE: usize = 24;
const ROW_INDEX_SIZE: u64 = 16;
const CELL_SIZE: usize = 8;

/// How a column's cells are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// String index, `*` when unset
    String,
    /// String index, upper-cased, `*` when unset
    Enum,
    /// String index, else an i32 at +4
    Int,
    /// String index, else an f32 at +4
    Float,
}

static COLUMNS: phf::Map<&'static str, Column> = phf_map! {
    "_context" => Column::String,
    "_context2" => Column::String,
    "_cover_concealed" => Column::Enum,
    "_cover_direction" => Column::Enum,
    "_previous_cover_direction" => Column::Enum,
    "_desired_cover_direction" => Column::Enum,
    "_cover_mode" => Column::Enum,
    "_previous_cover_mode" => Column::Enum,
    "_cover_type" => Column::Enum,
    "_current_location_cover_type" => Column::Enum,
    "_previous_cover_type" => Column::Enum,
    "_exposed_type" => Column::Enum,
    "_stance" => Column::Enum,
    "_desired_stance" => Column::Enum,
    "_arrival_stance" => Column::Enum,
    "_locomotion_should_turn" => Column::Enum,
    "_arrival_type" => Column::Enum,
    "_locomotion_speed" => Column::Enum,
    "_grapple_direction" => Column::Enum,
    "_run_n_gun_variation" => Column::Enum,
    "_has_legs" => Column::Enum,
    "_idgun_damage_direction" => Column::Enum,
    "_which_board_pull" => Column::Int,
    "_variant_type" => Column::Int,
    "_low_gravity_variant" => Column::Int,
    "_board_attack_spot" => Column::Float,
    "_weapon_class" => Column::Enum,
    "_weapon_type" => Column::Enum,
    "_damage_weapon" => Column::Enum,
    "_damage_direction" => Column::Enum,
    "_damage_location" => Column::Enum,
    "_fatal_damage_location" => Column::Enum,
    "_damage_taken" => Column::Enum,
    "_damage_weapon_class" => Column::Enum,
    "_tracking_turn_yaw_min" => Column::Float,
    "_tracking_turn_yaw_max" => Column::Float,
    "_melee_distance_min" => Column::Float,
    "_melee_distance_max" => Column::Float,
    "_throw_distance_min" => Column::Float,
    "_throw_distance_max" => Column::Float,
    "_locomotion_exit_yaw_min" => Column::Float,
    "_locomotion_exit_yaw_max" => Column::Float,
    "_locomotion_motion_angle_min" => Column::Float,
    "_locomotion_motion_angle_max" => Column::Float,
    "_lookahead_angle_min" => Column::Float,
    "_lookahead_angle_max" => Column::Float,
    "_locomotion_turn_yaw_min" => Column::Float,
    "_locomotion_turn_yaw_max" => Column::Float,
    "_locomotion_arrival_yaw_min" => Column::Float,
    "_locomotion_arrival_yaw_max" => Column::Float,
    "_tactical_arrival_facing_yaw_min" => Column::Float,
    "_tactical_arrival_facing_yaw_max" => Column::Float,
    "_locomotion_arrival_distance_min" => Column::Float,
    "_locomotion_arrival_distance_max" => Column::Float,
    "_enemy_yaw_min" => Column::Float,
    "_enemy_yaw_max" => Column::Float,
    "_perfect_enemy_yaw_min" => Column::Float,
    "_perfect_enemy_yaw_max" => Column::Float,
    "_react_yaw_min" => Column::Float,
    "_react_yaw_max" => Column::Float,
    "_speed_min" => Column::Float,
    "_speed_max" => Column::Float,
    "_locomotion_face_enemy_quadrant" => Column::Enum,
    "_locomotion_face_enemy_quadrant_previous" => Column::Enum,
    "_traversal_type" => Column::String,
    "_locomotion_pain_type" => Column::String,
    "_human_locomotion_movement_type" => Column::Enum,
    "_animation_alias" => Column::String,
    "_aim_up_alias" => Column::String,
    "_aim_down_alias" => Column::String,
    "_aim_left_alias" => Column::String,
    "_aim_right_alias" => Column::String,
    "_animation_alias_semi" => Column::String,
    "_animation_alias_singleshot" => Column::String,
    "_animation_alias_burst3" => Column::String,
    "_animation_alias_burst4" => Column::String,
    "_animation_alias_burst5" => Column::String,
    "_animation_alias_burst6" => Column::String,
    "_animation_alias_param_f" => Column::String,
    "_animation_alias_param_b" => Column::String,
    "_animation_alias_param_l" => Column::String,
    "_animation_alias_param_r" => Column::String,
    "_animation_alias_param_balance" => Column::String,
    "_animation_alias_turn_r" => Column::String,
    "_animation_alias_turn_l" => Column::String,
    "_param_idle_blend_dropoff" => Column::Float,
    "_param_turn_blend_min_ratio" => Column::Float,
    "_param_turn_blend_scale" => Column::Float,
    "_blend_in_time" => Column::Float,
    "_blend_out_time" => Column::Float,
    "_animation_mocomp" => Column::Enum,
    "_aim_table" => Column::Enum,
    "_gib_location" => Column::Enum,
    "_yaw_to_cover_min" => Column::Float,
    "_yaw_to_cover_max" => Column::Float,
    "_should_run" => Column::Enum,
    "_should_howl" => Column::Enum,
    "_arms_position" => Column::Enum,
    "_mind_control" => Column::Enum,
    "_move_mode" => Column::Enum,
    "_fire_mode" => Column::Enum,
    "_special_death" => Column::Enum,
    "_juke_direction" => Column::Enum,
    "_juke_distance" => Column::Enum,
    "_panic" => Column::Enum,
    "_gibbed_limbs" => Column::Enum,
    "_human_cover_flankability" => Column::Enum,
    "_robot_step_in" => Column::Enum,
    "_awareness" => Column::Enum,
    "_awareness_prev" => Column::Enum,
    "_robot_jump_direction" => Column::Enum,
    "_robot_wallrun_direction" => Column::Enum,
    "_robot_locomotion_type" => Column::Enum,
    "_robot_traversal_type" => Column::Enum,
    "_staircase_exit_type" => Column::Enum,
    "_staircase_type" => Column::Enum,
    "_staircase_state" => Column::Enum,
    "_staircase_direction" => Column::Enum,
    "_staircase_skip_num" => Column::Enum,
    "_melee_enemy_type" => Column::Enum,
    "_zombie_damageweapon_type" => Column::Enum,
    "_parasite_firing_rate" => Column::Enum,
    "_margwa_head" => Column::Enum,
    "_margwa_teleport" => Column::Enum,
    "_enemy" => Column::Enum,
    "_patrol" => Column::Enum,
    "_knockdown_direction" => Column::Enum,
    "_getup_direction" => Column::Enum,
    "_push_direction" => Column::Enum,
    "_human_locomotion_variation" => Column::Enum,
    "_robot_mode" => Column::Enum,
    "_low_gravity" => Column::Enum,
    "_knockdown_type" => Column::Enum,
    "_mechz_part" => Column::Enum,
    "_apothicon_bamf_distance_min" => Column::Float,
    "_apothicon_bamf_distance_max" => Column::Float,
    "_keeper_protector_attack" => Column::Enum,
    "_keeper_protector_attack_type" => Column::Enum,
    "_whirlwind_speed" => Column::Enum,
    "_quad_wall_crawl" => Column::Enum,
    "_quad_phase_direction" => Column::Enum,
    "_quad_phase_distance" => Column::Enum,
    "_zombie_blackholebomb_pull_state" => Column::Enum,
};

impl Column {
    pub fn for_name(name: &str) -> Option<Self> {
        COLUMNS.get(name).copied()
    }

    fn render(self, session: &Session, cell: &[u8; CELL_SIZE]) -> String {
        let index = i32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]]);
        let value = [cell[4], cell[5], cell[6], cell[7]];
        let text = session.string(index).filter(|s| !s.is_empty());

        match self {
            // Process string columns are written as read; only enums are upper-cased
            Column::String => text.unwrap_or_else(|| "*".to_string()),
            Column::Enum => text.map_or_else(|| "*".to_string(), |s| s.to_uppercase()),
            Column::Int => text.unwrap_or_else(|| i32::from_le_bytes(value).to_string()),
            Column::Float => text.unwrap_or_else(|| format_float(f32::from_le_bytes(value))),
        }
    }
}

/// Shortest round-trip text for a float cell.
///
/// Fixed notation is used while the decimal exponent stays within the
/// significant digits (at least 7) and above 1e-5; outside that range the
/// value is written as `1.5E-05` or `1E+20`.
pub fn format_float(value: f32) -> String {
    if !value.is_finite() || value == 0.0 {
        return match value {
            v if v.is_nan() => "NaN".to_string(),
            v if v == f32::INFINITY => "Infinity".to_string(),
            v if v == f32::NEG_INFINITY => "-Infinity".to_string(),
            v if v.is_sign_negative() => "-0".to_string(),
            _ => "0".to_string(),
        };
    }

    let scientific = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let position = exponent + 1;
    let max_digits = digits.len().max(7) as i32;

    if position <= max_digits && position >= -3 {
        return value.to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let (first, rest) = digits.split_at(1);
    let fraction = if rest.is_empty() {
        String::new()
    } else {
        format!(".{}", rest)
    };
    let exponent_sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{}{}E{}{:02}", sign, first, fraction, exponent_sign, exponent.abs())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorTable {
    pub selectors: Vec<Selector>,
}

impl SelectorTable {
    /// Read `count` selector headers from `start`, then each selector's
    /// columns, row index block and cells in turn
    pub fn read(session: &Session, start: u64, count: usize) -> Result<Self> {
        let mut cursor = Cursor::new(session.source(), start);

        let mut shapes = Vec::new();
        for _ in 0..count {
            let header = cursor.read_record(SELECTOR_SIZE)?;
            let name = session.string(header.i32_at(0)?).unwrap_or_default();
            shapes.push((name, header.count_at(16)?, header.count_at(32)?));
        }

        let mut selectors = Vec::new();
        for (name, columns, rows) in shapes {
            let mut headers = Vec::new();
            for _ in 0..columns {
                let column = cursor.read_record(COLUMN_SIZE)?;
                headers.push(session.string(column.i32_at(0)?).unwrap_or_default());
            }
            cursor.skip(ROW_INDEX_SIZE * rows as u64);

            let readers: Vec<_> = headers.iter().map(|h| Column::for_name(h)).collect();
            let mut table = Vec::new();
            for _ in 0..rows {
                let mut row = Vec::with_capacity(columns);
                for reader in &readers {
                    let bytes = cursor.read_bytes(CELL_SIZE)?;
                    let mut cell = [0u8; CELL_SIZE];
                    cell.copy_from_slice(&bytes);
                    row.push(reader.map(|r| r.render(session, &cell)).unwrap_or_default());
                }
                table.push(row);
            }

            selectors.push(Selector {
                name,
                headers,
                rows: table,
            });
        }

        Ok(Self { selectors })
    }

    /// Every field is followed by a comma; selectors end with a line
    /// holding a single comma
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for selector in &self.selectors {
            let _ = writeln!(out, "{},", selector.name);
            for header in &selector.headers {
                let _ = write!(out, "{},", header);
            }
            out.push('\n');
            for row in &selector.rows {
                for cell in row {
                    let _ = write!(out, "{},", cell);
                }
                out.push('\n');
            }
            out.push_str(",\n");
        }
        out
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::AnimSelectorTable,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Selectors(record.i32_at(16)?),
        )
        .with_payload(record.u64_at(8)?, 0))
    })
}

/// Container header: selector count, 4 bytes, then the name with the
/// selectors after it
pub fn from_container(session: &Session, header: u64) -> Result<Asset> {
    let mut cursor = Cursor::new(session.source(), header);
    let selectors = cursor.read_i32()?;
    cursor.skip(4);
    let path = cursor.read_cstring()?;

    Ok(Asset::new(
        AssetKind::AnimSelectorTable,
        Backing::Container,
        path,
        header,
        AssetHeader::Selectors(selectors),
    )
    .with_payload(cursor.position(), 0))
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let AssetHeader::Selectors(count) = asset.header else {
        return Err(Error::Decode(format!("{} has no selector count", asset.path)));
    };
    let count = usize::try_from(count)
        .map_err(|_| Error::Decode(format!("negative selector count {}", count)))?;

    let table = SelectorTable::read(session, asset.start, count)?;
    target.write(&format!("animtables/{}", asset.path), table.to_text())?;
    Ok(())
}
