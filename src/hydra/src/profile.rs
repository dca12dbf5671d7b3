//! Per-build constants for locating pools in a process image
//!
//! Everything that changes between game builds lives here so the pool
//! index and decoders stay build-agnostic.

/// Field checks applied to a window read around a pattern hit
#[derive(Debug, Clone, Copy)]
pub struct FieldCheck {
    pub offset: usize,
    pub value: i32,
}

/// How to find and verify the asset pool table
#[derive(Debug, Clone, Copy)]
pub struct PoolTableLocator {
    /// Hex pattern, `??` for wildcards
    pub pattern: &'static str,
    /// Added to the hit address to get the table start
    pub anchor_offset: i64,
    /// Window read starts at hit + window_offset
    pub window_offset: i64,
    pub window_len: usize,
    /// Entry strides expected at fixed offsets of the window
    pub checks: &'static [FieldCheck],
}

/// How to find and verify the string pool
#[derive(Debug, Clone, Copy)]
pub struct StringPoolLocator {
    pub pattern: &'static str,
    pub anchor_offset: i64,
    /// A pointer at hit + backref_offset must equal hit + backref_target
    pub backref_offset: i64,
    pub backref_target: i64,
    /// Size of the pool in bytes
    pub extent: u64,
    /// Distance between consecutive strings
    pub stride: u64,
}

/// Constants for one game build
#[derive(Debug)]
pub struct Profile {
    pub name: &'static str,
    pub process_name: &'static str,
    pub pool_table: PoolTableLocator,
    pub string_pool: StringPoolLocator,
    /// Size of each pool descriptor in the table
    pub descriptor_size: u64,
    /// Pool names in table order
    pub pools: &'static [&'static str],
}

impl Profile {
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool_slot(&self, name: &str) -> Option<usize> {
        self.pools.iter().position(|&pool| pool == name)
    }
}

/// Black Ops III, PC
pub static T7_PC: Profile = Profile {
    name: "t7-pc",
    process_name: "BlackOps3",
    pool_table: PoolTableLocator {
        pattern: "78 00 00 00 13 01 00 00",
        anchor_offset: -8,
        window_offset: -8,
        window_len: 128,
        checks: &[
            FieldCheck {
                offset: 8,
                value: 120,
            },
            FieldCheck {
                offset: 40,
                value: 1680,
            },
            FieldCheck {
                offset: 104,
                value: 248,
            },
        ],
    },
    string_pool: StringPoolLocator {
        pattern: "01 00 00 04 65 6E 5F",
        anchor_offset: -24,
        backref_offset: -1052,
        backref_target: -28,
        extent: 1_811_796,
        stride: 0x1C,
    },
    descriptor_size: 32,
    pools: &T7_POOLS,
};

static T7_POOLS: [&str; 0x6B] = [
    "physpreset",
    "physconstraints",
    "destructibledef",
    "xanim",
    "xmodel",
    "xmodelmesh",
    "material",
    "computeshaderset",
    "techset",
    "image",
    "sound",
    "sound_patch",
    "col_map",
    "com_map",
    "game_map",
    "map_ents",
    "gfx_map",
    "lightdef",
    "lensflaredef",
    "ui_map",
    "font",
    "fonticon",
    "localize",
    "weapon",
    "weapondef",
    "weaponvariant",
    "weaponfull",
    "cgmediatable",
    "playersoundstable",
    "playerfxtable",
    "sharedweaponsounds",
    "attachment",
    "attachmentunique",
    "weaponcamo",
    "customizationtable",
    "customizationtable_feimages",
    "customizationtablecolor",
    "snddriverglobals",
    "fx",
    "tagfx",
    "klf",
    "impactsfxtable",
    "impactsoundstable",
    "player_character",
    "aitype",
    "character",
    "xmodelalias",
    "rawfile",
    "stringtable",
    "structuredtable",
    "leaderboarddef",
    "ddl",
    "glasses",
    "texturelist",
    "scriptparsetree",
    "keyvaluepairs",
    "vehicle",
    "addon_map_ents",
    "tracer",
    "slug",
    "surfacefxtable",
    "surfacesounddef",
    "footsteptable",
    "entityfximpacts",
    "entitysoundimpacts",
    "zbarrier",
    "vehiclefxdef",
    "vehiclesounddef",
    "typeinfo",
    "scriptbundle",
    "scriptbundlelist",
    "rumble",
    "bulletpenetration",
    "locdmgtable",
    "aimtable",
    "animselectortable",
    "animmappingtable",
    "animstatemachine",
    "behaviortree",
    "behaviorstatemachine",
    "ttf",
    "sanim",
    "lightdescription",
    "shellshock",
    "xcam",
    "bgcache",
    "texturecombo",
    "flametable",
    "bitfield",
    "attachmentcosmeticvariant",
    "maptable",
    "maptableloadingimages",
    "medal",
    "medaltable",
    "objective",
    "objectivelist",
    "umbra_tome",
    "navmesh",
    "navvolume",
    "binaryhtml",
    "laser",
    "beam",
    "streamerhint",
    "string",
    "assetlist",
    "report",
    "depend",
];

static PROFILES: [&Profile; 1] = [&T7_PC];

/// Look up a built-in profile by name
pub fn by_name(name: &str) -> Option<&'static Profile> {
    PROFILES.iter().copied().find(|p| p.name == name)
}

pub fn all() -> &'static [&'static Profile] {
    &PROFILES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    #[test]
    fn test_t7_pool_table() {
        assert_eq!(T7_PC.pool_count(), 107);
        assert_eq!(T7_PC.pools[0], "physpreset");
        assert_eq!(T7_PC.pools[106], "depend");
        assert_eq!(T7_PC.pool_slot("localize"), Some(22));
        assert_eq!(T7_PC.pool_slot("xcam"), Some(84));
        assert_eq!(T7_PC.pool_slot("missing"), None);
    }

    #[test]
    fn test_profile_patterns_parse() {
        for profile in all() {
            assert!(Pattern::parse(profile.pool_table.pattern).is_some());
            assert!(Pattern::parse(profile.string_pool.pattern).is_some());
        }
    }

    #[test]
    fn test_by_name() {
        assert!(by_name("t7-pc").is_some());
        assert!(by_name("t8-pc").is_none());
    }
}
