//! Asset catalog entries

use std::fmt;

/// Asset kinds that can be listed and exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    PhysPreset,
    MapEnts,
    Localize,
    WeaponCamo,
    RawFile,
    StringTable,
    StructuredTable,
    ScriptParseTree,
    Rumble,
    AnimSelectorTable,
    AnimMappingTable,
    AnimStateMachine,
    BehaviorTree,
    XCam,
}

impl AssetKind {
    pub const ALL: [AssetKind; 14] = [
        AssetKind::PhysPreset,
        AssetKind::MapEnts,
        AssetKind::Localize,
        AssetKind::WeaponCamo,
        AssetKind::RawFile,
        AssetKind::StringTable,
        AssetKind::StructuredTable,
        AssetKind::ScriptParseTree,
        AssetKind::Rumble,
        AssetKind::AnimSelectorTable,
        AssetKind::AnimMappingTable,
        AssetKind::AnimStateMachine,
        AssetKind::BehaviorTree,
        AssetKind::XCam,
    ];

    /// Pool name, also used as the kind's display and config name
    pub fn name(self) -> &'static str {
        match self {
            AssetKind::PhysPreset => "physpreset",
            AssetKind::MapEnts => "map_ents",
            AssetKind::Localize => "localize",
            AssetKind::WeaponCamo => "weaponcamo",
            AssetKind::RawFile => "rawfile",
            AssetKind::StringTable => "stringtable",
            AssetKind::StructuredTable => "structuredtable",
            AssetKind::ScriptParseTree => "scriptparsetree",
            AssetKind::Rumble => "rumble",
            AssetKind::AnimSelectorTable => "animselectortable",
            AssetKind::AnimMappingTable => "animmappingtable",
            AssetKind::AnimStateMachine => "animstatemachine",
            AssetKind::BehaviorTree => "behaviortree",
            AssetKind::XCam => "xcam",
        }
    }

    pub fn from_pool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an asset was found, which fixes how its records are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backing {
    Process,
    Container,
}

impl Backing {
    /// Whether an inline pointer field marks present data.
    ///
    /// Live records hold real pointers; serialized records hold -1 where
    /// the data follows inline.
    pub fn pointer_present(self, raw: i64) -> bool {
        match self {
            Backing::Process => raw > 0,
            Backing::Container => raw == -1,
        }
    }

    /// Size of an index block of `bytes`, including alignment padding
    pub fn pad_index_block(self, bytes: u64) -> u64 {
        match self {
            Backing::Process => bytes + bytes % 8,
            Backing::Container => bytes,
        }
    }
}

/// Counts read from an asset's header during enumeration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssetHeader {
    Size(u64),
    Mass(f64),
    Rumble { duration_ms: i32 },
    XCam { frames: i32, framerate: i32 },
    Table { columns: i32, rows: i32 },
    Structured { entries: i32, properties: i32 },
    Entries(i64),
    Selectors(i32),
    States(i32),
    Behaviors(i32),
    Strings(u32),
    Camos(i32),
}

impl AssetHeader {
    pub fn info(&self) -> String {
        match *self {
            AssetHeader::Size(bytes) => format!("Size - {:.2}KB", bytes as f64 / 1024.0),
            AssetHeader::Mass(mass) => format!("Mass - {:.2}", mass),
            AssetHeader::Rumble { duration_ms } => format!("Duration - {}ms", duration_ms),
            AssetHeader::XCam { frames, framerate } => {
                format!("Frames - {}, Framerate - {}", frames, framerate)
            }
            AssetHeader::Table { columns, rows } => {
                format!("Columns - {} Rows - {}", columns, rows)
            }
            AssetHeader::Structured {
                entries,
                properties,
            } => format!("Entries - {} Properties - {}", entries, properties),
            AssetHeader::Entries(n) => format!("Entries - {}", n),
            AssetHeader::Selectors(n) => format!("Selectors - {}", n),
            AssetHeader::States(n) => format!("States - {}", n),
            AssetHeader::Behaviors(n) => format!("Behaviors - {}", n),
            AssetHeader::Strings(n) => format!("Strings - {}", n),
            AssetHeader::Camos(n) => format!("Camos - {}", n),
        }
    }
}

/// A listed asset.
///
/// Holds only locations and header counts; exporting reads and decodes
/// the record again.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// File name part of the path
    pub name: String,
    pub path: String,
    pub kind: AssetKind,
    pub backing: Backing,
    /// Pool entry or pool descriptor address, or header offset in a container
    pub record: u64,
    /// Start of the asset's payload, where it has one
    pub start: u64,
    pub size: u64,
    pub header: AssetHeader,
}

impl Asset {
    pub fn new(kind: AssetKind, backing: Backing, path: String, record: u64, header: AssetHeader) -> Self {
        Self {
            name: display_name(&path).to_string(),
            path,
            kind,
            backing,
            record,
            start: 0,
            size: 0,
            header,
        }
    }

    pub fn with_payload(mut self, start: u64, size: u64) -> Self {
        self.start = start;
        self.size = size;
        self
    }

    pub fn info(&self) -> String {
        self.header.info()
    }

    /// True when any whitespace separated term occurs in the path.
    ///
    /// An empty filter matches everything.
    pub fn matches(&self, filter: &str) -> bool {
        let mut terms = filter.split_whitespace().peekable();
        terms.peek().is_none() || terms.any(|term| self.path.contains(term))
    }
}

/// Last path component, split on either separator
pub fn display_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Stable sort by kind name, as presented to users
pub fn sort_by_kind(assets: &mut [Asset]) {
    assets.sort_by(|a, b| a.kind.name().cmp(b.kind.name()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(kind: AssetKind, path: &str) -> Asset {
        Asset::new(kind, Backing::Process, path.to_string(), 0, AssetHeader::Size(0))
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in AssetKind::ALL {
            assert_eq!(AssetKind::from_pool_name(kind.name()), Some(kind));
        }
        assert_eq!(AssetKind::from_pool_name("xmodel"), None);
        assert_eq!(AssetKind::XCam.to_string(), "xcam");
    }

    #[test]
    fn test_backing_conventions() {
        assert!(Backing::Process.pointer_present(0x1400_0000));
        assert!(!Backing::Process.pointer_present(-1));
        assert!(Backing::Container.pointer_present(-1));
        assert!(!Backing::Container.pointer_present(0x1400_0000));

        assert_eq!(Backing::Process.pad_index_block(12), 16);
        assert_eq!(Backing::Process.pad_index_block(16), 16);
        assert_eq!(Backing::Container.pad_index_block(12), 12);
    }

    #[test]
    fn test_header_info() {
        assert_eq!(AssetHeader::Size(2048).info(), "Size - 2.00KB");
        assert_eq!(AssetHeader::Mass(12.5).info(), "Mass - 12.50");
        assert_eq!(
            AssetHeader::Table {
                columns: 3,
                rows: 2
            }
            .info(),
            "Columns - 3 Rows - 2"
        );
        assert_eq!(
            AssetHeader::XCam {
                frames: 120,
                framerate: 30
            }
            .info(),
            "Frames - 120, Framerate - 30"
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("scripts/zm/_zm.gsc"), "_zm.gsc");
        assert_eq!(display_name("animtables\\zombie.ai_am"), "zombie.ai_am");
        assert_eq!(display_name("plain"), "plain");
    }

    #[test]
    fn test_matches_filter() {
        let a = asset(AssetKind::RawFile, "scripts/zm/_zm_weapons.gsc");
        assert!(a.matches(""));
        assert!(a.matches("   "));
        assert!(a.matches("weapons"));
        assert!(a.matches("nothing zm/"));
        assert!(!a.matches("mp/ cp/"));
    }

    #[test]
    fn test_sort_by_kind_is_stable() {
        let mut assets = vec![
            asset(AssetKind::XCam, "b"),
            asset(AssetKind::RawFile, "z"),
            asset(AssetKind::AnimMappingTable, "m"),
            asset(AssetKind::RawFile, "a"),
        ];
        sort_by_kind(&mut assets);
        let order: Vec<_> = assets.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(order, vec!["m", "z", "a", "b"]);
    }
}
