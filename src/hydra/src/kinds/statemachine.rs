//! Animation state machines
//!
//! Three consecutive passes: main states, then every substate, then every
//! transition. Each pass after the first is preceded by an index block
//! that is skipped.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::{Cursor, Record};
use crate::export::ExportTarget;
use crate::json::{to_pretty_string, OrderedMap};
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const STATE_SIZE: usize = 24;
const SUBSTATE_SIZE: usize = 64;
const TRANSITION_SIZE: usize = 48;

/// The two flag words of a substate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
    pub word1: i32,
    pub word2: i32,
}

impl StateFlags {
    pub const REQUIRES_RAGDOLL_NOTETRACK: i32 = 0x2;

    pub const TERMINAL: i32 = 0x1;
    pub const LOOPSYNC: i32 = 0x2;
    pub const MULTIPLEDELTA: i32 = 0x4;
    pub const PARAMETRIC2D: i32 = 0x8;
    pub const CODERATE: i32 = 0x10;
    pub const ALLOW_TRANSDEC_AIM: i32 = 0x20;
    pub const FORCE_FIRE: i32 = 0x40;
    pub const CLEANLOOP: i32 = 0x80;
    pub const ANIMDRIVENLOCOMOTION: i32 = 0x100;
    pub const SPEEDBLEND: i32 = 0x200;

    /// Second-word flags in output order
    const WORD2: [(&'static str, i32); 10] = [
        ("loopsync", Self::LOOPSYNC),
        ("cleanloop", Self::CLEANLOOP),
        ("multipledelta", Self::MULTIPLEDELTA),
        ("terminal", Self::TERMINAL),
        ("parametric2d", Self::PARAMETRIC2D),
        ("animdrivenlocomotion", Self::ANIMDRIVENLOCOMOTION),
        ("coderate", Self::CODERATE),
        ("speedblend", Self::SPEEDBLEND),
        ("allow_transdec_aim", Self::ALLOW_TRANSDEC_AIM),
        ("force_fire", Self::FORCE_FIRE),
    ];

    pub fn has(self, flag: i32) -> bool {
        self.word2 & flag != 0
    }

    pub fn requires_ragdoll_notetrack(self) -> bool {
        self.word1 & Self::REQUIRES_RAGDOLL_NOTETRACK != 0
    }

    /// Names of the set flags, in output order
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::WORD2
            .into_iter()
            .filter(move |&(_, flag)| self.has(flag))
            .map(|(name, _)| name)
            .chain(
                self.requires_ragdoll_notetrack()
                    .then_some("requires_ragdoll_notetrack"),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub animation_selector: String,
}

impl Serialize for Transition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.animation_selector.is_empty() {
            map.serialize_entry("animation_selector", &self.animation_selector)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubState {
    pub animation_selector: String,
    pub aim_selector: String,
    pub shoot_selector: String,
    pub transition_decorator: String,
    pub delta_layer_function: String,
    pub transdec_layer_function: String,
    pub asm_client_notify: String,
    pub flags: StateFlags,
    /// Present when the substate has a transitions pointer
    pub transitions: Option<OrderedMap<Transition>>,
}

impl Serialize for SubState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let strings = [
            ("animation_selector", &self.animation_selector),
            ("transition_decorator", &self.transition_decorator),
            ("aim_selector", &self.aim_selector),
            ("shoot_selector", &self.shoot_selector),
            ("delta_layer_function", &self.delta_layer_function),
            ("transdec_layer_function", &self.transdec_layer_function),
            ("asm_client_notify", &self.asm_client_notify),
        ];

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in strings {
            if !value.is_empty() {
                map.serialize_entry(key, value)?;
            }
        }
        for name in self.flags.names() {
            map.serialize_entry(name, &true)?;
        }
        if let Some(transitions) = &self.transitions {
            map.serialize_entry("transitions", transitions)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MainState {
    pub substates: OrderedMap<SubState>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct StateMachine {
    pub states: OrderedMap<MainState>,
}

/// Substate while decoding, before transitions are attached
struct Pending {
    name: String,
    state: SubState,
    transitions: usize,
}

impl StateMachine {
    /// Decode from `start` given the header's main state and substate counts
    pub fn read(session: &Session, backing: Backing, start: u64, main: usize, substates: usize) -> Result<Self> {
        let mut cursor = Cursor::new(session.source(), start);
        let name = |record: &Record, offset| -> Result<String> {
            Ok(session.string(record.i32_at(offset)?).unwrap_or_default())
        };

        let mut states = Vec::new();
        for _ in 0..main {
            let state = cursor.read_record(STATE_SIZE)?;
            states.push((name(&state, 0)?, state.count_at(16)?));
        }
        cursor.skip(backing.pad_index_block(4 * substates as u64));

        let mut pending: Vec<(String, Vec<Pending>)> = Vec::new();
        let mut total_transitions = 0u64;
        for (state_name, count) in states {
            let mut children = Vec::new();
            for _ in 0..count {
                let record = cursor.read_record(SUBSTATE_SIZE)?;
                let transitions = record.count_at(56)?;
                total_transitions += transitions as u64;

                let present = backing.pointer_present(record.i64_at(48)?);
                children.push(Pending {
                    name: name(&record, 0)?,
                    state: SubState {
                        animation_selector: name(&record, 20)?,
                        aim_selector: name(&record, 24)?,
                        shoot_selector: name(&record, 28)?,
                        transition_decorator: name(&record, 32)?,
                        delta_layer_function: name(&record, 36)?,
                        transdec_layer_function: name(&record, 40)?,
                        asm_client_notify: name(&record, 44)?,
                        flags: StateFlags {
                            word1: record.i32_at(8)?,
                            word2: record.i32_at(12)?,
                        },
                        transitions: present.then(OrderedMap::new),
                    },
                    transitions,
                });
            }
            pending.push((state_name, children));
        }
        cursor.skip(backing.pad_index_block(4 * total_transitions));

        let mut machine = StateMachine::default();
        for (state_name, children) in pending {
            let mut main_state = MainState::default();
            for mut child in children {
                for _ in 0..child.transitions {
                    let record = cursor.read_record(TRANSITION_SIZE)?;
                    let transition = Transition {
                        animation_selector: name(&record, 28)?,
                    };
                    // Transitions without a map to hold them are consumed and dropped
                    if let Some(map) = child.state.transitions.as_mut() {
                        map.insert(name(&record, 0)?, transition);
                    }
                }
                main_state.substates.insert(child.name, child.state);
            }
            machine.states.insert(state_name, main_state);
        }

        Ok(machine)
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::AnimStateMachine,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::States(record.i32_at(32)?),
        )
        .with_payload(record.u64_at(8)?, 0))
    })
}

/// Container header: main state count, 12 bytes, substate count,
/// 20 bytes, then the name with the states after it
pub fn from_container(session: &Session, header: u64) -> Result<Asset> {
    let mut cursor = Cursor::new(session.source(), header);
    cursor.read_i32()?;
    cursor.skip(12);
    let substates = cursor.read_i32()?;
    cursor.skip(20);
    let path = cursor.read_cstring()?;

    Ok(Asset::new(
        AssetKind::AnimStateMachine,
        Backing::Container,
        path,
        header,
        AssetHeader::States(substates),
    )
    .with_payload(cursor.position(), 0))
}

/// Main state and substate counts from the asset's header
fn counts(session: &Session, asset: &Asset) -> Result<(usize, usize)> {
    let (main, sub) = match asset.backing {
        Backing::Process => (16, 32),
        Backing::Container => (0, 16),
    };
    let header = Record::read(session.source(), asset.record, sub + 4)?;
    Ok((header.count_at(main)?, header.count_at(sub)?))
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let (main, substates) = counts(session, asset)?;
    let machine = StateMachine::read(session, asset.backing, asset.start, main, substates)
        .map_err(|e| match e {
            Error::OutOfBounds { address, len } => Error::Decode(format!(
                "state machine {} runs past the end of its data at {:#x} (+{})",
                asset.path, address, len
            )),
            other => other,
        })?;

    target.write(
        &format!("animstatemachines/{}", asset.path),
        to_pretty_string(&machine)?,
    )?;
    Ok(())
}
