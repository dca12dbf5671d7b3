//! Behavior trees
//!
//! Nodes are 72-byte records in pre-order: each node is followed directly
//! by its children. The decoded tree is an arena indexed by [`NodeId`].

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::{Cursor, Record};
use crate::export::ExportTarget;
use crate::json::to_pretty_string;
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const NODE_SIZE: usize = 72;

/// Deepest nesting accepted when decoding
pub const MAX_DEPTH: usize = 256;

const NODE_TYPES: [&str; 14] = [
    "action",
    "condition_blackboard",
    "condition_script",
    "condition_script_negate",
    "condition_service_script",
    "decorator_random",
    "decorator_script",
    "decorator_timer",
    "parallel",
    "sequence",
    "selector",
    "probability_selector",
    "behavior_state_machine",
    "link_node",
];

pub fn type_name(index: i32) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|i| NODE_TYPES.get(i))
        .map_or_else(|| format!("BT_UNKNOWN_TYPE_INDEX: {}", index), |s| s.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub usize);

/// Type-specific fields
#[derive(Debug, Clone, PartialEq)]
pub enum NodeFields {
    Action {
        asm_state_name: Option<String>,
        action_name: Option<String>,
        action_notify: Option<String>,
        start_function: Option<String>,
        update_function: Option<String>,
        terminate_function: Option<String>,
        looping_action: i32,
        action_time_max: i32,
    },
    Condition {
        script_function: Option<String>,
        interrupt_name: Option<String>,
        cooldown_min: i32,
        cooldown_max: i32,
    },
    Chance {
        percent_chance: f32,
    },
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unset when the string index does not resolve
    pub id: Option<String>,
    pub node_type: String,
    pub index: i32,
    pub parent: i32,
    pub fields: NodeFields,
    /// Present when the record has a children pointer or declares children
    pub children: Option<Vec<NodeId>>,
}

impl Node {
    /// Decode one record; returns the node and its declared child count
    fn read(session: &Session, backing: Backing, record: &Record) -> Result<(Self, usize)> {
        let string = |slot: usize| -> Result<Option<String>> {
            Ok(session.string(record.i32_at(28 + slot * 4)?))
        };

        let type_index = record.i32_at(4)?;
        let fields = match type_index {
            0 | 12 => NodeFields::Action {
                asm_state_name: string(3)?,
                action_name: string(4)?,
                action_notify: string(5)?,
                start_function: string(6)?,
                update_function: string(7)?,
                terminate_function: string(8)?,
                looping_action: record.i32_at(64)?,
                action_time_max: record.i32_at(68)?,
            },
            1..=4 => NodeFields::Condition {
                script_function: string(6)?,
                interrupt_name: string(7)?,
                cooldown_min: record.i32_at(64)?,
                cooldown_max: record.i32_at(68)?,
            },
            5 | 11 => NodeFields::Chance {
                percent_chance: record.f32_at(64)?,
            },
            _ => NodeFields::None,
        };

        let count = record.count_at(24)?;
        let has_children = backing.pointer_present(record.i64_at(16)?) || count > 0;

        let node = Node {
            id: session.string(record.i32_at(0)?),
            node_type: type_name(type_index),
            index: record.i32_at(8)?,
            parent: record.i32_at(12)?,
            fields,
            children: has_children.then(Vec::new),
        };
        Ok((node, count))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorTree {
    pub nodes: Vec<Node>,
}

impl BehaviorTree {
    pub const ROOT: NodeId = NodeId(0);

    /// Decode the tree at `start`, reading at most `limit` nodes
    pub fn read(session: &Session, backing: Backing, start: u64, limit: usize) -> Result<Self> {
        let mut cursor = Cursor::new(session.source(), start);
        let mut next = || -> Result<(Node, usize)> {
            let record = cursor.read_record(NODE_SIZE)?;
            Node::read(session, backing, &record)
        };

        let (root, count) = next()?;
        let mut nodes = vec![root];
        // (parent, children still to read)
        let mut stack = vec![(0usize, count)];

        while let Some(top) = stack.last_mut() {
            if top.1 == 0 {
                stack.pop();
                continue;
            }
            top.1 -= 1;
            let parent = top.0;

            if nodes.len() >= limit {
                return Err(Error::Decode(format!(
                    "behavior tree has more than {} nodes",
                    limit
                )));
            }
            if stack.len() >= MAX_DEPTH {
                return Err(Error::Decode(format!(
                    "behavior tree nests deeper than {}",
                    MAX_DEPTH
                )));
            }

            let (node, count) = next()?;
            let id = NodeId(nodes.len());
            nodes.push(node);
            if let Some(children) = nodes[parent].children.as_mut() {
                children.push(id);
            }
            if count > 0 {
                stack.push((id.0, count));
            }
        }

        Ok(Self { nodes })
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Write a string entry only when it resolved
fn string_entry<M: SerializeMap>(map: &mut M, key: &str, value: &Option<String>) -> std::result::Result<(), M::Error> {
    match value {
        Some(value) => map.serialize_entry(key, value),
        None => Ok(()),
    }
}

/// Serializes one node and its subtree
struct NodeView<'a> {
    tree: &'a BehaviorTree,
    node: &'a Node,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let node = self.node;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &node.node_type)?;
        string_entry(&mut map, "id", &node.id)?;

        match &node.fields {
            NodeFields::Action {
                asm_state_name,
                action_name,
                action_notify,
                start_function,
                update_function,
                terminate_function,
                looping_action,
                action_time_max,
            } => {
                string_entry(&mut map, "ActionName", action_name)?;
                string_entry(&mut map, "ASMStateName", asm_state_name)?;
                string_entry(&mut map, "actionNotify", action_notify)?;
                string_entry(&mut map, "StartFunction", start_function)?;
                string_entry(&mut map, "TerminateFunction", terminate_function)?;
                string_entry(&mut map, "UpdateFunction", update_function)?;
                map.serialize_entry("loopingAction", looping_action)?;
                map.serialize_entry("actionTimeMax", action_time_max)?;
            }
            NodeFields::Condition {
                script_function,
                interrupt_name,
                cooldown_min,
                cooldown_max,
            } => {
                string_entry(&mut map, "scriptFunction", script_function)?;
                string_entry(&mut map, "interruptName", interrupt_name)?;
                map.serialize_entry("cooldownMin", cooldown_min)?;
                map.serialize_entry("cooldownMax", cooldown_max)?;
            }
            NodeFields::Chance { percent_chance } => {
                map.serialize_entry("percentChance", percent_chance)?;
            }
            NodeFields::None => {}
        }

        if let Some(children) = &node.children {
            let views: Vec<_> = children
                .iter()
                .filter_map(|&id| self.tree.node(id))
                .map(|node| NodeView {
                    tree: self.tree,
                    node,
                })
                .collect();
            map.serialize_entry("children", &views)?;
        }
        map.end()
    }
}

impl Serialize for BehaviorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.node(Self::ROOT) {
            Some(node) => NodeView { tree: self, node }.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::BehaviorTree,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::Behaviors(record.i32_at(16)?),
        )
        .with_payload(record.u64_at(8)?, 0))
    })
}

/// Container header: node count, 20 bytes, then the name with the nodes
/// after it
pub fn from_container(session: &Session, header: u64) -> Result<Asset> {
    let mut cursor = Cursor::new(session.source(), header);
    let count = cursor.read_i32()?;
    cursor.skip(20);
    let path = cursor.read_cstring()?;

    Ok(Asset::new(
        AssetKind::BehaviorTree,
        Backing::Container,
        path,
        header,
        AssetHeader::Behaviors(count),
    )
    .with_payload(cursor.position(), 0))
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let AssetHeader::Behaviors(count) = asset.header else {
        return Err(Error::Decode(format!("{} has no node count", asset.path)));
    };
    let limit = usize::try_from(count).unwrap_or(0).max(1);

    let tree = BehaviorTree::read(session, asset.backing, asset.start, limit)?;
    target.write(&format!("behavior/{}", asset.path), to_pretty_string(&tree)?)?;
    Ok(())
}
