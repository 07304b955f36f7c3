use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{EntityId, Result, Value};

/// Resolved node inside an entity's procedural graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle {
    pub entity: EntityId,
    /// Node name, nested group nodes are addressed as `outer.inner`.
    pub path: String,
}

/// Addressable value of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Default value of an input socket.
    Input(usize),
    /// Value held by a constant node (boolean, integer, float, vector or string input).
    Constant,
    /// Sub-graph assigned to a group node.
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeFlag {
    Mute,
    /// Custom color used as an "enabled" marker in the graph editor.
    Highlight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    #[default]
    Normal,
    /// Only emit surface instances, without realizing them.
    SurfacesOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    pub name: String,
}

pub type StableId = i64;

/// Runtime instance index to stable surface id.
pub type EquivalenceMap = BTreeMap<u32, StableId>;

/// The procedural graph engine. Everything here is a black box owned by the host.
pub trait GraphBackend: Send + Sync {
    fn node(&self, entity: EntityId, path: &str) -> Option<NodeHandle>;

    fn read(&self, node: &NodeHandle, slot: Slot) -> Result<Value>;

    fn write(&self, node: &NodeHandle, slot: Slot, value: Value) -> Result<()>;

    fn flag(&self, node: &NodeHandle, flag: NodeFlag) -> Result<bool>;

    fn set_flag(&self, node: &NodeHandle, flag: NodeFlag, on: bool) -> Result<()>;

    fn is_linked(&self, from: &NodeHandle, output: usize, to: &NodeHandle, input: usize)
        -> Result<bool>;

    fn link(&self, from: &NodeHandle, output: usize, to: &NodeHandle, input: usize) -> Result<()>;

    fn set_eval_mode(&self, entity: EntityId, mode: EvalMode) -> Result<()>;

    /// Evaluate the graph and return instances in runtime order.
    fn evaluate_instances(&self, entity: EntityId) -> Result<Vec<InstanceRef>>;

    fn write_equivalence(&self, entity: EntityId, map: &EquivalenceMap) -> Result<()>;
}
