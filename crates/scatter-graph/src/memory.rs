use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use scatter_core::{
    EntityId, EquivalenceMap, EvalMode, GraphBackend, InstanceRef, NodeFlag, NodeHandle, Result,
    ScatterError, Slot, Value,
};

/// Every mutation the in-memory graph accepted, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphWrite {
    Value {
        entity: EntityId,
        path: String,
        slot: Slot,
        value: Value,
    },
    Flag {
        entity: EntityId,
        path: String,
        flag: NodeFlag,
        on: bool,
    },
    Link {
        entity: EntityId,
        from: String,
        to: String,
    },
    Equivalence {
        entity: EntityId,
    },
}

impl GraphWrite {
    pub fn entity(&self) -> EntityId {
        match self {
            GraphWrite::Value { entity, .. }
            | GraphWrite::Flag { entity, .. }
            | GraphWrite::Link { entity, .. }
            | GraphWrite::Equivalence { entity } => *entity,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            GraphWrite::Value { path, .. } | GraphWrite::Flag { path, .. } => Some(path),
            GraphWrite::Link { to, .. } => Some(to),
            GraphWrite::Equivalence { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryNode {
    values: HashMap<Slot, Value>,
    flags: HashSet<NodeFlag>,
}

type LinkKey = (EntityId, String, usize, String, usize);

#[derive(Default)]
struct MemoryState {
    strict: bool,
    nodes: HashMap<(EntityId, String), MemoryNode>,
    links: HashSet<LinkKey>,
    failing: HashSet<(EntityId, String)>,
    eval_modes: HashMap<EntityId, EvalMode>,
    instances: HashMap<EntityId, Vec<InstanceRef>>,
    failing_eval: HashSet<EntityId>,
    equivalence: HashMap<EntityId, EquivalenceMap>,
    log: Vec<GraphWrite>,
    evaluations: usize,
    last_eval_mode: Option<EvalMode>,
}

/// In-memory [`GraphBackend`] that records every write.
///
/// By default any node path resolves; [`MemoryGraph::strict`] only resolves
/// nodes declared with [`MemoryGraph::add_node`].
#[derive(Default)]
pub struct MemoryGraph {
    state: RwLock<MemoryState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        let graph = Self::default();
        graph.state.write().strict = true;
        graph
    }

    pub fn add_node(&self, entity: EntityId, path: &str) {
        self.state
            .write()
            .nodes
            .entry((entity, path.to_string()))
            .or_default();
    }

    /// Make every write touching `path` fail.
    pub fn fail_writes_to(&self, entity: EntityId, path: &str) {
        self.state.write().failing.insert((entity, path.to_string()));
    }

    pub fn accept_writes_to(&self, entity: EntityId, path: &str) {
        self.state
            .write()
            .failing
            .remove(&(entity, path.to_string()));
    }

    pub fn set_instances(&self, entity: EntityId, names: &[&str]) {
        let instances = names
            .iter()
            .map(|n| InstanceRef {
                name: n.to_string(),
            })
            .collect();
        self.state.write().instances.insert(entity, instances);
    }

    pub fn fail_evaluation(&self, entity: EntityId, fail: bool) {
        let mut state = self.state.write();
        if fail {
            state.failing_eval.insert(entity);
        } else {
            state.failing_eval.remove(&entity);
        }
    }

    pub fn writes(&self) -> usize {
        self.state.read().log.len()
    }

    pub fn writes_for(&self, entity: EntityId) -> usize {
        self.state
            .read()
            .log
            .iter()
            .filter(|w| w.entity() == entity)
            .count()
    }

    pub fn write_log(&self) -> Vec<GraphWrite> {
        self.state.read().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.write().log.clear();
    }

    pub fn value(&self, entity: EntityId, path: &str, slot: Slot) -> Option<Value> {
        self.state
            .read()
            .nodes
            .get(&(entity, path.to_string()))
            .and_then(|n| n.values.get(&slot))
            .cloned()
    }

    pub fn has_flag(&self, entity: EntityId, path: &str, flag: NodeFlag) -> bool {
        self.state
            .read()
            .nodes
            .get(&(entity, path.to_string()))
            .map(|n| n.flags.contains(&flag))
            .unwrap_or(false)
    }

    pub fn has_link(&self, entity: EntityId, from: &str, to: &str) -> bool {
        self.state
            .read()
            .links
            .iter()
            .any(|(e, f, _, t, _)| *e == entity && f == from && t == to)
    }

    pub fn eval_mode(&self, entity: EntityId) -> EvalMode {
        self.state
            .read()
            .eval_modes
            .get(&entity)
            .copied()
            .unwrap_or_default()
    }

    /// Mode the graph was in during the most recent evaluation.
    pub fn last_eval_mode(&self) -> Option<EvalMode> {
        self.state.read().last_eval_mode
    }

    pub fn evaluations(&self) -> usize {
        self.state.read().evaluations
    }

    pub fn equivalence(&self, entity: EntityId) -> Option<EquivalenceMap> {
        self.state.read().equivalence.get(&entity).cloned()
    }

    fn check_writable(state: &MemoryState, node: &NodeHandle) -> Result<()> {
        if state.failing.contains(&(node.entity, node.path.clone())) {
            return Err(ScatterError::Graph(format!(
                "node '{}' rejected the write",
                node.path
            )));
        }
        Ok(())
    }
}

impl GraphBackend for MemoryGraph {
    fn node(&self, entity: EntityId, path: &str) -> Option<NodeHandle> {
        let state = self.state.read();
        if state.strict && !state.nodes.contains_key(&(entity, path.to_string())) {
            return None;
        }
        Some(NodeHandle {
            entity,
            path: path.to_string(),
        })
    }

    fn read(&self, node: &NodeHandle, slot: Slot) -> Result<Value> {
        Ok(self
            .value(node.entity, &node.path, slot)
            .unwrap_or(Value::None))
    }

    fn write(&self, node: &NodeHandle, slot: Slot, value: Value) -> Result<()> {
        let mut state = self.state.write();
        Self::check_writable(&state, node)?;
        state
            .nodes
            .entry((node.entity, node.path.clone()))
            .or_default()
            .values
            .insert(slot, value.clone());
        state.log.push(GraphWrite::Value {
            entity: node.entity,
            path: node.path.clone(),
            slot,
            value,
        });
        Ok(())
    }

    fn flag(&self, node: &NodeHandle, flag: NodeFlag) -> Result<bool> {
        Ok(self.has_flag(node.entity, &node.path, flag))
    }

    fn set_flag(&self, node: &NodeHandle, flag: NodeFlag, on: bool) -> Result<()> {
        let mut state = self.state.write();
        Self::check_writable(&state, node)?;
        let flags = &mut state
            .nodes
            .entry((node.entity, node.path.clone()))
            .or_default()
            .flags;
        if on {
            flags.insert(flag);
        } else {
            flags.remove(&flag);
        }
        state.log.push(GraphWrite::Flag {
            entity: node.entity,
            path: node.path.clone(),
            flag,
            on,
        });
        Ok(())
    }

    fn is_linked(
        &self,
        from: &NodeHandle,
        output: usize,
        to: &NodeHandle,
        input: usize,
    ) -> Result<bool> {
        Ok(self.state.read().links.contains(&(
            from.entity,
            from.path.clone(),
            output,
            to.path.clone(),
            input,
        )))
    }

    fn link(&self, from: &NodeHandle, output: usize, to: &NodeHandle, input: usize) -> Result<()> {
        let mut state = self.state.write();
        Self::check_writable(&state, to)?;
        // An input socket accepts a single link.
        state
            .links
            .retain(|(e, _, _, t, i)| !(*e == to.entity && *t == to.path && *i == input));
        state.links.insert((
            from.entity,
            from.path.clone(),
            output,
            to.path.clone(),
            input,
        ));
        state.log.push(GraphWrite::Link {
            entity: to.entity,
            from: from.path.clone(),
            to: to.path.clone(),
        });
        Ok(())
    }

    fn set_eval_mode(&self, entity: EntityId, mode: EvalMode) -> Result<()> {
        self.state.write().eval_modes.insert(entity, mode);
        Ok(())
    }

    fn evaluate_instances(&self, entity: EntityId) -> Result<Vec<InstanceRef>> {
        let mut state = self.state.write();
        state.evaluations += 1;
        let mode = state.eval_modes.get(&entity).copied().unwrap_or_default();
        state.last_eval_mode = Some(mode);
        if state.failing_eval.contains(&entity) {
            return Err(ScatterError::Graph("evaluation failed".to_string()));
        }
        Ok(state.instances.get(&entity).cloned().unwrap_or_default())
    }

    fn write_equivalence(&self, entity: EntityId, map: &EquivalenceMap) -> Result<()> {
        let mut state = self.state.write();
        state.equivalence.insert(entity, map.clone());
        state.log.push(GraphWrite::Equivalence { entity });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_failing_node() {
        let graph = MemoryGraph::new();
        let id = Uuid::new_v4();
        graph.fail_writes_to(id, "s_scale_random");
        let node = graph.node(id, "s_scale_random").unwrap();
        assert!(graph.write(&node, Slot::Input(1), Value::Float(1.0)).is_err());
        assert_eq!(graph.writes(), 0);
    }

    #[test]
    fn test_relink_replaces_input() {
        let graph = MemoryGraph::new();
        let id = Uuid::new_v4();
        let to = graph.node(id, "R").unwrap();
        let a = graph.node(id, "A").unwrap();
        let b = graph.node(id, "B").unwrap();
        graph.link(&a, 0, &to, 0).unwrap();
        graph.link(&b, 0, &to, 0).unwrap();
        assert!(!graph.has_link(id, "A", "R"));
        assert!(graph.has_link(id, "B", "R"));
        assert_eq!(graph.writes_for(id), 2);
    }
}
