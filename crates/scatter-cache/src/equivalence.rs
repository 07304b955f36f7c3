//! Maps runtime surface instance order to stable surface ids for manual distribution.
//!
//! Entries are keyed by entity and invalidated when its surface-name set changes.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, error, trace};

use scatter_core::{
    Entity, EntityId, EquivalenceMap, EvalMode, GraphBackend, ReentryFlag, Result, SceneHost,
    Surface,
};

use crate::{CacheMetrics, CacheStats};

/// Distribution method whose points are painted per surface.
pub const MANUAL_ALL: &str = "manual_all";

/// Order-independent hash of a surface-name set.
pub fn surface_set_hash(surfaces: &[Surface]) -> u64 {
    let names: BTreeSet<&str> = surfaces.iter().map(|s| s.name.as_str()).collect();
    let mut hasher = FxHasher::default();
    names.len().hash(&mut hasher);
    for name in names {
        name.hash(&mut hasher);
    }
    hasher.finish()
}

#[derive(Debug, Clone)]
pub struct EquivalenceEntry {
    pub surface_hash: u64,
    pub map: Arc<EquivalenceMap>,
}

/// Puts the entity's graph back into normal evaluation when dropped.
struct EvalModeGuard<'a> {
    graph: &'a dyn GraphBackend,
    entity: EntityId,
}

impl<'a> EvalModeGuard<'a> {
    fn enter(graph: &'a dyn GraphBackend, entity: EntityId, mode: EvalMode) -> Result<Self> {
        graph.set_eval_mode(entity, mode)?;
        Ok(Self { graph, entity })
    }
}

impl Drop for EvalModeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.graph.set_eval_mode(self.entity, EvalMode::Normal) {
            error!(entity = %self.entity, error = %e, "failed to restore evaluation mode");
        }
    }
}

pub struct SurfaceEquivalenceCache {
    host: Arc<dyn SceneHost>,
    graph: Arc<dyn GraphBackend>,
    entries: DashMap<EntityId, EquivalenceEntry>,
    rebuilding: ReentryFlag,
    metrics: CacheMetrics,
}

impl SurfaceEquivalenceCache {
    pub fn new(host: Arc<dyn SceneHost>, graph: Arc<dyn GraphBackend>) -> Self {
        Self {
            host,
            graph,
            entries: DashMap::new(),
            rebuilding: ReentryFlag::new(),
            metrics: CacheMetrics::new(),
        }
    }

    /// Current runtime-index to stable-id map of `entity`, recomputed only when
    /// its surface set changed since the last call.
    pub fn get_equivalence(&self, entity: &Entity) -> Result<Arc<EquivalenceMap>> {
        let surfaces = self.host.surfaces(entity.id);
        let hash = surface_set_hash(&surfaces);

        if let Some(entry) = self.entries.get(&entity.id) {
            if entry.surface_hash == hash {
                self.metrics.record_hit();
                return Ok(entry.map.clone());
            }
        }
        self.metrics.record_miss();

        let map = Arc::new(self.compute(entity, &surfaces)?);
        self.entries.insert(
            entity.id,
            EquivalenceEntry {
                surface_hash: hash,
                map: map.clone(),
            },
        );
        Ok(map)
    }

    fn compute(&self, entity: &Entity, surfaces: &[Surface]) -> Result<EquivalenceMap> {
        if surfaces.is_empty() {
            trace!(entity = %entity.name, "no surfaces, empty equivalence");
            return Ok(EquivalenceMap::new());
        }
        self.metrics.record_recompute();

        let instances = {
            let _mode =
                EvalModeGuard::enter(self.graph.as_ref(), entity.id, EvalMode::SurfacesOnly)?;
            self.graph.evaluate_instances(entity.id)?
        };

        let ids: HashMap<&str, i64> = surfaces
            .iter()
            .map(|s| (s.name.as_str(), s.stable_id))
            .collect();
        let map: EquivalenceMap = instances
            .iter()
            .filter_map(|instance| ids.get(instance.name.as_str()).copied())
            .enumerate()
            .map(|(idx, stable_id)| (idx as u32, stable_id))
            .collect();

        self.graph.write_equivalence(entity.id, &map)?;
        debug!(entity = %entity.name, surfaces = map.len(), "surface equivalence rebuilt");
        Ok(map)
    }

    pub fn flush(&self, entity: EntityId) -> bool {
        let removed = self.entries.remove(&entity).is_some();
        if removed {
            self.metrics.record_flush();
        }
        removed
    }

    pub fn flush_all(&self) {
        if !self.entries.is_empty() {
            self.metrics.record_flush();
        }
        self.entries.clear();
    }

    pub fn cached(&self, entity: EntityId) -> Option<EquivalenceEntry> {
        self.entries.get(&entity).map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Bring every visible `manual_all` system up to date with its surfaces.
    /// Returns how many systems were checked.
    pub fn refresh_manual_surfaces(&self) -> Result<usize> {
        let Some(_guard) = self.rebuilding.try_enter() else {
            trace!("surface refresh already running");
            return Ok(0);
        };
        let mut checked = 0;
        for entity in self.host.entities() {
            if entity.is_group() {
                continue;
            }
            let hidden = self
                .host
                .read_property(entity.id, "hide_viewport")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let method = self.host.read_property(entity.id, "s_distribution_method");
            if hidden || method.as_ref().and_then(|v| v.as_str()) != Some(MANUAL_ALL) {
                continue;
            }
            self.get_equivalence(&entity)?;
            checked += 1;
        }
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_core::{MemoryScene, Value};
    use scatter_graph::MemoryGraph;

    fn setup() -> (Arc<MemoryScene>, Arc<MemoryGraph>, SurfaceEquivalenceCache) {
        let scene = Arc::new(MemoryScene::new());
        let graph = Arc::new(MemoryGraph::new());
        let cache = SurfaceEquivalenceCache::new(scene.clone(), graph.clone());
        (scene, graph, cache)
    }

    #[test]
    fn test_hash_ignores_order() {
        let a = [Surface::new("Rock", 1), Surface::new("Cliff", 2)];
        let b = [Surface::new("Cliff", 2), Surface::new("Rock", 1)];
        assert_eq!(surface_set_hash(&a), surface_set_hash(&b));
        assert_ne!(surface_set_hash(&a), surface_set_hash(&a[..1]));
    }

    #[test]
    fn test_runtime_order_is_enumerated() {
        let (scene, graph, cache) = setup();
        let entity = Entity::scatter("Moss", "Rock");
        scene.add_entity(entity.clone());
        scene.set_surfaces(
            entity.id,
            vec![Surface::new("Rock", 11), Surface::new("Cliff", 22)],
        );
        graph.set_instances(entity.id, &["Cliff", "Moss", "Rock"]);

        let map = cache.get_equivalence(&entity).unwrap();
        assert_eq!(map.get(&0), Some(&22));
        assert_eq!(map.get(&1), Some(&11));
        assert_eq!(map.len(), 2);
        assert_eq!(graph.last_eval_mode(), Some(EvalMode::SurfacesOnly));
        assert_eq!(graph.eval_mode(entity.id), EvalMode::Normal);
        assert_eq!(graph.equivalence(entity.id).as_ref(), Some(map.as_ref()));
    }

    #[test]
    fn test_zero_surfaces() {
        let (scene, graph, cache) = setup();
        let entity = Entity::scatter("Moss", "Rock");
        scene.add_entity(entity.clone());
        let map = cache.get_equivalence(&entity).unwrap();
        assert!(map.is_empty());
        assert_eq!(graph.evaluations(), 0);
    }

    #[test]
    fn test_eval_mode_restored_on_failure() {
        let (scene, graph, cache) = setup();
        let entity = Entity::scatter("Moss", "Rock");
        scene.add_entity(entity.clone());
        scene.set_surfaces(entity.id, vec![Surface::new("Rock", 1)]);
        graph.fail_evaluation(entity.id, true);

        assert!(cache.get_equivalence(&entity).is_err());
        assert_eq!(graph.eval_mode(entity.id), EvalMode::Normal);
        assert!(cache.cached(entity.id).is_none());
    }

    #[test]
    fn test_refresh_only_visible_manual_systems() {
        let (scene, graph, cache) = setup();
        let manual = scene.add_entity(Entity::scatter("Manual", "Rock"));
        scene.set(manual, "s_distribution_method", Value::Enum(MANUAL_ALL.into()));
        scene.set_surfaces(manual, vec![Surface::new("Rock", 1)]);
        let hidden = scene.add_entity(Entity::scatter("Hidden", "Rock"));
        scene.set(hidden, "s_distribution_method", Value::Enum(MANUAL_ALL.into()));
        scene.set(hidden, "hide_viewport", true);
        let random = scene.add_entity(Entity::scatter("Random", "Rock"));
        scene.set(random, "s_distribution_method", Value::Enum("random".into()));

        assert_eq!(cache.refresh_manual_surfaces().unwrap(), 1);
        assert_eq!(graph.evaluations(), 1);
        assert_eq!(cache.refresh_manual_surfaces().unwrap(), 1);
        assert_eq!(graph.evaluations(), 1);
        assert_eq!(cache.len(), 1);
    }
}
