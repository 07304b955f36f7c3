use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use scatter_core::{
    CameraState, Entity, GraphBackend, ReentryFlag, Result, SceneHost, Value,
};
use scatter_graph::GraphOps;

use crate::{CacheMetrics, CacheStats};

pub const CAM_LOCATION_NODE: &str = "s_cam_location";
pub const CAM_ROTATION_NODE: &str = "s_cam_rotation_euler";
pub const CAM_INFOS_NODE: &str = "s_cam_infos";
pub const CAM_VISIBILITY_NODES: [&str; 2] = ["s_visibility_cam", "s_visibility_cam_predist"];
pub const SCALE_FADING_NODE: &str = "s_scale_fading";

/// Hash over everything a camera-dependent graph consumes.
pub fn camera_hash(camera: &CameraState) -> u64 {
    let mut hasher = FxHasher::default();
    for v in camera.location.iter().chain(camera.rotation.iter()) {
        hasher.write_u64(v.to_bits());
    }
    hasher.write_u64(camera.effective_sensor().to_bits());
    hasher.write_i64(camera.sensor_fit.index());
    hasher.write_u64(camera.lens.to_bits());
    for v in camera.shift.iter().chain(camera.boost.iter()) {
        hasher.write_u64(v.to_bits());
    }
    hasher.write_u32(camera.resolution[0]);
    hasher.write_u32(camera.resolution[1]);
    let d = &camera.distances;
    for v in [d.visibility_min, d.visibility_max, d.fading_min, d.fading_max] {
        hasher.write_u64(v.to_bits());
    }
    hasher.finish()
}

/// Hash of location and rotation only, used to detect a camera that stopped moving.
pub fn transform_hash(camera: &CameraState) -> u64 {
    let mut hasher = FxHasher::default();
    for v in camera.location.iter().chain(camera.rotation.iter()) {
        hasher.write_u64(v.to_bits());
    }
    hasher.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A camera update is already running further up the stack.
    Reentrant,
    NoCamera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Unchanged,
    Updated { entities: usize, writes: usize },
    Skipped(SkipReason),
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraCacheEntry {
    pub hash: Option<u64>,
    pub last_applied: Option<CameraState>,
}

fn flag(host: &dyn SceneHost, entity: &Entity, property: &str) -> bool {
    host.read_property(entity.id, property)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn text(host: &dyn SceneHost, entity: &Entity, property: &str) -> String {
    host.read_property(entity.id, property)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Whether any enabled feature of `entity` reads camera data.
pub fn is_camera_dependent(host: &dyn SceneHost, entity: &Entity) -> bool {
    flag(host, entity, "s_visibility_cam_allow")
        || flag(host, entity, "s_scale_fading_allow")
        || (flag(host, entity, "s_display_allow") && flag(host, entity, "s_display_camdist_allow"))
        || (flag(host, entity, "s_rot_align_y_allow")
            && text(host, entity, "s_rot_align_y_method") == "meth_align_y_camera")
        || (flag(host, entity, "s_rot_align_z_allow")
            && text(host, entity, "s_rot_align_z_method") == "meth_align_z_camera")
}

/// Process-wide memo of the last camera pushed into the scatter graphs.
pub struct CameraCache {
    host: Arc<dyn SceneHost>,
    graph: Arc<dyn GraphBackend>,
    entry: Mutex<CameraCacheEntry>,
    updating: ReentryFlag,
    metrics: CacheMetrics,
}

impl CameraCache {
    pub fn new(host: Arc<dyn SceneHost>, graph: Arc<dyn GraphBackend>) -> Self {
        Self {
            host,
            graph,
            entry: Mutex::new(CameraCacheEntry::default()),
            updating: ReentryFlag::new(),
            metrics: CacheMetrics::new(),
        }
    }

    pub fn entry(&self) -> CameraCacheEntry {
        self.entry.lock().clone()
    }

    /// Forget the cached hash so the next update reaches the graph.
    pub fn reset(&self) {
        let mut entry = self.entry.lock();
        if entry.hash.take().is_some() {
            self.metrics.record_flush();
        }
    }

    /// True when the host camera matches what was last pushed.
    pub fn is_current(&self) -> bool {
        match self.host.active_camera() {
            Some(camera) => self.entry.lock().hash == Some(camera_hash(&camera)),
            None => true,
        }
    }

    pub fn is_updating(&self) -> bool {
        self.updating.is_active()
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    pub fn maybe_update_camera(&self, force: bool) -> UpdateOutcome {
        let Some(_guard) = self.updating.try_enter() else {
            debug!("camera update already running, skipped");
            return UpdateOutcome::Skipped(SkipReason::Reentrant);
        };
        let Some(camera) = self.host.active_camera() else {
            trace!("no active camera");
            return UpdateOutcome::Skipped(SkipReason::NoCamera);
        };

        let hash = camera_hash(&camera);
        {
            let mut entry = self.entry.lock();
            if !force && entry.hash == Some(hash) {
                self.metrics.record_hit();
                return UpdateOutcome::Unchanged;
            }
            self.metrics.record_miss();
        }
        self.metrics.record_recompute();

        let mut entities = 0;
        let mut writes = 0;
        let mut failed = 0;
        for entity in self.host.entities() {
            if entity.is_group() || !is_camera_dependent(self.host.as_ref(), &entity) {
                continue;
            }
            if flag(self.host.as_ref(), &entity, "hide_viewport") {
                trace!(entity = %entity.name, "hidden, camera push skipped");
                continue;
            }
            match self.push_camera(&entity, &camera) {
                Ok(count) => {
                    entities += 1;
                    writes += count;
                }
                Err(e) => {
                    warn!(entity = %entity.name, error = %e, "camera push failed");
                    failed += 1;
                }
            }
        }

        // The hash is only cached once every dependent graph holds this camera.
        {
            let mut entry = self.entry.lock();
            if failed == 0 {
                entry.hash = Some(hash);
                entry.last_applied = Some(camera);
            } else {
                entry.hash = None;
            }
        }

        info!(entities, writes, force, "camera pushed to scatter graphs");
        UpdateOutcome::Updated { entities, writes }
    }

    fn push_camera(&self, entity: &Entity, camera: &CameraState) -> Result<usize> {
        let ops = GraphOps::new(self.graph.as_ref(), entity)?;
        let host = self.host.as_ref();
        let mut writes = 0;
        let mut count = |changed: bool| writes += changed as usize;

        count(ops.set_constant(CAM_LOCATION_NODE, Value::Vector(camera.location))?);
        count(ops.set_constant(CAM_ROTATION_NODE, Value::Vector(camera.rotation))?);

        if flag(host, entity, "s_visibility_camclip_allow")
            && flag(host, entity, "s_visibility_camclip_cam_autofill")
        {
            let inputs: [(usize, Value); 9] = [
                (0, camera.effective_sensor().into()),
                (1, camera.lens.into()),
                (2, camera.shift[0].into()),
                (3, camera.shift[1].into()),
                (4, Value::Int(camera.resolution[0] as i64)),
                (5, Value::Int(camera.resolution[1] as i64)),
                (6, camera.boost[0].into()),
                (7, camera.boost[1].into()),
                (8, Value::Int(camera.sensor_fit.index())),
            ];
            for (idx, value) in inputs {
                count(ops.set_input(CAM_INFOS_NODE, idx, value)?);
            }
        }

        if flag(host, entity, "s_visibility_camdist_allow")
            && flag(host, entity, "s_visibility_camdist_per_cam_data")
        {
            for node in CAM_VISIBILITY_NODES {
                count(ops.set_input(node, 9, camera.distances.visibility_min)?);
                count(ops.set_input(node, 10, camera.distances.visibility_max)?);
            }
        }

        if flag(host, entity, "s_scale_fading_allow")
            && flag(host, entity, "s_scale_fading_per_cam_data")
        {
            count(ops.set_input(SCALE_FADING_NODE, 3, camera.distances.fading_min)?);
            count(ops.set_input(SCALE_FADING_NODE, 4, camera.distances.fading_max)?);
        }

        Ok(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scatter_core::{MemoryScene, Slot};
    use scatter_graph::MemoryGraph;

    fn setup() -> (Arc<MemoryScene>, Arc<MemoryGraph>, CameraCache) {
        let scene = Arc::new(MemoryScene::new());
        let graph = Arc::new(MemoryGraph::new());
        let cache = CameraCache::new(scene.clone(), graph.clone());
        (scene, graph, cache)
    }

    #[test]
    fn test_hash_covers_intrinsics() {
        let a = CameraState::default();
        let mut b = a.clone();
        b.lens = 35.0;
        assert_ne!(camera_hash(&a), camera_hash(&b));
        assert_eq!(transform_hash(&a), transform_hash(&b));
        b.location[2] = 1.0;
        assert_ne!(transform_hash(&a), transform_hash(&b));
    }

    #[test]
    fn test_no_camera_is_skipped() {
        let (_scene, graph, cache) = setup();
        assert_eq!(
            cache.maybe_update_camera(false),
            UpdateOutcome::Skipped(SkipReason::NoCamera)
        );
        assert_eq!(graph.writes(), 0);
    }

    #[test]
    fn test_reentrant_call_is_skipped() {
        let (scene, _graph, cache) = setup();
        scene.set_camera(Some(CameraState::default()));
        let _guard = cache.updating.try_enter();
        assert_eq!(
            cache.maybe_update_camera(true),
            UpdateOutcome::Skipped(SkipReason::Reentrant)
        );
    }

    #[test]
    fn test_camclip_autofill_writes_intrinsics() {
        let (scene, graph, cache) = setup();
        let id = scene.add_entity(Entity::scatter("Trees", "Terrain"));
        scene.set(id, "s_visibility_cam_allow", true);
        scene.set(id, "s_visibility_camclip_allow", true);
        scene.set(id, "s_visibility_camclip_cam_autofill", true);
        let camera = CameraState {
            lens: 85.0,
            ..CameraState::default()
        };
        scene.set_camera(Some(camera));

        assert!(cache.maybe_update_camera(false).is_updated());
        assert_eq!(
            graph.value(id, CAM_INFOS_NODE, Slot::Input(1)),
            Some(Value::Float(85.0))
        );
        assert_eq!(
            graph.value(id, CAM_INFOS_NODE, Slot::Input(4)),
            Some(Value::Int(1920))
        );
    }

    #[test]
    fn test_hidden_and_independent_entities_untouched() {
        let (scene, graph, cache) = setup();
        let hidden = scene.add_entity(Entity::scatter("Hidden", "Terrain"));
        scene.set(hidden, "s_scale_fading_allow", true);
        scene.set(hidden, "hide_viewport", true);
        let plain = scene.add_entity(Entity::scatter("Plain", "Terrain"));
        scene.set_camera(Some(CameraState::default()));

        assert_eq!(
            cache.maybe_update_camera(false),
            UpdateOutcome::Updated {
                entities: 0,
                writes: 0
            }
        );
        assert_eq!(graph.writes_for(hidden), 0);
        assert_eq!(graph.writes_for(plain), 0);
    }

    #[test]
    fn test_failed_push_is_retried() {
        let (scene, graph, cache) = setup();
        let id = scene.add_entity(Entity::scatter("Trees", "Terrain"));
        scene.set(id, "s_scale_fading_allow", true);
        let camera = CameraState {
            location: [4.0, -2.0, 1.5],
            ..CameraState::default()
        };
        scene.set_camera(Some(camera));
        graph.fail_writes_to(id, CAM_LOCATION_NODE);

        assert_eq!(
            cache.maybe_update_camera(false),
            UpdateOutcome::Updated {
                entities: 0,
                writes: 0
            }
        );
        assert!(!cache.is_current());

        graph.accept_writes_to(id, CAM_LOCATION_NODE);
        assert!(cache.maybe_update_camera(false).is_updated());
        assert_eq!(
            graph.value(id, CAM_LOCATION_NODE, Slot::Constant),
            Some(Value::Vector([4.0, -2.0, 1.5]))
        );
        assert!(cache.is_current());
        assert_eq!(cache.maybe_update_camera(false), UpdateOutcome::Unchanged);
    }

    #[test]
    fn test_reset_forces_recompute() {
        let (scene, _graph, cache) = setup();
        scene.set_camera(Some(CameraState::default()));
        cache.maybe_update_camera(false);
        assert!(cache.is_current());
        cache.reset();
        assert!(!cache.is_current());
        assert!(cache.maybe_update_camera(false).is_updated());
        assert_eq!(cache.stats().flushes, 1);
    }
}
