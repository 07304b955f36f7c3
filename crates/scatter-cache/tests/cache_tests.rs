use std::sync::Arc;

use scatter_cache::{CameraCache, SurfaceEquivalenceCache, UpdateOutcome, SCALE_FADING_NODE};
use scatter_core::{CameraState, Entity, MemoryScene, Slot, Surface, Value};
use scatter_graph::MemoryGraph;

fn fading_scene() -> (Arc<MemoryScene>, Arc<MemoryGraph>, Entity) {
    let scene = Arc::new(MemoryScene::new());
    let graph = Arc::new(MemoryGraph::new());
    let entity = Entity::scatter("Grass", "Terrain");
    scene.add_entity(entity.clone());
    scene.set(entity.id, "s_scale_fading_allow", true);
    scene.set(entity.id, "s_scale_fading_per_cam_data", true);
    scene.set_camera(Some(CameraState::default()));
    (scene, graph, entity)
}

#[test]
fn test_camera_unchanged_twice_writes_nothing() {
    let (scene, graph, _entity) = fading_scene();
    let cache = CameraCache::new(scene.clone(), graph.clone());

    assert!(cache.maybe_update_camera(false).is_updated());
    graph.clear_log();

    assert_eq!(cache.maybe_update_camera(false), UpdateOutcome::Unchanged);
    assert_eq!(cache.maybe_update_camera(false), UpdateOutcome::Unchanged);
    assert_eq!(graph.writes(), 0);
}

#[test]
fn test_camera_change_writes_once() {
    let (scene, graph, entity) = fading_scene();
    let cache = CameraCache::new(scene.clone(), graph.clone());
    cache.maybe_update_camera(false);
    graph.clear_log();

    let mut camera = CameraState::default();
    camera.location = [4.0, 2.0, 1.0];
    camera.distances.fading_max = 90.0;
    scene.set_camera(Some(camera));

    // location and fading max changed, everything else is read-before-write equal
    assert_eq!(
        cache.maybe_update_camera(false),
        UpdateOutcome::Updated {
            entities: 1,
            writes: 2
        }
    );
    assert_eq!(graph.writes(), 2);
    assert_eq!(
        graph.value(entity.id, SCALE_FADING_NODE, Slot::Input(4)),
        Some(Value::Float(90.0))
    );
    assert_eq!(cache.maybe_update_camera(false), UpdateOutcome::Unchanged);
    assert_eq!(graph.writes(), 2);
}

#[test]
fn test_forced_update_skips_hash_check() {
    let (scene, graph, _entity) = fading_scene();
    let cache = CameraCache::new(scene.clone(), graph.clone());
    cache.maybe_update_camera(false);
    graph.clear_log();

    // graph already holds the values, so a forced push still writes nothing
    assert_eq!(
        cache.maybe_update_camera(true),
        UpdateOutcome::Updated {
            entities: 1,
            writes: 0
        }
    );
    let stats = cache.stats();
    assert_eq!(stats.recomputes, 2);
    assert_eq!(stats.hits, 0);
}

#[test]
fn test_equivalence_recomputed_only_on_surface_change() {
    let scene = Arc::new(MemoryScene::new());
    let graph = Arc::new(MemoryGraph::new());
    let cache = SurfaceEquivalenceCache::new(scene.clone(), graph.clone());
    let entity = Entity::scatter("Pebbles", "Beach");
    scene.add_entity(entity.clone());
    scene.set_surfaces(entity.id, vec![Surface::new("Beach", 7)]);
    graph.set_instances(entity.id, &["Beach", "Dune"]);

    let first = cache.get_equivalence(&entity).unwrap();
    let second = cache.get_equivalence(&entity).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(graph.evaluations(), 1);

    scene.set_surfaces(
        entity.id,
        vec![Surface::new("Beach", 7), Surface::new("Dune", 8)],
    );
    let third = cache.get_equivalence(&entity).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.get(&1), Some(&8));
    assert_eq!(graph.evaluations(), 2);

    assert!(cache.flush(entity.id));
    assert!(!cache.flush(entity.id));
    cache.get_equivalence(&entity).unwrap();
    assert_eq!(graph.evaluations(), 3);
}
