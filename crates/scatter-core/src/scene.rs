use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    CameraState, Entity, EntityId, InputState, ModifierKeys, PropertyName, Result, SceneHost,
    ScatterError, SelectionScope, Surface, Value,
};

#[derive(Default)]
struct SceneState {
    entities: Vec<Entity>,
    properties: HashMap<EntityId, HashMap<String, Value>>,
    selected: HashSet<EntityId>,
    keys: ModifierKeys,
    input: InputState,
    camera: Option<CameraState>,
    surfaces: HashMap<EntityId, Vec<Surface>>,
}

/// In-memory [`SceneHost`], used by tests and headless tools.
///
/// Entities keep insertion order, which is also the selection order.
#[derive(Default)]
pub struct MemoryScene {
    state: RwLock<SceneState>,
    writes: AtomicUsize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&self, entity: Entity) -> EntityId {
        let id = entity.id;
        let mut state = self.state.write();
        state.properties.entry(id).or_default();
        state.entities.push(entity);
        id
    }

    pub fn remove_entity(&self, name: &str) -> Option<Entity> {
        let mut state = self.state.write();
        let idx = state.entities.iter().position(|e| e.name == name)?;
        let entity = state.entities.remove(idx);
        state.properties.remove(&entity.id);
        state.selected.remove(&entity.id);
        state.surfaces.remove(&entity.id);
        Some(entity)
    }

    /// Replace an entity snapshot (lock set, group, ...), matched by id.
    pub fn update_entity(&self, entity: Entity) -> bool {
        let mut state = self.state.write();
        match state.entities.iter_mut().find(|e| e.id == entity.id) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    /// Seed a property without counting it as a write.
    pub fn set(&self, entity: EntityId, property: &str, value: impl Into<Value>) {
        self.state
            .write()
            .properties
            .entry(entity)
            .or_default()
            .insert(property.to_string(), value.into());
    }

    pub fn get(&self, entity: EntityId, property: &str) -> Option<Value> {
        self.read_property(entity, property)
    }

    pub fn select(&self, entity: EntityId) {
        self.state.write().selected.insert(entity);
    }

    pub fn deselect_all(&self) {
        self.state.write().selected.clear();
    }

    pub fn set_modifier_keys(&self, keys: ModifierKeys) {
        self.state.write().keys = keys;
    }

    pub fn set_input_state(&self, input: InputState) {
        self.state.write().input = input;
    }

    pub fn set_camera(&self, camera: Option<CameraState>) {
        self.state.write().camera = camera;
    }

    pub fn set_surfaces(&self, entity: EntityId, surfaces: Vec<Surface>) {
        self.state.write().surfaces.insert(entity, surfaces);
    }

    /// Number of `write_property` calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SceneHost for MemoryScene {
    fn entity(&self, name: &str) -> Option<Entity> {
        self.state
            .read()
            .entities
            .iter()
            .find(|e| e.name == name)
            .cloned()
    }

    fn entity_by_id(&self, id: EntityId) -> Option<Entity> {
        self.state
            .read()
            .entities
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn entities(&self) -> Vec<Entity> {
        self.state.read().entities.clone()
    }

    fn group_members(&self, group: &str) -> Vec<Entity> {
        self.state
            .read()
            .entities
            .iter()
            .filter(|e| !e.is_group() && e.group.as_deref() == Some(group))
            .cloned()
            .collect()
    }

    fn selected_entities(&self, scope: SelectionScope, source: &Entity) -> Vec<Entity> {
        let state = self.state.read();
        state
            .entities
            .iter()
            .filter(|e| !e.is_group() && state.selected.contains(&e.id))
            .filter(|e| match scope {
                SelectionScope::ActiveEmitter => e.emitter == source.emitter,
                SelectionScope::AllEmitters => true,
            })
            .cloned()
            .collect()
    }

    fn read_property(&self, entity: EntityId, property: &str) -> Option<Value> {
        self.state
            .read()
            .properties
            .get(&entity)
            .and_then(|props| props.get(property))
            .cloned()
    }

    fn write_property(&self, entity: EntityId, property: &str, value: Value) -> Result<()> {
        let mut state = self.state.write();
        let props = state
            .properties
            .get_mut(&entity)
            .ok_or_else(|| ScatterError::EntityNotFound(entity.to_string()))?;
        props.insert(property.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn property_names(&self, entity: EntityId) -> Vec<PropertyName> {
        let state = self.state.read();
        let mut names: Vec<PropertyName> = state
            .properties
            .get(&entity)
            .map(|props| props.keys().map(PropertyName::new).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn modifier_keys(&self) -> ModifierKeys {
        self.state.read().keys
    }

    fn input_state(&self) -> InputState {
        self.state.read().input
    }

    fn active_camera(&self) -> Option<CameraState> {
        self.state.read().camera.clone()
    }

    fn surfaces(&self, entity: EntityId) -> Vec<Surface> {
        self.state
            .read()
            .surfaces
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_scopes() {
        let scene = MemoryScene::new();
        let a = scene.add_entity(Entity::scatter("A", "Plane"));
        let b = scene.add_entity(Entity::scatter("B", "Plane"));
        let c = scene.add_entity(Entity::scatter("C", "Hill"));
        scene.add_entity(Entity::scatter("D", "Plane"));
        for id in [a, b, c] {
            scene.select(id);
        }

        let source = scene.entity("A").unwrap();
        let local: Vec<_> = scene
            .selected_entities(SelectionScope::ActiveEmitter, &source)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(local, vec!["A", "B"]);
        assert_eq!(
            scene
                .selected_entities(SelectionScope::AllEmitters, &source)
                .len(),
            3
        );
    }

    #[test]
    fn test_write_to_removed_entity_fails() {
        let scene = MemoryScene::new();
        let a = scene.add_entity(Entity::scatter("A", "Plane"));
        scene.remove_entity("A");
        assert!(scene.write_property(a, "hide_viewport", true.into()).is_err());
        assert_eq!(scene.writes(), 0);
    }

    #[test]
    fn test_group_members() {
        let scene = MemoryScene::new();
        scene.add_entity(Entity::group("Meadow", "Plane"));
        scene.add_entity(Entity::scatter("Grass", "Plane").in_group("Meadow"));
        scene.add_entity(Entity::scatter("Rocks", "Plane"));
        let members = scene.group_members("Meadow");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "Grass");
    }
}
