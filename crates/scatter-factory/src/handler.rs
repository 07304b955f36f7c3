use std::sync::Arc;

use scatter_cache::{CameraCache, SurfaceEquivalenceCache, UpdateOutcome};
use scatter_core::{
    EngineConfig, Entity, ModifierKeys, PropertyName, Result, ScatterError, SceneHost, Suppress,
    Value,
};
use scatter_graph::GraphOps;

use crate::{DispatchError, Dispatcher};

/// One property edit as seen by its handler.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub entity: Entity,
    pub property: PropertyName,
    pub value: Value,
    pub keys: ModifierKeys,
}

impl PropertyChange {
    fn mismatch(&self, expected: &str) -> ScatterError {
        ScatterError::invalid_value(
            self.property.as_str(),
            format!("expected {}, got {}", expected, self.value.type_name()),
        )
    }

    pub fn bool(&self) -> Result<bool> {
        self.value.as_bool().ok_or_else(|| self.mismatch("bool"))
    }

    pub fn int(&self) -> Result<i64> {
        self.value.as_int().ok_or_else(|| self.mismatch("int"))
    }

    pub fn float(&self) -> Result<f64> {
        self.value.as_float().ok_or_else(|| self.mismatch("float"))
    }

    pub fn text(&self) -> Result<&str> {
        self.value.as_str().ok_or_else(|| self.mismatch("string"))
    }

    pub fn vector(&self) -> Result<[f64; 3]> {
        self.value.as_vector().ok_or_else(|| self.mismatch("vector"))
    }

    /// The value as an RGBA color.
    pub fn rgba(&self) -> Result<Value> {
        self.value.to_rgba().ok_or_else(|| self.mismatch("color"))
    }
}

/// Handler for a concrete property name.
pub type HandlerFn = Arc<dyn Fn(&HandlerContext<'_>, &PropertyChange) -> Result<()> + Send + Sync>;

/// Handler shared by every expansion of a template, receiving the 1-based index.
pub type IndexedHandlerFn =
    Arc<dyn Fn(&HandlerContext<'_>, &PropertyChange, u8) -> Result<()> + Send + Sync>;

/// What a handler may touch while it runs.
pub struct HandlerContext<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher
    }

    pub fn host(&self) -> &'a dyn SceneHost {
        self.dispatcher.host()
    }

    pub fn graph<'e>(&self, entity: &'e Entity) -> Result<GraphOps<'e>>
    where
        'a: 'e,
    {
        GraphOps::new(self.dispatcher.graph(), entity)
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        self.dispatcher.config().load_full()
    }

    pub fn read(&self, entity: &Entity, property: &str) -> Option<Value> {
        self.host().read_property(entity.id, property)
    }

    pub fn read_bool(&self, entity: &Entity, property: &str) -> bool {
        self.read(entity, property)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn read_float(&self, entity: &Entity, property: &str) -> f64 {
        self.read(entity, property)
            .and_then(|v| v.as_float())
            .unwrap_or(0.0)
    }

    pub fn read_str(&self, entity: &Entity, property: &str) -> String {
        self.read(entity, property)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Store a value on `entity` and run its handler. Batch fan-out and
    /// delayed timing stay off for the nested dispatch.
    pub fn set_property(
        &self,
        entity: &Entity,
        property: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.host().write_property(entity.id, property, value.into())?;
        let _guard = self
            .dispatcher
            .gate()
            .suppress(Suppress::BATCH | Suppress::DELAY);
        self.redispatch(entity, property, ModifierKeys::none())
    }

    /// Run the handler of `property` again with its stored value, without any fan-out.
    pub fn refresh_property(&self, entity: &Entity, property: &str) -> Result<()> {
        let _guard = self.dispatcher.gate().suppress(Suppress::FAN_OUT);
        self.redispatch(entity, property, ModifierKeys::none())
    }

    fn redispatch(&self, entity: &Entity, property: &str, keys: ModifierKeys) -> Result<()> {
        match self.dispatcher.dispatch(entity, property, keys) {
            Ok(()) => Ok(()),
            // Plain data properties have no handler.
            Err(DispatchError::UnknownProperty { .. }) => Ok(()),
            Err(DispatchError::Engine(e)) => Err(e),
            Err(e) => Err(ScatterError::Dispatch(e.to_string())),
        }
    }

    pub fn camera(&self) -> &'a CameraCache {
        self.dispatcher.camera()
    }

    /// Push the camera into every camera-dependent graph, ignoring the cached hash.
    pub fn refresh_camera(&self) -> UpdateOutcome {
        let camera = self.camera();
        camera.reset();
        camera.maybe_update_camera(true)
    }

    pub fn equivalence(&self) -> &'a SurfaceEquivalenceCache {
        self.dispatcher.equivalence()
    }

    pub fn group_members(&self, group: &Entity) -> Vec<Entity> {
        self.host().group_members(&group.name)
    }

    /// Entities a batch edit started from `source` applies to, `source` first.
    pub fn selection(&self, source: &Entity) -> Vec<Entity> {
        let scope = self.config().factory.alt_selection;
        let mut targets = vec![source.clone()];
        targets.extend(
            self.host()
                .selected_entities(scope, source)
                .into_iter()
                .filter(|e| e.id != source.id && !e.is_group()),
        );
        targets
    }
}
