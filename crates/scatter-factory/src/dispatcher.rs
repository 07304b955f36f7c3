//! Routes property writes to their registered handler and drives fan-out.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use scatter_cache::{CameraCache, SurfaceEquivalenceCache};
use scatter_core::{
    Entity, GraphBackend, ModifierKeys, PropertyName, SceneHost, SharedConfig, Suppress,
    UpdateGate,
};

use crate::{
    DispatchError, DispatchResult, EngineNotice, HandlerContext, NoticeHub, NoticeSink,
    PropertyChange, Registry, SyncChannels,
};

/// Properties still honoured on entities owned by another file.
pub const LINKED_ALLOW_LIST: [&str; 2] = ["hide_viewport", "hide_render"];

pub struct Dispatcher {
    registry: Arc<Registry>,
    host: Arc<dyn SceneHost>,
    graph: Arc<dyn GraphBackend>,
    gate: UpdateGate,
    config: SharedConfig,
    channels: RwLock<SyncChannels>,
    camera: Arc<CameraCache>,
    equivalence: Arc<SurfaceEquivalenceCache>,
    notices: NoticeHub,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        host: Arc<dyn SceneHost>,
        graph: Arc<dyn GraphBackend>,
        config: SharedConfig,
    ) -> Self {
        let camera = Arc::new(CameraCache::new(host.clone(), graph.clone()));
        let equivalence = Arc::new(SurfaceEquivalenceCache::new(host.clone(), graph.clone()));
        Self {
            registry,
            host,
            graph,
            gate: UpdateGate::new(),
            config,
            channels: RwLock::new(SyncChannels::default()),
            camera,
            equivalence,
            notices: NoticeHub::default(),
        }
    }

    pub fn with_notice_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.notices.set_sink(sink);
        self
    }

    pub fn with_channels(self, channels: SyncChannels) -> Self {
        *self.channels.write() = channels;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn host(&self) -> &dyn SceneHost {
        self.host.as_ref()
    }

    pub fn graph(&self) -> &dyn GraphBackend {
        self.graph.as_ref()
    }

    pub fn gate(&self) -> &UpdateGate {
        &self.gate
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraCache {
        &self.camera
    }

    pub fn camera_handle(&self) -> Arc<CameraCache> {
        self.camera.clone()
    }

    pub fn equivalence(&self) -> &SurfaceEquivalenceCache {
        &self.equivalence
    }

    pub fn channels(&self) -> RwLockReadGuard<'_, SyncChannels> {
        self.channels.read()
    }

    pub fn channels_mut(&self) -> RwLockWriteGuard<'_, SyncChannels> {
        self.channels.write()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotice> {
        self.notices.subscribe()
    }

    pub(crate) fn notify(&self, notice: EngineNotice) {
        self.notices.publish(notice);
    }

    /// Run the handler for `property` with the value currently stored on
    /// `entity`, then fan the value out to the batch selection and to the
    /// synchronization channels the entity belongs to.
    pub fn dispatch(&self, entity: &Entity, property: &str, keys: ModifierKeys) -> DispatchResult<()> {
        if self.gate.is_suppressed(Suppress::DISPATCH) {
            return Ok(());
        }
        if entity.linked && !LINKED_ALLOW_LIST.contains(&property) {
            debug!(entity = %entity.name, property, "ignoring write on linked entity");
            return Ok(());
        }

        let Some(handler) = self.registry.get(property) else {
            warn!(entity = %entity.name, property, "no handler registered");
            self.notify(EngineNotice::unknown_property(&entity.name, property));
            return Err(DispatchError::UnknownProperty {
                entity: entity.name.clone(),
                property: property.to_string(),
            });
        };
        let Some(value) = self.host.read_property(entity.id, property) else {
            if self.host.entity_by_id(entity.id).is_none() {
                debug!(entity = %entity.name, property, "entity no longer exists");
                return Err(DispatchError::StaleReference(entity.name.clone()));
            }
            warn!(entity = %entity.name, property, "registered property has no value");
            return Err(DispatchError::UnknownProperty {
                entity: entity.name.clone(),
                property: property.to_string(),
            });
        };

        let change = PropertyChange {
            entity: entity.clone(),
            property: handler.name().clone(),
            value,
            keys,
        };
        let handled = self.invoke(handler, &change);

        if entity.is_group() {
            return handled;
        }

        let name: &PropertyName = &change.property;
        let config = self.config.load_full();
        if keys.alt
            && config.factory.alt_allow
            && !name.is_random_seed_trigger()
            && !self.gate.is_suppressed(Suppress::BATCH)
        {
            let report = self.apply_to_selection(
                entity,
                name,
                &change.value,
                config.factory.alt_selection,
            );
            if !report.is_empty() {
                debug!(property, ?report, "batch fan-out");
            }
        }
        if config.factory.synchronization_allow
            && !name.is_seed()
            && !self.gate.is_suppressed(Suppress::SYNC)
        {
            let report = self.propagate(entity, name, &change.value);
            if !report.is_empty() {
                debug!(property, ?report, "synchronization");
            }
        }

        handled
    }

    fn invoke(
        &self,
        handler: &crate::RegisteredHandler,
        change: &PropertyChange,
    ) -> DispatchResult<()> {
        let ctx = HandlerContext::new(self);
        let outcome = catch_unwind(AssertUnwindSafe(|| handler.invoke(&ctx, change)));
        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        error!(
            entity = %change.entity.name,
            property = %change.property,
            %message,
            "handler failed"
        );
        self.notify(EngineNotice::handler_failed(
            &change.entity.name,
            change.property.as_str(),
            &message,
        ));
        Err(DispatchError::HandlerFailed {
            entity: change.entity.name.clone(),
            property: change.property.to_string(),
            message,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rule;
    use scatter_core::{shared_config, EngineConfig, MemoryScene, Slot, Value};
    use scatter_graph::MemoryGraph;

    fn setup(registry: Registry) -> (Arc<MemoryScene>, Arc<MemoryGraph>, Dispatcher) {
        let scene = Arc::new(MemoryScene::new());
        let graph = Arc::new(MemoryGraph::new());
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            scene.clone(),
            graph.clone(),
            shared_config(EngineConfig::default()),
        );
        (scene, graph, dispatcher)
    }

    fn scale_rule() -> Rule {
        Rule::new("s_scale_default_value", |ctx, change| {
            let ops = ctx.graph(&change.entity)?;
            ops.set_input("s_scale_default", 1, change.value.clone())?;
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_runs_handler() {
        let registry = Registry::builder().rule(scale_rule()).build().unwrap();
        let (scene, graph, dispatcher) = setup(registry);
        let e = Entity::scatter("Grass", "Plane");
        scene.add_entity(e.clone());
        scene.set(e.id, "s_scale_default_value", [2.0, 2.0, 2.0]);

        dispatcher
            .dispatch(&e, "s_scale_default_value", ModifierKeys::none())
            .unwrap();
        assert_eq!(
            graph.value(e.id, "s_scale_default", Slot::Input(1)),
            Some(Value::Vector([2.0, 2.0, 2.0]))
        );
    }

    #[test]
    fn test_unknown_property_is_reported() {
        let registry = Registry::builder().rule(scale_rule()).build().unwrap();
        let (scene, graph, dispatcher) = setup(registry);
        let mut rx = dispatcher.subscribe();
        let e = Entity::scatter("Grass", "Plane");
        scene.add_entity(e.clone());
        scene.set(e.id, "s_bogus", 1.0);

        let err = dispatcher
            .dispatch(&e, "s_bogus", ModifierKeys::none())
            .unwrap_err();
        assert!(err.is_unknown_property());
        assert_eq!(graph.writes(), 0);
        assert_eq!(rx.try_recv().unwrap().property(), "s_bogus");
    }

    #[test]
    fn test_removed_entity_is_stale() {
        let registry = Registry::builder().rule(scale_rule()).build().unwrap();
        let (scene, graph, dispatcher) = setup(registry);
        let mut rx = dispatcher.subscribe();
        let e = Entity::scatter("Grass", "Plane");
        scene.add_entity(e.clone());
        scene.set(e.id, "s_scale_default_value", 1.0);
        scene.remove_entity("Grass");

        let err = dispatcher
            .dispatch(&e, "s_scale_default_value", ModifierKeys::none())
            .unwrap_err();
        assert!(matches!(err, DispatchError::StaleReference(name) if name == "Grass"));
        assert_eq!(graph.writes(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_suppressed_dispatch_is_noop() {
        let registry = Registry::builder().rule(scale_rule()).build().unwrap();
        let (scene, graph, dispatcher) = setup(registry);
        let e = Entity::scatter("Grass", "Plane");
        scene.add_entity(e.clone());
        scene.set(e.id, "s_scale_default_value", [2.0, 2.0, 2.0]);

        let _guard = dispatcher.gate().suppress(Suppress::DISPATCH);
        dispatcher
            .dispatch(&e, "s_scale_default_value", ModifierKeys::none())
            .unwrap();
        assert_eq!(graph.writes(), 0);
    }

    #[test]
    fn test_linked_entity_only_accepts_visibility() {
        let registry = Registry::builder()
            .rule(scale_rule())
            .rule(Rule::new("hide_viewport", |ctx, change| {
                ctx.graph(&change.entity)?
                    .set_input("engine_output", 1, !change.bool()?)?;
                Ok(())
            }))
            .build()
            .unwrap();
        let (scene, graph, dispatcher) = setup(registry);
        let e = Entity::scatter("Library Grass", "Plane").as_linked();
        scene.add_entity(e.clone());
        scene.set(e.id, "s_scale_default_value", [2.0, 2.0, 2.0]);
        scene.set(e.id, "hide_viewport", true);

        dispatcher
            .dispatch(&e, "s_scale_default_value", ModifierKeys::none())
            .unwrap();
        assert_eq!(graph.writes(), 0);
        dispatcher
            .dispatch(&e, "hide_viewport", ModifierKeys::none())
            .unwrap();
        assert_eq!(graph.writes(), 1);
    }

    #[test]
    fn test_handler_panic_becomes_error() {
        let registry = Registry::builder()
            .rule(Rule::new("s_scale_default_value", |_, _| panic!("boom")))
            .build()
            .unwrap();
        let (scene, _graph, dispatcher) = setup(registry);
        let e = Entity::scatter("Grass", "Plane");
        scene.add_entity(e.clone());
        scene.set(e.id, "s_scale_default_value", 1.0);

        let err = dispatcher
            .dispatch(&e, "s_scale_default_value", ModifierKeys::none())
            .unwrap_err();
        match err {
            DispatchError::HandlerFailed { message, .. } => assert!(message.contains("boom")),
            other => panic!("unexpected error: {}", other),
        }
        // gate stays usable after the unwind
        assert_eq!(dispatcher.gate().active(), Suppress::empty());
    }
}
