use serde::Serialize;
use tracing::{debug, warn};

use scatter_core::{Entity, ModifierKeys, PropertyName, ScatterError, SelectionScope, Suppress, Value};

use crate::{DispatchError, Dispatcher, LINKED_ALLOW_LIST};

/// What a fan-out did to each target, by entity name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub updated: Vec<String>,
    pub skipped_locked: Vec<String>,
    pub skipped_equal: Vec<String>,
    pub skipped_linked: Vec<String>,
    /// Targets that disappeared from the scene.
    pub stale: Vec<String>,
    pub failed: Vec<String>,
}

impl FanOutReport {
    pub fn merge(&mut self, other: FanOutReport) {
        self.updated.extend(other.updated);
        self.skipped_locked.extend(other.skipped_locked);
        self.skipped_equal.extend(other.skipped_equal);
        self.skipped_linked.extend(other.skipped_linked);
        self.stale.extend(other.stale);
        self.failed.extend(other.failed);
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
            && self.skipped_locked.is_empty()
            && self.skipped_equal.is_empty()
            && self.skipped_linked.is_empty()
            && self.stale.is_empty()
            && self.failed.is_empty()
    }
}

impl Dispatcher {
    /// Copy `value` of `property` from `source` onto every other selected system.
    pub fn apply_to_selection(
        &self,
        source: &Entity,
        property: &PropertyName,
        value: &Value,
        scope: SelectionScope,
    ) -> FanOutReport {
        let _guard = self.gate().suppress(Suppress::FAN_OUT);
        let mut report = FanOutReport::default();
        for target in self.host().selected_entities(scope, source) {
            if target.id == source.id || target.is_group() {
                continue;
            }
            self.fan_out_one(&target, property, value, &mut report);
        }
        report
    }

    /// Write one fan-out target and run its handler. Callers hold a
    /// [`Suppress::FAN_OUT`] guard so targets never fan out further.
    pub(crate) fn fan_out_one(
        &self,
        target: &Entity,
        property: &PropertyName,
        value: &Value,
        report: &mut FanOutReport,
    ) {
        let name = target.name.clone();
        if target.linked && !LINKED_ALLOW_LIST.contains(&property.as_str()) {
            report.skipped_linked.push(name);
            return;
        }
        if target.is_locked(property) {
            report.skipped_locked.push(name);
            return;
        }
        if self.host().read_property(target.id, property.as_str()).as_ref() == Some(value) {
            report.skipped_equal.push(name);
            return;
        }
        match self
            .host()
            .write_property(target.id, property.as_str(), value.clone())
        {
            Ok(()) => {}
            Err(ScatterError::EntityNotFound(_)) => {
                debug!(target = %name, %property, "fan-out target no longer exists");
                report.stale.push(name);
                return;
            }
            Err(e) => {
                warn!(target = %name, %property, error = %e, "fan-out write failed");
                report.failed.push(name);
                return;
            }
        }
        if !self.registry().contains(property.as_str()) {
            report.updated.push(name);
            return;
        }
        match self.dispatch(target, property.as_str(), ModifierKeys::none()) {
            Ok(()) => report.updated.push(name),
            Err(DispatchError::StaleReference(_)) => report.stale.push(name),
            Err(e) => {
                warn!(target = %name, %property, error = %e, "fan-out handler failed");
                report.failed.push(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Registry, Rule};
    use scatter_core::{shared_config, EngineConfig, MemoryScene, SceneHost, Slot};
    use scatter_graph::MemoryGraph;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryScene>, Arc<MemoryGraph>, Dispatcher) {
        let registry = Registry::builder()
            .rule(Rule::new("s_scale_default_value", |ctx, change| {
                ctx.graph(&change.entity)?
                    .set_input("s_scale_default", 1, change.value.clone())?;
                Ok(())
            }))
            .build()
            .unwrap();
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

    #[test]
    fn test_locked_and_equal_targets_are_skipped() {
        let (scene, graph, dispatcher) = setup();
        let a = Entity::scatter("A", "Plane");
        let b = Entity::scatter("B", "Plane");
        let c = Entity::scatter("C", "Plane").with_locked("s_scale_default_value");
        for e in [&a, &b, &c] {
            scene.add_entity(e.clone());
            scene.set(e.id, "s_scale_default_value", 1.0);
            scene.select(e.id);
        }
        scene.set(a.id, "s_scale_default_value", 2.0);

        let keys = ModifierKeys::alt();
        dispatcher.dispatch(&a, "s_scale_default_value", keys).unwrap();
        assert_eq!(scene.get(b.id, "s_scale_default_value"), Some(Value::Float(2.0)));
        assert_eq!(scene.get(c.id, "s_scale_default_value"), Some(Value::Float(1.0)));
        assert_eq!(
            graph.value(b.id, "s_scale_default", Slot::Input(1)),
            Some(Value::Float(2.0))
        );

        // second identical edit touches nothing on the targets
        let host_writes = scene.writes();
        graph.clear_log();
        dispatcher.dispatch(&a, "s_scale_default_value", keys).unwrap();
        assert_eq!(scene.writes(), host_writes);
        assert_eq!(graph.writes_for(b.id), 0);
        assert_eq!(graph.writes_for(c.id), 0);
    }

    #[test]
    fn test_report_contents() {
        let (scene, _graph, dispatcher) = setup();
        let a = Entity::scatter("A", "Plane");
        let b = Entity::scatter("B", "Plane");
        let linked = Entity::scatter("L", "Plane").as_linked();
        let group = Entity::group("G", "Plane");
        for e in [&a, &b, &linked, &group] {
            scene.add_entity(e.clone());
            scene.set(e.id, "s_scale_default_value", 1.0);
            scene.select(e.id);
        }
        let source = scene.entity("A").unwrap();

        let report = dispatcher.apply_to_selection(
            &source,
            &PropertyName::from("s_scale_default_value"),
            &Value::Float(3.0),
            SelectionScope::ActiveEmitter,
        );
        assert_eq!(report.updated, vec!["B".to_string()]);
        assert_eq!(report.skipped_linked, vec!["L".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(dispatcher.gate().active(), Suppress::empty());
    }

    #[test]
    fn test_unregistered_property_is_copied_without_handler() {
        let (scene, graph, dispatcher) = setup();
        let a = Entity::scatter("A", "Plane");
        let b = Entity::scatter("B", "Plane");
        for e in [&a, &b] {
            scene.add_entity(e.clone());
            scene.select(e.id);
        }
        let report = dispatcher.apply_to_selection(
            &a,
            &PropertyName::from("s_display_custom_note"),
            &Value::Text("hello".into()),
            SelectionScope::ActiveEmitter,
        );
        assert_eq!(report.updated, vec!["B".to_string()]);
        assert_eq!(scene.get(b.id, "s_display_custom_note"), Some(Value::Text("hello".into())));
        assert_eq!(graph.writes(), 0);
    }
}
