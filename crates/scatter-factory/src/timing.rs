//! Coalescing of raw property writes before they reach the dispatcher.
//!
//! Every burst of writes yields at most one dispatch per `(entity, property)`,
//! carrying the value stored when the window closes.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use scatter_core::{
    Entity, EntityId, InputState, ModifierKeys, PropertyName, Scheduler, Suppress, TaskControl,
    UpdateMethod,
};

use crate::{DispatchError, Dispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingPolicy {
    Immediate,
    FixedDelay(Duration),
    /// Wait for the pointer to be released, polling at the given period.
    ReleaseDetect(Duration),
}

#[derive(Debug)]
pub enum WriteOutcome {
    Dispatched,
    /// Opened a new coalescing window.
    Scheduled,
    /// Folded into the open window.
    Coalesced,
    /// The property has no handler.
    Ignored,
    Failed(DispatchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingWrite {
    entity: EntityId,
    property: PropertyName,
    keys: ModifierKeys,
}

#[derive(Debug, Default)]
enum TimingState {
    #[default]
    Idle,
    Scheduled {
        pending: Vec<PendingWrite>,
    },
    Polling {
        pending: Vec<PendingWrite>,
    },
}

impl TimingState {
    fn pending_mut(&mut self) -> Option<&mut Vec<PendingWrite>> {
        match self {
            TimingState::Idle => None,
            TimingState::Scheduled { pending } | TimingState::Polling { pending } => Some(pending),
        }
    }

    fn take(&mut self) -> Vec<PendingWrite> {
        match std::mem::take(self) {
            TimingState::Idle => Vec::new(),
            TimingState::Scheduled { pending } | TimingState::Polling { pending } => pending,
        }
    }
}

impl PendingWrite {
    fn same_key(&self, other: &PendingWrite) -> bool {
        self.entity == other.entity && self.property == other.property
    }
}

/// Last write wins per key, first write keeps its place in the queue.
fn upsert(pending: &mut Vec<PendingWrite>, write: PendingWrite) {
    match pending.iter_mut().find(|p| p.same_key(&write)) {
        Some(slot) => slot.keys = write.keys,
        None => pending.push(write),
    }
}

/// The UI-facing entry point: decides when a raw write is dispatched.
pub struct UpdateFactory {
    dispatcher: Arc<Dispatcher>,
    scheduler: Arc<dyn Scheduler>,
    state: Arc<Mutex<TimingState>>,
}

impl UpdateFactory {
    pub fn new(dispatcher: Arc<Dispatcher>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            dispatcher,
            scheduler,
            state: Arc::new(Mutex::new(TimingState::Idle)),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Whether a coalescing window is open.
    pub fn is_pending(&self) -> bool {
        !matches!(*self.state.lock(), TimingState::Idle)
    }

    pub fn policy_for(&self, property: &str) -> TimingPolicy {
        let config = self.dispatcher.config().load();
        let factory = &config.factory;
        let delayed = self
            .dispatcher
            .registry()
            .get(property)
            .is_some_and(|h| h.options().delayed);
        if !factory.delay_allow || !delayed || self.dispatcher.gate().is_suppressed(Suppress::DELAY)
        {
            return TimingPolicy::Immediate;
        }
        match factory.update_method {
            UpdateMethod::Delayed if factory.update_delay().is_zero() => TimingPolicy::Immediate,
            UpdateMethod::Delayed => TimingPolicy::FixedDelay(factory.update_delay()),
            UpdateMethod::OnHalt => TimingPolicy::ReleaseDetect(factory.release_poll()),
        }
    }

    /// Called by the host after it stored a new value for `property` on `entity`.
    pub fn on_property_write(&self, entity: &Entity, property: &str) -> WriteOutcome {
        let keys = self.dispatcher.host().modifier_keys();
        let write = PendingWrite {
            entity: entity.id,
            property: PropertyName::new(property),
            keys,
        };
        match self.policy_for(property) {
            TimingPolicy::Immediate => self.dispatch_now(entity, property, keys),
            TimingPolicy::FixedDelay(delay) => self.defer(write, delay),
            TimingPolicy::ReleaseDetect(poll) => match self.dispatcher.host().input_state() {
                InputState::Press => self.poll(write, poll),
                InputState::Confirm | InputState::Idle => {
                    if let Some(pending) = self.state.lock().pending_mut() {
                        pending.retain(|p| !p.same_key(&write));
                    }
                    self.dispatch_now(entity, property, keys)
                }
            },
        }
    }

    fn dispatch_now(&self, entity: &Entity, property: &str, keys: ModifierKeys) -> WriteOutcome {
        outcome(self.dispatcher.dispatch(entity, property, keys))
    }

    fn defer(&self, write: PendingWrite, delay: Duration) -> WriteOutcome {
        {
            let mut state = self.state.lock();
            if let Some(pending) = state.pending_mut() {
                upsert(pending, write);
                return WriteOutcome::Coalesced;
            }
            *state = TimingState::Scheduled {
                pending: vec![write],
            };
        }
        trace!(?delay, "coalescing window opened");

        let dispatcher = self.dispatcher.clone();
        let state = self.state.clone();
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                let pending = state.lock().take();
                fire(&dispatcher, pending);
                TaskControl::Done
            }),
        );
        WriteOutcome::Scheduled
    }

    fn poll(&self, write: PendingWrite, period: Duration) -> WriteOutcome {
        {
            let mut state = self.state.lock();
            if let Some(pending) = state.pending_mut() {
                upsert(pending, write);
                return WriteOutcome::Coalesced;
            }
            *state = TimingState::Polling {
                pending: vec![write],
            };
        }
        trace!(?period, "waiting for input release");

        let dispatcher = self.dispatcher.clone();
        let state = self.state.clone();
        self.scheduler.schedule(
            period,
            Box::new(move || {
                if dispatcher.host().input_state() == InputState::Press {
                    return TaskControl::RunAgainIn(period);
                }
                let pending = state.lock().take();
                fire(&dispatcher, pending);
                TaskControl::Done
            }),
        );
        WriteOutcome::Scheduled
    }
}

fn outcome(result: crate::DispatchResult<()>) -> WriteOutcome {
    match result {
        Ok(()) => WriteOutcome::Dispatched,
        Err(DispatchError::UnknownProperty { .. } | DispatchError::StaleReference(_)) => {
            WriteOutcome::Ignored
        }
        Err(e) => WriteOutcome::Failed(e),
    }
}

fn fire(dispatcher: &Dispatcher, pending: Vec<PendingWrite>) {
    let _guard = dispatcher.gate().suppress(Suppress::DELAY);
    for write in pending {
        let Some(entity) = dispatcher.host().entity_by_id(write.entity) else {
            debug!(property = %write.property, "entity removed before the window closed");
            continue;
        };
        let result = dispatcher.dispatch(&entity, write.property.as_str(), write.keys);
        if let WriteOutcome::Failed(e) = outcome(result) {
            warn!(
                entity = %entity.name,
                property = %write.property,
                error = %e,
                "delayed dispatch failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Registry, Rule};
    use scatter_core::{shared_config, EngineConfig, ManualScheduler, MemoryScene, Slot, Value};
    use scatter_graph::MemoryGraph;

    struct Rig {
        scene: Arc<MemoryScene>,
        graph: Arc<MemoryGraph>,
        scheduler: Arc<ManualScheduler>,
        factory: UpdateFactory,
        entity: Entity,
    }

    fn rig(method: UpdateMethod) -> Rig {
        let registry = Registry::builder()
            .rule(
                Rule::new("s_scale_default_multiplier", |ctx, change| {
                    ctx.graph(&change.entity)?
                        .set_input("s_scale_default", 2, change.value.clone())?;
                    Ok(())
                })
                .slider(),
            )
            .rule(Rule::new("s_scale_default_allow", |_, _| Ok(())))
            .build()
            .unwrap();
        let mut config = EngineConfig::default();
        config.factory.delay_allow = true;
        config.factory.update_method = method;
        let scene = Arc::new(MemoryScene::new());
        let graph = Arc::new(MemoryGraph::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(registry),
            scene.clone(),
            graph.clone(),
            shared_config(config),
        ));
        let scheduler = Arc::new(ManualScheduler::new());
        let factory = UpdateFactory::new(dispatcher, scheduler.clone());
        let entity = Entity::scatter("Grass", "Plane");
        scene.add_entity(entity.clone());
        Rig {
            scene,
            graph,
            scheduler,
            factory,
            entity,
        }
    }

    #[test]
    fn test_policy_selection() {
        let r = rig(UpdateMethod::Delayed);
        assert_eq!(
            r.factory.policy_for("s_scale_default_multiplier"),
            TimingPolicy::FixedDelay(Duration::from_millis(250))
        );
        assert_eq!(
            r.factory.policy_for("s_scale_default_allow"),
            TimingPolicy::Immediate
        );
        let _g = r.factory.dispatcher().gate().suppress(Suppress::DELAY);
        assert_eq!(
            r.factory.policy_for("s_scale_default_multiplier"),
            TimingPolicy::Immediate
        );
    }

    #[test]
    fn test_fixed_delay_coalesces_burst() {
        let r = rig(UpdateMethod::Delayed);
        for v in [1.0, 2.0, 3.0] {
            r.scene.set(r.entity.id, "s_scale_default_multiplier", v);
            r.factory
                .on_property_write(&r.entity, "s_scale_default_multiplier");
        }
        assert!(r.factory.is_pending());
        assert_eq!(r.graph.writes(), 0);

        r.scheduler.advance(Duration::from_millis(250));
        assert!(!r.factory.is_pending());
        assert_eq!(r.graph.writes(), 1);
        assert_eq!(
            r.graph.value(r.entity.id, "s_scale_default", Slot::Input(2)),
            Some(Value::Float(3.0))
        );
    }

    #[test]
    fn test_release_detect_waits_for_release() {
        let r = rig(UpdateMethod::OnHalt);
        r.scene.set_input_state(InputState::Press);
        r.scene.set(r.entity.id, "s_scale_default_multiplier", 1.5);
        assert!(matches!(
            r.factory.on_property_write(&r.entity, "s_scale_default_multiplier"),
            WriteOutcome::Scheduled
        ));
        r.scene.set(r.entity.id, "s_scale_default_multiplier", 4.0);
        assert!(matches!(
            r.factory.on_property_write(&r.entity, "s_scale_default_multiplier"),
            WriteOutcome::Coalesced
        ));

        r.scheduler.advance(Duration::from_millis(500));
        assert_eq!(r.graph.writes(), 0);

        r.scene.set_input_state(InputState::Idle);
        r.scheduler.advance(Duration::from_millis(100));
        assert_eq!(r.graph.writes(), 1);
        assert_eq!(
            r.graph.value(r.entity.id, "s_scale_default", Slot::Input(2)),
            Some(Value::Float(4.0))
        );
    }

    #[test]
    fn test_confirm_dispatches_immediately() {
        let r = rig(UpdateMethod::OnHalt);
        r.scene.set_input_state(InputState::Confirm);
        r.scene.set(r.entity.id, "s_scale_default_multiplier", 2.0);
        assert!(matches!(
            r.factory.on_property_write(&r.entity, "s_scale_default_multiplier"),
            WriteOutcome::Dispatched
        ));
        assert_eq!(r.graph.writes(), 1);
        assert_eq!(r.scheduler.pending(), 0);
    }

    #[test]
    fn test_deleted_entity_is_skipped() {
        let r = rig(UpdateMethod::Delayed);
        r.scene.set(r.entity.id, "s_scale_default_multiplier", 2.0);
        r.factory
            .on_property_write(&r.entity, "s_scale_default_multiplier");
        r.scene.remove_entity("Grass");

        r.scheduler.advance(Duration::from_millis(250));
        assert_eq!(r.graph.writes(), 0);
        assert!(!r.factory.is_pending());
    }

    #[test]
    fn test_unknown_property_is_ignored() {
        let r = rig(UpdateMethod::Delayed);
        r.scene.set(r.entity.id, "s_bogus", 1.0);
        assert!(matches!(
            r.factory.on_property_write(&r.entity, "s_bogus"),
            WriteOutcome::Ignored
        ));
    }
}
