use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use scatter_core::{CameraUpdateMethod, SceneHost, Scheduler, SharedConfig, TaskControl};

use crate::{transform_hash, CameraCache, UpdateOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Applied(UpdateOutcome),
    /// A delayed application was scheduled.
    Scheduled,
    /// Waiting for an explicit [`CameraDelivery::apply_now`].
    Deferred,
    /// A timer or halt poll is already waiting; nothing new was scheduled.
    AlreadyPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryState {
    Idle,
    Scheduled,
    Polling { last_transform: u64 },
}

/// Decides when camera movement reaches [`CameraCache::maybe_update_camera`].
pub struct CameraDelivery {
    cache: Arc<CameraCache>,
    host: Arc<dyn SceneHost>,
    scheduler: Arc<dyn Scheduler>,
    config: SharedConfig,
    state: Arc<Mutex<DeliveryState>>,
}

impl CameraDelivery {
    pub fn new(
        cache: Arc<CameraCache>,
        host: Arc<dyn SceneHost>,
        scheduler: Arc<dyn Scheduler>,
        config: SharedConfig,
    ) -> Self {
        Self {
            cache,
            host,
            scheduler,
            config,
            state: Arc::new(Mutex::new(DeliveryState::Idle)),
        }
    }

    pub fn cache(&self) -> &Arc<CameraCache> {
        &self.cache
    }

    pub fn is_pending(&self) -> bool {
        *self.state.lock() != DeliveryState::Idle
    }

    /// Host notification that the scene camera may have changed.
    pub fn camera_moved(&self) -> DeliveryOutcome {
        if self.cache.is_current() {
            return DeliveryOutcome::Applied(UpdateOutcome::Unchanged);
        }
        let camera = self.config.load().camera.clone();
        match camera.update_method {
            CameraUpdateMethod::Realtime => {
                DeliveryOutcome::Applied(self.cache.maybe_update_camera(false))
            }
            CameraUpdateMethod::Apply => DeliveryOutcome::Deferred,
            CameraUpdateMethod::Delayed if camera.update_delay().is_zero() => {
                DeliveryOutcome::Applied(self.cache.maybe_update_camera(false))
            }
            CameraUpdateMethod::Delayed => self.schedule_delayed(camera.update_delay()),
            CameraUpdateMethod::OnHalt => self.start_halt_poll(camera.halt_poll()),
        }
    }

    /// Push the current camera regardless of the cached hash.
    pub fn apply_now(&self) -> UpdateOutcome {
        self.cache.maybe_update_camera(true)
    }

    fn schedule_delayed(&self, delay: Duration) -> DeliveryOutcome {
        {
            let mut state = self.state.lock();
            if *state != DeliveryState::Idle {
                return DeliveryOutcome::AlreadyPending;
            }
            *state = DeliveryState::Scheduled;
        }
        let cache = self.cache.clone();
        let state = self.state.clone();
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                *state.lock() = DeliveryState::Idle;
                let outcome = cache.maybe_update_camera(false);
                debug!(?outcome, "delayed camera update fired");
                TaskControl::Done
            }),
        );
        DeliveryOutcome::Scheduled
    }

    fn start_halt_poll(&self, period: Duration) -> DeliveryOutcome {
        let Some(camera) = self.host.active_camera() else {
            return DeliveryOutcome::Applied(self.cache.maybe_update_camera(false));
        };
        {
            let mut state = self.state.lock();
            if *state != DeliveryState::Idle {
                return DeliveryOutcome::AlreadyPending;
            }
            *state = DeliveryState::Polling {
                last_transform: transform_hash(&camera),
            };
        }
        let cache = self.cache.clone();
        let host = self.host.clone();
        let state = self.state.clone();
        self.scheduler.schedule(
            period,
            Box::new(move || {
                let current = host.active_camera().map(|c| transform_hash(&c));
                {
                    let mut state = state.lock();
                    if let (DeliveryState::Polling { last_transform }, Some(current)) =
                        (&mut *state, current)
                    {
                        if *last_transform != current {
                            trace!("camera still moving");
                            *last_transform = current;
                            return TaskControl::RunAgainIn(period);
                        }
                    }
                    *state = DeliveryState::Idle;
                }
                let outcome = cache.maybe_update_camera(false);
                debug!(?outcome, "camera halted, update applied");
                TaskControl::Done
            }),
        );
        DeliveryOutcome::Scheduled
    }
}
