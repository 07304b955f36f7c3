use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// User-facing report of a dispatch problem. Never blocks the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineNotice {
    HandlerFailed {
        entity: String,
        property: String,
        message: String,
        at: DateTime<Utc>,
    },
    UnknownProperty {
        entity: String,
        property: String,
        at: DateTime<Utc>,
    },
}

impl EngineNotice {
    pub fn handler_failed(
        entity: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineNotice::HandlerFailed {
            entity: entity.into(),
            property: property.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn unknown_property(entity: impl Into<String>, property: impl Into<String>) -> Self {
        EngineNotice::UnknownProperty {
            entity: entity.into(),
            property: property.into(),
            at: Utc::now(),
        }
    }

    pub fn property(&self) -> &str {
        match self {
            EngineNotice::HandlerFailed { property, .. }
            | EngineNotice::UnknownProperty { property, .. } => property,
        }
    }
}

/// Host-side receiver, e.g. a status bar or report popup.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: &EngineNotice);
}

pub struct NoticeHub {
    sink: Option<Arc<dyn NoticeSink>>,
    tx: broadcast::Sender<EngineNotice>,
}

impl NoticeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { sink: None, tx }
    }

    pub fn set_sink(&mut self, sink: Arc<dyn NoticeSink>) {
        self.sink = Some(sink);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotice> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notice: EngineNotice) {
        if let Some(sink) = &self.sink {
            sink.notify(&notice);
        }
        // No subscribers is fine.
        if self.tx.send(notice).is_err() {
            trace!("notice dropped, no subscribers");
        }
    }
}

impl Default for NoticeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<EngineNotice>>);

    impl NoticeSink for Collect {
        fn notify(&self, notice: &EngineNotice) {
            self.0.lock().push(notice.clone());
        }
    }

    #[tokio::test]
    async fn test_notices_reach_sink_and_subscribers() {
        let sink = Arc::new(Collect::default());
        let mut hub = NoticeHub::new(8);
        hub.set_sink(sink.clone());
        let mut rx = hub.subscribe();

        hub.publish(EngineNotice::unknown_property("Grass", "s_bogus"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.property(), "s_bogus");
        assert_eq!(sink.0.lock().len(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = NoticeHub::default();
        hub.publish(EngineNotice::handler_failed("Grass", "s_scale_default_value", "boom"));
    }
}
