use std::sync::Arc;

use async_trait::async_trait;
use common::PublicationJob;
use mq::{JobQueue, MqError};
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::entity::publication_event;
use crate::notifications::delivery::PublicationDelivery;

/// Hands committed publication events to whatever delivers them.
///
/// Called after the publishing transaction commits; implementations must
/// return without waiting for delivery.
#[async_trait]
pub trait PublicationNotifier: Send + Sync {
    async fn notify(&self, event: &publication_event::Model) -> Result<(), MqError>;
}

/// Publishes a [`PublicationJob`] for the background consumer.
pub struct QueueNotifier {
    queue: Arc<dyn JobQueue>,
    queue_name: String,
}

impl QueueNotifier {
    pub fn new(queue: Arc<dyn JobQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl PublicationNotifier for QueueNotifier {
    async fn notify(&self, event: &publication_event::Model) -> Result<(), MqError> {
        let job = PublicationJob::new(event.id, event.article_id);
        self.queue.enqueue(&self.queue_name, &job).await
    }
}

/// Delivers on a spawned task in this process. Used when the queue is disabled.
pub struct InProcessNotifier {
    delivery: Arc<PublicationDelivery>,
    tracker: TaskTracker,
}

impl InProcessNotifier {
    pub fn new(delivery: Arc<PublicationDelivery>) -> Self {
        Self {
            delivery,
            tracker: TaskTracker::new(),
        }
    }

    /// Wait until every delivery spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[async_trait]
impl PublicationNotifier for InProcessNotifier {
    async fn notify(&self, event: &publication_event::Model) -> Result<(), MqError> {
        let delivery = Arc::clone(&self.delivery);
        let event_id = event.id;
        self.tracker.spawn(async move {
            match delivery.deliver(event_id).await {
                Ok(outcome) => debug!(%event_id, ?outcome, "In-process delivery finished"),
                Err(e) => error!(%event_id, error = %e, "In-process delivery failed"),
            }
        });
        Ok(())
    }
}

/// Notify and log failures. The outbox sweeper retries events whose hand-off failed.
pub async fn dispatch(notifier: &dyn PublicationNotifier, event: Option<&publication_event::Model>) {
    let Some(event) = event else {
        return;
    };
    if let Err(e) = notifier.notify(event).await {
        error!(
            event_id = %event.id,
            article_id = event.article_id,
            error = %e,
            "Failed to hand off publication event"
        );
    }
}
