use async_trait::async_trait;
pub use broccoli_queue::{
    brokers::broker::BrokerMessage,
    error::BroccoliError,
    queue::BroccoliQueue,
};
use common::PublicationJob;
use tracing::debug;

use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}

/// Producer side of the publication queue.
///
/// The server depends on this trait rather than on the broker so the
/// enqueue path can be exercised without Redis.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, queue: &str, job: &PublicationJob) -> Result<(), MqError>;
}

#[async_trait]
impl JobQueue for BroccoliQueue {
    async fn enqueue(&self, queue: &str, job: &PublicationJob) -> Result<(), MqError> {
        self.publish(queue, None, job, None)
            .await
            .map_err(|e| MqError::Publish {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;

        debug!(
            queue,
            event_id = %job.event_id,
            article_id = job.article_id,
            "Publication job enqueued"
        );
        Ok(())
    }
}
