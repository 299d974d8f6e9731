use std::sync::Arc;

use common::PublicationJob;
use mq::{BroccoliError, BrokerMessage, Mq};
use tracing::{error, info};

use crate::notifications::PublicationDelivery;

/// Consume publication jobs and fan each one out to every user.
pub async fn consume_publication_events(
    delivery: Arc<PublicationDelivery>,
    mq: Arc<Mq>,
    queue_name: String,
    concurrency: usize,
) {
    info!(queue = %queue_name, concurrency, "Starting publication event consumer");

    let result = mq
        .process_messages(
            &queue_name,
            Some(concurrency.max(1)),
            None,
            move |message: BrokerMessage<PublicationJob>| {
                let delivery = Arc::clone(&delivery);
                async move {
                    let job = message.payload;
                    match delivery.deliver(job.event_id).await {
                        Ok(outcome) => {
                            info!(
                                event_id = %job.event_id,
                                article_id = job.article_id,
                                ?outcome,
                                "Publication job processed"
                            );
                            Ok(())
                        }
                        Err(e) => {
                            error!(
                                event_id = %job.event_id,
                                article_id = job.article_id,
                                error = %e,
                                "Failed to process publication job"
                            );
                            Err(BroccoliError::Job(e.to_string()))
                        }
                    }
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Publication event consumer stopped unexpectedly");
    }
}
