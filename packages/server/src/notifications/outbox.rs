use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::*;
use tracing::{error, info, warn};

use crate::config::OutboxConfig;
use crate::entity::publication_event;
use crate::notifications::notifier::PublicationNotifier;

/// Re-hand undispatched publication events to the notifier on an interval.
///
/// Covers the window between a publishing commit and a failed or lost
/// enqueue. Delivery claims each event, so handing one off twice is harmless.
pub async fn run_outbox_sweeper(
    db: DatabaseConnection,
    notifier: Arc<dyn PublicationNotifier>,
    config: OutboxConfig,
) {
    info!(
        interval_secs = config.sweep_interval_secs,
        redeliver_after_secs = config.redeliver_after_secs,
        "Starting publication outbox sweeper"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(Ord::max(config.sweep_interval_secs, 1)));
    let grace = chrono::Duration::seconds(config.redeliver_after_secs);

    loop {
        interval.tick().await;

        if let Err(e) = sweep_once(&db, notifier.as_ref(), Utc::now() - grace).await {
            error!(error = %e, "Outbox sweep failed");
        }
    }
}

/// Hand off every undispatched event created before `older_than`.
/// Returns how many were handed off successfully.
pub async fn sweep_once(
    db: &DatabaseConnection,
    notifier: &dyn PublicationNotifier,
    older_than: chrono::DateTime<Utc>,
) -> anyhow::Result<usize> {
    let pending = publication_event::Entity::find()
        .filter(publication_event::Column::DispatchedAt.is_null())
        .filter(publication_event::Column::CreatedAt.lt(older_than))
        .order_by_asc(publication_event::Column::CreatedAt)
        .all(db)
        .await?;

    if pending.is_empty() {
        return Ok(0);
    }

    info!(count = pending.len(), "Re-dispatching pending publication events");

    let mut handed_off = 0;
    for event in &pending {
        match notifier.notify(event).await {
            Ok(()) => handed_off += 1,
            Err(e) => warn!(
                event_id = %event.id,
                article_id = event.article_id,
                error = %e,
                "Failed to re-dispatch publication event"
            ),
        }
    }
    Ok(handed_off)
}
