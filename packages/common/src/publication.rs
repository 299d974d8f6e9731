use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message handed to the notification consumer after a publish transition commits.
///
/// Carries only identifiers: the consumer reloads the article and the
/// recipients so a delayed delivery never sends stale content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationJob {
    /// Outbox row id (`publication_event.id`), used to claim the event exactly once.
    pub event_id: Uuid,
    pub article_id: i32,
    pub queued_at: DateTime<Utc>,
}

impl PublicationJob {
    pub fn new(event_id: Uuid, article_id: i32) -> Self {
        Self {
            event_id,
            article_id,
            queued_at: Utc::now(),
        }
    }
}

/// Kind tag stored on in-app notification rows.
pub const ARTICLE_PUBLISHED: &str = "article_published";
