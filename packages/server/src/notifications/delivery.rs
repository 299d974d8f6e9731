use std::sync::Arc;

use chrono::Utc;
use common::publication::ARTICLE_PUBLISHED;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SiteConfig;
use crate::entity::{article, category, notification, publication_event, user};
use crate::models::notification::ArticlePublishedData;
use crate::notifications::mailer::{Mailer, OutgoingMail};

/// Recipients loaded per page while fanning out.
const RECIPIENT_BATCH: u64 = 200;

/// Result of handling one publication event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Another delivery already claimed the event.
    AlreadyDispatched,
    /// The article was removed before delivery.
    ArticleGone,
    Delivered { recipients: u64, failures: u64 },
}

/// Fans a publication event out to every user: one in-app notification row
/// and one email each.
pub struct PublicationDelivery {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
}

impl PublicationDelivery {
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, site: SiteConfig) -> Self {
        Self { db, mailer, site }
    }

    /// Deliver the event with `event_id` unless some other delivery got there first.
    ///
    /// The outbox row is claimed before any recipient is contacted, so a
    /// redelivered job is a no-op. Per-recipient failures are logged and
    /// counted, never returned.
    pub async fn deliver(&self, event_id: Uuid) -> Result<DeliveryOutcome, DbErr> {
        let claimed = publication_event::Entity::update_many()
            .col_expr(
                publication_event::Column::DispatchedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(publication_event::Column::Id.eq(event_id))
            .filter(publication_event::Column::DispatchedAt.is_null())
            .exec(&self.db)
            .await?;
        if claimed.rows_affected != 1 {
            debug!(%event_id, "Publication event already dispatched, skipping");
            return Ok(DeliveryOutcome::AlreadyDispatched);
        }

        let Some(event) = publication_event::Entity::find_by_id(event_id).one(&self.db).await? else {
            return Ok(DeliveryOutcome::ArticleGone);
        };
        let Some(article) = article::Entity::find_by_id(event.article_id).one(&self.db).await? else {
            warn!(%event_id, article_id = event.article_id, "Published article no longer exists");
            return Ok(DeliveryOutcome::ArticleGone);
        };
        let category_name = category::Entity::find_by_id(article.category_id)
            .one(&self.db)
            .await?
            .map(|c| c.name);

        let data = ArticlePublishedData {
            article_id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            excerpt: article.excerpt.clone(),
            category: category_name,
        };
        let payload = serde_json::to_value(&data).map_err(|e| DbErr::Custom(e.to_string()))?;

        let mut recipients = 0u64;
        let mut failures = 0u64;
        let mut pages = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .paginate(&self.db, RECIPIENT_BATCH);

        while let Some(users) = pages.fetch_and_next().await? {
            for recipient in users {
                recipients += 1;
                if !self.notify_one(event_id, &recipient, &data, &payload).await {
                    failures += 1;
                }
            }
        }

        info!(
            %event_id,
            article_id = article.id,
            recipients,
            failures,
            "Publication event delivered"
        );
        Ok(DeliveryOutcome::Delivered {
            recipients,
            failures,
        })
    }

    /// Store the in-app notification and send the email. Each channel is
    /// attempted regardless of the other; returns whether both succeeded.
    async fn notify_one(
        &self,
        event_id: Uuid,
        recipient: &user::Model,
        data: &ArticlePublishedData,
        payload: &serde_json::Value,
    ) -> bool {
        let mut delivered = true;

        let stored = notification::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(recipient.id),
            kind: Set(ARTICLE_PUBLISHED.to_string()),
            data: Set(payload.clone()),
            read_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await;
        if let Err(e) = stored {
            delivered = false;
            warn!(%event_id, user_id = recipient.id, error = %e, "Failed to store in-app notification");
        }

        if let Err(e) = self.mailer.send(&render_mail(&self.site, recipient, data)).await {
            delivered = false;
            warn!(%event_id, user_id = recipient.id, error = %e, "Failed to email recipient");
        }

        delivered
    }
}

/// The "new article published" email for one recipient.
pub fn render_mail(site: &SiteConfig, recipient: &user::Model, data: &ArticlePublishedData) -> OutgoingMail {
    let mut body = format!("Hello {}!\n\nA new article has been published: {}\n", recipient.name, data.title);
    if let Some(excerpt) = &data.excerpt {
        body.push('\n');
        body.push_str(excerpt);
        body.push('\n');
    }
    body.push_str(&format!(
        "\nRead Article: {}\n\nThank you for reading {}!\n",
        site.url(&format!("article/{}", data.slug)),
        site.name
    ));

    OutgoingMail {
        to_name: recipient.name.clone(),
        to_email: recipient.email.clone(),
        subject: format!("New Article Published: {}", data.title),
        body,
    }
}
