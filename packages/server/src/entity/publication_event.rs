use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outbox row written in the same transaction as a publish transition.
///
/// `dispatched_at` is set by whichever delivery claims the event first;
/// a non-null value means recipients have already been handled.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publication_event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub article_id: i32,
    #[sea_orm(belongs_to, from = "article_id", to = "id")]
    pub article: HasOne<super::article::Entity>,

    pub created_at: DateTimeUtc,
    pub dispatched_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
