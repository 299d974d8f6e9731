use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub article_id: i32,
    #[sea_orm(belongs_to, from = "article_id", to = "id")]
    pub article: HasOne<super::article::Entity>,

    /// `featured_image` (single) or `gallery` (ordered).
    pub collection: String,

    /// Storage-safe ASCII name, `<uuid>.<ext>`.
    pub file_name: String,
    /// Display name derived from the uploaded filename.
    pub name: String,
    /// Key in the media store, e.g. `articles/12/<uuid>.jpg`.
    pub storage_key: String,
    pub mime_type: String,
    pub size: i64,
    /// SHA-256 of the stored bytes.
    pub checksum: String,
    #[sea_orm(default_value = 0)]
    pub position: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
