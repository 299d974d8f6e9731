use chrono::{DateTime, Utc};
use common::storage::{MediaStore, StorageKey};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::media;

/// Media collection an upload belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    /// At most one per article; a new upload replaces the old one.
    FeaturedImage,
    /// Ordered list of images.
    Gallery,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::FeaturedImage => "featured_image",
            Collection::Gallery => "gallery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "featured_image" => Some(Collection::FeaturedImage),
            "gallery" => Some(Collection::Gallery),
            _ => None,
        }
    }

    pub fn is_single(self) -> bool {
        matches!(self, Collection::FeaturedImage)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaResponse {
    pub id: Uuid,
    pub article_id: i32,
    #[schema(example = "gallery")]
    pub collection: String,
    /// Display name derived from the uploaded file name.
    #[schema(example = "Lab photo.jpg")]
    pub name: String,
    /// Name of the stored file.
    #[schema(example = "0f8fad5b-d9cb-469f-a165-70867728950e.jpg")]
    pub file_name: String,
    #[schema(example = "image/jpeg")]
    pub mime_type: String,
    pub size: i64,
    /// SHA-256 of the stored bytes, hex encoded.
    pub checksum: String,
    pub position: i32,
    /// Public URL of the file.
    #[schema(example = "/media/articles/7/0f8fad5b-d9cb-469f-a165-70867728950e.jpg")]
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl MediaResponse {
    pub fn new(m: media::Model, store: &dyn MediaStore) -> Self {
        let url = StorageKey::parse(&m.storage_key)
            .map(|key| store.url(&key))
            .unwrap_or_default();
        Self {
            id: m.id,
            article_id: m.article_id,
            collection: m.collection,
            name: m.name,
            file_name: m.file_name,
            mime_type: m.mime_type,
            size: m.size,
            checksum: m.checksum,
            position: m.position,
            url,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaListResponse {
    pub data: Vec<MediaResponse>,
}
