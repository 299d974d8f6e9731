use chrono::{DateTime, Utc};
use common::ArticleStatus;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::category::CategoryRef;
use crate::models::media::MediaResponse;
use crate::models::shared::{Pagination, Validator, double_option};
use crate::models::tag::TagResponse;

const MAX_TITLE: usize = 255;
const MAX_EXCERPT: usize = 1000;
const MAX_META_TITLE: usize = 255;
const MAX_META_DESCRIPTION: usize = 500;
const MAX_META_KEYWORDS: usize = 255;
const MAX_TAGS: usize = 50;

/// Request body for creating an article.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateArticleRequest {
    /// Article title (1-255 characters).
    #[schema(example = "A quantum computing breakthrough")]
    pub title: String,
    /// Explicit slug. Generated from the title when omitted.
    #[schema(example = "quantum-breakthrough")]
    pub slug: Option<String>,
    /// Short summary shown in listings (max 1000 characters).
    pub excerpt: Option<String>,
    /// Rich-text body, stored as-is.
    #[schema(example = "<p>Researchers announced...</p>")]
    pub content: String,
    /// Initial status: `draft` (default) or `published`.
    pub status: Option<ArticleStatus>,
    /// Whether the article is featured on the home page.
    pub is_featured: Option<bool>,
    /// Publication date. Defaults to now when created as `published`.
    pub published_at: Option<DateTime<Utc>>,
    /// Owning category ID.
    #[schema(example = 1)]
    pub category_id: i32,
    /// Tag IDs to attach.
    #[serde(default)]
    pub tag_ids: Vec<i32>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

pub fn validate_create_article(payload: &CreateArticleRequest) -> Result<(), AppError> {
    Validator::new()
        .text("title", &payload.title, "Title", MAX_TITLE)
        .check(
            !payload.content.trim().is_empty(),
            "content",
            "Content must not be empty",
        )
        .max_len("excerpt", payload.excerpt.as_deref(), "Excerpt", MAX_EXCERPT)
        .check(payload.tag_ids.len() <= MAX_TAGS, "tag_ids", "Too many tags")
        .max_len("meta_title", payload.meta_title.as_deref(), "Meta title", MAX_META_TITLE)
        .max_len(
            "meta_description",
            payload.meta_description.as_deref(),
            "Meta description",
            MAX_META_DESCRIPTION,
        )
        .max_len(
            "meta_keywords",
            payload.meta_keywords.as_deref(),
            "Meta keywords",
            MAX_META_KEYWORDS,
        )
        .finish()
}

/// Request body for updating an article. All fields are optional (PATCH semantics).
#[derive(Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    /// New explicit slug. The slug is otherwise regenerated only when the title changes.
    pub slug: Option<String>,
    /// Set to `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    /// Lifecycle target: draft -> published -> archived -> published.
    pub status: Option<ArticleStatus>,
    pub is_featured: Option<bool>,
    /// Set to `null` to clear (ignored when the update publishes the article).
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub category_id: Option<i32>,
    /// Replaces the full tag set when present.
    pub tag_ids: Option<Vec<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_keywords: Option<Option<String>>,
}

impl UpdateArticleRequest {
    /// A status-only update, used by the publish/archive shortcuts.
    pub fn status(status: ArticleStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

pub fn validate_update_article(payload: &UpdateArticleRequest) -> Result<(), AppError> {
    let mut v = Validator::new();
    if let Some(title) = &payload.title {
        v.text("title", title, "Title", MAX_TITLE);
    }
    if let Some(content) = &payload.content {
        v.check(!content.trim().is_empty(), "content", "Content must not be empty");
    }
    if let Some(tags) = &payload.tag_ids {
        v.check(tags.len() <= MAX_TAGS, "tag_ids", "Too many tags");
    }
    v.max_len("excerpt", payload.excerpt.as_ref().and_then(|e| e.as_deref()), "Excerpt", MAX_EXCERPT)
        .max_len(
            "meta_title",
            payload.meta_title.as_ref().and_then(|e| e.as_deref()),
            "Meta title",
            MAX_META_TITLE,
        )
        .max_len(
            "meta_description",
            payload.meta_description.as_ref().and_then(|e| e.as_deref()),
            "Meta description",
            MAX_META_DESCRIPTION,
        )
        .max_len(
            "meta_keywords",
            payload.meta_keywords.as_ref().and_then(|e| e.as_deref()),
            "Meta keywords",
            MAX_META_KEYWORDS,
        )
        .finish()
}

/// Which rows the admin listing includes with respect to the trash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrashedFilter {
    /// Only live articles.
    #[default]
    Exclude,
    /// Live and trashed articles.
    Include,
    /// Only trashed articles.
    Only,
}

/// Query parameters for the admin article listing.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminArticleListQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    pub per_page: Option<u64>,
    /// Filter by status.
    pub status: Option<ArticleStatus>,
    /// Filter by category.
    pub category_id: Option<i32>,
    /// `exclude` (default), `include` or `only`.
    pub trashed: Option<TrashedFilter>,
    /// Case-insensitive title substring.
    pub search: Option<String>,
    /// `created_at` (default), `updated_at`, `published_at`, `title` or `views`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

/// Author as shown on an article.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthorRef {
    pub id: i32,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
}

/// Article as shown in listings.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ArticleSummary {
    #[schema(example = 7)]
    pub id: i32,
    pub title: String,
    #[schema(example = "quantum-breakthrough")]
    pub slug: String,
    pub excerpt: Option<String>,
    pub status: ArticleStatus,
    pub is_featured: bool,
    pub views: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub category: Option<CategoryRef>,
    pub author: Option<AuthorRef>,
    /// Public URL of the featured image, if any.
    pub featured_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the article is in the trash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// SEO metadata of an article.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ArticleMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
}

/// Full article.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub summary: ArticleSummary,
    /// Rich-text body, returned verbatim.
    pub content: String,
    pub meta: ArticleMeta,
    pub tags: Vec<TagResponse>,
    pub media: Vec<MediaResponse>,
    /// Up to four other public articles of the same category (public endpoint only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<Vec<ArticleSummary>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ArticleListResponse {
    pub data: Vec<ArticleSummary>,
    pub pagination: Pagination,
}

/// Query parameters for `GET /search`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Free text. Operators and punctuation are ignored; the last word matches as a prefix.
    pub q: Option<String>,
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 12.
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    /// The query as received (trimmed).
    pub query: String,
    /// Number of matching articles.
    pub total: u64,
    pub data: Vec<ArticleSummary>,
    pub pagination: Pagination,
}

/// Landing page content.
#[derive(Serialize, utoipa::ToSchema)]
pub struct HomeResponse {
    /// Up to five latest featured articles.
    pub featured: Vec<ArticleSummary>,
    /// Up to twelve latest articles.
    pub latest: Vec<ArticleSummary>,
    /// Active categories in display order.
    pub categories: Vec<crate::models::category::CategoryResponse>,
}
