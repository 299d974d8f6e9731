use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::category;
use crate::error::AppError;
use crate::models::shared::{Validator, double_option};

const MAX_NAME: usize = 255;
const MAX_DESCRIPTION: usize = 2000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    #[schema(example = "Science")]
    pub name: String,
    /// Explicit slug. Generated from the name when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Sort key for public listings (ascending). Default: 0.
    pub display_order: Option<i32>,
    /// Default: true.
    pub is_active: Option<bool>,
}

pub fn validate_create_category(payload: &CreateCategoryRequest) -> Result<(), AppError> {
    Validator::new()
        .text("name", &payload.name, "Name", MAX_NAME)
        .max_len("description", payload.description.as_deref(), "Description", MAX_DESCRIPTION)
        .finish()
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

pub fn validate_update_category(payload: &UpdateCategoryRequest) -> Result<(), AppError> {
    let mut v = Validator::new();
    if let Some(name) = &payload.name {
        v.text("name", name, "Name", MAX_NAME);
    }
    v.max_len(
        "description",
        payload.description.as_ref().and_then(|d| d.as_deref()),
        "Description",
        MAX_DESCRIPTION,
    )
    .finish()
}

/// Category as embedded in an article.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryRef {
    pub id: i32,
    #[schema(example = "Science")]
    pub name: String,
    #[schema(example = "science")]
    pub slug: String,
}

impl From<&category::Model> for CategoryRef {
    fn from(c: &category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    #[schema(example = "Science")]
    pub name: String,
    #[schema(example = "science")]
    pub slug: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(c: category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            display_order: c.display_order,
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryListResponse {
    pub data: Vec<CategoryResponse>,
}

/// A public category page.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryArticlesResponse {
    pub category: CategoryResponse,
    pub data: Vec<crate::models::article::ArticleSummary>,
    pub pagination: crate::models::shared::Pagination,
}
