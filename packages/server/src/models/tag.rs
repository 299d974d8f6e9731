use serde::{Deserialize, Serialize};

use crate::entity::tag;
use crate::error::AppError;
use crate::models::shared::Validator;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TagRequest {
    #[schema(example = "Quantum")]
    pub name: String,
    /// Explicit slug. Generated from the name when omitted.
    pub slug: Option<String>,
}

pub fn validate_tag_request(payload: &TagRequest) -> Result<(), AppError> {
    Validator::new()
        .text("name", &payload.name, "Name", 100)
        .finish()
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagResponse {
    pub id: i32,
    #[schema(example = "Quantum")]
    pub name: String,
    #[schema(example = "quantum")]
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagListResponse {
    pub data: Vec<TagResponse>,
}
