use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::content::slug;
use crate::entity::{article_tag, tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::tag::{TagListResponse, TagRequest, TagResponse, validate_tag_request};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Tags",
    operation_id = "listTags",
    summary = "List tags by name",
    responses(
        (status = 200, description = "Tags", body = TagListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_tags(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TagListResponse>, AppError> {
    auth_user.require_any_permission(&["tag:manage", "article:create", "article:edit"])?;

    let data = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();
    Ok(Json(TagListResponse { data }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Tags",
    operation_id = "createTag",
    summary = "Create a tag",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Slug already in use (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<TagRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("tag:manage")?;
    validate_tag_request(&payload)?;

    let name = payload.name.trim().to_string();
    let now = Utc::now();
    let model = slug::insert_with_slug::<tag::Entity, _, _, _>(
        &state.db,
        &name,
        payload.slug.map(|s| s.trim().to_string()),
        |slug| tag::ActiveModel {
            name: Set(name.clone()),
            slug: Set(slug),
            created_at: Set(now),
            ..Default::default()
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(TagResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Tags",
    operation_id = "updateTag",
    summary = "Rename a tag",
    description = "Renaming regenerates the slug unless a slug is given.",
    params(("id" = i32, Path, description = "Tag ID")),
    request_body = TagRequest,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slug already in use (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn update_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<TagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    auth_user.require_permission("tag:manage")?;
    validate_tag_request(&payload)?;

    let existing = tag::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    let name = payload.name.trim().to_string();
    let new_slug = match payload.slug.as_deref().map(str::trim) {
        Some(explicit) if explicit != existing.slug => {
            slug::ensure_available::<tag::Entity, _>(&state.db, explicit, Some(id)).await?;
            Some(explicit.to_string())
        }
        Some(_) => None,
        None if name != existing.name => {
            Some(slug::unique_slug::<tag::Entity, _>(&state.db, &name, Some(id)).await?)
        }
        None => None,
    };

    let mut active: tag::ActiveModel = existing.into();
    active.name = Set(name);
    if let Some(slug) = new_slug {
        active.slug = Set(slug);
    }

    let model = active.update(&state.db).await.map_err(|e| {
        if slug::is_unique_violation(&e) {
            AppError::Conflict("Slug is already in use".into())
        } else {
            AppError::from(e)
        }
    })?;
    Ok(Json(TagResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Tags",
    operation_id = "deleteTag",
    summary = "Delete a tag",
    description = "Detaches the tag from every article, then deletes it.",
    params(("id" = i32, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_tag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("tag:manage")?;

    let txn = state.db.begin().await?;
    article_tag::Entity::delete_many()
        .filter(article_tag::Column::TagId.eq(id))
        .exec(&txn)
        .await?;
    let result = tag::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Tag not found".into()));
    }
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
