use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::content::slug;
use crate::entity::{article, category};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::category::{
    CategoryListResponse, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest,
    validate_create_category, validate_update_category,
};
use crate::models::shared::non_blank;
use crate::state::AppState;

async fn find_category(db: &DatabaseConnection, id: i32) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List all categories",
    description = "Includes inactive categories. Ordered by display order, then name.",
    responses(
        (status = 200, description = "Categories", body = CategoryListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_categories(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    auth_user.require_any_permission(&["category:manage", "article:create", "article:edit"])?;

    let data = category::Entity::find()
        .order_by_asc(category::Column::DisplayOrder)
        .order_by_asc(category::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(CategoryResponse::from)
        .collect();
    Ok(Json(CategoryListResponse { data }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Create a category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Slug already in use (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("category:manage")?;
    validate_create_category(&payload)?;

    let now = Utc::now();
    let name = payload.name.trim().to_string();
    let description = non_blank(payload.description);
    let explicit_slug = payload.slug.map(|s| s.trim().to_string());

    let model = slug::insert_with_slug::<category::Entity, _, _, _>(
        &state.db,
        &name,
        explicit_slug,
        |slug| category::ActiveModel {
            name: Set(name.clone()),
            slug: Set(slug),
            description: Set(description.clone()),
            display_order: Set(payload.display_order.unwrap_or(0)),
            is_active: Set(payload.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        },
    )
    .await?;

    info!(category_id = model.id, slug = %model.slug, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Categories",
    operation_id = "updateCategory",
    summary = "Update a category",
    description = "Partial update. Renaming regenerates the slug unless a slug is given.",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slug already in use (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn update_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    auth_user.require_permission("category:manage")?;
    validate_update_category(&payload)?;

    let existing = find_category(&state.db, id).await?;
    let mut active: category::ActiveModel = existing.clone().into();

    let renamed = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| *name != existing.name);
    match payload.slug.as_deref().map(str::trim) {
        Some(explicit) if explicit != existing.slug => {
            slug::ensure_available::<category::Entity, _>(&state.db, explicit, Some(id)).await?;
            active.slug = Set(explicit.to_string());
        }
        Some(_) => {}
        None => {
            if let Some(name) = renamed {
                active.slug =
                    Set(slug::unique_slug::<category::Entity, _>(&state.db, name, Some(id)).await?);
            }
        }
    }
    if let Some(name) = renamed {
        active.name = Set(name.to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(non_blank(description));
    }
    if let Some(order) = payload.display_order {
        active.display_order = Set(order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());

    let model = active.update(&state.db).await.map_err(|e| {
        if slug::is_unique_violation(&e) {
            AppError::Conflict("Slug is already in use".into())
        } else {
            AppError::from(e)
        }
    })?;
    Ok(Json(CategoryResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    operation_id = "deleteCategory",
    summary = "Delete an empty category",
    description = "Refused while any article, trashed ones included, still belongs to the category.",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Category still has articles (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("category:manage")?;
    find_category(&state.db, id).await?;

    let articles = article::Entity::find()
        .filter(article::Column::CategoryId.eq(id))
        .count(&state.db)
        .await?;
    if articles > 0 {
        return Err(AppError::Conflict(format!(
            "Category still has {articles} article(s)"
        )));
    }

    category::Entity::delete_by_id(id).exec(&state.db).await?;
    info!(category_id = id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
