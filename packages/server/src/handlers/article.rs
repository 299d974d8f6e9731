use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::ArticleStatus;
use common::storage::StorageKey;
use sea_orm::TransactionTrait;
use tracing::{instrument, warn};

use crate::content::{ArticleService, Written, present};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::article::{
    AdminArticleListQuery, ArticleDetail, ArticleListResponse, CreateArticleRequest,
    UpdateArticleRequest, validate_create_article, validate_update_article,
};
use crate::notifications::dispatch;
use crate::state::AppState;

/// Hand any publication event to the notifier, then render the article.
async fn finish_write(state: &AppState, written: Written) -> Result<ArticleDetail, AppError> {
    dispatch(state.notifier.as_ref(), written.event.as_ref()).await;
    Ok(present::detail(&state.db, state.media.as_ref(), written.article, None).await?)
}

/// Moving out of draft or archiving needs the publish permission on top of edit.
fn require_status_permission(auth_user: &AuthUser, status: Option<ArticleStatus>) -> Result<(), AppError> {
    match status {
        Some(ArticleStatus::Published | ArticleStatus::Archived) => {
            auth_user.require_permission("article:publish")
        }
        _ => Ok(()),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Articles",
    operation_id = "listArticles",
    summary = "List articles for authoring",
    description = "Paginated listing over all statuses. Filters: `status`, `category_id`, `trashed` (`exclude` by default, `include`, `only`), `search` (case-insensitive title match). Sort by `created_at` (default, desc), `updated_at`, `published_at`, `title` or `views`.",
    params(AdminArticleListQuery),
    responses(
        (status = 200, description = "Article page", body = ArticleListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 422, description = "Invalid sort field (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_articles(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AdminArticleListQuery>,
) -> Result<Json<ArticleListResponse>, AppError> {
    auth_user.require_any_permission(&["article:create", "article:edit"])?;

    let listing = ArticleService::new(&state.db).admin_listing(&query).await?;
    Ok(Json(ArticleListResponse {
        data: present::summaries(&state.db, state.media.as_ref(), listing.articles).await?,
        pagination: listing.pagination,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Articles",
    operation_id = "createArticle",
    summary = "Create an article",
    description = "Creates a draft, or publishes immediately when `status` is `published` (requires `article:publish`). A published article notifies every user once. The slug is derived from the title unless given.",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Explicit slug already in use (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("article:create")?;
    require_status_permission(&auth_user, payload.status)?;
    validate_create_article(&payload)?;

    let txn = state.db.begin().await?;
    let written = ArticleService::new(&txn)
        .create(auth_user.user_id, payload)
        .await?;
    txn.commit().await?;

    let detail = finish_write(&state, written).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Articles",
    operation_id = "getArticle",
    summary = "Get an article for editing",
    description = "Returns any article, including drafts and trashed ones.",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article", body = ArticleDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleDetail>, AppError> {
    auth_user.require_any_permission(&["article:create", "article:edit"])?;

    let article = ArticleService::new(&state.db).find(id).await?;
    Ok(Json(
        present::detail(&state.db, state.media.as_ref(), article, None).await?,
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Articles",
    operation_id = "updateArticle",
    summary = "Update an article",
    description = "Partial update. A `status` change must follow draft -> published -> archived -> published; publishing or archiving requires `article:publish`. Trashed articles must be restored first.",
    params(("id" = i32, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = ArticleDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Trashed, or slug already in use (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Validation error or illegal transition (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn update_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateArticleRequest>,
) -> Result<Json<ArticleDetail>, AppError> {
    auth_user.require_permission("article:edit")?;
    require_status_permission(&auth_user, payload.status)?;
    validate_update_article(&payload)?;

    let txn = state.db.begin().await?;
    let written = ArticleService::new(&txn).update(id, payload).await?;
    txn.commit().await?;

    Ok(Json(finish_write(&state, written).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/publish",
    tag = "Articles",
    operation_id = "publishArticle",
    summary = "Publish a draft or republish an archived article",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article published", body = ArticleDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Article is trashed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn publish_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleDetail>, AppError> {
    auth_user.require_permission("article:publish")?;
    transition(&state, id, ArticleStatus::Published).await
}

#[utoipa::path(
    post,
    path = "/{id}/archive",
    tag = "Articles",
    operation_id = "archiveArticle",
    summary = "Archive a published article",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article archived", body = ArticleDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Article is trashed (CONFLICT)", body = ErrorBody),
        (status = 422, description = "Only published articles can be archived (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn archive_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleDetail>, AppError> {
    auth_user.require_permission("article:publish")?;
    transition(&state, id, ArticleStatus::Archived).await
}

async fn transition(state: &AppState, id: i32, status: ArticleStatus) -> Result<Json<ArticleDetail>, AppError> {
    let txn = state.db.begin().await?;
    let written = ArticleService::new(&txn)
        .update(id, UpdateArticleRequest::status(status))
        .await?;
    txn.commit().await?;

    Ok(Json(finish_write(state, written).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Articles",
    operation_id = "trashArticle",
    summary = "Move an article to the trash",
    description = "Soft delete. The article disappears from every public surface at once and keeps its slug and views for a later restore.",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Article trashed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already trashed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn trash_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("article:delete")?;
    ArticleService::new(&state.db).trash(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/restore",
    tag = "Articles",
    operation_id = "restoreArticle",
    summary = "Restore a trashed article",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article restored", body = ArticleDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Article is not trashed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn restore_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleDetail>, AppError> {
    auth_user.require_permission("article:delete")?;
    let article = ArticleService::new(&state.db).restore(id).await?;
    Ok(Json(
        present::detail(&state.db, state.media.as_ref(), article, None).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/force",
    tag = "Articles",
    operation_id = "forceDeleteArticle",
    summary = "Permanently delete a trashed article",
    description = "Irreversible. Removes the article, its tag links, its media rows and stored files.",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Article is not trashed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn force_delete_article(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("article:delete")?;

    let txn = state.db.begin().await?;
    let storage_keys = ArticleService::new(&txn).force_delete(id).await?;
    txn.commit().await?;

    for raw in storage_keys {
        let removed = match StorageKey::parse(&raw) {
            Ok(key) => state.media.delete(&key).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!(article_id = id, key = %raw, error = %e, "Failed to remove stored media file");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
