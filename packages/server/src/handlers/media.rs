use axum::Json;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::storage::StorageKey;
use sea_orm::*;
use tokio_util::io::ReaderStream;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::content::ArticleService;
use crate::entity::media;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::media::{Collection, MediaListResponse, MediaResponse};
use crate::state::AppState;
use crate::utils::filename;

/// Multipart overhead allowed on top of the configured file size.
const MULTIPART_SLACK: u64 = 64 * 1024;

/// Body limit for the upload route, sized from the configured maximum.
pub fn upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(max_upload_size + MULTIPART_SLACK).unwrap_or(usize::MAX))
}

struct Upload {
    original_name: String,
    declared_type: Option<String>,
    bytes: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/{id}/media",
    tag = "Media",
    operation_id = "uploadMedia",
    summary = "Attach a file to an article",
    description = "Multipart upload with a `file` field and an optional `collection` field (`gallery` by default, or `featured_image`). \
        The file is stored under a generated `<uuid>.<ext>` name; the original name is kept, sanitized, as the display name. \
        A new featured image replaces the previous one.",
    params(("id" = i32, Path, description = "Article ID")),
    request_body(content_type = "multipart/form-data", description = "File upload with optional collection"),
    responses(
        (status = 201, description = "Media stored", body = MediaResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Article is trashed (CONFLICT)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 422, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn upload_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(article_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("media:manage")?;
    ArticleService::new(&state.db).find_editable(article_id).await?;

    let max_size = state.config.storage.max_upload_size;
    let mut upload: Option<Upload> = None;
    let mut collection = Collection::Gallery;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let declared_type = field.content_type().map(str::to_string);
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
                {
                    if (bytes.len() + chunk.len()) as u64 > max_size {
                        return Err(AppError::PayloadTooLarge(max_size));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                upload = Some(Upload {
                    original_name,
                    declared_type,
                    bytes,
                });
            }
            Some("collection") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read collection: {e}")))?;
                collection = Collection::parse(&text).ok_or_else(|| {
                    AppError::field("collection", "Collection must be one of: featured_image, gallery")
                })?;
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::field("file", "A file is required"))?;
    if upload.bytes.is_empty() {
        return Err(AppError::field("file", "The uploaded file is empty"));
    }

    let mime_type = filename::content_type(&upload.original_name, upload.declared_type.as_deref());
    let display_name = filename::display_name(&upload.original_name);
    let file_name = filename::storage_name(&upload.original_name, &mime_type);
    let key = StorageKey::parse(&filename::media_key(article_id, &file_name))?;

    let stored = state.media.put(&key, &upload.bytes).await?;

    let saved = save_media_row(&state, article_id, collection, &key, &file_name, &display_name, &mime_type, &stored).await;
    let (model, replaced) = match saved {
        Ok(saved) => saved,
        Err(e) => {
            if let Err(cleanup) = state.media.delete(&key).await {
                warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e);
        }
    };

    for old in replaced {
        remove_file(&state, &old).await;
    }

    info!(
        article_id,
        media_id = %model.id,
        collection = collection.as_str(),
        size = model.size,
        "Media uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(MediaResponse::new(model, state.media.as_ref())),
    ))
}

/// Insert the row; for single-file collections, drop the previous rows in the
/// same transaction and return their storage keys.
#[allow(clippy::too_many_arguments)]
async fn save_media_row(
    state: &AppState,
    article_id: i32,
    collection: Collection,
    key: &StorageKey,
    file_name: &str,
    display_name: &str,
    mime_type: &str,
    stored: &common::storage::StoredObject,
) -> Result<(media::Model, Vec<String>), AppError> {
    let txn = state.db.begin().await?;

    let existing = media::Entity::find()
        .filter(media::Column::ArticleId.eq(article_id))
        .filter(media::Column::Collection.eq(collection.as_str()))
        .all(&txn)
        .await?;

    let (position, replaced) = if collection.is_single() {
        media::Entity::delete_many()
            .filter(media::Column::ArticleId.eq(article_id))
            .filter(media::Column::Collection.eq(collection.as_str()))
            .exec(&txn)
            .await?;
        (0, existing.into_iter().map(|m| m.storage_key).collect())
    } else {
        let next = existing.iter().map(|m| m.position + 1).max().unwrap_or(0);
        (next, Vec::new())
    };

    let model = media::ActiveModel {
        id: Set(Uuid::new_v4()),
        article_id: Set(article_id),
        collection: Set(collection.as_str().to_string()),
        file_name: Set(file_name.to_string()),
        name: Set(display_name.to_string()),
        storage_key: Set(key.to_string()),
        mime_type: Set(mime_type.to_string()),
        size: Set(i64::try_from(stored.size).unwrap_or(i64::MAX)),
        checksum: Set(stored.checksum.to_hex()),
        position: Set(position),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok((model, replaced))
}

async fn remove_file(state: &AppState, raw_key: &str) {
    let result = match StorageKey::parse(raw_key) {
        Ok(key) => state.media.delete(&key).await.map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!(key = %raw_key, error = %e, "Failed to remove stored media file");
    }
}

#[utoipa::path(
    get,
    path = "/{id}/media",
    tag = "Media",
    operation_id = "listMedia",
    summary = "List an article's media",
    description = "Featured image first, then the gallery in order.",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Media list", body = MediaListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(article_id): Path<i32>,
) -> Result<Json<MediaListResponse>, AppError> {
    auth_user.require_any_permission(&["media:manage", "article:edit"])?;
    ArticleService::new(&state.db).find(article_id).await?;

    let data = media::Entity::find()
        .filter(media::Column::ArticleId.eq(article_id))
        .order_by_asc(media::Column::Collection)
        .order_by_asc(media::Column::Position)
        .order_by_asc(media::Column::CreatedAt)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|m| MediaResponse::new(m, state.media.as_ref()))
        .collect();
    Ok(Json(MediaListResponse { data }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Media",
    operation_id = "deleteMedia",
    summary = "Delete a media item and its file",
    params(("id" = Uuid, Path, description = "Media ID")),
    responses(
        (status = 204, description = "Media deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Media not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("media:manage")?;

    let model = media::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".into()))?;
    media::Entity::delete_by_id(id).exec(&state.db).await?;
    remove_file(&state, &model.storage_key).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Serve stored media bytes at their public URL.
#[instrument(skip(state))]
pub async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let key = StorageKey::parse(&path).map_err(|_| AppError::NotFound("File not found".into()))?;
    let reader = state.media.get_stream(&key).await?;

    let content_type = mime_guess::from_path(key.as_str())
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
