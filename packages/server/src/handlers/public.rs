use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use sea_orm::*;
use tracing::{instrument, warn};

use crate::content::{ArticleService, present};
use crate::entity::category;
use crate::error::{AppError, ErrorBody};
use crate::models::article::{
    ArticleDetail, ArticleListResponse, HomeResponse, SearchParams, SearchResponse,
};
use crate::models::category::{CategoryArticlesResponse, CategoryListResponse, CategoryResponse};
use crate::models::shared::PageQuery;
use crate::state::AppState;

/// Default page size on public listings.
const PUBLIC_PER_PAGE: u64 = 12;
const HOME_FEATURED: u64 = 5;
const HOME_LATEST: u64 = 12;

#[utoipa::path(
    get,
    path = "/",
    tag = "Public",
    operation_id = "home",
    summary = "Front page content",
    description = "Latest featured articles, latest articles, and active categories in display order.",
    responses((status = 200, description = "Front page", body = HomeResponse)),
)]
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, AppError> {
    let now = Utc::now();
    let service = ArticleService::new(&state.db);

    let featured = service.latest(HOME_FEATURED, true, now).await?;
    let latest = service.latest(HOME_LATEST, false, now).await?;

    Ok(Json(HomeResponse {
        featured: present::summaries(&state.db, state.media.as_ref(), featured).await?,
        latest: present::summaries(&state.db, state.media.as_ref(), latest).await?,
        categories: active_categories(&state.db).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Public",
    operation_id = "listPublicArticles",
    summary = "Published articles, newest first",
    params(PageQuery),
    responses((status = 200, description = "Article page", body = ArticleListResponse)),
)]
#[instrument(skip(state, query))]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ArticleListResponse>, AppError> {
    let (page, per_page) = query.resolve(PUBLIC_PER_PAGE);
    let listing = ArticleService::new(&state.db)
        .public_listing(page, per_page, Utc::now())
        .await?;

    Ok(Json(ArticleListResponse {
        data: present::summaries(&state.db, state.media.as_ref(), listing.articles).await?,
        pagination: listing.pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/{slug}",
    tag = "Public",
    operation_id = "showArticle",
    summary = "Read a published article",
    description = "Returns the article with its category, author, tags, media and up to four related articles. Each read counts one view.",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Article", body = ArticleDetail),
        (status = 404, description = "Unknown or not public (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn show_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetail>, AppError> {
    let now = Utc::now();
    let service = ArticleService::new(&state.db);

    let mut article = service.find_public(&slug, now).await?;
    match service.record_view(article.id).await {
        Ok(()) => article.views += 1,
        Err(e) => warn!(article_id = article.id, error = %e, "Failed to record article view"),
    }
    let related = service.related(&article, now).await?;

    let detail = present::detail(&state.db, state.media.as_ref(), article, Some(related)).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Public",
    operation_id = "listPublicCategories",
    summary = "Active categories in display order",
    responses((status = 200, description = "Categories", body = CategoryListResponse)),
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    Ok(Json(CategoryListResponse {
        data: active_categories(&state.db).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/{slug}/articles",
    tag = "Public",
    operation_id = "listCategoryArticles",
    summary = "Published articles of one category",
    params(("slug" = String, Path, description = "Category slug"), PageQuery),
    responses(
        (status = 200, description = "Category with an article page", body = CategoryArticlesResponse),
        (status = 404, description = "Unknown or inactive category (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn category_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryArticlesResponse>, AppError> {
    let category = category::Entity::find()
        .filter(category::Column::Slug.eq(&slug))
        .filter(category::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    let (page, per_page) = query.resolve(PUBLIC_PER_PAGE);
    let listing = ArticleService::new(&state.db)
        .category_listing(category.id, page, per_page, Utc::now())
        .await?;

    Ok(Json(CategoryArticlesResponse {
        category: CategoryResponse::from(category),
        data: present::summaries(&state.db, state.media.as_ref(), listing.articles).await?,
        pagination: listing.pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Public",
    operation_id = "searchArticles",
    summary = "Ranked full-text search",
    description = "Matches every word of `q` (the last one as a prefix) against titles, excerpts and bodies of published articles. Title hits rank above excerpt hits, which rank above body hits. An empty query returns the regular listing.",
    params(SearchParams),
    responses((status = 200, description = "Ranked results", body = SearchResponse)),
)]
#[instrument(skip(state, params), fields(q = params.q.as_deref().unwrap_or_default()))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let raw = params.q.unwrap_or_default();
    let (page, per_page) = PageQuery {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve(PUBLIC_PER_PAGE);

    let results = ArticleService::new(&state.db)
        .search(&raw, page, per_page, Utc::now())
        .await?;

    Ok(Json(SearchResponse {
        query: raw.trim().to_string(),
        total: results.pagination.total,
        data: present::summaries(&state.db, state.media.as_ref(), results.articles).await?,
        pagination: results.pagination,
    }))
}

async fn active_categories(db: &DatabaseConnection) -> Result<Vec<CategoryResponse>, DbErr> {
    Ok(category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::DisplayOrder)
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(CategoryResponse::from)
        .collect())
}
