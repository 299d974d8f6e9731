use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::ArticleStatus;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{debug, info};
use uuid::Uuid;

use crate::content::lifecycle::{self, Transition};
use crate::content::search::{SearchDocument, SearchQuery};
use crate::content::slug;
use crate::entity::{article, article_tag, category, media, publication_event, tag};
use crate::error::AppError;
use crate::models::article::{
    AdminArticleListQuery, CreateArticleRequest, TrashedFilter, UpdateArticleRequest,
};
use crate::models::shared::{PageQuery, Pagination, escape_like, non_blank, page_offset};

/// Related articles shown next to a public article.
pub const RELATED_LIMIT: u64 = 4;

/// Outcome of a write that may have published the article.
#[derive(Debug)]
pub struct Written {
    pub article: article::Model,
    /// Outbox row to hand to the notifier once the transaction commits.
    pub event: Option<publication_event::Model>,
}

/// A page of articles in display order.
pub struct ArticlePage {
    pub articles: Vec<article::Model>,
    pub pagination: Pagination,
}

/// Article reads and writes over a connection or an open transaction.
///
/// Writes that can publish must run inside a transaction so the article row,
/// its search index and the outbox row commit together.
pub struct ArticleService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ArticleService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Any article by ID, trashed ones included.
    pub async fn find(&self, id: i32) -> Result<article::Model, AppError> {
        article::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Article not found".into()))
    }

    /// An article that is not in the trash.
    pub async fn find_editable(&self, id: i32) -> Result<article::Model, AppError> {
        let article = self.find(id).await?;
        if article.deleted_at.is_some() {
            return Err(AppError::Conflict(
                "Article is in the trash; restore it first".into(),
            ));
        }
        Ok(article)
    }

    /// A publicly visible article by slug.
    pub async fn find_public(&self, slug: &str, now: DateTime<Utc>) -> Result<article::Model, AppError> {
        article::Entity::find()
            .filter(article::Column::Slug.eq(slug))
            .filter(lifecycle::public_condition(now))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Article not found".into()))
    }

    /// Add one view in a single statement so concurrent readers never lose updates.
    pub async fn record_view(&self, id: i32) -> Result<(), DbErr> {
        article::Entity::update_many()
            .col_expr(
                article::Column::Views,
                Expr::col(article::Column::Views).add(1),
            )
            .filter(article::Column::Id.eq(id))
            .exec(self.conn)
            .await?;
        Ok(())
    }

    /// Public articles, newest first.
    pub async fn public_listing(
        &self,
        page: u64,
        per_page: u64,
        now: DateTime<Utc>,
    ) -> Result<ArticlePage, DbErr> {
        let select = article::Entity::find().filter(lifecycle::public_condition(now));
        self.paginate_newest(select, page, per_page).await
    }

    /// Public articles of one category, newest first.
    pub async fn category_listing(
        &self,
        category_id: i32,
        page: u64,
        per_page: u64,
        now: DateTime<Utc>,
    ) -> Result<ArticlePage, DbErr> {
        let select = article::Entity::find()
            .filter(lifecycle::public_condition(now))
            .filter(article::Column::CategoryId.eq(category_id));
        self.paginate_newest(select, page, per_page).await
    }

    /// Latest public articles, optionally featured only.
    pub async fn latest(
        &self,
        limit: u64,
        featured_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<article::Model>, DbErr> {
        let mut select = article::Entity::find().filter(lifecycle::public_condition(now));
        if featured_only {
            select = select.filter(article::Column::IsFeatured.eq(true));
        }
        newest_first(select).limit(limit).all(self.conn).await
    }

    /// Other public articles in the same category.
    pub async fn related(
        &self,
        article: &article::Model,
        now: DateTime<Utc>,
    ) -> Result<Vec<article::Model>, DbErr> {
        let select = article::Entity::find()
            .filter(lifecycle::public_condition(now))
            .filter(article::Column::CategoryId.eq(article.category_id))
            .filter(article::Column::Id.ne(article.id));
        newest_first(select)
            .limit(RELATED_LIMIT)
            .all(self.conn)
            .await
    }

    /// Ranked full-text search over public articles.
    ///
    /// A query with nothing searchable in it returns the default listing.
    pub async fn search(
        &self,
        raw: &str,
        page: u64,
        per_page: u64,
        now: DateTime<Utc>,
    ) -> Result<ArticlePage, DbErr> {
        let Some(query) = SearchQuery::parse(raw) else {
            return self.public_listing(page, per_page, now).await;
        };

        let mut select = article::Entity::find()
            .select_only()
            .column(article::Column::Id)
            .column(article::Column::SearchIndex)
            .column(article::Column::PublishedAt)
            .filter(lifecycle::public_condition(now));
        for pattern in query.like_patterns() {
            select = select.filter(
                Expr::col(article::Column::SearchIndex).like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        let candidates: Vec<(i32, String, Option<DateTime<Utc>>)> =
            select.into_tuple().all(self.conn).await?;
        let candidate_count = candidates.len();

        let mut ranked: Vec<(f64, Option<DateTime<Utc>>, i32)> = candidates
            .into_iter()
            .filter_map(|(id, index, published_at)| {
                let score = query.score(&SearchDocument::parse(&index))?;
                Some((score, published_at, id))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| b.2.cmp(&a.2))
        });

        let total = ranked.len() as u64;
        debug!(candidate_count, total, "Ranked search candidates");

        let page_ids: Vec<i32> = ranked
            .into_iter()
            .skip(usize::try_from(page_offset(page, per_page)).unwrap_or(usize::MAX))
            .take(per_page as usize)
            .map(|(_, _, id)| id)
            .collect();

        let mut articles = article::Entity::find()
            .filter(article::Column::Id.is_in(page_ids.clone()))
            .all(self.conn)
            .await?;
        articles.sort_by_key(|a| page_ids.iter().position(|id| *id == a.id));

        Ok(ArticlePage {
            articles,
            pagination: Pagination::new(page, per_page, total),
        })
    }

    /// Authoring listing with status, category, trash and title filters.
    pub async fn admin_listing(&self, query: &AdminArticleListQuery) -> Result<ArticlePage, AppError> {
        let (page, per_page) = PageQuery {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(20);

        let mut select = article::Entity::find();

        select = match query.trashed.unwrap_or_default() {
            TrashedFilter::Exclude => select.filter(article::Column::DeletedAt.is_null()),
            TrashedFilter::Include => select,
            TrashedFilter::Only => select.filter(article::Column::DeletedAt.is_not_null()),
        };
        if let Some(status) = query.status {
            select = select.filter(article::Column::Status.eq(status));
        }
        if let Some(category_id) = query.category_id {
            select = select.filter(article::Column::CategoryId.eq(category_id));
        }
        if let Some(ref search) = query.search {
            let term = escape_like(search.trim());
            if !term.is_empty() {
                select = select.filter(
                    Expr::expr(Func::lower(Expr::col(article::Column::Title)))
                        .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
                );
            }
        }

        let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
            "created_at" => article::Column::CreatedAt,
            "updated_at" => article::Column::UpdatedAt,
            "published_at" => article::Column::PublishedAt,
            "title" => article::Column::Title,
            "views" => article::Column::Views,
            _ => {
                return Err(AppError::field(
                    "sort_by",
                    "sort_by must be one of: created_at, updated_at, published_at, title, views",
                ));
            }
        };
        let sort_order = if query.sort_order.as_deref() == Some("asc") {
            Order::Asc
        } else {
            Order::Desc
        };

        let total = select
            .clone()
            .paginate(self.conn, per_page)
            .num_items()
            .await?;

        let articles = select
            .order_by(sort_column, sort_order)
            .order_by_desc(article::Column::Id)
            .offset(Some(page_offset(page, per_page)))
            .limit(Some(per_page))
            .all(self.conn)
            .await?;

        Ok(ArticlePage {
            articles,
            pagination: Pagination::new(page, per_page, total),
        })
    }

    async fn paginate_newest(
        &self,
        select: Select<article::Entity>,
        page: u64,
        per_page: u64,
    ) -> Result<ArticlePage, DbErr> {
        let total = select
            .clone()
            .paginate(self.conn, per_page)
            .num_items()
            .await?;
        let articles = newest_first(select)
            .offset(Some(page_offset(page, per_page)))
            .limit(Some(per_page))
            .all(self.conn)
            .await?;
        Ok(ArticlePage {
            articles,
            pagination: Pagination::new(page, per_page, total),
        })
    }

    /// Tag IDs linked to an article.
    pub async fn tag_ids(&self, article_id: i32) -> Result<Vec<i32>, DbErr> {
        article_tag::Entity::find()
            .select_only()
            .column(article_tag::Column::TagId)
            .filter(article_tag::Column::ArticleId.eq(article_id))
            .into_tuple()
            .all(self.conn)
            .await
    }

    async fn require_category(&self, category_id: i32) -> Result<(), AppError> {
        let exists = category::Entity::find_by_id(category_id)
            .one(self.conn)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::field("category_id", "Category does not exist"));
        }
        Ok(())
    }

    /// Deduplicate `ids`, keeping order, and check that every tag exists.
    async fn require_tags(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        let mut seen = HashSet::new();
        let unique: Vec<i32> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.is_empty() {
            return Ok(unique);
        }

        let found = tag::Entity::find()
            .filter(tag::Column::Id.is_in(unique.clone()))
            .count(self.conn)
            .await?;
        if found != unique.len() as u64 {
            return Err(AppError::field("tag_ids", "One or more tags do not exist"));
        }
        Ok(unique)
    }

    async fn replace_tags(&self, article_id: i32, tag_ids: &[i32]) -> Result<(), DbErr> {
        article_tag::Entity::delete_many()
            .filter(article_tag::Column::ArticleId.eq(article_id))
            .exec(self.conn)
            .await?;

        if tag_ids.is_empty() {
            return Ok(());
        }
        let rows = tag_ids.iter().map(|&tag_id| article_tag::ActiveModel {
            article_id: Set(article_id),
            tag_id: Set(tag_id),
        });
        article_tag::Entity::insert_many(rows)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    async fn record_publication(&self, article_id: i32) -> Result<publication_event::Model, DbErr> {
        publication_event::ActiveModel {
            id: Set(Uuid::now_v7()),
            article_id: Set(article_id),
            created_at: Set(Utc::now()),
            dispatched_at: Set(None),
        }
        .insert(self.conn)
        .await
    }

    /// Move an article to the trash. Its slug stays reserved.
    pub async fn trash(&self, id: i32) -> Result<article::Model, AppError> {
        let article = self.find(id).await?;
        if article.deleted_at.is_some() {
            return Err(AppError::Conflict("Article is already in the trash".into()));
        }
        let mut active: article::ActiveModel = article.into();
        active.deleted_at = Set(Some(Utc::now()));
        Ok(active.update(self.conn).await?)
    }

    /// Bring a trashed article back with its slug and view count intact.
    pub async fn restore(&self, id: i32) -> Result<article::Model, AppError> {
        let article = self.find(id).await?;
        if article.deleted_at.is_none() {
            return Err(AppError::Conflict("Article is not in the trash".into()));
        }
        let mut active: article::ActiveModel = article.into();
        active.deleted_at = Set(None);
        Ok(active.update(self.conn).await?)
    }

    /// Permanently remove a trashed article with its tag links, media rows and
    /// outbox rows. Returns the storage keys of the removed media so the caller
    /// can delete the files after commit.
    pub async fn force_delete(&self, id: i32) -> Result<Vec<String>, AppError> {
        let article = self.find(id).await?;
        if article.deleted_at.is_none() {
            return Err(AppError::Conflict(
                "Only trashed articles can be permanently deleted".into(),
            ));
        }

        let storage_keys: Vec<String> = media::Entity::find()
            .select_only()
            .column(media::Column::StorageKey)
            .filter(media::Column::ArticleId.eq(id))
            .into_tuple()
            .all(self.conn)
            .await?;

        media::Entity::delete_many()
            .filter(media::Column::ArticleId.eq(id))
            .exec(self.conn)
            .await?;
        article_tag::Entity::delete_many()
            .filter(article_tag::Column::ArticleId.eq(id))
            .exec(self.conn)
            .await?;
        publication_event::Entity::delete_many()
            .filter(publication_event::Column::ArticleId.eq(id))
            .exec(self.conn)
            .await?;
        article::Entity::delete_by_id(id).exec(self.conn).await?;

        info!(article_id = id, media = storage_keys.len(), "Article permanently deleted");
        Ok(storage_keys)
    }
}

impl<'a, C: ConnectionTrait + TransactionTrait> ArticleService<'a, C> {
    /// Create an article, publishing it immediately if asked to.
    pub async fn create(
        &self,
        author_id: i32,
        payload: CreateArticleRequest,
    ) -> Result<Written, AppError> {
        let status = payload.status.unwrap_or_default();
        let transition =
            lifecycle::initial(status).map_err(|e| AppError::field("status", e.to_string()))?;

        self.require_category(payload.category_id).await?;
        let tag_ids = self.require_tags(&payload.tag_ids).await?;

        let now = Utc::now();
        let title = payload.title.trim().to_string();
        let excerpt = non_blank(payload.excerpt);
        let published_at =
            lifecycle::resolve_published_at(transition, payload.published_at, None, now);
        let search_index =
            SearchDocument::build(&title, excerpt.as_deref(), &payload.content).to_string();
        let explicit_slug = payload.slug.map(|s| s.trim().to_string());

        let article = slug::insert_with_slug::<article::Entity, _, _, _>(
            self.conn,
            &title,
            explicit_slug,
            |slug| article::ActiveModel {
                title: Set(title.clone()),
                slug: Set(slug),
                excerpt: Set(excerpt.clone()),
                content: Set(payload.content.clone()),
                status: Set(status),
                is_featured: Set(payload.is_featured.unwrap_or(false)),
                views: Set(0),
                published_at: Set(published_at),
                meta_title: Set(non_blank(payload.meta_title.clone())),
                meta_description: Set(non_blank(payload.meta_description.clone())),
                meta_keywords: Set(non_blank(payload.meta_keywords.clone())),
                search_index: Set(search_index.clone()),
                user_id: Set(author_id),
                category_id: Set(payload.category_id),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
                ..Default::default()
            },
        )
        .await?;

        self.replace_tags(article.id, &tag_ids).await?;

        let event = if transition.enters_published() && article.published_at.is_some() {
            Some(self.record_publication(article.id).await?)
        } else {
            None
        };

        info!(article_id = article.id, slug = %article.slug, status = %article.status, "Article created");
        Ok(Written { article, event })
    }

    /// Move `id` from `from` to `to` only if its status is still `from`.
    ///
    /// Of two writers that read the same status, the second finds no row to
    /// change and gets a conflict, so a transition happens at most once.
    pub async fn claim_transition(
        &self,
        id: i32,
        from: ArticleStatus,
        to: ArticleStatus,
    ) -> Result<(), AppError> {
        let result = article::Entity::update_many()
            .col_expr(article::Column::Status, Expr::value(to.as_str()))
            .filter(article::Column::Id.eq(id))
            .filter(article::Column::Status.eq(from))
            .filter(article::Column::DeletedAt.is_null())
            .exec(self.conn)
            .await?;
        if result.rows_affected != 1 {
            debug!(article_id = id, %from, %to, "Lost status transition race");
            return Err(AppError::Conflict(
                "Article status changed concurrently; reload and retry".into(),
            ));
        }
        Ok(())
    }

    /// Apply a partial update, including any lifecycle transition.
    pub async fn update(&self, id: i32, payload: UpdateArticleRequest) -> Result<Written, AppError> {
        let current = self.find_editable(id).await?;

        let target = payload.status.unwrap_or(current.status);
        let transition = lifecycle::plan(current.status, target)
            .map_err(|e| AppError::field("status", e.to_string()))?;

        let now = Utc::now();
        let (requested_at, existing_at) = match payload.published_at {
            Some(explicit) => (explicit, None),
            None => (None, current.published_at),
        };
        let mut published_at =
            lifecycle::resolve_published_at(transition, requested_at, existing_at, now);
        if target == ArticleStatus::Published && published_at.is_none() {
            published_at = Some(now);
        }

        let title = payload
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.title)
            .to_string();
        let title_changed = title != current.title;

        let new_slug = match payload.slug.as_deref().map(str::trim) {
            Some(explicit) if explicit != current.slug => {
                slug::ensure_available::<article::Entity, _>(self.conn, explicit, Some(id)).await?;
                Some(explicit.to_string())
            }
            Some(_) => None,
            None if title_changed => {
                Some(slug::unique_slug::<article::Entity, _>(self.conn, &title, Some(id)).await?)
            }
            None => None,
        };

        if let Some(category_id) = payload.category_id {
            self.require_category(category_id).await?;
        }
        let tag_ids = match &payload.tag_ids {
            Some(ids) => Some(self.require_tags(ids).await?),
            None => None,
        };

        let excerpt = match payload.excerpt {
            Some(excerpt) => non_blank(excerpt),
            None => current.excerpt.clone(),
        };
        let content = payload.content.unwrap_or_else(|| current.content.clone());
        let search_index = SearchDocument::build(&title, excerpt.as_deref(), &content).to_string();

        let mut active: article::ActiveModel = current.clone().into();
        if title_changed {
            active.title = Set(title);
        }
        if let Some(slug) = new_slug {
            active.slug = Set(slug);
        }
        if excerpt != current.excerpt {
            active.excerpt = Set(excerpt);
        }
        if content != current.content {
            active.content = Set(content);
        }
        if search_index != current.search_index {
            active.search_index = Set(search_index);
        }
        if target != current.status {
            active.status = Set(target);
        }
        if published_at != current.published_at {
            active.published_at = Set(published_at);
        }
        if let Some(featured) = payload.is_featured {
            active.is_featured = Set(featured);
        }
        if let Some(category_id) = payload.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(meta_title) = payload.meta_title {
            active.meta_title = Set(non_blank(meta_title));
        }
        if let Some(meta_description) = payload.meta_description {
            active.meta_description = Set(non_blank(meta_description));
        }
        if let Some(meta_keywords) = payload.meta_keywords {
            active.meta_keywords = Set(non_blank(meta_keywords));
        }
        active.updated_at = Set(now);

        if transition != Transition::Unchanged {
            self.claim_transition(id, current.status, target).await?;
        }

        let article = active.update(self.conn).await.map_err(|e| {
            if slug::is_unique_violation(&e) {
                AppError::Conflict("Slug is already in use".into())
            } else {
                AppError::from(e)
            }
        })?;

        if let Some(tag_ids) = tag_ids {
            self.replace_tags(article.id, &tag_ids).await?;
        }

        let event = if transition.enters_published() && article.published_at.is_some() {
            Some(self.record_publication(article.id).await?)
        } else {
            None
        };

        if transition != Transition::Unchanged {
            info!(
                article_id = article.id,
                from = %current.status,
                to = %article.status,
                "Article status changed"
            );
        }
        Ok(Written { article, event })
    }
}

fn newest_first(select: Select<article::Entity>) -> Select<article::Entity> {
    select
        .order_by_desc(article::Column::PublishedAt)
        .order_by_desc(article::Column::Id)
}
