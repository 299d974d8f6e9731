use std::collections::HashMap;

use common::storage::{MediaStore, StorageKey};
use sea_orm::*;

use crate::entity::{article, category, media, tag, user};
use crate::models::article::{ArticleDetail, ArticleMeta, ArticleSummary, AuthorRef};
use crate::models::category::CategoryRef;
use crate::models::media::{Collection, MediaResponse};
use crate::models::tag::TagResponse;

/// Build listing entries, loading categories, authors and featured images in
/// one query each.
pub async fn summaries<C: ConnectionTrait>(
    conn: &C,
    store: &dyn MediaStore,
    articles: Vec<article::Model>,
) -> Result<Vec<ArticleSummary>, DbErr> {
    if articles.is_empty() {
        return Ok(Vec::new());
    }

    let article_ids: Vec<i32> = articles.iter().map(|a| a.id).collect();
    let category_ids: Vec<i32> = articles.iter().map(|a| a.category_id).collect();
    let user_ids: Vec<i32> = articles.iter().map(|a| a.user_id).collect();

    let categories: HashMap<i32, category::Model> = category::Entity::find()
        .filter(category::Column::Id.is_in(category_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let authors: HashMap<i32, String> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Name)
        .filter(user::Column::Id.is_in(user_ids))
        .into_tuple::<(i32, String)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let images: HashMap<i32, String> = media::Entity::find()
        .select_only()
        .column(media::Column::ArticleId)
        .column(media::Column::StorageKey)
        .filter(media::Column::ArticleId.is_in(article_ids))
        .filter(media::Column::Collection.eq(Collection::FeaturedImage.as_str()))
        .into_tuple::<(i32, String)>()
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|(article_id, key)| Some((article_id, public_url(store, &key)?)))
        .collect();

    Ok(articles
        .into_iter()
        .map(|a| {
            let category = categories.get(&a.category_id).map(CategoryRef::from);
            let author = authors.get(&a.user_id).map(|name| AuthorRef {
                id: a.user_id,
                name: name.clone(),
            });
            let featured_image_url = images.get(&a.id).cloned();
            summary(a, category, author, featured_image_url)
        })
        .collect())
}

/// Full article with tags and media. `related` is only set on public reads.
pub async fn detail<C: ConnectionTrait>(
    conn: &C,
    store: &dyn MediaStore,
    article: article::Model,
    related: Option<Vec<article::Model>>,
) -> Result<ArticleDetail, DbErr> {
    let tag_ids: Vec<i32> = crate::content::service::ArticleService::new(conn)
        .tag_ids(article.id)
        .await?;
    let tags = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .order_by_asc(tag::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();

    let media = media::Entity::find()
        .filter(media::Column::ArticleId.eq(article.id))
        .order_by_asc(media::Column::Collection)
        .order_by_asc(media::Column::Position)
        .order_by_asc(media::Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(|m| MediaResponse::new(m, store))
        .collect();

    let related = match related {
        Some(models) => Some(summaries(conn, store, models).await?),
        None => None,
    };

    let content = article.content.clone();
    let meta = ArticleMeta {
        title: article.meta_title.clone(),
        description: article.meta_description.clone(),
        keywords: article.meta_keywords.clone(),
    };
    let mut listed = summaries(conn, store, vec![article]).await?;
    let summary = listed
        .pop()
        .ok_or_else(|| DbErr::Custom("article summary missing".into()))?;

    Ok(ArticleDetail {
        summary,
        content,
        meta,
        tags,
        media,
        related,
    })
}

fn summary(
    a: article::Model,
    category: Option<CategoryRef>,
    author: Option<AuthorRef>,
    featured_image_url: Option<String>,
) -> ArticleSummary {
    ArticleSummary {
        id: a.id,
        title: a.title,
        slug: a.slug,
        excerpt: a.excerpt,
        status: a.status,
        is_featured: a.is_featured,
        views: a.views,
        published_at: a.published_at,
        category,
        author,
        featured_image_url,
        created_at: a.created_at,
        updated_at: a.updated_at,
        deleted_at: a.deleted_at,
    }
}

fn public_url(store: &dyn MediaStore, key: &str) -> Option<String> {
    StorageKey::parse(key).ok().map(|k| store.url(&k))
}
