use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::instrument;

use crate::config::SiteConfig;
use crate::content::lifecycle;
use crate::entity::{article, category};
use crate::error::AppError;
use crate::state::AppState;

/// One `<url>` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: &'static str,
    pub priority: f32,
}

/// Render entries as a sitemaps.org `urlset` document.
pub fn render(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            html_escape::encode_text(&entry.loc)
        ));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                lastmod.format("%Y-%m-%dT%H:%M:%SZ")
            ));
        }
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n",
            entry.changefreq, entry.priority
        ));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Home page, active categories and public articles.
pub async fn entries(
    db: &DatabaseConnection,
    site: &SiteConfig,
    now: DateTime<Utc>,
) -> Result<Vec<SitemapEntry>, DbErr> {
    let mut entries = vec![SitemapEntry {
        loc: site.url("/"),
        lastmod: Some(now),
        changefreq: "daily",
        priority: 1.0,
    }];

    let categories = category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::DisplayOrder)
        .order_by_asc(category::Column::Id)
        .all(db)
        .await?;
    entries.extend(categories.into_iter().map(|c| SitemapEntry {
        loc: site.url(&format!("category/{}", c.slug)),
        lastmod: Some(c.updated_at),
        changefreq: "weekly",
        priority: 0.8,
    }));

    let articles: Vec<(String, DateTime<Utc>)> = article::Entity::find()
        .select_only()
        .column(article::Column::Slug)
        .column(article::Column::UpdatedAt)
        .filter(lifecycle::public_condition(now))
        .order_by_desc(article::Column::PublishedAt)
        .order_by_desc(article::Column::Id)
        .into_tuple()
        .all(db)
        .await?;
    entries.extend(articles.into_iter().map(|(slug, updated_at)| SitemapEntry {
        loc: site.url(&format!("article/{slug}")),
        lastmod: Some(updated_at),
        changefreq: "weekly",
        priority: 0.9,
    }));

    Ok(entries)
}

#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = entries(&state.db, &state.config.site, Utc::now()).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render(&entries),
    ))
}
