use std::collections::HashSet;

use sea_orm::prelude::Expr;
use sea_orm::sea_query::LikeExpr;
use sea_orm::*;
use tracing::debug;

use crate::entity::{article, category, tag};
use crate::error::AppError;
use crate::models::shared::escape_like;

/// Maximum stored slug length, suffix included.
pub const MAX_SLUG_LEN: usize = 255;

/// Room left for a `-N` suffix when truncating a generated base.
const SUFFIX_RESERVE: usize = 12;

/// Inserts attempted before giving up on a contended slug.
const MAX_INSERT_ATTEMPTS: usize = 5;

/// An entity whose rows are addressed by a unique slug column.
pub trait Sluggable: EntityTrait {
    /// Slug used when the source text has no transliterable characters.
    const FALLBACK: &'static str;

    fn slug_column() -> Self::Column;
    fn id_column() -> Self::Column;
}

impl Sluggable for article::Entity {
    const FALLBACK: &'static str = "article";

    fn slug_column() -> Self::Column {
        article::Column::Slug
    }
    fn id_column() -> Self::Column {
        article::Column::Id
    }
}

impl Sluggable for category::Entity {
    const FALLBACK: &'static str = "category";

    fn slug_column() -> Self::Column {
        category::Column::Slug
    }
    fn id_column() -> Self::Column {
        category::Column::Id
    }
}

impl Sluggable for tag::Entity {
    const FALLBACK: &'static str = "tag";

    fn slug_column() -> Self::Column {
        tag::Column::Slug
    }
    fn id_column() -> Self::Column {
        tag::Column::Id
    }
}

/// Lower-case, hyphen-separated ASCII form of `source`.
///
/// Non-ASCII text is transliterated; an empty result becomes `fallback`.
pub fn base_slug(source: &str, fallback: &str) -> String {
    let mut slug = ::slug::slugify(source);
    if slug.len() > MAX_SLUG_LEN - SUFFIX_RESERVE {
        slug.truncate(MAX_SLUG_LEN - SUFFIX_RESERVE);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// First of `base`, `base-1`, `base-2`, ... not present in `taken`.
pub fn first_free(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n: u32 = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Check a caller-supplied slug: `^[a-z0-9]+(-[a-z0-9]+)*$`, at most 255 chars.
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err("Slug must be 1-255 characters");
    }
    let well_formed = slug
        .split('-')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    if !well_formed {
        return Err("Slug may only contain lowercase letters, digits and single hyphens");
    }
    Ok(())
}

/// Derive a slug from `source` that no other row of `E` uses.
///
/// `ignore_id` excludes the row being updated so re-deriving an unchanged
/// title keeps its current slug. Soft-deleted rows still count as taken.
pub async fn unique_slug<E, C>(conn: &C, source: &str, ignore_id: Option<i32>) -> Result<String, DbErr>
where
    E: Sluggable,
    C: ConnectionTrait,
{
    let base = base_slug(source, E::FALLBACK);
    let taken = taken_slugs::<E, C>(conn, &base, ignore_id).await?;
    Ok(first_free(&base, &taken))
}

/// Whether `slug` is already used by a row other than `ignore_id`.
pub async fn slug_taken<E, C>(conn: &C, slug: &str, ignore_id: Option<i32>) -> Result<bool, DbErr>
where
    E: Sluggable,
    C: ConnectionTrait,
{
    let mut select = E::find().filter(E::slug_column().eq(slug));
    if let Some(id) = ignore_id {
        select = select.filter(E::id_column().ne(id));
    }
    Ok(select.one(conn).await?.is_some())
}

/// Validate an explicit slug and make sure no other row uses it.
pub async fn ensure_available<E, C>(conn: &C, slug: &str, ignore_id: Option<i32>) -> Result<(), AppError>
where
    E: Sluggable,
    C: ConnectionTrait,
{
    validate_slug(slug).map_err(|msg| AppError::field("slug", msg))?;
    if slug_taken::<E, C>(conn, slug, ignore_id).await? {
        return Err(AppError::Conflict(format!("Slug '{slug}' is already in use")));
    }
    Ok(())
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Insert a new row built by `build(slug)`.
///
/// Without an explicit slug, one is derived from `source`; if a concurrent
/// writer claims it first the insert is retried with the next free suffix.
/// Each attempt runs in its own savepoint so a failed insert leaves the
/// surrounding transaction usable.
pub async fn insert_with_slug<E, A, C, F>(
    conn: &C,
    source: &str,
    explicit: Option<String>,
    build: F,
) -> Result<E::Model, AppError>
where
    E: Sluggable,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    E::Model: IntoActiveModel<A>,
    C: ConnectionTrait + TransactionTrait,
    F: Fn(String) -> A,
{
    if let Some(slug) = &explicit {
        ensure_available::<E, C>(conn, slug, None).await?;
    }

    for attempt in 1..=MAX_INSERT_ATTEMPTS {
        let slug = match &explicit {
            Some(slug) => slug.clone(),
            None => unique_slug::<E, C>(conn, source, None).await?,
        };

        let savepoint = conn.begin().await?;
        match build(slug).insert(&savepoint).await {
            Ok(model) => {
                savepoint.commit().await?;
                return Ok(model);
            }
            Err(err) => {
                savepoint.rollback().await?;
                if !is_unique_violation(&err) {
                    return Err(err.into());
                }
                if explicit.is_some() {
                    return Err(AppError::Conflict("Slug is already in use".into()));
                }
                debug!(entity = E::FALLBACK, attempt, "Slug claimed concurrently, retrying");
            }
        }
    }

    Err(AppError::Conflict(format!(
        "Could not allocate a unique {} slug",
        E::FALLBACK
    )))
}

async fn taken_slugs<E, C>(conn: &C, base: &str, ignore_id: Option<i32>) -> Result<HashSet<String>, DbErr>
where
    E: Sluggable,
    C: ConnectionTrait,
{
    let suffixed = LikeExpr::new(format!("{}-%", escape_like(base))).escape('\\');
    let mut select = E::find()
        .select_only()
        .column(E::slug_column())
        .filter(
            Condition::any()
                .add(E::slug_column().eq(base))
                .add(Expr::col(E::slug_column()).like(suffixed)),
        );
    if let Some(id) = ignore_id {
        select = select.filter(E::id_column().ne(id));
    }

    let slugs: Vec<String> = select.into_tuple().all(conn).await?;
    Ok(slugs.into_iter().collect())
}
