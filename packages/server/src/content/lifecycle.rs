use chrono::{DateTime, Utc};
use common::ArticleStatus;
use sea_orm::{ColumnTrait, Condition};

use crate::entity::article;

/// What a status change means for the article's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Status unchanged.
    Unchanged,
    /// draft -> published
    Publish,
    /// published -> archived
    Archive,
    /// archived -> published
    Republish,
}

impl Transition {
    /// Whether the article ends up published by this change.
    pub fn enters_published(self) -> bool {
        matches!(self, Transition::Publish | Transition::Republish)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ArticleStatus,
    pub to: ArticleStatus,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cannot change status from {} to {}", self.from, self.to)
    }
}

/// Classify a status change against the allowed lifecycle edges.
pub fn plan(from: ArticleStatus, to: ArticleStatus) -> Result<Transition, InvalidTransition> {
    use ArticleStatus::*;
    match (from, to) {
        (a, b) if a == b => Ok(Transition::Unchanged),
        (Draft, Published) => Ok(Transition::Publish),
        (Published, Archived) => Ok(Transition::Archive),
        (Archived, Published) => Ok(Transition::Republish),
        _ => Err(InvalidTransition { from, to }),
    }
}

/// Statuses a new article may start in.
pub fn initial(status: ArticleStatus) -> Result<Transition, InvalidTransition> {
    match status {
        ArticleStatus::Draft => Ok(Transition::Unchanged),
        ArticleStatus::Published => Ok(Transition::Publish),
        ArticleStatus::Archived => Err(InvalidTransition {
            from: ArticleStatus::Draft,
            to: ArticleStatus::Archived,
        }),
    }
}

/// `published_at` after a transition. A supplied date always wins; entering
/// published without one keeps the existing date or stamps `now`.
pub fn resolve_published_at(
    transition: Transition,
    requested: Option<DateTime<Utc>>,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (transition.enters_published(), requested) {
        (_, Some(at)) => Some(at),
        (true, None) => current.or(Some(now)),
        (false, None) => current,
    }
}

/// Visible to anonymous readers.
pub fn is_public(model: &article::Model, now: DateTime<Utc>) -> bool {
    model.deleted_at.is_none()
        && model.status == ArticleStatus::Published
        && model.published_at.is_some_and(|at| at <= now)
}

/// SQL form of [`is_public`].
pub fn public_condition(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(article::Column::DeletedAt.is_null())
        .add(article::Column::Status.eq(ArticleStatus::Published))
        .add(article::Column::PublishedAt.is_not_null())
        .add(article::Column::PublishedAt.lte(now))
}
