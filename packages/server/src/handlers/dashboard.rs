use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use common::ArticleStatus;
use sea_orm::*;
use tracing::instrument;

use crate::content::lifecycle;
use crate::content::present;
use crate::entity::{article, category, tag, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::dashboard::{DashboardResponse, DashboardTotals, MonthBucket, MonthlyTrend};
use crate::state::AppState;

const HISTOGRAM_MONTHS: i32 = 12;
const TOP_LIMIT: u64 = 10;

#[utoipa::path(
    get,
    path = "/",
    tag = "Dashboard",
    operation_id = "dashboard",
    summary = "Editorial statistics",
    description = "Totals, this month against last month, a twelve-month publication histogram, the latest articles and the most viewed ones.",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn dashboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    auth_user.require_permission("dashboard:view")?;

    let db = &state.db;
    let now = Utc::now();
    let live = || article::Entity::find().filter(article::Column::DeletedAt.is_null());
    let with_status = |status: ArticleStatus| live().filter(article::Column::Status.eq(status));

    let views: Vec<i64> = live()
        .select_only()
        .column(article::Column::Views)
        .into_tuple()
        .all(db)
        .await?;

    let totals = DashboardTotals {
        articles: live().count(db).await?,
        published: with_status(ArticleStatus::Published).count(db).await?,
        drafts: with_status(ArticleStatus::Draft).count(db).await?,
        archived: with_status(ArticleStatus::Archived).count(db).await?,
        trashed: article::Entity::find()
            .filter(article::Column::DeletedAt.is_not_null())
            .count(db)
            .await?,
        views: views.iter().sum(),
        categories: category::Entity::find().count(db).await?,
        active_categories: category::Entity::find()
            .filter(category::Column::IsActive.eq(true))
            .count(db)
            .await?,
        tags: tag::Entity::find().count(db).await?,
        users: user::Entity::find().count(db).await?,
    };

    let (year, month) = (now.year(), now.month() as i32);
    let window_start = month_start(year, month - (HISTOGRAM_MONTHS - 1))
        .ok_or_else(|| AppError::Internal("dashboard window out of range".into()))?;
    let published_dates: Vec<Option<DateTime<Utc>>> = with_status(ArticleStatus::Published)
        .select_only()
        .column(article::Column::PublishedAt)
        .filter(article::Column::PublishedAt.gte(window_start))
        .filter(article::Column::PublishedAt.lte(now))
        .into_tuple()
        .all(db)
        .await?;
    let published_per_month = histogram(now, published_dates.into_iter().flatten());

    let this_month = published_per_month.last().map_or(0, |b| b.published);
    let last_month = published_per_month
        .iter()
        .rev()
        .nth(1)
        .map_or(0, |b| b.published);
    let trend = MonthlyTrend {
        this_month,
        last_month,
        change_percent: change_percent(this_month, last_month),
    };

    let latest = live()
        .order_by_desc(article::Column::CreatedAt)
        .order_by_desc(article::Column::Id)
        .limit(TOP_LIMIT)
        .all(db)
        .await?;
    let most_viewed = article::Entity::find()
        .filter(lifecycle::public_condition(now))
        .order_by_desc(article::Column::Views)
        .order_by_desc(article::Column::Id)
        .limit(TOP_LIMIT)
        .all(db)
        .await?;

    Ok(Json(DashboardResponse {
        totals,
        trend,
        published_per_month,
        latest: present::summaries(db, state.media.as_ref(), latest).await?,
        most_viewed: present::summaries(db, state.media.as_ref(), most_viewed).await?,
    }))
}

/// First instant of a month; `month` may run outside 1..=12 and wraps into
/// neighbouring years.
fn month_start(year: i32, month: i32) -> Option<DateTime<Utc>> {
    let index = year * 12 + (month - 1);
    let (y, m) = (index.div_euclid(12), index.rem_euclid(12) + 1);
    Utc.with_ymd_and_hms(y, m as u32, 1, 0, 0, 0).single()
}

/// Per-month counts for the twelve months ending with the month of `now`, oldest first.
fn histogram(now: DateTime<Utc>, dates: impl Iterator<Item = DateTime<Utc>>) -> Vec<MonthBucket> {
    let current = now.year() * 12 + now.month0() as i32;
    let first = current - (HISTOGRAM_MONTHS - 1);

    let mut counts = vec![0u64; HISTOGRAM_MONTHS as usize];
    for date in dates {
        let index = date.year() * 12 + date.month0() as i32;
        if (first..=current).contains(&index) {
            counts[(index - first) as usize] += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(offset, published)| {
            let index = first + offset as i32;
            MonthBucket {
                month: format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
                published,
            }
        })
        .collect()
}

/// Percentage change rounded to one decimal; `None` without a baseline.
fn change_percent(this_month: u64, last_month: u64) -> Option<f64> {
    if last_month == 0 {
        return None;
    }
    let change = (this_month as f64 - last_month as f64) / last_month as f64 * 100.0;
    Some((change * 10.0).round() / 10.0)
}
