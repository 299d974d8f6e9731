use serde::Serialize;

use crate::models::article::ArticleSummary;

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardTotals {
    pub articles: u64,
    pub published: u64,
    pub drafts: u64,
    pub archived: u64,
    pub trashed: u64,
    pub views: i64,
    pub categories: u64,
    pub active_categories: u64,
    pub tags: u64,
    pub users: u64,
}

/// Articles published this calendar month against the previous one.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MonthlyTrend {
    pub this_month: u64,
    pub last_month: u64,
    /// Percentage change, `null` when last month had none.
    pub change_percent: Option<f64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MonthBucket {
    /// `YYYY-MM`.
    #[schema(example = "2024-05")]
    pub month: String,
    pub published: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub totals: DashboardTotals,
    pub trend: MonthlyTrend,
    /// The last twelve months, oldest first.
    pub published_per_month: Vec<MonthBucket>,
    /// Ten most recently created articles.
    pub latest: Vec<ArticleSummary>,
    /// Ten most viewed published articles.
    pub most_viewed: Vec<ArticleSummary>,
}
