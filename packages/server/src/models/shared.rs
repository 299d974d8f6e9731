use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, FieldErrors};

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 12)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 4)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// `?page=&per_page=` query parameters.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100).
    pub per_page: Option<u64>,
}

/// Largest page number whose row offset still fits a signed 64-bit bind parameter.
pub const MAX_PAGE: u64 = i64::MAX as u64 / 100;

impl PageQuery {
    /// Clamp to `(1 <= page <= MAX_PAGE, 1 <= per_page <= 100)`, using
    /// `default_per_page` when unset.
    pub fn resolve(&self, default_per_page: u64) -> (u64, u64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(default_per_page).clamp(1, 100);
        (page, per_page)
    }
}

/// Rows to skip before `page`. Inputs come from [`PageQuery::resolve`].
pub fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(per_page)
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Collects per-field validation messages and turns them into one error.
#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        }
        self
    }

    /// Trimmed text must be 1..=max characters.
    pub fn text(&mut self, field: &str, value: &str, label: &str, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        let message = format!("{label} must be 1-{max} characters");
        self.check(len > 0 && len <= max, field, &message)
    }

    /// Optional text must not exceed `max` characters.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, label: &str, max: usize) -> &mut Self {
        let ok = value.is_none_or(|v| v.chars().count() <= max);
        let message = format!("{label} must be at most {max} characters");
        self.check(ok, field, &message)
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(std::mem::take(&mut self.errors)))
        }
    }
}

/// Trim, turning blank strings into `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
