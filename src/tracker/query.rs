//! Filtering and pagination of one owner's applications.
//!
//! A [`ListQuery`] is built from raw request parameters by
//! [`ListParams::parse`], which rejects malformed values before the store is
//! touched and normalizes page/limit into a valid slice. The same
//! [`ApplicationFilter`] is reused client-side so the list view can narrow
//! its local copy without waiting for the server.

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result, TrackerError};
use crate::tracker::application::{ApplicationStatus, TrackedApplication};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Bounds applied to the `limit` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Status and text filters. `None`/empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
}

impl ApplicationFilter {
    pub fn new(status: Option<ApplicationStatus>, search: Option<String>) -> Self {
        Self {
            status,
            search: search.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Both filters must hold.
    pub fn matches(&self, app: &TrackedApplication) -> bool {
        let status_ok = self.status.map_or(true, |status| app.status == status);
        let search_ok = self
            .search
            .as_deref()
            .map_or(true, |needle| app.matches_search(&needle.trim().to_lowercase()));
        status_ok && search_ok
    }
}

/// A validated, normalized list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: ApplicationFilter,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    pub fn new(filter: ApplicationFilter, page: u32, limit: u32, limits: PageLimits) -> Self {
        let limit = if limit == 0 {
            limits.default_limit
        } else {
            limit.min(limits.max_limit)
        };
        Self {
            filter,
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn skip(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }
}

/// Raw query-string parameters as received by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn parse(&self, limits: PageLimits) -> Result<ListQuery> {
        let mut errors = Vec::new();

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => match value.parse::<ApplicationStatus>() {
                Ok(status) => Some(status),
                Err(message) => {
                    errors.push(FieldError::new("status", message));
                    None
                }
            },
        };
        let page = parse_number(self.page.as_deref(), "page", &mut errors).unwrap_or(1);
        let limit = parse_number(self.limit.as_deref(), "limit", &mut errors).unwrap_or(0);

        if !errors.is_empty() {
            return Err(TrackerError::Validation(errors));
        }

        Ok(ListQuery::new(
            ApplicationFilter::new(status, self.search.clone()),
            page,
            limit,
            limits,
        ))
    }
}

// Negative values normalize like zero; only non-numeric text is an error.
fn parse_number(value: Option<&str>, field: &str, errors: &mut Vec<FieldError>) -> Option<u32> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match value.parse::<i64>() {
        Ok(n) => Some(n.clamp(0, u32::MAX as i64) as u32),
        Err(_) => {
            errors.push(FieldError::new(
                field,
                format!("Expected a number for '{}', received '{}'", field, value),
            ));
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1) as u64),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT, 0)
    }
}

/// One page of results plus the numbers needed to navigate.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Slice an already filtered and ordered result set.
pub fn paginate<T>(items: Vec<T>, query: &ListQuery) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(query.skip())
        .take(query.limit as usize)
        .collect();
    Page {
        items,
        pagination: Pagination::new(query.page, query.limit, total),
    }
}
