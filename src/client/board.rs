//! Presentation logic for the Kanban board and the paginated list.
//!
//! Nothing here knows about a particular drag-and-drop library: a drop is
//! reported as a [`DragEvent`] and resolved by [`resolve_drop`] into at most
//! one status transition. Any [`DropHandler`] can then carry it out.

use async_trait::async_trait;

use crate::client::state::TrackerState;
use crate::error::Result;
use crate::tracker::{ApplicationId, ApplicationStatus, Pagination, TrackedApplication};

/// Page numbers shown around the current page.
const PAGE_WINDOW: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn<'a> {
    pub status: ApplicationStatus,
    pub applications: Vec<&'a TrackedApplication>,
}

/// The four status columns, search applied, in [`ApplicationStatus::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Board<'a> {
    pub columns: Vec<BoardColumn<'a>>,
}

impl<'a> Board<'a> {
    pub fn build(state: &'a TrackerState) -> Self {
        let filter = state.filters.search_filter();
        let mut columns: Vec<BoardColumn<'a>> = ApplicationStatus::ALL
            .into_iter()
            .map(|status| BoardColumn {
                status,
                applications: Vec::new(),
            })
            .collect();

        for app in state.applications.iter().filter(|app| filter.matches(app)) {
            columns[app.status.index()].applications.push(app);
        }

        Self { columns }
    }

    pub fn column(&self, status: ApplicationStatus) -> &BoardColumn<'a> {
        &self.columns[status.index()]
    }
}

/// A card was released. Groups are column ids as reported by the UI; the
/// target is `None` when the card was dropped outside any column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEvent {
    pub record_id: ApplicationId,
    pub source_group: Option<String>,
    pub target_group: Option<String>,
}

impl DragEvent {
    pub fn new(record_id: ApplicationId, target_group: impl Into<String>) -> Self {
        Self {
            record_id,
            source_group: None,
            target_group: Some(target_group.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// The status change a drop asks for, if any. The record's stored status is
/// authoritative; `source_group` is only informational.
pub fn resolve_drop(state: &TrackerState, event: &DragEvent) -> Option<StatusTransition> {
    let target = event.target_group.as_deref()?.parse::<ApplicationStatus>().ok()?;
    let current = state.find(&event.record_id)?.status;

    if let Some(source) = event.source_group.as_deref() {
        if source != current.as_str() {
            tracing::debug!(
                id = %event.record_id,
                source,
                current = %current,
                "Drag source column disagrees with record status"
            );
        }
    }

    (target != current).then_some(StatusTransition {
        from: current,
        to: target,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The record changed column; carries the server-confirmed record.
    Moved(TrackedApplication),
    /// Same column, unknown column or unknown card.
    Ignored,
}

/// Anything that can act on a completed drag.
#[async_trait]
pub trait DropHandler: Send + Sync {
    async fn on_drop(&self, event: DragEvent) -> Result<DropOutcome>;
}

/// Pager model: visible page numbers and the "showing a-b of n" range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub pages: Vec<u64>,
    pub first_item: u64,
    pub last_item: u64,
    pub total: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// `None` when everything fits on one page.
    pub fn new(pagination: &Pagination) -> Option<Self> {
        let total_pages = pagination.total_pages;
        if total_pages <= 1 {
            return None;
        }
        let page = (pagination.page as u64).clamp(1, total_pages);
        let limit = pagination.limit.max(1) as u64;

        let mut start = page.saturating_sub(PAGE_WINDOW / 2).max(1);
        let end = (start + PAGE_WINDOW - 1).min(total_pages);
        if end - start + 1 < PAGE_WINDOW {
            start = (end + 1).saturating_sub(PAGE_WINDOW).max(1);
        }

        Some(Self {
            pages: (start..=end).collect(),
            first_item: (page - 1) * limit + 1,
            last_item: (page * limit).min(pagination.total),
            total: pagination.total,
            has_previous: page > 1,
            has_next: page < total_pages,
        })
    }
}

/// The page to load when the user picks `target`, or `None` if the pick is
/// out of range or already current.
pub fn navigate(pagination: &Pagination, target: u32) -> Option<u32> {
    let in_range = target >= 1 && (target as u64) <= pagination.total_pages;
    (in_range && target != pagination.page).then_some(target)
}
