//! Client-side mirror of the owner's applications.
//!
//! [`TrackerState`] changes only through [`TrackerState::reduce`], a pure
//! `(state, action) -> state` transition. The coordinator is the sole writer;
//! views read through the selectors at the bottom of this file.

use crate::tracker::{
    ApplicationFilter, ApplicationId, ApplicationStatus, Pagination, TrackedApplication,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub status: Option<ApplicationStatus>,
    pub search: String,
}

impl Filters {
    pub fn is_active(&self) -> bool {
        self.status.is_some() || !self.search.is_empty()
    }

    /// Status and search, as applied by the list view.
    pub fn to_filter(&self) -> ApplicationFilter {
        ApplicationFilter::new(self.status, Some(self.search.clone()))
    }

    /// Search only. The board groups by status instead of filtering on it.
    pub fn search_filter(&self) -> ApplicationFilter {
        ApplicationFilter::new(None, Some(self.search.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    List,
    #[default]
    Board,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub applications: Vec<TrackedApplication>,
    pub filters: Filters,
    pub pagination: Pagination,
    pub view_mode: ViewMode,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetApplications(Vec<TrackedApplication>),
    /// Insert at the front, replacing any record with the same id.
    AddApplication(TrackedApplication),
    /// Swap the record with `id` in place. No-op when `id` is absent.
    ReplaceApplication {
        id: ApplicationId,
        application: TrackedApplication,
    },
    RemoveApplication(ApplicationId),
    /// Put a removed record back at `index` (clamped). No-op if it is already present.
    RestoreApplication {
        application: TrackedApplication,
        index: usize,
    },
    SetPagination(Pagination),
    SetPage(u32),
    SetStatusFilter(Option<ApplicationStatus>),
    SetSearchFilter(String),
    ClearFilters,
    SetViewMode(ViewMode),
    SetLoading(bool),
    SetError(Option<String>),
}

impl TrackerState {
    pub fn new(page_limit: u32) -> Self {
        Self {
            pagination: Pagination::new(1, page_limit.max(1), 0),
            ..Self::default()
        }
    }

    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::SetApplications(applications) => {
                self.applications = applications;
            }
            Action::AddApplication(application) => {
                self.applications.retain(|app| app.id != application.id);
                self.applications.insert(0, application);
            }
            Action::ReplaceApplication { id, application } => {
                if let Some(slot) = self.applications.iter_mut().find(|app| app.id == id) {
                    *slot = application;
                }
            }
            Action::RemoveApplication(id) => {
                self.applications.retain(|app| app.id != id);
            }
            Action::RestoreApplication { application, index } => {
                if self.position(&application.id).is_none() {
                    let index = index.min(self.applications.len());
                    self.applications.insert(index, application);
                }
            }
            Action::SetPagination(pagination) => {
                self.pagination = pagination;
            }
            Action::SetPage(page) => {
                self.pagination.page = page.max(1);
            }
            Action::SetStatusFilter(status) => {
                self.filters.status = status;
                self.pagination.page = 1;
            }
            Action::SetSearchFilter(search) => {
                self.filters.search = search;
                self.pagination.page = 1;
            }
            Action::ClearFilters => {
                self.filters = Filters::default();
                self.pagination.page = 1;
            }
            Action::SetViewMode(mode) => {
                self.view_mode = mode;
            }
            Action::SetLoading(loading) => {
                self.loading = loading;
            }
            Action::SetError(error) => {
                self.error = error;
            }
        }
        self
    }

    /// In-place form of [`TrackerState::reduce`].
    pub fn dispatch(&mut self, action: Action) {
        *self = std::mem::take(self).reduce(action);
    }

    pub fn find(&self, id: &ApplicationId) -> Option<&TrackedApplication> {
        self.applications.iter().find(|app| &app.id == id)
    }

    pub fn position(&self, id: &ApplicationId) -> Option<usize> {
        self.applications.iter().position(|app| &app.id == id)
    }

    /// Records visible in the list view: status filter AND search.
    pub fn list_view(&self) -> Vec<&TrackedApplication> {
        let filter = self.filters.to_filter();
        self.applications
            .iter()
            .filter(|app| filter.matches(app))
            .collect()
    }

    /// Per-status totals over everything held locally.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for app in &self.applications {
            counts.0[app.status.index()] += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts([usize; 4]);

impl StatusCounts {
    pub fn get(&self, status: ApplicationStatus) -> usize {
        self.0[status.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApplicationStatus, usize)> + '_ {
        ApplicationStatus::ALL
            .into_iter()
            .map(move |status| (status, self.get(status)))
    }
}
