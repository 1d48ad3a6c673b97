//! Optimistic create/update/delete against the remote store.
//!
//! Every mutation follows the same transaction:
//!
//! 1. validate (no state touched on failure)
//! 2. snapshot the affected record and apply the change locally
//! 3. release the state lock and await the remote call
//! 4. commit the server's record, or put the snapshot back
//!
//! Calls on different records never wait on each other. Two in-flight calls
//! on the same record race and whichever resolves last wins; a rollback only
//! ever restores the snapshot its own call took.
//!
//! Fetches are tagged with a sequence number so a slow response can never
//! overwrite the result of a newer request. After [`MutationCoordinator::close`]
//! late responses are dropped without touching state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::client::board::{navigate, resolve_drop, DragEvent, DropHandler, DropOutcome};
use crate::client::remote::{ListRequest, ListResponse, TrackerRemote};
use crate::client::state::{Action, TrackerState, ViewMode};
use crate::config::ClientConfig;
use crate::error::{Result, TrackerError};
use crate::tracker::{
    ApplicationId, ApplicationPatch, ApplicationStatus, NewApplication, OwnerId, Pagination,
    TrackedApplication, MAX_PAGE_LIMIT,
};

const NOTIFICATION_CAPACITY: usize = 64;

pub const CREATED: &str = "Application added successfully";
pub const UPDATED: &str = "Application updated successfully";
pub const DELETED: &str = "Application deleted successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient user-facing message ("toast") for a finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

pub struct MutationCoordinator<R> {
    remote: Arc<R>,
    owner_id: OwnerId,
    state: Arc<RwLock<TrackerState>>,
    notifications: broadcast::Sender<Notification>,
    fetch_seq: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl<R> Clone for MutationCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            owner_id: self.owner_id.clone(),
            state: self.state.clone(),
            notifications: self.notifications.clone(),
            fetch_seq: self.fetch_seq.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<R: TrackerRemote> MutationCoordinator<R> {
    pub fn new(remote: R, config: &ClientConfig) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            remote: Arc::new(remote),
            owner_id: config.owner_id.clone(),
            state: Arc::new(RwLock::new(TrackerState::new(config.page_limit))),
            notifications,
            fetch_seq: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Shared handle to the synchronized state, for views.
    pub fn state(&self) -> Arc<RwLock<TrackerState>> {
        self.state.clone()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> TrackerState {
        self.state.read().await.clone()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Stop applying responses. Calls already in flight finish but leave state alone.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn dispatch(&self, action: Action) {
        self.state.write().await.dispatch(action);
    }

    /// Add a new application, showing it immediately.
    pub async fn create(&self, payload: NewApplication) -> Result<TrackedApplication> {
        let fields = payload.validate()?;
        let provisional = TrackedApplication::provisional(self.owner_id.clone(), fields);
        let temp_id = provisional.id.clone();

        self.dispatch(Action::AddApplication(provisional)).await;
        tracing::debug!(temp_id = %temp_id, "Provisional application inserted");

        match self.remote.create(&payload).await {
            Ok(confirmed) => {
                if self.is_closed() {
                    return Ok(confirmed);
                }
                self.reconcile_created(&temp_id, confirmed.clone()).await;
                tracing::info!(temp_id = %temp_id, id = %confirmed.id, "Application confirmed");
                self.notify(NotificationLevel::Success, CREATED);
                Ok(confirmed)
            }
            Err(e) => {
                if !self.is_closed() {
                    self.dispatch(Action::RemoveApplication(temp_id.clone())).await;
                    tracing::warn!(temp_id = %temp_id, error = %e, "Create failed, provisional record removed");
                    self.notify(NotificationLevel::Error, e.to_string());
                }
                Err(e)
            }
        }
    }

    // Swap the placeholder for the server's record, keeping exactly one copy
    // even if a fetch already brought the confirmed record in.
    async fn reconcile_created(&self, temp_id: &ApplicationId, confirmed: TrackedApplication) {
        let mut state = self.state.write().await;
        let has_temp = state.position(temp_id).is_some();
        let has_confirmed = state.position(&confirmed.id).is_some();

        match (has_temp, has_confirmed) {
            (true, false) => state.dispatch(Action::ReplaceApplication {
                id: temp_id.clone(),
                application: confirmed,
            }),
            (true, true) => state.dispatch(Action::RemoveApplication(temp_id.clone())),
            (false, false) => state.dispatch(Action::AddApplication(confirmed)),
            (false, true) => {}
        }
    }

    /// Change any subset of a record's fields, showing the change immediately.
    pub async fn update(
        &self,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<TrackedApplication> {
        let changes = patch.validate()?;
        if id.is_temporary() {
            return Err(TrackerError::invalid(
                "id",
                "Application has not been saved yet",
            ));
        }

        let (snapshot, pending) = {
            let mut state = self.state.write().await;
            let current = state
                .find(id)
                .cloned()
                .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

            let mut optimistic = current.clone();
            optimistic.apply_patch(&changes, Utc::now());
            optimistic.is_optimistic = true;
            state.dispatch(Action::ReplaceApplication {
                id: id.clone(),
                application: optimistic.clone(),
            });
            (current, optimistic)
        };

        match self.remote.update(id, &patch).await {
            Ok(confirmed) => {
                if !self.is_closed() {
                    self.dispatch(Action::ReplaceApplication {
                        id: id.clone(),
                        application: confirmed.clone(),
                    })
                    .await;
                    tracing::info!(id = %id, status = %confirmed.status, "Application update confirmed");
                    self.notify(NotificationLevel::Success, UPDATED);
                }
                Ok(confirmed)
            }
            Err(e) => {
                if !self.is_closed() {
                    self.rollback_update(id, snapshot, &pending, &e).await;
                    self.notify(NotificationLevel::Error, e.to_string());
                }
                Err(e)
            }
        }
    }

    // Only undo our own optimistic copy. If another call has since written
    // the record, its state is newer than our snapshot and stays. A snapshot
    // that is still another call's optimistic copy is resolved by that call.
    async fn rollback_update(
        &self,
        id: &ApplicationId,
        snapshot: TrackedApplication,
        pending: &TrackedApplication,
        error: &TrackerError,
    ) {
        let mut state = self.state.write().await;
        if state.find(id) != Some(pending) {
            tracing::warn!(id = %id, error = %error, "Update failed, record changed since; keeping newer state");
            return;
        }
        state.dispatch(Action::ReplaceApplication {
            id: id.clone(),
            application: snapshot,
        });
        tracing::warn!(id = %id, error = %error, "Update failed, record rolled back");
    }

    /// Remove a record, hiding it immediately.
    pub async fn delete(&self, id: &ApplicationId) -> Result<()> {
        if id.is_temporary() {
            return Err(TrackerError::invalid(
                "id",
                "Application has not been saved yet",
            ));
        }

        let (snapshot, index) = {
            let mut state = self.state.write().await;
            let index = state
                .position(id)
                .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
            let snapshot = state.applications[index].clone();
            state.dispatch(Action::RemoveApplication(id.clone()));
            (snapshot, index)
        };

        match self.remote.delete(id).await {
            Ok(()) => {
                if !self.is_closed() {
                    tracing::info!(id = %id, "Application delete confirmed");
                    self.notify(NotificationLevel::Success, DELETED);
                }
                Ok(())
            }
            Err(e) => {
                if !self.is_closed() {
                    self.dispatch(Action::RestoreApplication {
                        application: snapshot,
                        index,
                    })
                    .await;
                    tracing::warn!(id = %id, index, error = %e, "Delete failed, record restored");
                    self.notify(NotificationLevel::Error, e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Carry out a board drop: a status-only update, or nothing at all.
    pub async fn move_card(&self, event: DragEvent) -> Result<DropOutcome> {
        let transition = {
            let state = self.state.read().await;
            resolve_drop(&state, &event)
        };
        let Some(transition) = transition else {
            tracing::debug!(id = %event.record_id, target = ?event.target_group, "Drop ignored");
            return Ok(DropOutcome::Ignored);
        };

        tracing::debug!(
            id = %event.record_id,
            from = %transition.from,
            to = %transition.to,
            "Moving card"
        );
        let moved = self
            .update(&event.record_id, ApplicationPatch::status(transition.to))
            .await?;
        Ok(DropOutcome::Moved(moved))
    }

    /// Reload the current view from the remote store.
    ///
    /// List mode fetches the current page with the active filters. Board mode
    /// fetches every page, unfiltered, and leaves search to the board itself.
    pub async fn refresh(&self) -> Result<()> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let (mode, request) = {
            let mut state = self.state.write().await;
            state.dispatch(Action::SetLoading(true));
            state.dispatch(Action::SetError(None));
            let request = ListRequest {
                status: state.filters.status,
                search: Some(state.filters.search.clone()).filter(|s| !s.is_empty()),
                page: Some(state.pagination.page),
                limit: Some(state.pagination.limit),
            };
            (state.view_mode, request)
        };

        let result = match mode {
            ViewMode::List => self.remote.list(&request).await,
            ViewMode::Board => self.fetch_all().await,
        };

        if self.is_closed() {
            return Ok(());
        }
        if seq != self.fetch_seq.load(Ordering::SeqCst) {
            tracing::debug!(seq, "Discarding stale fetch response");
            return Ok(());
        }

        let mut state = self.state.write().await;
        state.dispatch(Action::SetLoading(false));
        match result {
            Ok(response) => {
                tracing::debug!(
                    seq,
                    count = response.items.len(),
                    total = response.pagination.total,
                    "Applications loaded"
                );
                state.dispatch(Action::SetApplications(response.items));
                if mode == ViewMode::List {
                    state.dispatch(Action::SetPagination(response.pagination));
                }
                Ok(())
            }
            Err(e) => {
                state.dispatch(Action::SetError(Some(e.to_string())));
                drop(state);
                tracing::warn!(seq, error = %e, "Fetching applications failed");
                self.notify(NotificationLevel::Error, e.to_string());
                Err(e)
            }
        }
    }

    // Records created while the pages are read shift the newest-first order,
    // so a record can come back on the next page. The first copy wins.
    async fn fetch_all(&self) -> Result<ListResponse> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1;
        loop {
            let response = self
                .remote
                .list(&ListRequest {
                    page: Some(page),
                    limit: Some(MAX_PAGE_LIMIT),
                    ..ListRequest::default()
                })
                .await?;
            let Pagination {
                total, total_pages, ..
            } = response.pagination;
            items.extend(
                response
                    .items
                    .into_iter()
                    .filter(|app| seen.insert(app.id.clone())),
            );

            if u64::from(page) >= total_pages {
                return Ok(ListResponse {
                    pagination: Pagination::new(1, MAX_PAGE_LIMIT, total),
                    items,
                });
            }
            page += 1;
        }
    }

    pub async fn set_status_filter(&self, status: Option<ApplicationStatus>) -> Result<()> {
        self.dispatch(Action::SetStatusFilter(status)).await;
        self.refresh().await
    }

    /// Apply a (debounced) search. Re-applying the current search does nothing.
    pub async fn set_search_filter(&self, search: impl Into<String>) -> Result<()> {
        let search = search.into();
        if self.state.read().await.filters.search == search {
            return Ok(());
        }
        self.dispatch(Action::SetSearchFilter(search)).await;
        self.refresh().await
    }

    /// Apply each debounced search text as it arrives, until the input is
    /// dropped or the coordinator is closed.
    pub fn follow_search(&self, mut searches: mpsc::UnboundedReceiver<String>) -> JoinHandle<()>
    where
        R: 'static,
    {
        let coordinator = self.clone();
        tokio::spawn(async move {
            while let Some(search) = searches.recv().await {
                if coordinator.is_closed() {
                    break;
                }
                // Failures are already recorded in state and notified.
                let _ = coordinator.set_search_filter(search).await;
            }
        })
    }

    pub async fn clear_filters(&self) -> Result<()> {
        self.dispatch(Action::ClearFilters).await;
        self.refresh().await
    }

    /// Go to another page. Out-of-range or current pages are ignored.
    pub async fn set_page(&self, page: u32) -> Result<()> {
        let pagination = self.state.read().await.pagination;
        let Some(page) = navigate(&pagination, page) else {
            return Ok(());
        };
        self.dispatch(Action::SetPage(page)).await;
        self.refresh().await
    }

    pub async fn set_view_mode(&self, mode: ViewMode) -> Result<()> {
        if self.state.read().await.view_mode == mode {
            return Ok(());
        }
        self.dispatch(Action::SetViewMode(mode)).await;
        self.refresh().await
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        // No subscribers is fine: notifications are fire-and-forget.
        let _ = self.notifications.send(Notification {
            level,
            message: message.into(),
        });
    }
}

#[async_trait]
impl<R: TrackerRemote + 'static> DropHandler for MutationCoordinator<R> {
    async fn on_drop(&self, event: DragEvent) -> Result<DropOutcome> {
        self.move_card(event).await
    }
}
