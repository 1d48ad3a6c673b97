use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use job_tracker::client::coordinator::{CREATED, DELETED, UPDATED};
use job_tracker::client::remote::DELETE_FAILED;
use job_tracker::client::{
    Action, Board, DragEvent, DropHandler, DropOutcome, ListRequest, ListResponse,
    MutationCoordinator, NotificationLevel, SearchInput, TrackerRemote, TrackerState, ViewMode,
};
use job_tracker::config::ClientConfig;
use job_tracker::error::{Result, TrackerError};
use job_tracker::tracker::{
    ApplicationFilter, ApplicationId, ApplicationPatch, ApplicationStatus, ApplicationStore,
    ListQuery, NewApplication, OwnerId, PageLimits, TrackedApplication, ValidApplication,
};

// =============================================================================
// Scripted remote
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    List(ListRequest),
    Fetch(ApplicationId),
    Create(NewApplication),
    Update(ApplicationId, ApplicationPatch),
    Delete(ApplicationId),
}

#[derive(Debug, Default)]
struct Failures {
    list: Option<String>,
    create: Option<String>,
    update: Option<String>,
    delete: Option<String>,
}

/// In-memory server. Mutations can be held at a gate so tests can observe
/// the optimistic state while a call is in flight.
struct FakeRemote {
    owner: OwnerId,
    store: Mutex<ApplicationStore>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Failures>,
    list_delays: Mutex<VecDeque<Duration>>,
    // One entry per list call: a company to create server-side before
    // answering, as if another session added it mid-read.
    list_inserts: Mutex<VecDeque<Option<String>>>,
    // One entry per update that passes the gate, ahead of `failures.update`.
    update_results: Mutex<VecDeque<Option<String>>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeRemote {
    fn new() -> Self {
        Self {
            owner: OwnerId::new("u1"),
            store: Mutex::new(ApplicationStore::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Failures::default()),
            list_delays: Mutex::new(VecDeque::new()),
            list_inserts: Mutex::new(VecDeque::new()),
            update_results: Mutex::new(VecDeque::new()),
            gate: None,
        }
    }

    fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let remote = Self {
            gate: Some(gate.clone()),
            ..Self::new()
        };
        (remote, gate)
    }

    fn seed(&self, company: &str, role: &str, status: ApplicationStatus) -> TrackedApplication {
        self.store
            .lock()
            .unwrap()
            .create(
                &self.owner,
                ValidApplication {
                    company_name: company.to_string(),
                    role: role.to_string(),
                    status,
                    applied_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                },
            )
            .unwrap()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn fail(&self, set: impl FnOnce(&mut Failures)) {
        set(&mut self.failures.lock().unwrap());
    }

    fn delay_next_list(&self, delay: Duration) {
        self.list_delays.lock().unwrap().push_back(delay);
    }

    fn insert_before_lists(&self, inserts: impl IntoIterator<Item = Option<&'static str>>) {
        let mut queue = self.list_inserts.lock().unwrap();
        queue.extend(inserts.into_iter().map(|company| company.map(str::to_string)));
    }

    fn script_updates(&self, results: impl IntoIterator<Item = Option<&'static str>>) {
        let mut queue = self.update_results.lock().unwrap();
        queue.extend(results.into_iter().map(|message| message.map(str::to_string)));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(&self, pick: impl FnOnce(&Failures) -> Option<String>) -> Result<()> {
        let failure = pick(&self.failures.lock().unwrap());
        match failure {
            Some(message) => Err(TrackerError::RequestFailed(message)),
            None => Ok(()),
        }
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl TrackerRemote for FakeRemote {
    async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        self.record(Call::List(request.clone()));
        let delay = self.list_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.failure(|f| f.list.clone())?;
        let insert = self.list_inserts.lock().unwrap().pop_front().flatten();
        if let Some(company) = insert {
            self.seed(&company, "SWE", ApplicationStatus::Applied);
        }

        let query = ListQuery::new(
            ApplicationFilter::new(request.status, request.search.clone()),
            request.page.unwrap_or(1),
            request.limit.unwrap_or(0),
            PageLimits::default(),
        );
        let page = self.store.lock().unwrap().query(&self.owner, &query);
        Ok(ListResponse {
            items: page.items,
            pagination: page.pagination,
        })
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<TrackedApplication> {
        self.record(Call::Fetch(id.clone()));
        let found = self.store.lock().unwrap().get(&self.owner, id).cloned();
        found.ok_or_else(|| TrackerError::RequestFailed("Application not found".to_string()))
    }

    async fn create(&self, payload: &NewApplication) -> Result<TrackedApplication> {
        self.record(Call::Create(payload.clone()));
        self.pass_gate().await;
        self.failure(|f| f.create.clone())?;

        let fields = payload.validate()?;
        let created = self.store.lock().unwrap().create(&self.owner, fields);
        created
    }

    async fn update(
        &self,
        id: &ApplicationId,
        patch: &ApplicationPatch,
    ) -> Result<TrackedApplication> {
        self.record(Call::Update(id.clone(), patch.clone()));
        self.pass_gate().await;
        let scripted = self.update_results.lock().unwrap().pop_front();
        match scripted {
            Some(Some(message)) => return Err(TrackerError::RequestFailed(message)),
            Some(None) => {}
            None => self.failure(|f| f.update.clone())?,
        }

        let patch = patch.validate()?;
        let updated = self.store.lock().unwrap().update(&self.owner, id, &patch);
        updated
    }

    async fn delete(&self, id: &ApplicationId) -> Result<()> {
        self.record(Call::Delete(id.clone()));
        self.pass_gate().await;
        self.failure(|f| f.delete.clone())?;

        let removed = self.store.lock().unwrap().remove(&self.owner, id);
        removed.map(|_| ())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn coordinator(remote: FakeRemote) -> MutationCoordinator<FakeRemote> {
    let config = ClientConfig::new("http://tracker.test", OwnerId::new("u1"));
    MutationCoordinator::new(remote, &config)
}

fn coordinator_with_limit(remote: FakeRemote, limit: u32) -> MutationCoordinator<FakeRemote> {
    let config =
        ClientConfig::new("http://tracker.test", OwnerId::new("u1")).with_page_limit(limit);
    MutationCoordinator::new(remote, &config)
}

fn google_swe() -> NewApplication {
    NewApplication::new("Google", "SWE", "2024-01-15").with_status(ApplicationStatus::Applied)
}

async fn wait_until(
    coordinator: &MutationCoordinator<FakeRemote>,
    condition: impl Fn(&TrackerState) -> bool,
) {
    for _ in 0..100 {
        if condition(&coordinator.snapshot().await) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("state never reached the expected shape");
}

async fn wait_for_update_calls(coordinator: &MutationCoordinator<FakeRemote>, count: usize) {
    for _ in 0..100 {
        let updates = coordinator
            .remote()
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Update(..)))
            .count();
        if updates >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("update calls never reached the remote");
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_is_visible_immediately_then_confirmed() {
    let (remote, gate) = FakeRemote::gated();
    let coordinator = coordinator(remote);
    let mut notifications = coordinator.subscribe_notifications();

    let task = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create(google_swe()).await })
    };

    wait_until(&coordinator, |state| state.applications.len() == 1).await;
    let pending = coordinator.snapshot().await;
    let provisional = &pending.applications[0];
    assert!(provisional.is_optimistic);
    assert!(provisional.id.is_temporary());
    assert_eq!(provisional.company_name, "Google");

    gate.add_permits(1);
    let confirmed = task.await.unwrap().unwrap();

    let state = coordinator.snapshot().await;
    assert_eq!(state.applications.len(), 1);
    let record = &state.applications[0];
    assert_eq!(record.id, confirmed.id);
    assert!(!record.id.is_temporary());
    assert!(!record.is_optimistic);
    assert_eq!(record.company_name, "Google");
    assert_eq!(record.role, "SWE");
    assert_eq!(record.status, ApplicationStatus::Applied);
    assert_eq!(
        record.applied_date,
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    );

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Success);
    assert_eq!(notification.message, CREATED);
}

#[tokio::test]
async fn test_create_rejected_by_server_leaves_nothing_behind() {
    let remote = FakeRemote::new();
    remote.fail(|f| f.create = Some("Company name is required".to_string()));
    let coordinator = coordinator(remote);
    let mut notifications = coordinator.subscribe_notifications();

    let result = coordinator.create(google_swe()).await;

    assert_eq!(
        result,
        Err(TrackerError::RequestFailed(
            "Company name is required".to_string()
        ))
    );
    assert!(coordinator.snapshot().await.applications.is_empty());

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.message, "Company name is required");
}

#[tokio::test]
async fn test_invalid_create_never_reaches_state_or_network() {
    let coordinator = coordinator(FakeRemote::new());

    let result = coordinator
        .create(NewApplication::new("", "SWE", "not-a-date"))
        .await;

    let err = result.unwrap_err();
    let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["companyName", "appliedDate"]);
    assert!(coordinator.snapshot().await.applications.is_empty());
    assert!(coordinator.remote().calls().is_empty());
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_applies_locally_then_commits_server_record() {
    let (remote, gate) = FakeRemote::gated();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();

    let task = {
        let coordinator = coordinator.clone();
        let id = seeded.id.clone();
        tokio::spawn(async move {
            coordinator
                .update(&id, ApplicationPatch::status(ApplicationStatus::Offer))
                .await
        })
    };

    wait_until(&coordinator, |state| {
        state.applications[0].status == ApplicationStatus::Offer
    })
    .await;
    assert!(coordinator.snapshot().await.applications[0].is_optimistic);

    gate.add_permits(1);
    let confirmed = task.await.unwrap().unwrap();

    let state = coordinator.snapshot().await;
    assert_eq!(state.applications, vec![confirmed.clone()]);
    assert_eq!(confirmed.status, ApplicationStatus::Offer);
    assert!(!state.applications[0].is_optimistic);
}

#[tokio::test]
async fn test_failed_update_restores_every_field() {
    let remote = FakeRemote::new();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.fail(|f| f.update = Some("Failed to update application".to_string()));
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();
    let before = coordinator.snapshot().await.applications;
    let mut notifications = coordinator.subscribe_notifications();

    let patch = ApplicationPatch {
        company_name: Some("Alphabet".to_string()),
        role: Some("Staff SWE".to_string()),
        status: Some("Rejected".to_string()),
        applied_date: Some("2023-12-01".to_string()),
    };
    let result = coordinator.update(&seeded.id, patch).await;

    assert!(matches!(result, Err(TrackerError::RequestFailed(_))));
    assert_eq!(coordinator.snapshot().await.applications, before);
    assert_eq!(
        notifications.try_recv().unwrap().level,
        NotificationLevel::Error
    );
}

#[tokio::test]
async fn test_update_of_unknown_or_unsaved_record_is_rejected_locally() {
    let coordinator = coordinator(FakeRemote::new());

    let result = coordinator
        .update(
            &ApplicationId::generate(),
            ApplicationPatch::status(ApplicationStatus::Offer),
        )
        .await;
    assert!(matches!(result, Err(TrackerError::NotFound(_))));

    let result = coordinator
        .update(
            &ApplicationId::temporary(),
            ApplicationPatch::status(ApplicationStatus::Offer),
        )
        .await;
    assert_eq!(result.unwrap_err().field_errors()[0].field, "id");

    let result = coordinator
        .update(
            &ApplicationId::generate(),
            ApplicationPatch {
                status: Some("Ghosted".to_string()),
                ..ApplicationPatch::default()
            },
        )
        .await;
    assert_eq!(result.unwrap_err().field_errors()[0].field, "status");

    assert!(coordinator.remote().calls().is_empty());
}

#[tokio::test]
async fn test_mutations_on_different_records_do_not_wait_on_each_other() {
    let (remote, gate) = FakeRemote::gated();
    let a = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    let b = remote.seed("Amazon", "SDE", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();

    let spawn_move = |id: ApplicationId, status| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .update(&id, ApplicationPatch::status(status))
                .await
        })
    };
    let first = spawn_move(a.id.clone(), ApplicationStatus::Interview);
    let second = spawn_move(b.id.clone(), ApplicationStatus::Offer);

    // Both optimistic changes are visible while both calls are in flight
    wait_until(&coordinator, |state| {
        state.find(&a.id).map(|app| app.status) == Some(ApplicationStatus::Interview)
            && state.find(&b.id).map(|app| app.status) == Some(ApplicationStatus::Offer)
    })
    .await;

    gate.add_permits(2);
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let counts = coordinator.snapshot().await.status_counts();
    assert_eq!(counts.get(ApplicationStatus::Interview), 1);
    assert_eq!(counts.get(ApplicationStatus::Offer), 1);
    assert_eq!(counts.get(ApplicationStatus::Applied), 0);
}

#[tokio::test]
async fn test_failed_update_does_not_clobber_a_newer_confirmed_update() {
    let (remote, gate) = FakeRemote::gated();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.script_updates([None, Some("Failed to update application")]);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();

    let spawn_move = |status| {
        let coordinator = coordinator.clone();
        let id = seeded.id.clone();
        tokio::spawn(async move {
            coordinator
                .update(&id, ApplicationPatch::status(status))
                .await
        })
    };

    // The second move snapshots the first one's optimistic copy
    let first = spawn_move(ApplicationStatus::Interview);
    wait_for_update_calls(&coordinator, 1).await;
    let second = spawn_move(ApplicationStatus::Offer);
    wait_for_update_calls(&coordinator, 2).await;
    wait_until(&coordinator, |state| {
        state.applications[0].status == ApplicationStatus::Offer
    })
    .await;

    gate.add_permits(1);
    let confirmed = first.await.unwrap().unwrap();
    assert_eq!(confirmed.status, ApplicationStatus::Interview);

    gate.add_permits(1);
    assert!(second.await.unwrap().is_err());

    let state = coordinator.snapshot().await;
    assert_eq!(state.applications, vec![confirmed]);
    assert!(!state.applications[0].is_optimistic);
}

#[tokio::test]
async fn test_failed_update_while_earlier_update_in_flight_defers_to_it() {
    let (remote, gate) = FakeRemote::gated();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.script_updates([Some("Failed to update application"), None]);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();

    let spawn_move = |status| {
        let coordinator = coordinator.clone();
        let id = seeded.id.clone();
        tokio::spawn(async move {
            coordinator
                .update(&id, ApplicationPatch::status(status))
                .await
        })
    };

    let first = spawn_move(ApplicationStatus::Interview);
    wait_for_update_calls(&coordinator, 1).await;
    let second = spawn_move(ApplicationStatus::Offer);
    wait_for_update_calls(&coordinator, 2).await;

    // First call fails while the second is still pending: the record keeps
    // the second call's optimistic copy
    gate.add_permits(1);
    assert!(first.await.unwrap().is_err());
    let state = coordinator.snapshot().await;
    assert_eq!(state.applications[0].status, ApplicationStatus::Offer);
    assert!(state.applications[0].is_optimistic);

    gate.add_permits(1);
    let confirmed = second.await.unwrap().unwrap();
    let state = coordinator.snapshot().await;
    assert_eq!(state.applications, vec![confirmed]);
    assert!(!state.applications[0].is_optimistic);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_failed_delete_restores_record_at_original_position() {
    let (remote, gate) = FakeRemote::gated();
    remote.seed("Google", "SWE", ApplicationStatus::Applied);
    let middle = remote.seed("Amazon", "SDE", ApplicationStatus::Interview);
    remote.seed("Meta", "PE", ApplicationStatus::Offer);
    // Server answers with a bare 500
    remote.fail(|f| f.delete = Some(DELETE_FAILED.to_string()));
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();
    let before = coordinator.snapshot().await.applications;
    assert_eq!(before[1].id, middle.id);

    let task = {
        let coordinator = coordinator.clone();
        let id = middle.id.clone();
        tokio::spawn(async move { coordinator.delete(&id).await })
    };

    wait_until(&coordinator, |state| state.applications.len() == 2).await;
    assert!(coordinator.snapshot().await.find(&middle.id).is_none());

    gate.add_permits(1);
    let result = task.await.unwrap();

    assert_eq!(
        result,
        Err(TrackerError::RequestFailed(DELETE_FAILED.to_string()))
    );
    assert_eq!(coordinator.snapshot().await.applications, before);
}

#[tokio::test]
async fn test_delete_success_notifies() {
    let remote = FakeRemote::new();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();
    let mut notifications = coordinator.subscribe_notifications();

    coordinator.delete(&seeded.id).await.unwrap();

    assert!(coordinator.snapshot().await.applications.is_empty());
    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Success);
    assert_eq!(notification.message, DELETED);
}

// =============================================================================
// Board drops
// =============================================================================

#[tokio::test]
async fn test_drop_on_interview_column_issues_one_status_put() {
    let remote = FakeRemote::new();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();
    let calls_before = coordinator.remote().calls().len();
    let mut notifications = coordinator.subscribe_notifications();

    let outcome = coordinator
        .on_drop(DragEvent {
            record_id: seeded.id.clone(),
            source_group: Some("Applied".to_string()),
            target_group: Some("Interview".to_string()),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, DropOutcome::Moved(ref app) if app.status == ApplicationStatus::Interview));

    let calls = coordinator.remote().calls();
    assert_eq!(
        &calls[calls_before..],
        &[Call::Update(
            seeded.id.clone(),
            ApplicationPatch::status(ApplicationStatus::Interview)
        )]
    );

    let state = coordinator.snapshot().await;
    let board = Board::build(&state);
    let interview = &board.column(ApplicationStatus::Interview).applications;
    assert_eq!(interview.len(), 1);
    assert_eq!(interview[0].id, seeded.id);
    assert!(board
        .column(ApplicationStatus::Applied)
        .applications
        .is_empty());
    assert_eq!(notifications.try_recv().unwrap().message, UPDATED);
}

#[tokio::test]
async fn test_drop_without_a_real_move_does_nothing() {
    let remote = FakeRemote::new();
    let seeded = remote.seed("Google", "SWE", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();
    let calls_before = coordinator.remote().calls().len();
    let before = coordinator.snapshot().await;

    let same_column = DragEvent::new(seeded.id.clone(), "Applied");
    let unknown_column = DragEvent::new(seeded.id.clone(), "Archive");
    let outside = DragEvent {
        record_id: seeded.id.clone(),
        source_group: Some("Applied".to_string()),
        target_group: None,
    };
    let unknown_card = DragEvent::new(ApplicationId::generate(), "Offer");

    for event in [same_column, unknown_column, outside, unknown_card] {
        assert_eq!(coordinator.on_drop(event).await, Ok(DropOutcome::Ignored));
    }

    assert_eq!(coordinator.remote().calls().len(), calls_before);
    assert_eq!(coordinator.snapshot().await, before);
}

// =============================================================================
// Fetching and filters
// =============================================================================

#[tokio::test]
async fn test_board_mode_loads_every_page_unfiltered() {
    let remote = FakeRemote::new();
    for i in 0..150 {
        remote.seed(&format!("Company {}", i), "SWE", ApplicationStatus::Applied);
    }
    let coordinator = coordinator(remote);
    coordinator
        .dispatch(Action::SetStatusFilter(Some(ApplicationStatus::Offer)))
        .await;

    coordinator.refresh().await.unwrap();

    let state = coordinator.snapshot().await;
    assert_eq!(state.view_mode, ViewMode::Board);
    assert_eq!(state.applications.len(), 150);
    assert!(!state.loading);

    let lists: Vec<ListRequest> = coordinator
        .remote()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::List(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(lists.len(), 2);
    assert!(lists.iter().all(|r| r.status.is_none() && r.search.is_none()));
}

#[tokio::test]
async fn test_board_mode_drops_records_repeated_across_shifted_pages() {
    let remote = FakeRemote::new();
    for i in 0..150 {
        remote.seed(&format!("Company {}", i), "SWE", ApplicationStatus::Applied);
    }
    // A record created between the two page reads pushes the last record of
    // page 1 onto page 2
    remote.insert_before_lists([None, Some("Latecomer")]);
    let coordinator = coordinator(remote);

    coordinator.refresh().await.unwrap();

    let state = coordinator.snapshot().await;
    let ids: std::collections::HashSet<_> =
        state.applications.iter().map(|app| app.id.clone()).collect();
    assert_eq!(ids.len(), state.applications.len());
    assert_eq!(state.applications.len(), 150);
    assert_eq!(
        Board::build(&state)
            .column(ApplicationStatus::Applied)
            .applications
            .len(),
        150
    );
}

#[tokio::test]
async fn test_search_for_goog_returns_only_google() {
    let remote = FakeRemote::new();
    remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.seed("Amazon", "SDE", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);

    coordinator.set_view_mode(ViewMode::List).await.unwrap();
    assert_eq!(coordinator.snapshot().await.applications.len(), 2);

    coordinator.set_search_filter("goog").await.unwrap();

    let state = coordinator.snapshot().await;
    let visible = state.list_view();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].company_name, "Google");
    assert_eq!(state.pagination.total, 1);

    let last = coordinator.remote().calls().pop().unwrap();
    assert_eq!(
        last,
        Call::List(ListRequest {
            status: None,
            search: Some("goog".to_string()),
            page: Some(1),
            limit: Some(10),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_debounced_search_input_drives_one_fetch() {
    let remote = FakeRemote::new();
    remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.seed("Amazon", "SDE", ApplicationStatus::Applied);
    let config = ClientConfig::new("http://tracker.test", OwnerId::new("u1"));
    let coordinator = MutationCoordinator::new(remote, &config);
    coordinator
        .dispatch(Action::SetViewMode(ViewMode::List))
        .await;

    let (mut input, searches) = SearchInput::from_config(&config);
    let follower = coordinator.follow_search(searches);

    for text in ["g", "go", "goo", "goog"] {
        input.on_input(text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(config.search_debounce_ms)).await;
    wait_until(&coordinator, |state| {
        state.filters.search == "goog" && !state.loading && state.applications.len() == 1
    })
    .await;

    let lists: Vec<ListRequest> = coordinator
        .remote()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::List(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].search.as_deref(), Some("goog"));

    drop(input);
    follower.await.unwrap();
}

#[tokio::test]
async fn test_board_search_is_applied_locally() {
    let remote = FakeRemote::new();
    remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.seed("Amazon", "SDE", ApplicationStatus::Interview);
    let coordinator = coordinator(remote);
    coordinator.refresh().await.unwrap();

    coordinator.set_search_filter("goog").await.unwrap();

    let state = coordinator.snapshot().await;
    // The board keeps the full collection and narrows it for display
    assert_eq!(state.applications.len(), 2);
    let board = Board::build(&state);
    assert_eq!(board.column(ApplicationStatus::Applied).applications.len(), 1);
    assert!(board
        .column(ApplicationStatus::Interview)
        .applications
        .is_empty());
}

#[tokio::test]
async fn test_filtering_is_idempotent_and_repeat_search_is_suppressed() {
    let remote = FakeRemote::new();
    remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.seed("Amazon", "SDE", ApplicationStatus::Interview);
    remote.seed("Google", "PM", ApplicationStatus::Applied);
    let coordinator = coordinator(remote);
    coordinator.set_view_mode(ViewMode::List).await.unwrap();

    coordinator
        .set_status_filter(Some(ApplicationStatus::Applied))
        .await
        .unwrap();
    let once = coordinator.snapshot().await.applications;
    coordinator
        .set_status_filter(Some(ApplicationStatus::Applied))
        .await
        .unwrap();
    assert_eq!(coordinator.snapshot().await.applications, once);
    assert_eq!(once.len(), 2);

    coordinator.set_search_filter("pm").await.unwrap();
    let calls = coordinator.remote().calls().len();
    coordinator.set_search_filter("pm").await.unwrap();
    assert_eq!(coordinator.remote().calls().len(), calls);

    coordinator.clear_filters().await.unwrap();
    let state = coordinator.snapshot().await;
    assert!(!state.filters.is_active());
    assert_eq!(state.applications.len(), 3);
}

#[tokio::test]
async fn test_list_pagination_and_navigation() {
    let remote = FakeRemote::new();
    for i in 0..5 {
        remote.seed(&format!("Company {}", i), "SWE", ApplicationStatus::Applied);
    }
    let coordinator = coordinator_with_limit(remote, 2);
    coordinator.set_view_mode(ViewMode::List).await.unwrap();

    let state = coordinator.snapshot().await;
    assert_eq!(state.applications.len(), 2);
    assert_eq!(state.pagination.total_pages, 3);

    coordinator.set_page(3).await.unwrap();
    let state = coordinator.snapshot().await;
    assert_eq!(state.pagination.page, 3);
    assert_eq!(state.applications.len(), 1);

    // Out of range and current page are ignored without a request
    let calls = coordinator.remote().calls().len();
    coordinator.set_page(4).await.unwrap();
    coordinator.set_page(3).await.unwrap();
    coordinator.set_page(0).await.unwrap();
    assert_eq!(coordinator.remote().calls().len(), calls);

    // A filter change starts over at page 1
    coordinator
        .set_status_filter(Some(ApplicationStatus::Applied))
        .await
        .unwrap();
    assert_eq!(coordinator.snapshot().await.pagination.page, 1);
    match coordinator.remote().calls().pop() {
        Some(Call::List(request)) => assert_eq!(request.page, Some(1)),
        other => panic!("expected a list call, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stale_fetch_response_is_discarded() {
    let remote = FakeRemote::new();
    remote.seed("Google", "SWE", ApplicationStatus::Applied);
    remote.seed("Amazon", "SDE", ApplicationStatus::Interview);
    remote.delay_next_list(Duration::from_millis(500));
    let coordinator = coordinator(remote);
    coordinator.dispatch(Action::SetViewMode(ViewMode::List)).await;

    let slow = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.refresh().await })
    };
    while coordinator.remote().calls().is_empty() {
        tokio::task::yield_now().await;
    }

    coordinator
        .set_status_filter(Some(ApplicationStatus::Interview))
        .await
        .unwrap();
    let fresh = coordinator.snapshot().await.applications;
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].company_name, "Amazon");

    // The unfiltered response arrives last and must not win
    slow.await.unwrap().unwrap();
    let state = coordinator.snapshot().await;
    assert_eq!(state.applications, fresh);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_notified() {
    let remote = FakeRemote::new();
    remote.fail(|f| f.list = Some("Failed to fetch applications".to_string()));
    let coordinator = coordinator(remote);
    let mut notifications = coordinator.subscribe_notifications();

    assert!(coordinator.refresh().await.is_err());

    let state = coordinator.snapshot().await;
    assert_eq!(state.error.as_deref(), Some("Failed to fetch applications"));
    assert!(!state.loading);
    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
}

#[tokio::test]
async fn test_responses_after_close_leave_state_alone() {
    let (remote, gate) = FakeRemote::gated();
    let coordinator = coordinator(remote);
    let mut notifications = coordinator.subscribe_notifications();

    let task = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.create(google_swe()).await })
    };
    wait_until(&coordinator, |state| state.applications.len() == 1).await;
    let before = coordinator.snapshot().await;

    coordinator.close();
    gate.add_permits(1);
    task.await.unwrap().unwrap();

    assert!(coordinator.is_closed());
    assert_eq!(coordinator.snapshot().await, before);
    assert!(notifications.try_recv().is_err());
}
