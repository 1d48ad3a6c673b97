//! REST surface of the tracker, mounted under `/api/tracker`.
//!
//! Every handler is owner-scoped through the [`Owner`] extractor, which reads
//! the user id stamped by the upstream authentication layer. Handlers are
//! stateless apart from the shared [`ApplicationStore`].

mod response;

pub use response::ApiResponse;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{Result, TrackerError};
use crate::tracker::{
    ApplicationId, ApplicationPatch, ApplicationStore, ListParams, NewApplication, OwnerId,
    PageLimits, TrackedApplication,
};

/// Header carrying the authenticated user id.
pub const OWNER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<RwLock<ApplicationStore>>,
    pub page_limits: PageLimits,
}

impl ApiState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(ApplicationStore::with_capacity(
                config.max_applications,
            ))),
            page_limits: config.page_limits,
        }
    }
}

/// The caller's identity.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = TrackerError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(OwnerId::new(value)))
            .ok_or(TrackerError::Unauthorized)
    }
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/tracker",
            get(list_applications_handler).post(create_application_handler),
        )
        .route(
            "/api/tracker/:id",
            get(get_application_handler)
                .put(update_application_handler)
                .delete(delete_application_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "Tracker API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Tracker API stopped");
    Ok(())
}

pub async fn run_api(
    addr: SocketAddr,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind tracker API");
            return Err(e);
        }
    };
    serve(listener, state, shutdown).await
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>)>;

async fn create_application_handler(
    State(state): State<ApiState>,
    Owner(owner): Owner,
    payload: std::result::Result<Json<NewApplication>, JsonRejection>,
) -> ApiResult<TrackedApplication> {
    let Json(payload) = payload.map_err(|e| TrackerError::invalid("body", e.body_text()))?;
    let fields = payload.validate()?;

    let created = state.store.write().await.create(&owner, fields)?;
    tracing::info!(owner = %owner, id = %created.id, status = %created.status, "Application tracked");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(created).with_message("Application tracked successfully")),
    ))
}

async fn list_applications_handler(
    State(state): State<ApiState>,
    Owner(owner): Owner,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<TrackedApplication>> {
    let Query(params) = params.map_err(|e| TrackerError::invalid("query", e.body_text()))?;
    let query = params.parse(state.page_limits)?;
    let page = state.store.read().await.query(&owner, &query);
    tracing::debug!(
        owner = %owner,
        page = query.page,
        limit = query.limit,
        total = page.pagination.total,
        "Listed applications"
    );

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(page.items).with_pagination(page.pagination)),
    ))
}

async fn get_application_handler(
    State(state): State<ApiState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<TrackedApplication> {
    let id = ApplicationId::from(id);
    let store = state.store.read().await;
    let application = store
        .get(&owner, &id)
        .cloned()
        .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(application))))
}

async fn update_application_handler(
    State(state): State<ApiState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ApplicationPatch>, JsonRejection>,
) -> ApiResult<TrackedApplication> {
    let Json(patch) = payload.map_err(|e| TrackerError::invalid("body", e.body_text()))?;
    let patch = patch.validate()?;
    let id = ApplicationId::from(id);

    let updated = state.store.write().await.update(&owner, &id, &patch)?;
    tracing::info!(owner = %owner, id = %id, status = %updated.status, "Application updated");

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(updated).with_message("Application updated successfully")),
    ))
}

async fn delete_application_handler(
    State(state): State<ApiState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = ApplicationId::from(id);
    state.store.write().await.remove(&owner, &id)?;
    tracing::info!(owner = %owner, id = %id, "Application deleted");

    Ok((
        StatusCode::OK,
        Json(ApiResponse::done("Application deleted successfully")),
    ))
}
