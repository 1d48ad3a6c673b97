//! Server-side record model: the tracked application, its input checks,
//! the owner-scoped store and the filter/pagination engine.

pub mod application;
pub mod query;
pub mod store;
pub mod validation;

pub use application::{ApplicationId, ApplicationStatus, OwnerId, TrackedApplication};
pub use query::{
    ApplicationFilter, ListParams, ListQuery, Page, PageLimits, Pagination, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT,
};
pub use store::ApplicationStore;
pub use validation::{ApplicationPatch, NewApplication, ValidApplication, ValidPatch};
