//! Client core: everything a front end needs to mirror one owner's
//! applications and mutate them optimistically.
//!
//! - [`state`]: the reducer-driven state container and its selectors
//! - [`coordinator`]: optimistic create/update/delete and view fetches
//! - [`board`]: Kanban grouping, drop resolution and the pager model
//! - [`remote`]: the remote-store seam and its HTTP implementation
//! - [`debounce`]: the search input timer

pub mod board;
pub mod coordinator;
pub mod debounce;
pub mod remote;
pub mod state;

pub use board::{Board, BoardColumn, DragEvent, DropHandler, DropOutcome, PageWindow};
pub use coordinator::{MutationCoordinator, Notification, NotificationLevel};
pub use debounce::{Debouncer, SearchInput};
pub use remote::{HttpRemote, ListRequest, ListResponse, TrackerRemote};
pub use state::{Action, Filters, StatusCounts, TrackerState, ViewMode};
