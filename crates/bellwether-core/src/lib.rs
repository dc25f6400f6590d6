//! Contract for the external coordination service.
//!
//! The coordination service is consumed, never reimplemented: this crate
//! defines the primitive operations (`create`, `delete`, `exists`,
//! `get_data`, `get_children`), the session/path event vocabulary, and the
//! boundary error type. Backends implement [`CoordinationClient`] and
//! [`CoordinationConnector`]; everything above this crate is written against
//! the traits so the backend can be swapped without touching protocol logic.
//!
//! Watches are one-shot: a watch-taking call registers interest in at most
//! one future notification for the path, and continued observation requires
//! re-registering after every delivered event.

mod client;
mod error;
mod events;
mod types;

pub use client::CoordinationClient;
pub use client::CoordinationConnector;
pub use client::Session;
pub use error::CoordinationError;
pub use events::CoordinationEvent;
pub use events::PathEvent;
pub use events::PathEventKind;
pub use events::SessionState;
pub use types::CreateMode;
pub use types::CreateRequest;
pub use types::CreateResult;
pub use types::DeleteRequest;
pub use types::ExistsRequest;
pub use types::ExistsResult;
pub use types::GetChildrenRequest;
pub use types::GetChildrenResult;
pub use types::GetDataRequest;
pub use types::GetDataResult;
pub use types::NodeStat;
pub use types::parent_path;
