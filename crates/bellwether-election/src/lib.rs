//! Leader election over a coordination service.
//!
//! Many processes run this identical logic against a shared namespace;
//! exactly one at a time is recognized as leader, all others track the
//! leader's identity and react to its disappearance. The protocol needs no
//! locking beyond the coordination primitives themselves: the leader is
//! whoever wins the atomic, exclusive creation of the ephemeral leader
//! record, and everyone else re-arms one-shot watches to observe the next
//! transition.
//!
//! All protocol state lives inside a single event-loop task
//! ([`ElectionEngine`]); external callers interact through the cloneable
//! [`ElectionHandle`], which turns control calls into messages and exposes
//! point-in-time [`StatusSnapshot`]s.

mod engine;
mod error;
pub mod pure;
mod registry;
mod types;

pub use engine::ElectionEngine;
pub use engine::ElectionHandle;
pub use error::ElectionError;
pub use registry::PeerRegistry;
pub use types::ConnectionStatus;
pub use types::ElectionConfig;
pub use types::ElectionPaths;
pub use types::ElectionStatus;
pub use types::ExpiryPolicy;
pub use types::PEER_NODE_PREFIX;
pub use types::StatusSnapshot;
