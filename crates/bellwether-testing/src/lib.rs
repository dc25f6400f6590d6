//! Deterministic in-memory coordination service.
//!
//! Implements the full [`bellwether_core`] contract with real session
//! semantics: ephemeral owners, per-parent sequential suffixes, one-shot
//! watches, and per-session sequential event delivery. Used by unit and
//! integration tests, and wired into the node binary as the embedded
//! backend.
//!
//! Fault injection is first-class: sessions can be expired or have their
//! connection interrupted at any point, which is how crash and failover
//! scenarios are driven in tests.

mod service;

pub use service::DeterministicConnector;
pub use service::DeterministicCoordinationService;
pub use service::SessionHandle;
