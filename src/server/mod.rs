//! HTTP server wiring.

mod router;

pub use router::build_router;
