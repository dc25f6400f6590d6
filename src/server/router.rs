//! Axum router configuration
//!
//! ```text
//! /
//! ├── /leader/*   - election status and intent toggles
//! └── /health/*   - liveness probes
//! ```

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use bellwether_election::ElectionHandle;

use crate::handlers::leader_lead;
use crate::handlers::leader_status;
use crate::handlers::leader_watch;

/// Build the complete router for the control surface.
pub fn build_router(handle: ElectionHandle) -> Router {
    Router::new()
        .nest("/leader", leader_router(handle))
        .nest("/health", health_router())
}

/// Election routes.
///
/// Routes:
/// - `GET  /leader` - election status, identity, and peer list
/// - `POST /leader/watch` - set intent to observe only
/// - `POST /leader/lead` - set intent to contend
fn leader_router(handle: ElectionHandle) -> Router {
    Router::new()
        .route("/", get(leader_status))
        .route("/watch", post(leader_watch))
        .route("/lead", post(leader_lead))
        .with_state(handle)
}

/// Health check routes.
///
/// Routes:
/// - `GET /health/live` - process is alive
fn health_router() -> Router {
    Router::new().route("/live", get(liveness))
}

async fn liveness() -> &'static str {
    "ok"
}
