//! Election status and intent handlers.
//!
//! Thin by design: reads go straight to the engine handle's snapshot, and
//! the two intent toggles are messages into the engine loop. No protocol
//! logic lives here.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use bellwether_election::ElectionHandle;
use bellwether_election::StatusSnapshot;
use serde::Deserialize;
use serde::Serialize;

/// Response body of `GET /leader`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderResponse {
    /// Election status: WATCHING, WAITING, or LEADING.
    pub status: String,
    /// Connection status: CONNECTED or DISCONNECTED.
    pub connection: String,
    /// Identity carried by the leader record, if one is known.
    pub leader: Option<String>,
    /// This process's coordination-assigned identity.
    pub myid: Option<String>,
    /// This process's self-description.
    pub description: String,
    /// Sorted identities of the currently registered peers.
    pub peers: Vec<String>,
}

impl From<StatusSnapshot> for LeaderResponse {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            status: snapshot.status.as_str().to_string(),
            connection: snapshot.connection.as_str().to_string(),
            leader: snapshot.leader,
            myid: snapshot.my_id,
            description: snapshot.description,
            peers: snapshot.peers,
        }
    }
}

/// `GET /leader` - current election status of this node.
pub async fn leader_status(State(handle): State<ElectionHandle>) -> Json<LeaderResponse> {
    Json(LeaderResponse::from(handle.snapshot()))
}

/// `POST /leader/watch` - stop contending and observe only.
pub async fn leader_watch(State(handle): State<ElectionHandle>) -> Result<&'static str, StatusCode> {
    handle.stop_leading().map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok("Now watching (not trying to lead)")
}

/// `POST /leader/lead` - start contending for leadership.
pub async fn leader_lead(State(handle): State<ElectionHandle>) -> Result<&'static str, StatusCode> {
    handle.start_leading().map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok("Now trying to become leader")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bellwether_core::CoordinationConnector;
    use bellwether_election::ElectionConfig;
    use bellwether_election::ElectionEngine;
    use bellwether_testing::DeterministicCoordinationService;

    use super::*;

    async fn leading_handle() -> ElectionHandle {
        let service = DeterministicCoordinationService::new();
        let connector: Arc<dyn CoordinationConnector> = Arc::new(service.connector());
        let config = ElectionConfig {
            description: "handler test".to_string(),
            ..ElectionConfig::default()
        };
        let (handle, _task) = ElectionEngine::start(connector, config).await.unwrap();
        handle
    }

    #[tokio::test]
    async fn status_reports_the_snapshot_fields() {
        let handle = leading_handle().await;

        let Json(response) = leader_status(State(handle)).await;
        assert_eq!(response.status, "LEADING");
        assert_eq!(response.connection, "CONNECTED");
        assert_eq!(response.myid.as_deref(), Some("peer-0000000001"));
        assert_eq!(response.leader, response.myid);
        assert_eq!(response.description, "handler test");
        assert_eq!(response.peers, ["peer-0000000001"]);
    }

    #[tokio::test]
    async fn response_uses_the_wire_field_names() {
        let handle = leading_handle().await;

        let Json(response) = leader_status(State(handle)).await;
        let value = serde_json::to_value(&response).unwrap();
        for key in ["status", "connection", "leader", "myid", "description", "peers"] {
            assert!(value.get(key).is_some(), "missing key '{key}'");
        }
    }

    #[tokio::test]
    async fn intent_toggles_confirm_in_plain_text() {
        let handle = leading_handle().await;

        let message = leader_watch(State(handle.clone())).await.unwrap();
        assert_eq!(message, "Now watching (not trying to lead)");

        let message = leader_lead(State(handle)).await.unwrap();
        assert_eq!(message, "Now trying to become leader");
    }
}
