//! End-to-end election flows through the control-surface handlers.
//!
//! Several participants share one deterministic coordination service, and
//! every observation goes through the same handlers the HTTP router mounts.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use bellwether::handlers::LeaderResponse;
use bellwether::handlers::leader_lead;
use bellwether::handlers::leader_status;
use bellwether::handlers::leader_watch;
use bellwether_core::CoordinationConnector;
use bellwether_election::ElectionConfig;
use bellwether_election::ElectionEngine;
use bellwether_election::ElectionHandle;
use bellwether_testing::DeterministicCoordinationService;

async fn start_node(
    service: &Arc<DeterministicCoordinationService>,
    description: &str,
    contend: bool,
) -> ElectionHandle {
    let connector: Arc<dyn CoordinationConnector> = Arc::new(service.connector());
    let config = ElectionConfig {
        description: description.to_string(),
        contend_on_start: contend,
        ..ElectionConfig::default()
    };
    let (handle, _task) = ElectionEngine::start(connector, config).await.unwrap();
    handle
}

async fn status_of(handle: &ElectionHandle) -> LeaderResponse {
    leader_status(State(handle.clone())).await.0
}

async fn wait_for_status(handle: &ElectionHandle, what: &str, predicate: impl Fn(&LeaderResponse) -> bool) -> LeaderResponse {
    for _ in 0..200 {
        let response = status_of(handle).await;
        if predicate(&response) {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("never reached '{what}'; last response: {:?}", status_of(handle).await);
}

#[tokio::test]
async fn three_registrants_elect_the_first() {
    let service = DeterministicCoordinationService::new();
    let a = start_node(&service, "node a", true).await;
    let b = start_node(&service, "node b", true).await;
    let c = start_node(&service, "node c", true).await;

    let response = status_of(&a).await;
    assert_eq!(response.status, "LEADING");
    assert_eq!(response.leader.as_deref(), Some("peer-0000000001"));
    assert_eq!(response.myid.as_deref(), Some("peer-0000000001"));
    assert_eq!(response.connection, "CONNECTED");

    for follower in [&b, &c] {
        let response = status_of(follower).await;
        assert_eq!(response.status, "WAITING");
        assert_eq!(response.leader.as_deref(), Some("peer-0000000001"));
    }

    let response = wait_for_status(&a, "all peers registered", |r| r.peers.len() == 3).await;
    assert_eq!(response.peers, ["peer-0000000001", "peer-0000000002", "peer-0000000003"]);
}

#[tokio::test]
async fn killing_the_leader_elects_exactly_one_survivor() {
    let service = DeterministicCoordinationService::new();
    let a = start_node(&service, "node a", true).await;
    let b = start_node(&service, "node b", true).await;
    let c = start_node(&service, "node c", true).await;

    assert_eq!(status_of(&a).await.status, "LEADING");
    assert!(service.expire_owner_of("/leader").await);

    wait_for_status(&b, "failover settled", |_| b.is_leading() || c.is_leading()).await;

    let b_leading = b.is_leading();
    let c_leading = c.is_leading();
    assert!(b_leading ^ c_leading, "exactly one survivor must lead");

    let (winner, loser) = if b_leading { (&b, &c) } else { (&c, &b) };
    let winner_id = status_of(winner).await.myid.unwrap();
    let response = wait_for_status(loser, "loser references the winner", |r| {
        r.status == "WAITING" && r.leader.as_deref() == Some(winner_id.as_str())
    })
    .await;
    assert_eq!(response.status, "WAITING");
}

#[tokio::test]
async fn watch_mode_node_joins_the_race_on_demand() {
    let service = DeterministicCoordinationService::new();
    let a = start_node(&service, "node a", true).await;
    let d = start_node(&service, "node d", false).await;

    let response = status_of(&d).await;
    assert_eq!(response.status, "WATCHING");

    let message = leader_lead(State(d.clone())).await.unwrap();
    assert_eq!(message, "Now trying to become leader");

    let a_id = status_of(&a).await.myid.unwrap();
    wait_for_status(&d, "watcher now waits", |r| {
        r.status == "WAITING" && r.leader.as_deref() == Some(a_id.as_str())
    })
    .await;

    let message = leader_watch(State(a.clone())).await.unwrap();
    assert_eq!(message, "Now watching (not trying to lead)");

    let response = wait_for_status(&d, "former watcher leads", |r| r.status == "LEADING").await;
    assert_eq!(response.leader, response.myid);

    wait_for_status(&a, "former leader observes", |r| {
        r.status == "WATCHING" && r.leader == response.myid
    })
    .await;
}

#[tokio::test]
async fn lone_watcher_reports_vacancy() {
    let service = DeterministicCoordinationService::new();
    let d = start_node(&service, "node d", false).await;

    let response = status_of(&d).await;
    assert_eq!(response.status, "WATCHING");
    assert_eq!(response.leader, None);
    assert_eq!(response.myid.as_deref(), Some("peer-0000000001"));

    // Flipping intent against a vacancy claims it.
    leader_lead(State(d.clone())).await.unwrap();
    let response = wait_for_status(&d, "vacancy claimed", |r| r.status == "LEADING").await;
    assert_eq!(response.leader, response.myid);
}
