//! The election engine: a single-writer event loop over one session.
//!
//! Mutual exclusion comes from the atomic, exclusive creation of the
//! ephemeral leader record; liveness comes from re-arming one-shot watches
//! after every delivered notification. Nothing busy-polls: every
//! re-evaluation is driven by a notification or an explicit control call.
//!
//! All state is owned by the loop task. Control calls are messages on an
//! mpsc channel, notifications arrive on the session's event channel, and
//! both are drained by one `select!` loop, so reads during status
//! derivation can never race an in-flight watch callback.

use std::sync::Arc;

use bellwether_core::CoordinationClient;
use bellwether_core::CoordinationConnector;
use bellwether_core::CoordinationError;
use bellwether_core::CoordinationEvent;
use bellwether_core::CreateMode;
use bellwether_core::CreateRequest;
use bellwether_core::DeleteRequest;
use bellwether_core::ExistsRequest;
use bellwether_core::GetDataRequest;
use bellwether_core::PathEvent;
use bellwether_core::PathEventKind;
use bellwether_core::SessionState;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::ElectionError;
use crate::pure;
use crate::registry::PeerRegistry;
use crate::types::ConnectionStatus;
use crate::types::ElectionConfig;
use crate::types::ElectionPaths;
use crate::types::ElectionStatus;
use crate::types::ExpiryPolicy;
use crate::types::StatusSnapshot;

/// Control messages accepted by the engine loop.
#[derive(Debug)]
enum Command {
    StartLeading,
    StopLeading,
    Shutdown,
}

/// Outcome of one exclusive leader-record creation attempt.
enum TryOutcome {
    Won,
    Lost,
    Error,
}

/// Cloneable handle to a running engine.
///
/// Calls are messages into the engine loop; snapshots are read from a watch
/// channel the loop publishes to on every state change.
#[derive(Clone)]
pub struct ElectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<StatusSnapshot>,
}

impl ElectionHandle {
    /// Current point-in-time view of the participant.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status_rx.borrow().clone()
    }

    /// Current derived election status.
    pub fn status(&self) -> ElectionStatus {
        self.status_rx.borrow().status
    }

    /// Identity carried by the leader record, if one is known.
    pub fn current_leader(&self) -> Option<String> {
        self.status_rx.borrow().leader.clone()
    }

    /// Whether this participant currently holds the leader record.
    pub fn is_leading(&self) -> bool {
        self.status() == ElectionStatus::Leading
    }

    /// Record the intent to lead and contend as soon as possible.
    pub fn start_leading(&self) -> Result<(), ElectionError> {
        self.commands.send(Command::StartLeading).map_err(|_| ElectionError::EngineStopped)
    }

    /// Drop the intent to lead, relinquishing the record if held.
    pub fn stop_leading(&self) -> Result<(), ElectionError> {
        self.commands.send(Command::StopLeading).map_err(|_| ElectionError::EngineStopped)
    }

    /// Stop the engine and close its session.
    pub fn stop(&self) -> Result<(), ElectionError> {
        self.commands.send(Command::Shutdown).map_err(|_| ElectionError::EngineStopped)
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_rx.clone()
    }
}

/// The election protocol state machine and its event loop.
pub struct ElectionEngine {
    connector: Arc<dyn CoordinationConnector>,
    config: ElectionConfig,
    paths: ElectionPaths,
    client: Arc<dyn CoordinationClient>,
    events: mpsc::UnboundedReceiver<CoordinationEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<StatusSnapshot>,
    registry: PeerRegistry,
    status: ElectionStatus,
    connection: ConnectionStatus,
    current_leader: Option<String>,
    wants_to_lead: bool,
    /// Version token captured when this process created the leader record;
    /// the only token a relinquish delete is ever issued with.
    leader_record_version: Option<i64>,
}

impl ElectionEngine {
    /// Connect (bounded wait), run the registration sequence, and spawn the
    /// engine loop. Returns once this participant is registered and has
    /// evaluated the leader record for the first time.
    pub async fn start(
        connector: Arc<dyn CoordinationConnector>,
        config: ElectionConfig,
    ) -> Result<(ElectionHandle, JoinHandle<Result<(), ElectionError>>), ElectionError> {
        let paths = ElectionPaths::new(config.namespace.as_deref());
        info!(peers = %paths.peers, leader = %paths.leader, "joining election namespace");
        let session = connector.connect(config.connect_timeout).await?;
        let registry = PeerRegistry::new(session.client.clone(), paths.peers.clone(), config.description.clone());
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());

        let mut engine = ElectionEngine {
            wants_to_lead: config.contend_on_start,
            connector,
            config,
            paths,
            client: session.client,
            events: session.events,
            commands,
            status_tx,
            registry,
            status: ElectionStatus::Watching,
            connection: ConnectionStatus::Connected,
            current_leader: None,
            leader_record_version: None,
        };
        engine.startup_sequence().await?;
        engine.publish_status();

        let task = tokio::spawn(engine.run());
        Ok((
            ElectionHandle {
                commands: command_tx,
                status_rx,
            },
            task,
        ))
    }

    /// Registration sequence against a freshly connected session.
    async fn startup_sequence(&mut self) -> Result<(), ElectionError> {
        self.connection = ConnectionStatus::Connected;
        self.registry.ensure_path_exists(&self.paths.peers).await?;
        self.registry.register_self().await?;
        self.registry.refresh().await?;
        self.evaluate_leader().await;
        Ok(())
    }

    async fn run(mut self) -> Result<(), ElectionError> {
        info!(peer = ?self.registry.my_id(), "election engine running");
        loop {
            let outcome: Result<bool, ElectionError> = tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => Ok(true),
                    Some(Command::StartLeading) => {
                        self.start_leading().await;
                        Ok(false)
                    }
                    Some(Command::StopLeading) => {
                        self.stop_leading().await;
                        Ok(false)
                    }
                },
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await.map(|()| false),
                    // The delivery channel closing means the session is gone
                    // without a final notification; treat it as expiry.
                    None => self.handle_expiry().await.map(|()| false),
                },
            };
            match outcome {
                Ok(true) => break,
                Ok(false) => self.publish_status(),
                Err(fatal) => {
                    self.publish_status();
                    return Err(fatal);
                }
            }
        }

        debug!("election engine shutting down");
        if let Err(err) = self.client.close().await {
            debug!(%err, "session close failed");
        }
        self.connection = ConnectionStatus::Disconnected;
        self.status = ElectionStatus::Watching;
        self.current_leader = None;
        self.leader_record_version = None;
        self.publish_status();
        Ok(())
    }

    async fn handle_event(&mut self, event: CoordinationEvent) -> Result<(), ElectionError> {
        debug!(?event, "received coordination event");
        match event {
            CoordinationEvent::Session(SessionState::Connected) => {
                info!("coordination session connected");
                self.connection = ConnectionStatus::Connected;
                self.evaluate_leader().await;
            }
            CoordinationEvent::Session(SessionState::Disconnected) => {
                // The session may still be alive on the service side; no
                // leadership claim is asserted until it proves out again.
                warn!("coordination session disconnected");
                self.connection = ConnectionStatus::Disconnected;
                self.status = ElectionStatus::Watching;
            }
            CoordinationEvent::Session(SessionState::Expired) => {
                error!("coordination session expired");
                self.handle_expiry().await?;
            }
            CoordinationEvent::Path(event) => self.handle_path_event(event).await,
        }
        Ok(())
    }

    async fn handle_path_event(&mut self, event: PathEvent) {
        if event.path == self.paths.peers {
            if event.kind == PathEventKind::ChildrenChanged {
                if let Err(err) = self.registry.refresh().await {
                    warn!(%err, "failed to refresh peer list");
                }
            }
        } else if event.path == self.paths.leader {
            self.evaluate_leader().await;
        } else {
            debug!(path = %event.path, "ignoring event for unrelated path");
        }
    }

    /// Observe the leader record with fresh one-shot watches and derive the
    /// status. A lost creation race loops back to pick up the winner; every
    /// failure leaves a conservative status and waits for the next
    /// notification rather than polling.
    async fn evaluate_leader(&mut self) {
        if self.connection != ConnectionStatus::Connected {
            return;
        }
        loop {
            let existence = match self
                .client
                .exists(ExistsRequest {
                    path: self.paths.leader.clone(),
                    watch: true,
                })
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    self.note_transient(&err, "leader existence check failed");
                    return;
                }
            };

            if existence.stat.is_some() {
                match self
                    .client
                    .get_data(GetDataRequest {
                        path: self.paths.leader.clone(),
                        watch: true,
                    })
                    .await
                {
                    Ok(result) => {
                        let leader = String::from_utf8_lossy(&result.data).into_owned();
                        if self.registry.my_id() != Some(leader.as_str()) {
                            self.leader_record_version = None;
                        }
                        self.status = pure::derive_status(self.wants_to_lead, self.registry.my_id(), Some(&leader));
                        info!(leader = %leader, status = %self.status, "leader record observed");
                        self.current_leader = Some(leader);
                        return;
                    }
                    // Vanished between the existence check and the read.
                    Err(CoordinationError::NoNode { .. }) => continue,
                    Err(err) => {
                        self.note_transient(&err, "leader record read failed");
                        return;
                    }
                }
            }

            self.current_leader = None;
            self.leader_record_version = None;
            if !self.wants_to_lead {
                self.status = ElectionStatus::Watching;
                return;
            }
            match self.try_become_leader().await {
                TryOutcome::Won | TryOutcome::Error => return,
                TryOutcome::Lost => continue,
            }
        }
    }

    /// Attempt the atomic, exclusive creation of the leader record.
    async fn try_become_leader(&mut self) -> TryOutcome {
        let Some(my_id) = self.registry.my_id().map(str::to_string) else {
            self.status = ElectionStatus::Watching;
            return TryOutcome::Error;
        };
        match self
            .client
            .create(CreateRequest {
                path: self.paths.leader.clone(),
                data: my_id.clone().into_bytes(),
                mode: CreateMode::Ephemeral,
            })
            .await
        {
            Ok(created) => {
                info!(leader = %my_id, version = created.version, "won the leader election");
                self.leader_record_version = Some(created.version);
                self.current_leader = Some(my_id);
                self.status = ElectionStatus::Leading;
                TryOutcome::Won
            }
            Err(CoordinationError::NodeExists { .. }) => {
                debug!("lost the leader creation race");
                self.status = ElectionStatus::Waiting;
                TryOutcome::Lost
            }
            Err(err) => {
                warn!(%err, "leader record creation failed");
                self.status = ElectionStatus::Waiting;
                TryOutcome::Error
            }
        }
    }

    async fn start_leading(&mut self) {
        if self.wants_to_lead {
            // Already contending: nothing to create, nothing to flicker.
            if self.connection == ConnectionStatus::Connected && self.status == ElectionStatus::Watching {
                self.evaluate_leader().await;
            }
            return;
        }
        info!("now contending for leadership");
        self.wants_to_lead = true;
        if self.connection == ConnectionStatus::Connected {
            self.evaluate_leader().await;
        }
    }

    async fn stop_leading(&mut self) {
        self.wants_to_lead = false;
        if self.status == ElectionStatus::Leading {
            match self.leader_record_version.take() {
                Some(version) => {
                    match self
                        .client
                        .delete(DeleteRequest {
                            path: self.paths.leader.clone(),
                            expected_version: Some(version),
                        })
                        .await
                    {
                        Ok(()) => info!("relinquished leadership"),
                        Err(CoordinationError::VersionMismatch { .. }) | Err(CoordinationError::NoNode { .. }) => {
                            debug!("leader record is no longer this node's; leaving it in place");
                        }
                        Err(err) => warn!(%err, "failed to delete leader record"),
                    }
                }
                None => debug!("no captured leader record version; nothing to delete"),
            }
        }
        info!("now watching without contending");
        self.status = ElectionStatus::Watching;
        self.current_leader = None;
        self.leader_record_version = None;
        if self.connection == ConnectionStatus::Connected {
            self.evaluate_leader().await;
        }
    }

    /// Session expiry: the identity and any held leadership are gone.
    async fn handle_expiry(&mut self) -> Result<(), ElectionError> {
        self.connection = ConnectionStatus::Disconnected;
        self.status = ElectionStatus::Watching;
        self.current_leader = None;
        self.leader_record_version = None;
        match self.config.expiry_policy {
            ExpiryPolicy::FailFast => Err(ElectionError::SessionExpired),
            ExpiryPolicy::SelfHeal => self.recover().await,
        }
    }

    /// Open a fresh session and re-run the registration sequence. The
    /// standing intent is preserved and replayed; the old identity is not.
    async fn recover(&mut self) -> Result<(), ElectionError> {
        info!("recovering with a fresh coordination session");
        if let Err(err) = self.client.close().await {
            debug!(%err, "old session close failed");
        }
        let session = self.connector.connect(self.config.connect_timeout).await?;
        self.client = session.client;
        self.events = session.events;
        self.registry.reset(self.client.clone());
        self.startup_sequence().await?;
        Ok(())
    }

    fn note_transient(&mut self, err: &CoordinationError, context: &str) {
        warn!(%err, "{context}");
        self.status = if self.wants_to_lead {
            ElectionStatus::Waiting
        } else {
            ElectionStatus::Watching
        };
    }

    fn publish_status(&self) {
        let snapshot = StatusSnapshot {
            status: self.status,
            connection: self.connection,
            leader: self.current_leader.clone(),
            my_id: self.registry.my_id().map(str::to_string),
            description: self.registry.description().to_string(),
            peers: self.registry.peers().to_vec(),
            wants_to_lead: self.wants_to_lead,
        };
        self.status_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bellwether_testing::DeterministicCoordinationService;

    use super::*;

    async fn start_node(
        service: &Arc<DeterministicCoordinationService>,
        description: &str,
        contend: bool,
    ) -> (ElectionHandle, JoinHandle<Result<(), ElectionError>>) {
        start_node_with_policy(service, description, contend, ExpiryPolicy::FailFast).await
    }

    async fn start_node_with_policy(
        service: &Arc<DeterministicCoordinationService>,
        description: &str,
        contend: bool,
        expiry_policy: ExpiryPolicy,
    ) -> (ElectionHandle, JoinHandle<Result<(), ElectionError>>) {
        let connector: Arc<dyn CoordinationConnector> = Arc::new(service.connector());
        let config = ElectionConfig {
            namespace: None,
            description: description.to_string(),
            contend_on_start: contend,
            expiry_policy,
            connect_timeout: Duration::from_secs(5),
        };
        ElectionEngine::start(connector, config).await.unwrap()
    }

    async fn wait_until(handle: &ElectionHandle, what: &str, predicate: impl Fn(&StatusSnapshot) -> bool) -> StatusSnapshot {
        for _ in 0..200 {
            let snapshot = handle.snapshot();
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("never reached '{what}'; last snapshot: {:?}", handle.snapshot());
    }

    #[tokio::test]
    async fn single_contender_becomes_leader() {
        let service = DeterministicCoordinationService::new();
        let (handle, _task) = start_node(&service, "node a", true).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.status, ElectionStatus::Leading);
        assert_eq!(snapshot.connection, ConnectionStatus::Connected);
        assert_eq!(snapshot.my_id.as_deref(), Some("peer-0000000001"));
        assert_eq!(snapshot.leader.as_deref(), Some("peer-0000000001"));
        assert_eq!(snapshot.peers, ["peer-0000000001"]);
        assert_eq!(snapshot.description, "node a");
    }

    #[tokio::test]
    async fn contenders_wait_behind_the_first_leader() {
        let service = DeterministicCoordinationService::new();
        let (a, _task_a) = start_node(&service, "node a", true).await;
        let (b, _task_b) = start_node(&service, "node b", true).await;
        let (c, _task_c) = start_node(&service, "node c", true).await;

        assert_eq!(a.status(), ElectionStatus::Leading);
        assert_eq!(a.snapshot().my_id.as_deref(), Some("peer-0000000001"));

        for follower in [&b, &c] {
            let snapshot = follower.snapshot();
            assert_eq!(snapshot.status, ElectionStatus::Waiting);
            assert_eq!(snapshot.leader.as_deref(), Some("peer-0000000001"));
        }

        let expected = vec![
            "peer-0000000001".to_string(),
            "peer-0000000002".to_string(),
            "peer-0000000003".to_string(),
        ];
        for handle in [&a, &b, &c] {
            let snapshot = wait_until(handle, "full peer list", |s| s.peers.len() == 3).await;
            assert_eq!(snapshot.peers, expected);
        }
    }

    #[tokio::test]
    async fn passive_watcher_tracks_leader_without_contending() {
        let service = DeterministicCoordinationService::new();
        let (watcher, _task_w) = start_node(&service, "watcher", false).await;

        let snapshot = watcher.snapshot();
        assert_eq!(snapshot.status, ElectionStatus::Watching);
        assert_eq!(snapshot.leader, None);
        assert!(service.node_data("/leader").await.is_none());

        let (leader, _task_l) = start_node(&service, "leader", true).await;
        assert!(leader.is_leading());

        let leader_id = leader.snapshot().my_id.unwrap();
        let snapshot = wait_until(&watcher, "leader observed", |s| s.leader.is_some()).await;
        assert_eq!(snapshot.status, ElectionStatus::Watching);
        assert_eq!(snapshot.leader.as_deref(), Some(leader_id.as_str()));
    }

    #[tokio::test]
    async fn leader_expiry_fails_over_to_a_contender() {
        let service = DeterministicCoordinationService::new();
        let (a, task_a) = start_node(&service, "node a", true).await;
        let (b, _task_b) = start_node(&service, "node b", true).await;
        let (c, _task_c) = start_node(&service, "node c", true).await;

        assert!(a.is_leading());
        assert!(service.expire_owner_of("/leader").await);

        let winner = wait_until(&b, "failover settled", |_| {
            b.is_leading() || c.is_leading()
        })
        .await;
        drop(winner);

        // At most one holder at any instant, exactly one once settled.
        let leaders = [b.is_leading(), c.is_leading()].iter().filter(|&&l| l).count();
        assert_eq!(leaders, 1);

        let (winner, loser) = if b.is_leading() { (&b, &c) } else { (&c, &b) };
        let winner_id = winner.snapshot().my_id.unwrap();
        let loser_snapshot = wait_until(loser, "loser waits on winner", |s| {
            s.status == ElectionStatus::Waiting && s.leader.as_deref() == Some(winner_id.as_str())
        })
        .await;
        assert_eq!(loser_snapshot.status, ElectionStatus::Waiting);

        // The dead peer drops out of everyone's registry.
        wait_until(winner, "peer list shrinks", |s| s.peers.len() == 2).await;

        // Fail-fast: the expired node's engine finishes with the expiry error.
        let result = task_a.await.unwrap();
        assert!(matches!(result, Err(ElectionError::SessionExpired)));
        assert!(a.start_leading().is_err());
    }

    #[tokio::test]
    async fn stop_leading_relinquishes_and_hands_off() {
        let service = DeterministicCoordinationService::new();
        let (a, _task_a) = start_node(&service, "node a", true).await;
        let (b, _task_b) = start_node(&service, "node b", true).await;

        assert!(a.is_leading());
        a.stop_leading().unwrap();

        let b_snapshot = wait_until(&b, "handoff", |s| s.status == ElectionStatus::Leading).await;
        let b_id = b_snapshot.my_id.unwrap();
        assert_eq!(service.node_data("/leader").await, Some(b_id.clone().into_bytes()));

        let a_snapshot = wait_until(&a, "old leader watches", |s| {
            s.status == ElectionStatus::Watching && s.leader.as_deref() == Some(b_id.as_str())
        })
        .await;
        assert!(!a_snapshot.wants_to_lead);
    }

    #[tokio::test]
    async fn stop_leading_on_a_follower_touches_nothing() {
        let service = DeterministicCoordinationService::new();
        let (a, _task_a) = start_node(&service, "node a", true).await;
        let (b, _task_b) = start_node(&service, "node b", true).await;

        assert!(a.is_leading());
        let version_before = service.node_version("/leader").await.unwrap();

        assert_eq!(b.status(), ElectionStatus::Waiting);
        b.stop_leading().unwrap();

        let snapshot = wait_until(&b, "follower steps aside", |s| s.status == ElectionStatus::Watching).await;
        assert!(!snapshot.wants_to_lead);
        assert!(a.is_leading());
        assert_eq!(service.node_version("/leader").await, Some(version_before));
    }

    #[tokio::test]
    async fn start_leading_is_idempotent() {
        let service = DeterministicCoordinationService::new();
        let (handle, _task) = start_node(&service, "node a", true).await;

        assert!(handle.is_leading());
        tokio::time::sleep(Duration::from_millis(50)).await;
        let version_before = service.node_version("/leader").await.unwrap();

        let mut updates = handle.subscribe();
        updates.borrow_and_update();

        handle.start_leading().unwrap();
        handle.start_leading().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // No duplicate creation attempt and no status flicker.
        assert!(!updates.has_changed().unwrap());
        assert!(handle.is_leading());
        assert_eq!(service.node_version("/leader").await, Some(version_before));
    }

    #[tokio::test]
    async fn watcher_flips_to_contender_via_start_leading() {
        let service = DeterministicCoordinationService::new();
        let (a, _task_a) = start_node(&service, "node a", true).await;
        let (d, _task_d) = start_node(&service, "node d", false).await;

        assert_eq!(d.status(), ElectionStatus::Watching);

        d.start_leading().unwrap();
        let a_id = a.snapshot().my_id.unwrap();
        wait_until(&d, "contender waits", |s| {
            s.status == ElectionStatus::Waiting && s.leader.as_deref() == Some(a_id.as_str())
        })
        .await;

        a.stop_leading().unwrap();
        let snapshot = wait_until(&d, "contender takes over", |s| s.status == ElectionStatus::Leading).await;
        assert_eq!(snapshot.leader, snapshot.my_id);
    }

    #[tokio::test]
    async fn start_leading_against_a_vacancy_wins_immediately() {
        let service = DeterministicCoordinationService::new();
        let (d, _task_d) = start_node(&service, "node d", false).await;

        assert_eq!(d.status(), ElectionStatus::Watching);
        d.start_leading().unwrap();

        let snapshot = wait_until(&d, "vacancy claimed", |s| s.status == ElectionStatus::Leading).await;
        assert_eq!(snapshot.leader, snapshot.my_id);
    }

    #[tokio::test]
    async fn self_heal_recovers_with_a_fresh_identity() {
        let service = DeterministicCoordinationService::new();
        let (a, _task_a) = start_node_with_policy(&service, "node a", true, ExpiryPolicy::SelfHeal).await;

        assert!(a.is_leading());
        assert_eq!(a.snapshot().my_id.as_deref(), Some("peer-0000000001"));

        assert!(service.expire_owner_of("/leader").await);

        let snapshot = wait_until(&a, "recovered under a new identity", |s| {
            s.status == ElectionStatus::Leading && s.my_id.as_deref() == Some("peer-0000000002")
        })
        .await;
        assert_eq!(snapshot.leader.as_deref(), Some("peer-0000000002"));
        assert_eq!(snapshot.peers, ["peer-0000000002"]);
        assert!(snapshot.wants_to_lead);
    }

    #[tokio::test]
    async fn connection_blip_demotes_then_restores() {
        let service = DeterministicCoordinationService::new();
        let (a, _task_a) = start_node(&service, "node a", true).await;

        assert!(a.is_leading());
        let session = service.interrupt_owner_of("/leader").await.unwrap();

        let snapshot = wait_until(&a, "conservative demotion", |s| {
            s.connection == ConnectionStatus::Disconnected
        })
        .await;
        assert_eq!(snapshot.status, ElectionStatus::Watching);
        // The session survived, so the record is still in place.
        assert!(service.node_data("/leader").await.is_some());

        assert!(service.restore_session(session).await);
        wait_until(&a, "leadership restored", |s| s.status == ElectionStatus::Leading).await;

        // The captured version survived the blip, so relinquishing works.
        a.stop_leading().unwrap();
        wait_until(&a, "relinquished after blip", |s| s.status == ElectionStatus::Watching).await;
        assert!(service.node_data("/leader").await.is_none());
    }

    #[tokio::test]
    async fn shutdown_closes_the_session_and_frees_the_record() {
        let service = DeterministicCoordinationService::new();
        let (a, task_a) = start_node(&service, "node a", true).await;
        let (b, _task_b) = start_node(&service, "node b", true).await;

        assert!(a.is_leading());
        a.stop().unwrap();
        task_a.await.unwrap().unwrap();

        wait_until(&b, "successor elected", |s| s.status == ElectionStatus::Leading).await;
        assert_eq!(service.live_sessions().await, 1);
    }
}
