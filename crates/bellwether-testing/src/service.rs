//! The in-memory coordination service and its session handles.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bellwether_core::CoordinationClient;
use bellwether_core::CoordinationConnector;
use bellwether_core::CoordinationError;
use bellwether_core::CoordinationEvent;
use bellwether_core::CreateRequest;
use bellwether_core::CreateResult;
use bellwether_core::DeleteRequest;
use bellwether_core::ExistsRequest;
use bellwether_core::ExistsResult;
use bellwether_core::GetChildrenRequest;
use bellwether_core::GetChildrenResult;
use bellwether_core::GetDataRequest;
use bellwether_core::GetDataResult;
use bellwether_core::NodeStat;
use bellwether_core::PathEvent;
use bellwether_core::PathEventKind;
use bellwether_core::Session;
use bellwether_core::SessionState;
use bellwether_core::parent_path;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// A stored node.
struct NodeRecord {
    data: Vec<u8>,
    /// Globally unique creation token, so a conditional delete can never
    /// match a record created by a different session after a race.
    version: i64,
    ephemeral_owner: Option<u64>,
}

/// A registered session.
struct SessionRecord {
    events: mpsc::UnboundedSender<CoordinationEvent>,
    alive: bool,
}

#[derive(Default)]
struct ServiceState {
    nodes: BTreeMap<String, NodeRecord>,
    sessions: HashMap<u64, SessionRecord>,
    /// One-shot watchers armed by `exists`/`get_data`, keyed by path.
    data_watches: HashMap<String, Vec<u64>>,
    /// One-shot watchers armed by `get_children`, keyed by parent path.
    child_watches: HashMap<String, Vec<u64>>,
    /// Next sequential suffix per parent path; the first assignment is 1.
    sequences: HashMap<String, u64>,
    next_session_id: u64,
    next_version: i64,
}

/// A deterministic in-memory coordination service.
///
/// Thread-safe; all sessions share one namespace tree. Watches are one-shot
/// and deduplicated per session, and each session's events are delivered in
/// order on its own channel.
pub struct DeterministicCoordinationService {
    state: Mutex<ServiceState>,
}

impl Default for DeterministicCoordinationService {
    fn default() -> Self {
        Self {
            state: Mutex::new(ServiceState::default()),
        }
    }
}

impl DeterministicCoordinationService {
    /// Create a new service wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connector handing out fresh sessions against this service.
    pub fn connector(self: &Arc<Self>) -> DeterministicConnector {
        DeterministicConnector {
            service: self.clone(),
        }
    }

    /// Open a new session.
    pub async fn open_session(self: &Arc<Self>) -> (SessionHandle, mpsc::UnboundedReceiver<CoordinationEvent>) {
        let mut state = self.state.lock().await;
        state.next_session_id += 1;
        let id = state.next_session_id;
        let (events, events_rx) = mpsc::unbounded_channel();
        state.sessions.insert(id, SessionRecord { events, alive: true });
        debug!(session = id, "session opened");
        let handle = SessionHandle {
            service: self.clone(),
            id,
        };
        (handle, events_rx)
    }

    /// Forcibly expire a session: it is notified, then all of its ephemeral
    /// nodes are removed with the usual watch notifications to survivors.
    pub async fn expire_session(&self, id: u64) -> bool {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&id) else {
            return false;
        };
        if !session.alive {
            return false;
        }
        let _ = session.events.send(CoordinationEvent::Session(SessionState::Expired));
        session.alive = false;
        debug!(session = id, "session expired");
        remove_ephemerals(&mut state, id);
        true
    }

    /// Expire the session that owns the ephemeral node at `path`.
    pub async fn expire_owner_of(&self, path: &str) -> bool {
        let owner = {
            let state = self.state.lock().await;
            state.nodes.get(path).and_then(|node| node.ephemeral_owner)
        };
        match owner {
            Some(id) => self.expire_session(id).await,
            None => false,
        }
    }

    /// Deliver a `Disconnected` to the owner of `path` without ending its
    /// session; returns the session id so the blip can be healed.
    pub async fn interrupt_owner_of(&self, path: &str) -> Option<u64> {
        let state = self.state.lock().await;
        let id = state.nodes.get(path).and_then(|node| node.ephemeral_owner)?;
        let session = state.sessions.get(&id)?;
        if !session.alive {
            return None;
        }
        let _ = session.events.send(CoordinationEvent::Session(SessionState::Disconnected));
        Some(id)
    }

    /// Deliver a `Connected` to a session that survived a connection blip.
    pub async fn restore_session(&self, id: u64) -> bool {
        let state = self.state.lock().await;
        match state.sessions.get(&id) {
            Some(session) if session.alive => {
                let _ = session.events.send(CoordinationEvent::Session(SessionState::Connected));
                true
            }
            _ => false,
        }
    }

    /// Payload of the node at `path`, if any (inspection for tests).
    pub async fn node_data(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state.nodes.get(path).map(|node| node.data.clone())
    }

    /// Version token of the node at `path`, if any (inspection for tests).
    pub async fn node_version(&self, path: &str) -> Option<i64> {
        let state = self.state.lock().await;
        state.nodes.get(path).map(|node| node.version)
    }

    /// Number of sessions that are still alive.
    pub async fn live_sessions(&self) -> usize {
        let state = self.state.lock().await;
        state.sessions.values().filter(|session| session.alive).count()
    }

    async fn close_session(&self, id: u64) {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&id) else {
            return;
        };
        if !session.alive {
            return;
        }
        session.alive = false;
        debug!(session = id, "session closed");
        remove_ephemerals(&mut state, id);
    }
}

fn stat_of(record: &NodeRecord) -> NodeStat {
    NodeStat {
        version: record.version,
        ephemeral_owner: record.ephemeral_owner.unwrap_or(0),
        data_length: record.data.len() as u32,
    }
}

fn ensure_alive(state: &ServiceState, id: u64) -> Result<(), CoordinationError> {
    match state.sessions.get(&id) {
        Some(session) if session.alive => Ok(()),
        _ => Err(CoordinationError::SessionExpired),
    }
}

fn register_watch(watches: &mut HashMap<String, Vec<u64>>, path: &str, session: u64) {
    let entry = watches.entry(path.to_string()).or_default();
    if !entry.contains(&session) {
        entry.push(session);
    }
}

/// Fire and consume the one-shot data watches registered at `path`.
fn fire_data_watches(state: &mut ServiceState, path: &str, kind: PathEventKind) {
    let Some(watchers) = state.data_watches.remove(path) else {
        return;
    };
    for id in watchers {
        if let Some(session) = state.sessions.get(&id) {
            if session.alive {
                let _ = session.events.send(CoordinationEvent::Path(PathEvent {
                    path: path.to_string(),
                    kind,
                }));
            }
        }
    }
}

/// Fire and consume the one-shot children watches registered at `parent`.
fn fire_child_watches(state: &mut ServiceState, parent: &str) {
    let Some(watchers) = state.child_watches.remove(parent) else {
        return;
    };
    for id in watchers {
        if let Some(session) = state.sessions.get(&id) {
            if session.alive {
                let _ = session.events.send(CoordinationEvent::Path(PathEvent {
                    path: parent.to_string(),
                    kind: PathEventKind::ChildrenChanged,
                }));
            }
        }
    }
}

fn remove_ephemerals(state: &mut ServiceState, owner: u64) {
    let doomed: Vec<String> = state
        .nodes
        .iter()
        .filter(|(_, node)| node.ephemeral_owner == Some(owner))
        .map(|(path, _)| path.clone())
        .collect();
    for path in doomed {
        state.nodes.remove(&path);
        fire_data_watches(state, &path, PathEventKind::NodeDeleted);
        if let Some(parent) = parent_path(&path) {
            let parent = parent.to_string();
            fire_child_watches(state, &parent);
        }
    }
}

/// One session's operation surface.
pub struct SessionHandle {
    service: Arc<DeterministicCoordinationService>,
    id: u64,
}

impl SessionHandle {
    /// The service-assigned session id.
    pub fn session_id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl CoordinationClient for SessionHandle {
    async fn create(&self, request: CreateRequest) -> Result<CreateResult, CoordinationError> {
        let mut state = self.service.state.lock().await;
        ensure_alive(&state, self.id)?;
        if !request.path.starts_with('/') {
            return Err(CoordinationError::Failed {
                reason: format!("invalid path '{}'", request.path),
            });
        }
        let parent = match parent_path(&request.path) {
            Some(parent) => parent.to_string(),
            None => {
                return Err(CoordinationError::Failed {
                    reason: "cannot create the namespace root".to_string(),
                });
            }
        };
        if !parent.is_empty() && !state.nodes.contains_key(&parent) {
            return Err(CoordinationError::NoParent {
                path: request.path.clone(),
            });
        }
        let path = if request.mode.is_sequential() {
            let counter = state.sequences.entry(parent.clone()).or_insert(1);
            let sequence = *counter;
            *counter += 1;
            format!("{}{:010}", request.path, sequence)
        } else {
            request.path.clone()
        };
        if state.nodes.contains_key(&path) {
            return Err(CoordinationError::NodeExists { path });
        }
        state.next_version += 1;
        let version = state.next_version;
        state.nodes.insert(path.clone(), NodeRecord {
            data: request.data,
            version,
            ephemeral_owner: request.mode.is_ephemeral().then_some(self.id),
        });
        debug!(session = self.id, path = %path, version, "node created");
        fire_data_watches(&mut state, &path, PathEventKind::NodeCreated);
        fire_child_watches(&mut state, &parent);
        Ok(CreateResult { path, version })
    }

    async fn delete(&self, request: DeleteRequest) -> Result<(), CoordinationError> {
        let mut state = self.service.state.lock().await;
        ensure_alive(&state, self.id)?;
        let Some(record) = state.nodes.get(&request.path) else {
            return Err(CoordinationError::NoNode {
                path: request.path.clone(),
            });
        };
        if let Some(expected) = request.expected_version {
            if record.version != expected {
                return Err(CoordinationError::VersionMismatch {
                    path: request.path.clone(),
                    expected,
                    actual: record.version,
                });
            }
        }
        state.nodes.remove(&request.path);
        debug!(session = self.id, path = %request.path, "node deleted");
        fire_data_watches(&mut state, &request.path, PathEventKind::NodeDeleted);
        if let Some(parent) = parent_path(&request.path) {
            let parent = parent.to_string();
            fire_child_watches(&mut state, &parent);
        }
        Ok(())
    }

    async fn exists(&self, request: ExistsRequest) -> Result<ExistsResult, CoordinationError> {
        let mut state = self.service.state.lock().await;
        ensure_alive(&state, self.id)?;
        if request.watch {
            register_watch(&mut state.data_watches, &request.path, self.id);
        }
        Ok(ExistsResult {
            stat: state.nodes.get(&request.path).map(stat_of),
        })
    }

    async fn get_data(&self, request: GetDataRequest) -> Result<GetDataResult, CoordinationError> {
        let mut state = self.service.state.lock().await;
        ensure_alive(&state, self.id)?;
        let Some(record) = state.nodes.get(&request.path) else {
            return Err(CoordinationError::NoNode {
                path: request.path.clone(),
            });
        };
        let result = GetDataResult {
            data: record.data.clone(),
            stat: stat_of(record),
        };
        if request.watch {
            register_watch(&mut state.data_watches, &request.path, self.id);
        }
        Ok(result)
    }

    async fn get_children(&self, request: GetChildrenRequest) -> Result<GetChildrenResult, CoordinationError> {
        let mut state = self.service.state.lock().await;
        ensure_alive(&state, self.id)?;
        if !request.path.is_empty() && !state.nodes.contains_key(&request.path) {
            return Err(CoordinationError::NoNode {
                path: request.path.clone(),
            });
        }
        let prefix = format!("{}/", request.path);
        let children = state
            .nodes
            .keys()
            .filter_map(|path| {
                let rest = path.strip_prefix(&prefix)?;
                (!rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        if request.watch {
            register_watch(&mut state.child_watches, &request.path, self.id);
        }
        Ok(GetChildrenResult { children })
    }

    async fn close(&self) -> Result<(), CoordinationError> {
        self.service.close_session(self.id).await;
        Ok(())
    }
}

/// Connector handing out sessions of a [`DeterministicCoordinationService`].
pub struct DeterministicConnector {
    service: Arc<DeterministicCoordinationService>,
}

#[async_trait]
impl CoordinationConnector for DeterministicConnector {
    async fn connect(&self, _timeout: Duration) -> Result<Session, CoordinationError> {
        let (handle, events) = self.service.open_session().await;
        Ok(Session {
            client: Arc::new(handle),
            events,
        })
    }
}
