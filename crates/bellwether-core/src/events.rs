//! Session and path events delivered by the coordination service.
//!
//! Events arrive on a single per-session channel in delivery order. Path
//! events are produced by one-shot watches; each delivered event consumes
//! the registration that produced it.

/// Connection-level state transitions of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The session reached the service and ephemeral state is live.
    Connected,
    /// The connection dropped; the session (and its ephemeral nodes) may
    /// still be alive on the service side.
    Disconnected,
    /// The session is gone; every ephemeral node it owned has been deleted.
    Expired,
}

/// What changed at a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEventKind {
    /// The node was created.
    NodeCreated,
    /// The node was deleted.
    NodeDeleted,
    /// The node's payload changed.
    DataChanged,
    /// The set of immediate children changed.
    ChildrenChanged,
}

/// A delivered watch notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEvent {
    /// The watched path the change applies to.
    pub path: String,
    /// The kind of change.
    pub kind: PathEventKind,
}

/// Anything a session can deliver to its listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationEvent {
    /// Connection-state transition.
    Session(SessionState),
    /// Watch notification for a path.
    Path(PathEvent),
}
