//! Request and result types for the primitive coordination operations.

/// How a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Survives the creating session.
    Persistent,
    /// Deleted automatically when the creating session ends.
    Ephemeral,
    /// Ephemeral, with a service-assigned monotonically increasing suffix
    /// appended to the requested path.
    EphemeralSequential,
}

impl CreateMode {
    /// Whether nodes created in this mode are bound to the session lifetime.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    /// Whether the service assigns a sequence suffix to the path.
    pub fn is_sequential(&self) -> bool {
        matches!(self, CreateMode::EphemeralSequential)
    }
}

/// Metadata about an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    /// Version token assigned at creation, unique per node incarnation.
    pub version: i64,
    /// Session that owns the node if it is ephemeral, 0 otherwise.
    pub ephemeral_owner: u64,
    /// Payload size in bytes.
    pub data_length: u32,
}

/// Request payload for `create`.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Path to create; for sequential modes this is the prefix the service
    /// appends the sequence suffix to.
    pub path: String,
    /// Opaque payload stored at the node.
    pub data: Vec<u8>,
    /// Lifetime and naming mode.
    pub mode: CreateMode,
}

/// Result of a successful `create`.
#[derive(Debug, Clone)]
pub struct CreateResult {
    /// The actual path of the created node (includes any assigned suffix).
    pub path: String,
    /// Version token of the created node; retained by callers that later
    /// issue conditional deletes.
    pub version: i64,
}

/// Request payload for `delete`.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    /// Path to delete.
    pub path: String,
    /// When set, the delete succeeds only if the node's current version
    /// matches; `None` deletes unconditionally.
    pub expected_version: Option<i64>,
}

/// Request payload for `exists`.
#[derive(Debug, Clone)]
pub struct ExistsRequest {
    /// Path to check.
    pub path: String,
    /// Register a one-shot watch for the next change at the path. The watch
    /// is accepted even when the node does not exist yet, so creation can be
    /// observed.
    pub watch: bool,
}

/// Result of `exists`.
#[derive(Debug, Clone)]
pub struct ExistsResult {
    /// Metadata when the node exists, `None` otherwise.
    pub stat: Option<NodeStat>,
}

/// Request payload for `get_data`.
#[derive(Debug, Clone)]
pub struct GetDataRequest {
    /// Path to read.
    pub path: String,
    /// Register a one-shot watch for the next change at the path.
    pub watch: bool,
}

/// Result of `get_data`.
#[derive(Debug, Clone)]
pub struct GetDataResult {
    /// The node's payload.
    pub data: Vec<u8>,
    /// The node's metadata at read time.
    pub stat: NodeStat,
}

/// Request payload for `get_children`.
#[derive(Debug, Clone)]
pub struct GetChildrenRequest {
    /// Parent path to list.
    pub path: String,
    /// Register a one-shot watch for the next membership change under the
    /// path.
    pub watch: bool,
}

/// Result of `get_children`.
#[derive(Debug, Clone)]
pub struct GetChildrenResult {
    /// Immediate child names (not full paths), lexicographically sorted.
    pub children: Vec<String>,
}

/// Parent of an absolute path, `None` for the root itself.
///
/// The empty string denotes the namespace root, which always exists.
pub fn parent_path(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    Some(&path[..idx])
}
