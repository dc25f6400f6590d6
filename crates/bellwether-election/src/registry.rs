//! Registration of this process's identity and tracking of the live peers.

use std::sync::Arc;

use bellwether_core::CoordinationClient;
use bellwether_core::CoordinationError;
use bellwether_core::CreateMode;
use bellwether_core::CreateRequest;
use bellwether_core::ExistsRequest;
use bellwether_core::GetChildrenRequest;
use bellwether_core::parent_path;
use tracing::debug;
use tracing::info;

use crate::types::PEER_NODE_PREFIX;

/// Owns this process's identity and the sorted list of live peers.
///
/// The identity is coordination-assigned (ephemeral + sequential) and scoped
/// to one session; after a reconnection the registry is reset and registers
/// again under a fresh identity.
pub struct PeerRegistry {
    client: Arc<dyn CoordinationClient>,
    peers_path: String,
    description: String,
    my_id: Option<String>,
    peers: Vec<String>,
}

impl PeerRegistry {
    /// Create a registry bound to a session and a peers path.
    pub fn new(client: Arc<dyn CoordinationClient>, peers_path: String, description: String) -> Self {
        Self {
            client,
            peers_path,
            description,
            my_id: None,
            peers: Vec::new(),
        }
    }

    /// This process's identity, once registered.
    pub fn my_id(&self) -> Option<&str> {
        self.my_id.as_deref()
    }

    /// This process's self-description payload.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sorted identities of the currently known peers.
    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Rebind to a fresh session, dropping the old identity and peer list.
    pub fn reset(&mut self, client: Arc<dyn CoordinationClient>) {
        self.client = client;
        self.my_id = None;
        self.peers.clear();
    }

    /// Idempotent persistent creation of `path`, including missing
    /// ancestors. Losing a creation race to another process is success;
    /// termination is guaranteed because the namespace root always exists.
    pub async fn ensure_path_exists(&self, path: &str) -> Result<(), CoordinationError> {
        let mut missing = Vec::new();
        let mut cursor = path.to_string();
        loop {
            let result = self
                .client
                .exists(ExistsRequest {
                    path: cursor.clone(),
                    watch: false,
                })
                .await?;
            if result.stat.is_some() {
                break;
            }
            missing.push(cursor.clone());
            match parent_path(&cursor) {
                Some(parent) if !parent.is_empty() => cursor = parent.to_string(),
                _ => break,
            }
        }
        for node in missing.iter().rev() {
            match self
                .client
                .create(CreateRequest {
                    path: node.clone(),
                    data: Vec::new(),
                    mode: CreateMode::Persistent,
                })
                .await
            {
                Ok(_) => info!(path = %node, "created path"),
                Err(CoordinationError::NodeExists { .. }) => {
                    debug!(path = %node, "path already exists");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Register this process under the peers path, returning the assigned
    /// identity. Fails only if the session is not connected.
    pub async fn register_self(&mut self) -> Result<String, CoordinationError> {
        let created = self
            .client
            .create(CreateRequest {
                path: format!("{}/{}", self.peers_path, PEER_NODE_PREFIX),
                data: self.description.clone().into_bytes(),
                mode: CreateMode::EphemeralSequential,
            })
            .await?;
        let id = match created.path.rfind('/') {
            Some(idx) => created.path[idx + 1..].to_string(),
            None => created.path.clone(),
        };
        info!(peer = %id, "registered under peers path");
        self.my_id = Some(id.clone());
        Ok(id)
    }

    /// Re-list the peers with a fresh one-shot children watch, replacing the
    /// in-memory list wholesale. An empty result — including a transiently
    /// missing peers path — is never an error.
    pub async fn refresh(&mut self) -> Result<(), CoordinationError> {
        match self
            .client
            .get_children(GetChildrenRequest {
                path: self.peers_path.clone(),
                watch: true,
            })
            .await
        {
            Ok(result) => {
                let mut peers = result.children;
                peers.sort();
                debug!(count = peers.len(), "refreshed peer list");
                self.peers = peers;
                Ok(())
            }
            Err(CoordinationError::NoNode { .. }) => {
                self.peers.clear();
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use bellwether_testing::DeterministicCoordinationService;

    use super::*;

    async fn registry(
        service: &Arc<DeterministicCoordinationService>,
        peers_path: &str,
        description: &str,
    ) -> PeerRegistry {
        let (handle, _events) = service.open_session().await;
        PeerRegistry::new(Arc::new(handle), peers_path.to_string(), description.to_string())
    }

    #[tokio::test]
    async fn ensure_path_exists_creates_missing_ancestors() {
        let service = DeterministicCoordinationService::new();
        let reg = registry(&service, "/my-app/peers", "test").await;

        reg.ensure_path_exists("/my-app/peers").await.unwrap();
        assert!(service.node_data("/my-app").await.is_some());
        assert!(service.node_data("/my-app/peers").await.is_some());

        // Second call is a no-op.
        reg.ensure_path_exists("/my-app/peers").await.unwrap();
    }

    #[tokio::test]
    async fn registration_assigns_sequential_identities() {
        let service = DeterministicCoordinationService::new();
        let mut first = registry(&service, "/peers", "first").await;
        let mut second = registry(&service, "/peers", "second").await;

        first.ensure_path_exists("/peers").await.unwrap();
        let id1 = first.register_self().await.unwrap();
        let id2 = second.register_self().await.unwrap();

        assert_eq!(id1, "peer-0000000001");
        assert_eq!(id2, "peer-0000000002");
        assert_eq!(first.my_id(), Some("peer-0000000001"));

        first.refresh().await.unwrap();
        assert_eq!(first.peers(), ["peer-0000000001", "peer-0000000002"]);
    }

    #[tokio::test]
    async fn refresh_tolerates_a_missing_peers_path() {
        let service = DeterministicCoordinationService::new();
        let mut reg = registry(&service, "/peers", "test").await;

        reg.refresh().await.unwrap();
        assert!(reg.peers().is_empty());
    }
}
