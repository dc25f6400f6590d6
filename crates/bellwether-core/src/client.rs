//! Backend traits for the coordination service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoordinationError;
use crate::events::CoordinationEvent;
use crate::types::CreateRequest;
use crate::types::CreateResult;
use crate::types::DeleteRequest;
use crate::types::ExistsRequest;
use crate::types::ExistsResult;
use crate::types::GetChildrenRequest;
use crate::types::GetChildrenResult;
use crate::types::GetDataRequest;
use crate::types::GetDataResult;

/// Primitive operations of one open coordination session.
///
/// Implementations deliver at most one notification per watch registration
/// and dispatch all of a session's events sequentially on its event channel.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Create a node, returning its actual path and version token.
    async fn create(&self, request: CreateRequest) -> Result<CreateResult, CoordinationError>;

    /// Delete a node, optionally conditional on its current version.
    async fn delete(&self, request: DeleteRequest) -> Result<(), CoordinationError>;

    /// Check node existence, optionally arming a one-shot watch.
    async fn exists(&self, request: ExistsRequest) -> Result<ExistsResult, CoordinationError>;

    /// Read a node's payload, optionally arming a one-shot watch.
    async fn get_data(&self, request: GetDataRequest) -> Result<GetDataResult, CoordinationError>;

    /// List a node's children sorted, optionally arming a one-shot watch.
    async fn get_children(&self, request: GetChildrenRequest) -> Result<GetChildrenResult, CoordinationError>;

    /// End the session; every ephemeral node it owns is removed.
    async fn close(&self) -> Result<(), CoordinationError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: CoordinationClient + ?Sized> CoordinationClient for Arc<T> {
    async fn create(&self, request: CreateRequest) -> Result<CreateResult, CoordinationError> {
        (**self).create(request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<(), CoordinationError> {
        (**self).delete(request).await
    }

    async fn exists(&self, request: ExistsRequest) -> Result<ExistsResult, CoordinationError> {
        (**self).exists(request).await
    }

    async fn get_data(&self, request: GetDataRequest) -> Result<GetDataResult, CoordinationError> {
        (**self).get_data(request).await
    }

    async fn get_children(&self, request: GetChildrenRequest) -> Result<GetChildrenResult, CoordinationError> {
        (**self).get_children(request).await
    }

    async fn close(&self) -> Result<(), CoordinationError> {
        (**self).close().await
    }
}

/// An open session: the operation surface plus its event stream.
pub struct Session {
    /// Operation surface of the session.
    pub client: Arc<dyn CoordinationClient>,
    /// Sequential event stream; closed when the session dies.
    pub events: mpsc::UnboundedReceiver<CoordinationEvent>,
}

/// Session factory for a configured coordination endpoint.
#[async_trait]
pub trait CoordinationConnector: Send + Sync {
    /// Open a session, blocking until it is connected or `timeout` elapses
    /// (failing with [`CoordinationError::ConnectTimeout`]).
    async fn connect(&self, timeout: Duration) -> Result<Session, CoordinationError>;
}
