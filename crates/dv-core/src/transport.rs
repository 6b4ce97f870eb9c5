//! Boundary towards the network/rendering layer
//!
//! Views are pushed as `{id, data}` updates through a [`ViewTransport`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

/// Opaque identifier of a view subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random identifier for consumers that do not bring their own
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ViewId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One outbound push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewUpdate {
    pub id: ViewId,
    pub data: Value,
}

/// Receives view pushes
pub trait ViewTransport: Send + Sync {
    fn push(&self, update: ViewUpdate);
}

impl<F> ViewTransport for F
where
    F: Fn(ViewUpdate) + Send + Sync,
{
    fn push(&self, update: ViewUpdate) {
        self(update)
    }
}

/// Transport backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<ViewUpdate>,
}

impl ChannelTransport {
    /// Create the transport together with the receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ViewUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ViewTransport for ChannelTransport {
    fn push(&self, update: ViewUpdate) {
        let id = update.id.clone();
        if self.sender.send(update).is_err() {
            warn!(view_id = %id, "view receiver dropped, update discarded");
        }
    }
}
