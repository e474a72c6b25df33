//! Wire path in, adapter response out.
//!
//! The router is what a message layer calls once it has pulled a TLV path
//! out of an incoming frame: decode, resolve against the tree, then hand the
//! resolved node's qualifier to the registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::metrics::{Metrics, RouteMetrics};
use crate::registry::{Action, Dispatch, QualifierRegistry, Request};
use crate::resolver::{self, ResolveError};
use crate::tlv::{self, TlvError};
use crate::tree::{NodeId, TagTree};

/// Routing failures, each reported to the requester as a distinct negative ack
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Malformed(#[from] TlvError),
    #[error(transparent)]
    NoSuchName(#[from] ResolveError),
    #[error("node {node} ({qualifier}) has no adapter for the request")]
    NotHandled { node: NodeId, qualifier: String },
}

/// A request some adapter answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routed {
    pub node: NodeId,
    pub qualifier: String,
    pub adapter: String,
    pub response: Value,
}

pub struct Router {
    tree: Arc<TagTree>,
    registry: Arc<QualifierRegistry>,
    metrics: Metrics,
}

impl Router {
    pub fn new(tree: Arc<TagTree>, registry: Arc<QualifierRegistry>) -> Self {
        Self {
            tree,
            registry,
            metrics: Metrics::new(),
        }
    }

    pub fn tree(&self) -> &TagTree {
        &self.tree
    }

    pub fn registry(&self) -> &QualifierRegistry {
        &self.registry
    }

    /// Route a path still in wire form
    pub fn route(
        &self,
        wire_path: &[u8],
        action: Action,
        payload: Value,
    ) -> Result<Routed, RouteError> {
        let segments = tlv::decode_path(wire_path).inspect_err(|e| {
            debug!(error = %e, "rejecting malformed path");
            self.metrics.record_malformed();
        })?;

        let resolved = resolver::resolve(&self.tree, &segments).inspect_err(|_| {
            self.metrics.record_no_such_name();
        })?;

        let request = Request::new(resolved.id, action, payload);
        match self.registry.dispatch(resolved.qualifier, &request) {
            Dispatch::Handled { adapter, response } => {
                self.metrics.record_handled();
                Ok(Routed {
                    node: resolved.id,
                    qualifier: resolved.qualifier.to_string(),
                    adapter,
                    response,
                })
            }
            Dispatch::NotHandled => {
                self.metrics.record_not_handled();
                Err(RouteError::NotHandled {
                    node: resolved.id,
                    qualifier: resolved.qualifier.to_string(),
                })
            }
        }
    }

    pub fn metrics(&self) -> RouteMetrics {
        self.metrics.snapshot()
    }
}
