use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::descriptor::UQ_TAGNET_ADAPTER_LIST;
use crate::tree::NodeId;

/// What the requester wants done at the resolved node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Put,
    Head,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Get => "get",
            Action::Put => "put",
            Action::Head => "head",
        })
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Action::Get),
            "put" => Ok(Action::Put),
            "head" => Ok(Action::Head),
            other => Err(format!("unknown action '{}' (use get, put or head)", other)),
        }
    }
}

/// A request routed to a node's adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub node: NodeId,
    pub action: Action,
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    pub fn new(node: impl Into<NodeId>, action: Action, payload: Value) -> Self {
        Self {
            node: node.into(),
            action,
            payload,
        }
    }
}

/// Runtime handler bound to a qualifier.
///
/// Adapters must not block; dispatch may run on latency-sensitive paths.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    /// Return a response to claim the request, `None` to decline it
    fn try_handle(&self, request: &Request) -> Option<Value>;
}

/// Outcome of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Handled { adapter: String, response: Value },
    NotHandled,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled { .. })
    }

    pub fn into_response(self) -> Option<Value> {
        match self {
            Dispatch::Handled { response, .. } => Some(response),
            Dispatch::NotHandled => None,
        }
    }
}

/// Adapter list for one qualifier. Replaced wholesale, never edited in place.
pub type AdapterList = Arc<[Arc<dyn Adapter>]>;

/// Summary of the adapters bound to one qualifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifierInfo {
    pub qualifier: String,
    pub adapters: Vec<String>,
}

/// Maps qualifiers to ordered adapter lists and dispatches first-match-wins.
pub struct QualifierRegistry {
    lists: RwLock<HashMap<String, AdapterList>>,
    frozen: AtomicBool,
}

impl QualifierRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Append `adapter` to the list for `qualifier`.
    ///
    /// The list is rebuilt and swapped in, so a dispatch already holding the
    /// previous list never sees a half-updated one.
    pub fn register(&self, qualifier: &str, adapter: Arc<dyn Adapter>) {
        if self.is_frozen() {
            warn!(qualifier, adapter = adapter.name(), "late adapter registration");
        } else {
            info!(qualifier, adapter = adapter.name(), "registering adapter");
        }

        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let next: AdapterList = match lists.get(qualifier) {
            Some(current) => current
                .iter()
                .cloned()
                .chain(std::iter::once(adapter))
                .collect(),
            None => Arc::from(vec![adapter]),
        };
        lists.insert(qualifier.to_string(), next);
    }

    /// Mark the end of startup registration
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::AcqRel) {
            info!(qualifiers = self.qualifier_count(), "qualifier registry frozen");
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Current adapter list for `qualifier`
    pub fn snapshot(&self, qualifier: &str) -> Option<AdapterList> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(qualifier)
            .cloned()
    }

    /// Offer `request` to each adapter for `qualifier` in registration order.
    /// The first one to answer wins.
    pub fn dispatch(&self, qualifier: &str, request: &Request) -> Dispatch {
        let Some(list) = self.snapshot(qualifier) else {
            debug!(qualifier, "no adapters for qualifier");
            return Dispatch::NotHandled;
        };

        for adapter in list.iter() {
            if let Some(response) = adapter.try_handle(request) {
                debug!(
                    qualifier,
                    adapter = adapter.name(),
                    action = %request.action,
                    "request handled"
                );
                return Dispatch::Handled {
                    adapter: adapter.name().to_string(),
                    response,
                };
            }
        }

        debug!(qualifier, adapters = list.len(), "all adapters declined");
        Dispatch::NotHandled
    }

    /// Adapter names for `qualifier`, in dispatch order
    pub fn adapter_names(&self, qualifier: &str) -> Vec<String> {
        self.snapshot(qualifier)
            .map(|list| list.iter().map(|a| a.name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Get the number of qualifiers with at least one adapter
    pub fn qualifier_count(&self) -> usize {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get the total number of registrations
    pub fn adapter_count(&self) -> usize {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|list| list.len())
            .sum()
    }

    /// Every qualifier with its adapters, sorted by qualifier
    pub fn list(&self) -> Vec<QualifierInfo> {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        let mut infos: Vec<QualifierInfo> = lists
            .iter()
            .map(|(qualifier, list)| QualifierInfo {
                qualifier: qualifier.clone(),
                adapters: list.iter().map(|a| a.name().to_string()).collect(),
            })
            .collect();
        infos.sort_by(|a, b| a.qualifier.cmp(&b.qualifier));
        infos
    }
}

impl Default for QualifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Dumps are keyed by the adapter-list qualifier
impl fmt::Debug for QualifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(UQ_TAGNET_ADAPTER_LIST)
            .field("qualifiers", &self.list())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
