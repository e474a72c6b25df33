//! Adapters that ship with the crate.
//!
//! They are bound by path rather than by qualifier string, so they follow a
//! schema whose qualifiers differ from the built-in table as long as the
//! paths exist.

pub mod diag;
pub mod poll;

use std::sync::Arc;

use tracing::{info, warn};

use crate::registry::{Adapter, QualifierRegistry};
use crate::resolver::{parse_text_path, resolve};
use crate::tree::TagTree;

pub use diag::{DropAdapter, EchoAdapter, FillAdapter};
pub use poll::{PollCount, PollEvents, PollState};

/// Built-in adapters and the paths they serve
pub fn builtin_adapters() -> Vec<(&'static str, Arc<dyn Adapter>)> {
    let poll = PollState::new();
    let events: Arc<dyn Adapter> = Arc::new(PollEvents::new(poll.clone()));
    let count: Arc<dyn Adapter> = Arc::new(PollCount::new(poll));
    let zeros: Arc<dyn Adapter> = Arc::new(FillAdapter::zeros());
    let ones: Arc<dyn Adapter> = Arc::new(FillAdapter::ones());
    let echo: Arc<dyn Adapter> = Arc::new(EchoAdapter);
    let discard: Arc<dyn Adapter> = Arc::new(DropAdapter);
    vec![
        ("tag/poll/ev", events),
        ("tag/poll/cnt", count),
        ("tag/.test/zero/byte", zeros),
        ("tag/.test/ones/byte", ones),
        ("tag/.test/echo/byte", echo),
        ("tag/.test/drop/byte", discard),
    ]
}

/// Register the built-in adapters against whatever qualifiers `tree` gives
/// their paths. Paths missing from the tree, or resolving to a node with no
/// qualifier, are skipped. Returns the number registered.
pub fn register_builtin(tree: &TagTree, registry: &QualifierRegistry) -> usize {
    let mut registered = 0;
    for (path, adapter) in builtin_adapters() {
        match resolve(tree, &parse_text_path(path)) {
            Ok(node) if !node.qualifier.is_empty() => {
                registry.register(node.qualifier, adapter);
                registered += 1;
            }
            Ok(node) => {
                warn!(path, id = %node.id, "node has no qualifier, skipping adapter")
            }
            Err(e) => warn!(path, error = %e, "path not in schema, skipping adapter"),
        }
    }
    info!(registered, "built-in adapters registered");
    registered
}
