//! Process-wide naming tree, built once at startup.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::descriptor::DescriptorTable;
use crate::tree::{ParentCheck, SchemaError, TagTree};

static TREE: OnceLock<Arc<TagTree>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("invalid tagnet schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("tagnet namespace already initialized")]
    AlreadyInitialized,
}

/// Build the tree from `table` and install it for the rest of the process.
///
/// Fails if the table is inconsistent or a tree is already installed; the
/// installed tree is never replaced.
pub fn init(
    table: &DescriptorTable,
    check: ParentCheck,
) -> Result<Arc<TagTree>, NamespaceError> {
    if TREE.get().is_some() {
        return Err(NamespaceError::AlreadyInitialized);
    }
    let tree = Arc::new(TagTree::build_with(table, check)?);
    TREE.set(tree.clone())
        .map_err(|_| NamespaceError::AlreadyInitialized)?;
    info!(nodes = tree.len(), "tagnet namespace installed");
    Ok(tree)
}

/// The installed tree, if `init` has run
pub fn get() -> Option<Arc<TagTree>> {
    TREE.get().cloned()
}
