//! Tree builder and the frozen Tagnet naming tree.
//!
//! The tree is built once from a [`DescriptorTable`] and never mutated after
//! that. Nodes live in a flat vector indexed by id; parent and child links are
//! ids into the same vector.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::descriptor::{Descriptor, DescriptorTable, TnId, MAX_ID, ROOT_ID};
use crate::tlv::{self, NameSegment, TlvError};

/// Id of a node in a built tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u16);

impl NodeId {
    pub const ROOT: NodeId = NodeId(ROOT_ID);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<TnId> for NodeId {
    fn from(id: TnId) -> Self {
        NodeId(id.id())
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How parent links are checked for acyclicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentCheck {
    /// Every parent id must be strictly less than its child's id
    #[default]
    Ordered,
    /// Any ordering, with an explicit walk to the root per node
    Walk,
}

/// Table invariant violations. Any of these aborts startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("descriptor table is empty")]
    MissingRoot,
    #[error("descriptor table has {0} entries, limit is 65000")]
    TooManyNodes(usize),
    #[error("node {id}: bad name TLV: {source}")]
    BadName {
        id: u16,
        #[source]
        source: TlvError,
    },
    #[error("node {id}: bad help TLV: {source}")]
    BadHelp {
        id: u16,
        #[source]
        source: TlvError,
    },
    #[error("node {id}: {field} TLV has trailing bytes")]
    TrailingBytes { id: u16, field: &'static str },
    #[error("node {id}: help is not a string")]
    HelpNotString { id: u16 },
    #[error("node {id}: id outside dense range 0..{len}")]
    IdOutOfRange { id: u16, len: usize },
    #[error("duplicate node id {0}")]
    DuplicateId(u16),
    #[error("root node has parent {0}")]
    RootHasParent(u16),
    #[error("node {id} has no parent")]
    OrphanNode { id: u16 },
    #[error("node {id}: parent {parent} does not exist")]
    UnknownParent { id: u16, parent: u16 },
    #[error("node {id}: parent {parent} does not precede it")]
    ParentNotBefore { id: u16, parent: u16 },
    #[error("node {id}: parent chain does not reach the root")]
    Cycle { id: u16 },
    #[error("nodes {first} and {second} under {parent} are both named '{name}'")]
    SiblingCollision {
        parent: u16,
        first: u16,
        second: u16,
        name: NameSegment,
    },
}

/// One node of the naming tree
#[derive(Debug, Clone)]
pub struct TagNode {
    id: NodeId,
    name: NameSegment,
    help: NameSegment,
    qualifier: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TagNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Path component this node contributes
    pub fn name(&self) -> &NameSegment {
        &self.name
    }

    pub fn help(&self) -> &NameSegment {
        &self.help
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in id order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Frozen naming tree
#[derive(Debug, Clone)]
pub struct TagTree {
    nodes: Vec<TagNode>,
}

impl TagTree {
    /// Build with the default ordered parent check
    pub fn build(table: &DescriptorTable) -> Result<Self, SchemaError> {
        Self::build_with(table, ParentCheck::Ordered)
    }

    pub fn build_with(table: &DescriptorTable, check: ParentCheck) -> Result<Self, SchemaError> {
        let entries = table.entries();
        if entries.is_empty() {
            return Err(SchemaError::MissingRoot);
        }
        if entries.len() > MAX_ID as usize {
            return Err(SchemaError::TooManyNodes(entries.len()));
        }

        // slot by id so the rest of the build can index directly
        let len = entries.len();
        let mut slots: Vec<Option<TagNode>> = vec![None; len];
        for entry in entries {
            let node = decode_entry(entry)?;
            let slot = slots
                .get_mut(entry.id as usize)
                .ok_or(SchemaError::IdOutOfRange { id: entry.id, len })?;
            if slot.is_some() {
                return Err(SchemaError::DuplicateId(entry.id));
            }
            *slot = Some(node);
        }
        // ids are unique and all below len, so every slot is filled
        let mut nodes: Vec<TagNode> = slots.into_iter().flatten().collect();

        check_parents(&nodes, check)?;

        for index in 1..nodes.len() {
            let Some(parent) = nodes[index].parent else {
                continue;
            };
            let id = nodes[index].id;
            if let Some(&other) = nodes[parent.index()]
                .children
                .iter()
                .find(|c| nodes[c.index()].name == nodes[index].name)
            {
                return Err(SchemaError::SiblingCollision {
                    parent: parent.0,
                    first: other.0,
                    second: id.0,
                    name: nodes[index].name.clone(),
                });
            }
            nodes[parent.index()].children.push(id);
        }

        info!(nodes = nodes.len(), ?check, "tagnet tree built");
        Ok(Self { nodes })
    }

    /// Build the tree for the generated table
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::build(&DescriptorTable::builtin())
    }

    pub fn root(&self) -> &TagNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn get(&self, id: impl Into<NodeId>) -> Option<&TagNode> {
        self.nodes.get(id.into().index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true for a built tree; the root always exists
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &TagNode> {
        self.nodes.iter()
    }

    pub fn children(&self, id: impl Into<NodeId>) -> impl Iterator<Item = &TagNode> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |c| &self.nodes[c.index()])
    }

    pub fn parent(&self, id: impl Into<NodeId>) -> Option<&TagNode> {
        self.get(id)
            .and_then(|n| n.parent)
            .map(|p| &self.nodes[p.index()])
    }

    /// Segments leading from the root to `id`, excluding the root's own name
    pub fn path_of(&self, id: impl Into<NodeId>) -> Option<Vec<NameSegment>> {
        let mut node = self.get(id)?;
        let mut path = Vec::new();
        while let Some(parent) = node.parent {
            path.push(node.name.clone());
            node = &self.nodes[parent.index()];
        }
        path.reverse();
        Some(path)
    }

    /// First node, in id order, carrying `qualifier`
    pub fn find_by_qualifier(&self, qualifier: &str) -> Option<&TagNode> {
        if qualifier.is_empty() {
            return None;
        }
        self.nodes.iter().find(|n| n.qualifier == qualifier)
    }

    fn fmt_subtree(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.nodes[id.index()];
        writeln!(
            f,
            "{:indent$}{:>3} {} [{}]",
            "",
            node.id.0,
            node.name,
            node.qualifier,
            indent = depth * 2
        )?;
        for child in &node.children {
            self.fmt_subtree(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TagTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_subtree(f, NodeId::ROOT, 0)
    }
}

fn decode_entry(entry: &Descriptor) -> Result<TagNode, SchemaError> {
    let id = entry.id;
    let (name, used) =
        tlv::decode(&entry.name_tlv).map_err(|source| SchemaError::BadName { id, source })?;
    if used != entry.name_tlv.len() {
        return Err(SchemaError::TrailingBytes { id, field: "name" });
    }
    let (help, used) =
        tlv::decode(&entry.help_tlv).map_err(|source| SchemaError::BadHelp { id, source })?;
    if used != entry.help_tlv.len() {
        return Err(SchemaError::TrailingBytes { id, field: "help" });
    }
    if !help.is_string() {
        return Err(SchemaError::HelpNotString { id });
    }

    Ok(TagNode {
        id: NodeId(id),
        name,
        help,
        qualifier: entry.qualifier.clone(),
        parent: entry.parent_id.map(NodeId),
        children: Vec::new(),
    })
}

fn check_parents(nodes: &[TagNode], check: ParentCheck) -> Result<(), SchemaError> {
    if let Some(parent) = nodes[NodeId::ROOT.index()].parent {
        return Err(SchemaError::RootHasParent(parent.0));
    }

    for node in &nodes[1..] {
        let id = node.id.0;
        let parent = node.parent.ok_or(SchemaError::OrphanNode { id })?;
        if parent.index() >= nodes.len() {
            return Err(SchemaError::UnknownParent {
                id,
                parent: parent.0,
            });
        }
        if check == ParentCheck::Ordered && parent.0 >= id {
            return Err(SchemaError::ParentNotBefore {
                id,
                parent: parent.0,
            });
        }
    }

    if check == ParentCheck::Walk {
        walk_to_root(nodes)?;
    }
    Ok(())
}

/// Visited-set walk from every node to the root
fn walk_to_root(nodes: &[TagNode]) -> Result<(), SchemaError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        OnPath,
        Reaches,
    }

    let mut marks = vec![Mark::Unseen; nodes.len()];
    marks[NodeId::ROOT.index()] = Mark::Reaches;
    let mut path = Vec::new();

    for start in 0..nodes.len() {
        let mut cursor = start;
        while marks[cursor] == Mark::Unseen {
            marks[cursor] = Mark::OnPath;
            path.push(cursor);
            match nodes[cursor].parent {
                Some(parent) => cursor = parent.index(),
                None => break,
            }
        }
        if marks[cursor] == Mark::OnPath {
            debug!(id = cursor, "parent cycle detected");
            return Err(SchemaError::Cycle {
                id: nodes[cursor].id.0,
            });
        }
        for visited in path.drain(..) {
            marks[visited] = Mark::Reaches;
        }
    }
    Ok(())
}
