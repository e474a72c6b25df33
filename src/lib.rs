pub mod adapters;
pub mod config;
pub mod descriptor;
pub mod metrics;
pub mod namespace;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod tlv;
pub mod tree;

pub use descriptor::{DescriptorTable, TnId};
pub use registry::{Action, Adapter, Dispatch, QualifierRegistry, Request};
pub use resolver::{resolve, Resolved, ResolveError};
pub use router::{RouteError, Router};
pub use tlv::NameSegment;
pub use tree::{NodeId, SchemaError, TagTree};
