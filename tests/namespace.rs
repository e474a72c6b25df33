use tagnet::descriptor::DescriptorTable;
use tagnet::namespace::{self, NamespaceError};
use tagnet::resolver::{parse_text_path, resolve};
use tagnet::tree::{NodeId, ParentCheck};

/// The namespace is process-global, so this file holds a single test.
#[test]
fn test_namespace_installs_once() {
    assert!(namespace::get().is_none());

    let tree = namespace::init(&DescriptorTable::builtin(), ParentCheck::Ordered).unwrap();
    assert_eq!(tree.len(), 40);

    let again = namespace::init(&DescriptorTable::builtin(), ParentCheck::Walk);
    assert_eq!(again.unwrap_err(), NamespaceError::AlreadyInitialized);

    let installed = namespace::get().unwrap();
    let node = resolve(&installed, &parse_text_path("tag/sd/0/dblk/.recnum")).unwrap();
    assert_eq!(node.id, NodeId(15));
    assert!(std::sync::Arc::ptr_eq(&tree, &installed));
}
