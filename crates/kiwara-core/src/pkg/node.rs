//! Resolved dependency tree.
//!
//! Nodes live in an arena ([`PackageTree`]) and refer to each other by
//! [`NodeId`]. The parent link is an index, so it never owns anything, and a
//! node's children are owned by the arena in manifest declaration order.
//!
//! The read-only query surface lives on the [`PackageView`] trait so that the
//! per-rule scoped views built during evaluation answer the same questions as
//! the tree itself.

use super::manifest::{DeprecatedInfo, Manifest};
use serde_json::Value;
use std::fmt;

/// Index of a node inside its [`PackageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct NodeData {
    manifest: Manifest,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    is_loop: bool,
}

/// A fully resolved dependency tree. Immutable once handed out by the
/// resolver.
#[derive(Debug)]
pub struct PackageTree {
    nodes: Vec<NodeData>,
}

impl PackageTree {
    pub(crate) fn new(root: Manifest) -> Self {
        Self {
            nodes: vec![NodeData {
                manifest: root,
                parent: None,
                children: Vec::new(),
                is_loop: false,
            }],
        }
    }

    /// Append a child to `parent`. The child's parent link is set here and
    /// nowhere else.
    pub(crate) fn attach(&mut self, parent: NodeId, manifest: Manifest, is_loop: bool) -> NodeId {
        debug_assert!(!self.nodes[parent.0].is_loop, "loop nodes are leaves");
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            manifest,
            parent: Some(parent),
            children: Vec::new(),
            is_loop,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> PackageNode<'_> {
        PackageNode { tree: self, id }
    }

    pub(crate) fn manifest_of(&self, id: NodeId) -> &Manifest {
        &self.nodes[id.0].manifest
    }

    pub(crate) fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub(crate) fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub(crate) fn is_loop_of(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_loop
    }

    #[must_use]
    pub fn root(&self) -> PackageNode<'_> {
        PackageNode {
            tree: self,
            id: NodeId::ROOT,
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<PackageNode<'_>> {
        (id.0 < self.nodes.len()).then_some(PackageNode { tree: self, id })
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order, root first.
    #[must_use]
    pub fn pre_order(&self) -> Vec<PackageNode<'_>> {
        let mut nodes = Vec::with_capacity(self.len());
        self.root().visit(true, |node| nodes.push(node));
        nodes
    }
}

/// Read-only queries shared by tree nodes and scoped views.
pub trait PackageView: Copy {
    fn manifest(&self) -> &Manifest;

    /// The node this one was attached to. `None` for the root.
    fn parent(&self) -> Option<Self>;

    /// Children in manifest declaration order.
    fn direct_dependencies(&self) -> Vec<Self>;

    /// True when this package already appears among its own ancestors.
    fn is_loop(&self) -> bool;

    fn name(&self) -> &str {
        self.manifest().name()
    }

    fn version(&self) -> &str {
        self.manifest().version()
    }

    fn full_name(&self) -> String {
        self.manifest().full_name()
    }

    fn deprecated_info(&self) -> DeprecatedInfo {
        self.manifest().deprecated_info()
    }

    /// Detached copy of the raw manifest.
    fn data(&self) -> Value {
        self.manifest().data()
    }

    /// Path-addressed manifest lookup (`repository.url`, `keywords[0]`).
    fn get(&self, path: &str) -> Option<&Value> {
        self.manifest().get(path)
    }

    /// Call `callback` for every descendant in pre-order, optionally
    /// starting with this node.
    fn visit<F: FnMut(Self)>(&self, include_self: bool, mut callback: F) {
        if include_self {
            callback(*self);
        }
        let mut stack: Vec<Self> = self.direct_dependencies();
        stack.reverse();
        while let Some(node) = stack.pop() {
            callback(node);
            stack.extend(node.direct_dependencies().into_iter().rev());
        }
    }

    /// This node and its descendants matching `filter`, in pre-order.
    fn packages_by<F: FnMut(&Self) -> bool>(&self, mut filter: F) -> Vec<Self> {
        let mut matches = Vec::new();
        self.visit(true, |node| {
            if filter(&node) {
                matches.push(node);
            }
        });
        matches
    }

    fn packages_by_name(&self, name: &str, version: Option<&str>) -> Vec<Self> {
        self.packages_by(|node| {
            node.name() == name && version.map_or(true, |v| node.version() == v)
        })
    }

    fn package_by_name(&self, name: &str, version: Option<&str>) -> Option<Self> {
        self.packages_by_name(name, version).into_iter().next()
    }

    /// `(name, version)` pairs from the outermost ancestor down to this node.
    fn path(&self) -> Vec<(String, String)> {
        let mut path = Vec::new();
        let mut current = Some(*self);
        while let Some(node) = current {
            path.push((node.name().to_string(), node.version().to_string()));
            current = node.parent();
        }
        path.reverse();
        path
    }

    /// `root@1.0.0 → dep1@1.0.0 → dep2@1.0.0`
    fn path_string(&self) -> String {
        format_path(&self.path())
    }

    /// Distance from the root (root = 0).
    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }
}

/// Join `(name, version)` pairs as `a@1 → b@2`.
#[must_use]
pub fn format_path(path: &[(String, String)]) -> String {
    path.iter()
        .map(|(name, version)| format!("{name}@{version}"))
        .collect::<Vec<_>>()
        .join(" → ")
}

/// A node of a [`PackageTree`].
#[derive(Clone, Copy)]
pub struct PackageNode<'a> {
    tree: &'a PackageTree,
    id: NodeId,
}

impl<'a> PackageNode<'a> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn tree(&self) -> &'a PackageTree {
        self.tree
    }

    fn data_ref(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.0]
    }

    /// Number of direct dependencies, without building the child list.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.data_ref().children.len()
    }
}

impl PackageView for PackageNode<'_> {
    fn manifest(&self) -> &Manifest {
        &self.data_ref().manifest
    }

    fn parent(&self) -> Option<Self> {
        self.data_ref().parent.map(|id| PackageNode {
            tree: self.tree,
            id,
        })
    }

    fn direct_dependencies(&self) -> Vec<Self> {
        self.data_ref()
            .children
            .iter()
            .map(|&id| PackageNode {
                tree: self.tree,
                id,
            })
            .collect()
    }

    fn is_loop(&self) -> bool {
        self.data_ref().is_loop
    }
}

impl PartialEq for PackageNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for PackageNode<'_> {}

impl fmt::Debug for PackageNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageNode")
            .field("id", &self.id)
            .field("full_name", &self.full_name())
            .field("is_loop", &self.is_loop())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_tree;
    use serde_json::json;

    fn diamond() -> PackageTree {
        mock_tree(&json!({
            "name": "root",
            "version": "1.0.0",
            "dependencies": [
                {
                    "name": "dep1",
                    "version": "1.0.0",
                    "dependencies": [{ "name": "dep2", "version": "1.0.0" }]
                },
                {
                    "name": "dep3",
                    "version": "1.0.0",
                    "dependencies": [{ "name": "dep2", "version": "2.0.0" }]
                }
            ]
        }))
    }

    #[test]
    fn test_parent_links() {
        let tree = diamond();
        let root = tree.root();
        assert!(root.parent().is_none());

        for child in root.direct_dependencies() {
            assert_eq!(child.parent(), Some(root));
        }
    }

    #[test]
    fn test_visit_is_pre_order() {
        let tree = diamond();
        let mut seen = Vec::new();
        tree.root().visit(true, |n| seen.push(n.full_name()));
        assert_eq!(
            seen,
            vec![
                "root@1.0.0",
                "dep1@1.0.0",
                "dep2@1.0.0",
                "dep3@1.0.0",
                "dep2@2.0.0"
            ]
        );

        let mut without_self = Vec::new();
        tree.root().visit(false, |n| without_self.push(n.full_name()));
        assert_eq!(without_self.len(), 4);
        assert_eq!(tree.pre_order().len(), 5);
    }

    #[test]
    fn test_packages_by_name() {
        let tree = diamond();
        let root = tree.root();

        assert_eq!(root.packages_by_name("dep2", None).len(), 2);
        assert_eq!(root.packages_by_name("dep2", Some("2.0.0")).len(), 1);
        assert!(root.package_by_name("dep4", None).is_none());

        let first = root.package_by_name("dep2", None).unwrap();
        assert_eq!(first.version(), "1.0.0");
    }

    #[test]
    fn test_packages_by_includes_self() {
        let tree = diamond();
        let matches = tree.root().packages_by(|n| n.version() == "1.0.0");
        assert_eq!(matches.len(), 4);
        assert_eq!(matches[0], tree.root());
    }

    #[test]
    fn test_path_and_depth() {
        let tree = diamond();
        let root = tree.root();
        assert_eq!(root.path(), vec![("root".to_string(), "1.0.0".to_string())]);
        assert_eq!(root.depth(), 0);

        let dep2 = root.direct_dependencies()[0].direct_dependencies()[0];
        assert_eq!(
            dep2.path(),
            vec![
                ("root".to_string(), "1.0.0".to_string()),
                ("dep1".to_string(), "1.0.0".to_string()),
                ("dep2".to_string(), "1.0.0".to_string())
            ]
        );
        assert_eq!(dep2.path_string(), "root@1.0.0 → dep1@1.0.0 → dep2@1.0.0");
        assert_eq!(dep2.depth(), 2);
    }

    #[test]
    fn test_data_is_detached() {
        let tree = mock_tree(&json!({
            "name": "root",
            "version": "1.0.0",
            "deprecated": "use something else",
            "repository": { "url": "git+https://example.com/root.git" }
        }));
        let root = tree.root();

        let mut copy = root.data();
        copy["name"] = json!("changed");
        assert_eq!(root.name(), "root");
        assert_eq!(root.get("name"), Some(&json!("root")));
        assert_eq!(
            root.get("repository.url").and_then(Value::as_str),
            Some("git+https://example.com/root.git")
        );

        let info = root.deprecated_info();
        assert!(info.deprecated);
        assert_eq!(info.message, "use something else");
    }

    #[test]
    fn test_get_out_of_range() {
        let tree = diamond();
        assert!(tree.get(NodeId::ROOT).is_some());
        assert!(tree.get(NodeId(99)).is_none());
    }
}
