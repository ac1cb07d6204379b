//! Per-rule views of a subtree.
//!
//! Before a rule looks at a package, the subtree below it is copied into a
//! small arena whose slots point back at the tree nodes and carry that
//! rule's attachment data. Parent links inside the copy point at the copy.
//! Ancestors above the view root are still reachable, but they carry no
//! attachment data. The view is dropped as soon as the check returns.

use super::attachment::{AttachmentData, AttachmentLookup};
use super::rule::CheckError;
use crate::error::Error;
use crate::pkg::{Manifest, NodeId, PackageNode, PackageTree, PackageView};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

static NO_ATTACHMENTS: AttachmentData = BTreeMap::new();

/// A check asked for attachment data its rule never produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No attachment data found for \"{0}\"")]
pub struct MissingAttachment(pub String);

struct Slot {
    origin: NodeId,
    parent: Option<usize>,
    children: Vec<usize>,
    attachments: Arc<AttachmentData>,
}

/// One rule's view of the subtree rooted at one node.
pub struct ScopedView<'t> {
    tree: &'t PackageTree,
    slots: Vec<Slot>,
}

impl<'t> ScopedView<'t> {
    /// Copy the subtree under `node`, taking each node's data for the rule at
    /// `rule_index` from `lookup`.
    ///
    /// # Errors
    /// Returns [`Error::MissingAttachments`] if a node of the subtree has no
    /// entry for the rule.
    pub fn build(
        node: PackageNode<'t>,
        rule_index: usize,
        rule_name: &str,
        lookup: &AttachmentLookup,
    ) -> Result<Self, Error> {
        let tree = node.tree();
        let mut slots: Vec<Slot> = Vec::new();
        let mut pending = vec![(node.id(), None)];

        while let Some((origin, parent)) = pending.pop() {
            let attachments = lookup.get(origin, rule_index).cloned().ok_or_else(|| {
                Error::MissingAttachments {
                    full_name: tree.manifest_of(origin).full_name(),
                    rule: rule_name.to_string(),
                }
            })?;

            let index = slots.len();
            slots.push(Slot {
                origin,
                parent,
                children: Vec::new(),
                attachments,
            });
            if let Some(parent) = parent {
                slots[parent].children.push(index);
            }

            pending.extend(
                tree.children_of(origin)
                    .iter()
                    .rev()
                    .map(|&child| (child, Some(index))),
            );
        }

        Ok(Self { tree, slots })
    }

    #[must_use]
    pub fn root(&self) -> ScopedNode<'_> {
        ScopedNode {
            view: self,
            position: Position::Slot(0),
        }
    }

    /// Number of nodes copied into the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Inside the copied subtree.
    Slot(usize),
    /// An ancestor above the view root.
    Outside(NodeId),
}

/// A package as seen by one rule.
#[derive(Clone, Copy)]
pub struct ScopedNode<'v> {
    view: &'v ScopedView<'v>,
    position: Position,
}

impl<'v> ScopedNode<'v> {
    fn origin_id(&self) -> NodeId {
        match self.position {
            Position::Slot(i) => self.view.slots[i].origin,
            Position::Outside(id) => id,
        }
    }

    /// The underlying tree node.
    #[must_use]
    pub fn origin(&self) -> PackageNode<'v> {
        self.view.tree.node(self.origin_id())
    }

    /// Whether this node is part of the rule's view (false for ancestors of
    /// the view root).
    #[must_use]
    pub fn in_view(&self) -> bool {
        matches!(self.position, Position::Slot(_))
    }

    /// All attachment data this rule holds for the package, as a copy.
    #[must_use]
    pub fn attachments(&self) -> AttachmentData {
        self.attachment_map().clone()
    }

    /// One attachment value.
    ///
    /// # Errors
    /// Returns [`MissingAttachment`] when the rule has no value under `key`,
    /// either because it never declared it or because the fetch failed.
    pub fn attachment(&self, key: &str) -> Result<&'v Value, MissingAttachment> {
        self.attachment_map()
            .get(key)
            .ok_or_else(|| MissingAttachment(key.to_string()))
    }

    /// One attachment value, deserialized.
    pub fn attachment_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, CheckError> {
        let value = self.attachment(key)?;
        serde_json::from_value(value.clone()).map_err(|e| CheckError::AttachmentShape {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn attachment_map(&self) -> &'v AttachmentData {
        match self.position {
            Position::Slot(i) => &self.view.slots[i].attachments,
            Position::Outside(_) => &NO_ATTACHMENTS,
        }
    }
}

impl PackageView for ScopedNode<'_> {
    fn manifest(&self) -> &Manifest {
        self.view.tree.manifest_of(self.origin_id())
    }

    fn parent(&self) -> Option<Self> {
        let position = match self.position {
            Position::Slot(i) => match self.view.slots[i].parent {
                Some(parent) => Position::Slot(parent),
                None => Position::Outside(self.view.tree.parent_of(self.origin_id())?),
            },
            Position::Outside(id) => Position::Outside(self.view.tree.parent_of(id)?),
        };
        Some(Self {
            view: self.view,
            position,
        })
    }

    fn direct_dependencies(&self) -> Vec<Self> {
        match self.position {
            Position::Slot(i) => self.view.slots[i]
                .children
                .iter()
                .map(|&child| Self {
                    view: self.view,
                    position: Position::Slot(child),
                })
                .collect(),
            Position::Outside(id) => self
                .view
                .tree
                .children_of(id)
                .iter()
                .map(|&child| Self {
                    view: self.view,
                    position: Position::Outside(child),
                })
                .collect(),
        }
    }

    fn is_loop(&self) -> bool {
        self.view.tree.is_loop_of(self.origin_id())
    }
}

impl fmt::Debug for ScopedNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedNode")
            .field("full_name", &self.full_name())
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_tree;
    use serde_json::json;

    fn tree() -> PackageTree {
        mock_tree(&json!({
            "name": "root",
            "version": "1.0.0",
            "dependencies": [
                {
                    "name": "dep1",
                    "version": "1.0.0",
                    "dependencies": [{ "name": "dep2", "version": "1.0.0" }]
                },
                { "name": "dep3", "version": "1.0.0" }
            ]
        }))
    }

    /// Rule 0 stores `{ "who": <full name> }`, rule 1 stores nothing.
    fn lookup(tree: &PackageTree) -> AttachmentLookup {
        let mut lookup = AttachmentLookup::new();
        for node in tree.pre_order() {
            let mut data = AttachmentData::new();
            data.insert("who".into(), json!(node.full_name()));
            lookup.insert(node.id(), vec![Arc::new(data), Arc::new(AttachmentData::new())]);
        }
        lookup
    }

    #[test]
    fn test_view_has_same_shape() {
        let tree = tree();
        let lookup = lookup(&tree);
        let view = ScopedView::build(tree.root(), 0, "r", &lookup).unwrap();
        assert_eq!(view.len(), tree.len());

        let mut scoped = Vec::new();
        view.root().visit(true, |n| scoped.push(n.full_name()));
        let mut original = Vec::new();
        tree.root().visit(true, |n| original.push(n.full_name()));
        assert_eq!(scoped, original);
    }

    #[test]
    fn test_parents_point_into_the_view() {
        let tree = tree();
        let lookup = lookup(&tree);
        let view = ScopedView::build(tree.root(), 0, "r", &lookup).unwrap();

        let dep2 = view.root().package_by_name("dep2", None).unwrap();
        let dep1 = dep2.parent().unwrap();
        assert!(dep1.in_view());
        assert_eq!(dep1.attachment("who").unwrap(), &json!("dep1@1.0.0"));
        assert_eq!(dep2.path_string(), "root@1.0.0 → dep1@1.0.0 → dep2@1.0.0");
    }

    #[test]
    fn test_rule_only_sees_its_own_data() {
        let tree = tree();
        let lookup = lookup(&tree);

        let first = ScopedView::build(tree.root(), 0, "first", &lookup).unwrap();
        assert_eq!(first.root().attachment("who").unwrap(), &json!("root@1.0.0"));

        let second = ScopedView::build(tree.root(), 1, "second", &lookup).unwrap();
        let err = second.root().attachment("who").unwrap_err();
        assert_eq!(err.to_string(), "No attachment data found for \"who\"");
        assert!(second.root().attachments().is_empty());
    }

    #[test]
    fn test_ancestors_above_view_have_no_data() {
        let tree = tree();
        let lookup = lookup(&tree);
        let dep1 = tree.root().direct_dependencies()[0];

        let view = ScopedView::build(dep1, 0, "r", &lookup).unwrap();
        assert_eq!(view.len(), 2);

        let root = view.root();
        assert_eq!(root.attachment("who").unwrap(), &json!("dep1@1.0.0"));
        assert_eq!(root.depth(), 1);

        let above = root.parent().unwrap();
        assert!(!above.in_view());
        assert_eq!(above.name(), "root");
        assert!(above.attachment("who").is_err());
        assert_eq!(root.origin(), dep1);
    }

    #[test]
    fn test_missing_lookup_entry_is_an_error() {
        let tree = tree();
        let empty = AttachmentLookup::new();
        let err = ScopedView::build(tree.root(), 0, "r", &empty).err().unwrap();
        assert!(matches!(err, Error::MissingAttachments { .. }));
    }

    #[test]
    fn test_typed_attachment() {
        let tree = tree();
        let lookup = lookup(&tree);
        let view = ScopedView::build(tree.root(), 0, "r", &lookup).unwrap();

        let who: String = view.root().attachment_as("who").unwrap();
        assert_eq!(who, "root@1.0.0");

        let wrong = view.root().attachment_as::<u64>("who").unwrap_err();
        assert!(matches!(wrong, CheckError::AttachmentShape { .. }));
    }
}
