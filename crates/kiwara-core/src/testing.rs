//! Fixtures shared by unit tests.

use crate::lint::{AttachmentData, AttachmentLookup, RuleSet};
use crate::pkg::{Manifest, NodeId, PackageTree};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Build a manifest from a nested mock where `dependencies` is a list of
/// child mocks. Missing identity defaults to `mockPackage@1.2.3`.
pub(crate) fn mock_manifest(mock: &Value) -> Manifest {
    let mut data = Map::new();
    data.insert("name".into(), Value::from("mockPackage"));
    data.insert("version".into(), Value::from("1.2.3"));

    if let Some(fields) = mock.as_object() {
        for (key, value) in fields {
            match key.as_str() {
                "dependencies" | "devDependencies" => {
                    let declared: Map<String, Value> = value
                        .as_array()
                        .into_iter()
                        .flatten()
                        .map(|child| {
                            (
                                child["name"].as_str().unwrap_or("mockPackage").to_string(),
                                child.get("version").cloned().unwrap_or("1.2.3".into()),
                            )
                        })
                        .collect();
                    data.insert(key.clone(), Value::Object(declared));
                }
                "loop" => {}
                _ => {
                    data.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Manifest::new(Value::Object(data)).unwrap()
}

/// Build a tree from a nested mock. A child with `"loop": true` is attached
/// as a loop node and its own dependencies are ignored.
pub(crate) fn mock_tree(mock: &Value) -> PackageTree {
    let mut tree = PackageTree::new(mock_manifest(mock));
    attach_children(&mut tree, NodeId::ROOT, mock);
    tree
}

fn attach_children(tree: &mut PackageTree, parent: NodeId, mock: &Value) {
    let Some(children) = mock.get("dependencies").and_then(Value::as_array) else {
        return;
    };
    for child in children {
        let is_loop = child.get("loop").and_then(Value::as_bool).unwrap_or(false);
        let id = tree.attach(parent, mock_manifest(child), is_loop);
        if !is_loop {
            attach_children(tree, id, child);
        }
    }
}

/// A lookup giving every rule an empty attachment map on every node.
pub(crate) fn empty_lookup(tree: &PackageTree, rules: &RuleSet) -> AttachmentLookup {
    let mut lookup = AttachmentLookup::new();
    for node in tree.pre_order() {
        lookup.insert(
            node.id(),
            rules.iter().map(|_| Arc::new(AttachmentData::new())).collect(),
        );
    }
    lookup
}
