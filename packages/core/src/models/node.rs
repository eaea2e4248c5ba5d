//! Node Data Structures
//!
//! The document tree is built from a single universal [`Node`] struct: the
//! intrinsic shape (`id`, `parent_id`, `node_type`, `children`, `tags`,
//! `is_parsed`) plus a typed field map declared per node type by the
//! [`NodeTypeRegistry`](crate::models::registry::NodeTypeRegistry).
//!
//! # Invariants
//!
//! - Every node except the tree root is reachable from exactly one parent's
//!   `children`, and that parent's id equals the node's `parent_id`.
//! - `parent_id` is a back-reference only; children are owned exclusively by
//!   their parent.
//! - Children order is a first-class, observable property.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::registry::NodeTypeSpec;
use crate::models::value::FieldValue;

/// A typed, addressable element of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique id within the container; generated on attach when empty.
    #[serde(default)]
    pub id: String,

    /// Type discriminator, resolved through the registry.
    #[serde(rename = "type")]
    pub node_type: String,

    /// Back-reference to the containing node; empty for the root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,

    /// Ordered child nodes, insertion order significant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,

    /// Optional tag set; never emitted on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Bookkeeping flag for the persistence layer; never emitted on the wire.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_parsed: bool,

    /// Type-specific fields. Absent key means absent value; `null` is never
    /// stored.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Node {
    /// Create a blank node of the given type, id to be assigned on attach.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self::with_id(String::new(), node_type)
    }

    /// Create a node with an explicit id.
    pub fn with_id(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            node_type: node_type.into(),
            parent_id: String::new(),
            children: Vec::new(),
            tags: None,
            is_parsed: false,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment, for seeding and tests.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Builder-style child attachment, for seeding and tests.
    pub fn with_child(mut self, child: Node) -> Self {
        self.attach(child);
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Append a child, generating an id when absent and setting its
    /// back-reference to this node.
    pub fn attach(&mut self, mut child: Node) -> &Node {
        if child.id.is_empty() {
            child.id = Uuid::new_v4().to_string();
        }
        child.parent_id = self.id.clone();
        self.children.push(child);
        self.children.last().expect("child just pushed")
    }

    /// Depth-first lookup of a node by id, including self.
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable variant of [`find`](Node::find).
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Find the node whose `children` currently contains `id`.
    pub fn find_parent_of(&self, id: &str) -> Option<&Node> {
        if self.children.iter().any(|child| child.id == id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_parent_of(id))
    }

    /// Remove the node with `id` from wherever it sits in this subtree and
    /// hand it back, children and all.
    pub fn detach(&mut self, id: &str) -> Option<Node> {
        if let Some(pos) = self.children.iter().position(|child| child.id == id) {
            return Some(self.children.remove(pos));
        }
        self.children.iter_mut().find_map(|child| child.detach(id))
    }

    /// Lenient field merge: apply a JSON payload onto this node.
    ///
    /// Each payload key is matched case-insensitively against the declared
    /// field descriptors of this node's type (plus the writable intrinsics
    /// `id` and `tags`). Values are coerced to the declared kind; a value
    /// that will not coerce is skipped without failing the rest of the
    /// payload. Keys named in `skip` and structural intrinsics (`parentId`,
    /// `children`) are never written.
    ///
    /// Returns the number of fields actually written.
    pub fn apply(
        &mut self,
        payload: &serde_json::Map<String, Value>,
        spec: Option<&NodeTypeSpec>,
        skip: &[&str],
    ) -> usize {
        let mut applied = 0;
        for (key, value) in payload {
            if value.is_null() || skip.iter().any(|s| s.eq_ignore_ascii_case(key)) {
                continue;
            }
            // `type` never changes after construction; structure is owned by
            // the container's mutation primitives.
            if ["type", "parentId", "children", "isParsed"]
                .iter()
                .any(|s| s.eq_ignore_ascii_case(key))
            {
                continue;
            }
            if key.eq_ignore_ascii_case("id") {
                if let Value::String(id) = value {
                    self.id = id.clone();
                    applied += 1;
                }
                continue;
            }
            if key.eq_ignore_ascii_case("tags") {
                if let Some(tags) = as_string_list(value) {
                    self.tags = Some(tags);
                    applied += 1;
                }
                continue;
            }
            let Some(descriptor) = spec.and_then(|s| s.descriptor(key)) else {
                continue;
            };
            if let Some(coerced) = FieldValue::coerce(descriptor.kind, value) {
                self.fields.insert(descriptor.name.to_string(), coerced);
                applied += 1;
            }
        }
        applied
    }

    /// Declared role required to receive this node, when any.
    ///
    /// A node-level `requiredRole` field overrides the type-level marker.
    pub fn required_role<'a>(&'a self, spec: Option<&'a NodeTypeSpec>) -> Option<&'a str> {
        self.fields
            .get("requiredRole")
            .and_then(FieldValue::as_str)
            .filter(|role| !role.is_empty())
            .or_else(|| spec.and_then(|s| s.required_role))
    }
}

fn as_string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registry::NodeTypeRegistry;
    use serde_json::json;

    #[test]
    fn a_single_node_has_no_children() {
        let site = Node::with_id("root", "site");
        assert!(!site.has_children());
    }

    #[test]
    fn attaching_a_child_sets_back_reference_and_id() {
        let mut site = Node::with_id("root", "site");
        let child = site.attach(Node::new("page"));
        assert!(!child.id.is_empty());
        assert_eq!(child.parent_id, "root");
        assert_eq!(site.children.len(), 1);
    }

    #[test]
    fn attach_keeps_an_explicit_id() {
        let mut site = Node::with_id("root", "site");
        site.attach(Node::with_id("about", "page"));
        assert_eq!(site.children[0].id, "about");
    }

    #[test]
    fn find_walks_the_whole_subtree() {
        let site = Node::with_id("root", "site")
            .with_child(Node::with_id("blog", "page").with_child(Node::with_id("post", "text")));
        assert_eq!(site.find("post").unwrap().node_type, "text");
        assert!(site.find("missing").is_none());
    }

    #[test]
    fn find_parent_of_returns_the_owning_node() {
        let site = Node::with_id("root", "site")
            .with_child(Node::with_id("blog", "page").with_child(Node::with_id("post", "text")));
        assert_eq!(site.find_parent_of("post").unwrap().id, "blog");
        assert!(site.find_parent_of("root").is_none());
    }

    #[test]
    fn detach_hands_back_the_subtree() {
        let mut site = Node::with_id("root", "site")
            .with_child(Node::with_id("blog", "page").with_child(Node::with_id("post", "text")));
        let blog = site.detach("blog").unwrap();
        assert_eq!(blog.children.len(), 1);
        assert!(!site.has_children());
    }

    #[test]
    fn apply_matches_fields_case_insensitively() {
        let registry = NodeTypeRegistry::builtin();
        let mut page = Node::with_id("about", "page");
        let payload = json!({"NAME": "About", "Route": "/about"});
        let applied = page.apply(
            payload.as_object().unwrap(),
            registry.spec("page"),
            &["id", "type"],
        );
        assert_eq!(applied, 2);
        assert_eq!(page.fields.get("name"), Some(&FieldValue::Str("About".into())));
        assert_eq!(page.fields.get("route"), Some(&FieldValue::Str("/about".into())));
    }

    #[test]
    fn apply_skips_uncoercible_fields_and_keeps_the_rest() {
        let registry = NodeTypeRegistry::builtin();
        let mut page = Node::with_id("about", "page");
        let payload = json!({"published": "neigh", "name": "About"});
        let applied = page.apply(
            payload.as_object().unwrap(),
            registry.spec("page"),
            &["id", "type"],
        );
        assert_eq!(applied, 1);
        assert!(!page.fields.contains_key("published"));
        assert_eq!(page.fields.get("name"), Some(&FieldValue::Str("About".into())));
    }

    #[test]
    fn apply_never_touches_type_or_structure() {
        let registry = NodeTypeRegistry::builtin();
        let mut page = Node::with_id("about", "page");
        let payload = json!({"type": "site", "parentId": "elsewhere", "children": []});
        let applied = page.apply(payload.as_object().unwrap(), registry.spec("page"), &["type"]);
        assert_eq!(applied, 0);
        assert_eq!(page.node_type, "page");
        assert_eq!(page.parent_id, "");
    }

    #[test]
    fn apply_writes_tags_from_string_arrays() {
        let registry = NodeTypeRegistry::builtin();
        let mut page = Node::with_id("about", "page");
        let payload = json!({"tags": ["nav", "footer"]});
        page.apply(payload.as_object().unwrap(), registry.spec("page"), &[]);
        assert_eq!(page.tags, Some(vec!["nav".to_string(), "footer".to_string()]));
    }

    #[test]
    fn node_level_required_role_overrides_the_type_marker() {
        let registry = NodeTypeRegistry::builtin();
        let page = Node::with_id("about", "page")
            .with_field("requiredRole", FieldValue::Str("editor".into()));
        assert_eq!(page.required_role(registry.spec("page")), Some("editor"));

        let order = Node::with_id("o1", "order");
        assert_eq!(order.required_role(registry.spec("order")), Some("admin"));
    }
}
