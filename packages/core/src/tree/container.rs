//! Node Tree / Relation Store
//!
//! The [`Container`] owns the document tree (a single root [`Node`]) and an
//! auxiliary relation set: unordered `(from, to)` id pairs expressing
//! cross-links that are not containment. It is created once per process from
//! a fresh or loaded root and lives for the process lifetime, shared across
//! connections behind `Arc<RwLock<Container>>`.
//!
//! Mutation primitives return the affected node id and broadcast a
//! [`ChangeEvent`]; callers re-encode and push from their own tasks.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{Node, NodeTypeSpec};
use crate::tree::events::{ChangeEvent, EVENT_CHANNEL_CAPACITY};

/// Errors raised when assembling a container from untrusted parts.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Two nodes in the loaded tree share an id.
    #[error("duplicate node id '{id}' in tree")]
    DuplicateId { id: String },
}

/// A non-hierarchical edge between two node ids.
///
/// Lookup is undirected; the stored order only records who linked whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from: String,
    pub to: String,
}

/// Payload of a Move request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveSpec {
    pub id: String,
    pub old_parent_id: String,
    pub parent_id: String,
    pub new_index: usize,
}

/// The process-lifetime owner of the root node and the relation edge set.
#[derive(Debug)]
pub struct Container {
    root: Node,
    relations: Vec<Relation>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Container {
    /// Create a container around a root node.
    pub fn new(root: Node) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Container {
            root,
            relations: Vec::new(),
            events,
        }
    }

    /// Rebuild a container from loaded parts.
    ///
    /// The tree structure is authoritative: every child's `parent_id` is
    /// normalized to its actual parent. Duplicate ids are rejected.
    pub fn from_parts(mut root: Node, relations: Vec<Relation>) -> Result<Self, TreeError> {
        let mut seen = std::collections::HashSet::new();
        check_unique(&root, &mut seen)?;
        normalize_parents(&mut root);
        let mut container = Container::new(root);
        container.relations = relations;
        Ok(container)
    }

    /// The demo tree used when no snapshot exists yet.
    pub fn seed() -> Self {
        use crate::models::FieldValue::Str;
        let root = Node::with_id("root", "site")
            .with_field("name", Str("Arbor".into()))
            .with_child(
                Node::with_id("start", "page")
                    .with_field("name", Str("Start".into()))
                    .with_field("route", Str("/".into()))
                    .with_child(
                        Node::with_id("welcome", "text")
                            .with_field("text", Str("Welcome to Arbor.".into())),
                    ),
            )
            .with_child(
                Node::with_id("about", "page")
                    .with_field("name", Str("About".into()))
                    .with_field("route", Str("/about".into())),
            );
        Container::new(root)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Subscribe to change events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Tree traversal by id; `None` when absent.
    pub fn get_by_id(&self, id: &str) -> Option<&Node> {
        self.root.find(id)
    }

    /// Nodes linked to `id` through the relation set, in either direction.
    ///
    /// Edges whose far end no longer resolves are skipped.
    pub fn relations_of(&self, id: &str) -> Vec<&Node> {
        self.relations
            .iter()
            .filter_map(|rel| {
                if rel.from == id {
                    Some(rel.to.as_str())
                } else if rel.to == id {
                    Some(rel.from.as_str())
                } else {
                    None
                }
            })
            .filter_map(|other| self.get_by_id(other))
            .collect()
    }

    /// Add a relation edge between two ids.
    pub fn add_relation(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.relations.push(Relation {
            from: from.into(),
            to: to.into(),
        });
    }

    /// Append `node` as the last child of `parent_id`, generating an id when
    /// absent. Returns the new node's id, or `None` when the parent is
    /// missing or the id would collide.
    pub fn add_child(&mut self, parent_id: &str, node: Node) -> Option<String> {
        if !node.id.is_empty() && self.get_by_id(&node.id).is_some() {
            return None;
        }
        let parent = self.root.find_mut(parent_id)?;
        let id = parent.attach(node).id.clone();
        self.emit(ChangeEvent::ChildrenChanged {
            parent_id: parent_id.to_string(),
        });
        Some(id)
    }

    /// Apply an update payload onto the node with `id`.
    ///
    /// Returns the node's id even when no field survived coercion (the
    /// caller still pushes the node); `None` only when the id is unknown.
    pub fn apply_update(
        &mut self,
        id: &str,
        payload: &serde_json::Map<String, serde_json::Value>,
        spec: Option<&NodeTypeSpec>,
    ) -> Option<String> {
        let node = self.root.find_mut(id)?;
        let applied = node.apply(payload, spec, &["type"]);
        if applied > 0 {
            self.emit(ChangeEvent::ValueChanged {
                node_id: id.to_string(),
            });
        }
        Some(id.to_string())
    }

    /// Detach the node with `id` from its parent. Returns the parent's id so
    /// the caller can re-render the shrunk subtree; `None` when the id is
    /// unknown or names the root.
    pub fn remove(&mut self, id: &str) -> Option<String> {
        let parent_id = self.root.find_parent_of(id)?.id.clone();
        self.root.find_mut(&parent_id)?.detach(id)?;
        self.emit(ChangeEvent::ChildrenChanged {
            parent_id: parent_id.clone(),
        });
        Some(parent_id)
    }

    /// Reposition a node, within one parent or across two.
    ///
    /// Same-parent moves are remove-then-insert at `new_index`. Cross-parent
    /// moves detach from the old parent and insert at `new_index` (append
    /// when the new parent has no children). Indices are clamped to the
    /// sibling count. Returns the new parent's id; `None` when either parent
    /// id is missing, the node is not under the old parent, or the target
    /// parent sits inside the moved subtree.
    pub fn move_node(&mut self, mv: &MoveSpec) -> Option<String> {
        if mv.parent_id.is_empty() || mv.old_parent_id.is_empty() {
            return None;
        }
        if mv.parent_id == mv.old_parent_id {
            let parent = self.root.find_mut(&mv.old_parent_id)?;
            let from = parent.children.iter().position(|c| c.id == mv.id)?;
            let node = parent.children.remove(from);
            let to = mv.new_index.min(parent.children.len());
            parent.children.insert(to, node);
            self.emit(ChangeEvent::ChildrenChanged {
                parent_id: mv.parent_id.clone(),
            });
            return Some(mv.parent_id.clone());
        }

        // Moving a node under its own descendant would orphan the subtree.
        if self.get_by_id(&mv.id)?.find(&mv.parent_id).is_some() {
            return None;
        }
        if self.get_by_id(&mv.parent_id).is_none() {
            return None;
        }
        let mut node = {
            let old_parent = self.root.find_mut(&mv.old_parent_id)?;
            let pos = old_parent.children.iter().position(|c| c.id == mv.id)?;
            old_parent.children.remove(pos)
        };
        let new_parent = self
            .root
            .find_mut(&mv.parent_id)
            .expect("target parent checked above");
        node.parent_id = new_parent.id.clone();
        if new_parent.children.is_empty() {
            new_parent.children.push(node);
        } else {
            let to = mv.new_index.min(new_parent.children.len());
            new_parent.children.insert(to, node);
        }
        self.emit(ChangeEvent::ChildrenChanged {
            parent_id: mv.old_parent_id.clone(),
        });
        self.emit(ChangeEvent::ChildrenChanged {
            parent_id: mv.parent_id.clone(),
        });
        Some(mv.parent_id.clone())
    }

    fn emit(&self, event: ChangeEvent) {
        // No subscribers is fine; the send result only reports that.
        let _ = self.events.send(event);
    }
}

fn check_unique(node: &Node, seen: &mut std::collections::HashSet<String>) -> Result<(), TreeError> {
    if !seen.insert(node.id.clone()) {
        return Err(TreeError::DuplicateId {
            id: node.id.clone(),
        });
    }
    node.children.iter().try_for_each(|child| check_unique(child, seen))
}

fn normalize_parents(node: &mut Node) {
    let id = node.id.clone();
    for child in &mut node.children {
        child.parent_id = id.clone();
        normalize_parents(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_page_site() -> Container {
        Container::new(
            Node::with_id("root", "site")
                .with_child(Node::with_id("blog", "page"))
                .with_child(Node::with_id("about", "page")),
        )
    }

    #[test]
    fn can_get_child_from_container() {
        let container = two_page_site();
        assert_eq!(container.get_by_id("about").unwrap().node_type, "page");
    }

    #[test]
    fn get_non_existing_by_id_returns_none() {
        let container = two_page_site();
        assert!(container.get_by_id("missing").is_none());
    }

    #[test]
    fn relations_resolve_in_either_direction() {
        let mut container = two_page_site();
        container.add_relation("root", "blog");
        assert_eq!(container.relations_of("blog").len(), 1);
        assert_eq!(container.relations_of("root")[0].id, "blog");
    }

    #[test]
    fn two_edges_from_one_node_yield_two_entries() {
        let mut container = two_page_site();
        container.add_relation("root", "blog");
        container.add_relation("root", "about");
        assert_eq!(container.relations_of("root").len(), 2);
    }

    #[test]
    fn added_children_keep_insertion_order() {
        let mut container = Container::new(Node::with_id("root", "site"));
        container.add_child("root", Node::with_id("a", "page")).unwrap();
        container.add_child("root", Node::with_id("b", "page")).unwrap();
        let ids: Vec<_> = container.root().children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn add_child_rejects_a_colliding_id() {
        let mut container = two_page_site();
        assert!(container.add_child("root", Node::with_id("about", "page")).is_none());
        assert_eq!(container.root().children.len(), 2);
    }

    #[test]
    fn parent_id_matches_the_owning_parent_after_add() {
        let mut container = two_page_site();
        let id = container.add_child("blog", Node::new("text")).unwrap();
        let node = container.get_by_id(&id).unwrap();
        assert_eq!(node.parent_id, "blog");
        assert_eq!(container.root().find_parent_of(&id).unwrap().id, "blog");
    }

    #[test]
    fn remove_returns_the_parent_id() {
        let mut container = two_page_site();
        assert_eq!(container.remove("about").as_deref(), Some("root"));
        assert!(container.get_by_id("about").is_none());
        assert_eq!(container.root().children.len(), 1);
    }

    #[test]
    fn removing_the_root_or_a_stranger_is_a_no_op() {
        let mut container = two_page_site();
        assert!(container.remove("root").is_none());
        assert!(container.remove("missing").is_none());
        assert_eq!(container.root().children.len(), 2);
    }

    #[test]
    fn same_parent_move_changes_only_the_index() {
        let mut container = two_page_site();
        let mv = MoveSpec {
            id: "about".into(),
            old_parent_id: "root".into(),
            parent_id: "root".into(),
            new_index: 0,
        };
        assert_eq!(container.move_node(&mv).as_deref(), Some("root"));
        let ids: Vec<_> = container.root().children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["about", "blog"]);
        assert_eq!(container.get_by_id("about").unwrap().parent_id, "root");
    }

    #[test]
    fn cross_parent_move_updates_membership_and_back_reference() {
        let mut container = two_page_site();
        let mv = MoveSpec {
            id: "about".into(),
            old_parent_id: "root".into(),
            parent_id: "blog".into(),
            new_index: 0,
        };
        assert_eq!(container.move_node(&mv).as_deref(), Some("blog"));
        assert_eq!(container.root().children.len(), 1);
        let about = container.get_by_id("about").unwrap();
        assert_eq!(about.parent_id, "blog");
        assert_eq!(container.get_by_id("blog").unwrap().children[0].id, "about");
    }

    #[test]
    fn move_with_a_missing_parent_id_is_rejected() {
        let mut container = two_page_site();
        let mv = MoveSpec {
            id: "about".into(),
            old_parent_id: String::new(),
            parent_id: "blog".into(),
            new_index: 0,
        };
        assert!(container.move_node(&mv).is_none());
    }

    #[test]
    fn move_under_own_descendant_is_rejected() {
        let mut container = Container::new(
            Node::with_id("root", "site").with_child(
                Node::with_id("blog", "page").with_child(Node::with_id("post", "text")),
            ),
        );
        let mv = MoveSpec {
            id: "blog".into(),
            old_parent_id: "root".into(),
            parent_id: "post".into(),
            new_index: 0,
        };
        assert!(container.move_node(&mv).is_none());
        assert!(container.get_by_id("blog").is_some());
    }

    #[test]
    fn updates_emit_value_changed() {
        let mut container = two_page_site();
        let registry = crate::models::NodeTypeRegistry::builtin();
        let mut events = container.subscribe();
        let payload = json!({"name": "About us"});
        container
            .apply_update("about", payload.as_object().unwrap(), registry.spec("page"))
            .unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            ChangeEvent::ValueChanged {
                node_id: "about".into()
            }
        );
    }

    #[test]
    fn structural_mutations_emit_children_changed() {
        let mut container = two_page_site();
        let mut events = container.subscribe();
        container.add_child("blog", Node::new("text")).unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            ChangeEvent::ChildrenChanged {
                parent_id: "blog".into()
            }
        );
    }

    #[test]
    fn from_parts_normalizes_parent_references() {
        let mut root = Node::with_id("root", "site");
        let mut blog = Node::with_id("blog", "page");
        blog.parent_id = "stale".into();
        root.children.push(blog);
        let container = Container::from_parts(root, Vec::new()).unwrap();
        assert_eq!(container.get_by_id("blog").unwrap().parent_id, "root");
    }

    #[test]
    fn from_parts_rejects_duplicate_ids() {
        let root = Node::with_id("root", "site")
            .with_child(Node::with_id("twin", "page"))
            .with_child(Node::with_id("twin", "page"));
        assert!(matches!(
            Container::from_parts(root, Vec::new()),
            Err(TreeError::DuplicateId { .. })
        ));
    }
}
