//! Streaming Node Writer
//!
//! Renders a node subtree to bytes in a single forward pass. Every byte is
//! append-only; no intermediate document tree is built. The writer borrows
//! the container (to resolve relations) and the registry (for the per-type
//! field tables that drive extra-field order and null omission).
//!
//! Relation expansion is bounded by recursion level: children stop fetching
//! relations below the second tree level, and a related node never fetches
//! relations of its own, so mutual links cannot recurse.

use crate::models::{FieldValue, Node, NodeTypeRegistry};
use crate::serializer::notation::*;
use crate::tree::Container;

pub struct NodeWriter<'a> {
    container: &'a Container,
    registry: &'a NodeTypeRegistry,
    buf: Vec<u8>,
}

impl<'a> NodeWriter<'a> {
    pub fn new(container: &'a Container, registry: &'a NodeTypeRegistry) -> Self {
        NodeWriter {
            container,
            registry,
            buf: Vec::new(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write a node structure, optionally with its relations.
    pub fn write_node(&mut self, node: Option<&Node>, fetch_relations: bool) {
        self.write_node_at(node, 0, fetch_relations);
    }

    fn write_node_at(&mut self, node: Option<&Node>, level: usize, include_relations: bool) {
        self.buf.push(OBJECT_START);
        let Some(node) = node else {
            self.buf.push(OBJECT_END);
            return;
        };

        self.write_intrinsics(node);

        if node.has_children() {
            self.buf.push(COMMA);
            self.write_key("children");
            self.write_array(node.children.len(), |writer, i| {
                writer.write_node_at(Some(&node.children[i]), level + 1, level < 2);
            });
        }

        if include_relations {
            let relations = self.container.relations_of(&node.id);
            if !relations.is_empty() {
                self.buf.push(COMMA);
                self.write_key("relations");
                self.write_array(relations.len(), |writer, i| {
                    writer.write_node_at(Some(relations[i]), level + 1, false);
                });
            }
        }

        self.write_extra_fields(node);

        self.buf.push(OBJECT_END);
    }

    fn write_intrinsics(&mut self, node: &Node) {
        self.write_key("id");
        self.write_string(&node.id);
        self.buf.push(COMMA);
        self.write_key("type");
        self.write_string(&node.node_type);
        if !node.parent_id.is_empty() {
            self.buf.push(COMMA);
            self.write_key("parentId");
            self.write_string(&node.parent_id);
        }
    }

    /// Type-specific fields, in the declared descriptor order. A field with
    /// no value is an absent key. Unregistered types fall back to the node's
    /// own field map.
    fn write_extra_fields(&mut self, node: &Node) {
        let pairs: Vec<(&str, &FieldValue)> = match self.registry.spec(&node.node_type) {
            Some(spec) => spec
                .fields
                .iter()
                .filter_map(|d| node.fields.get(d.name).map(|v| (d.name, v)))
                .collect(),
            None => node.fields.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        };
        for (name, value) in pairs {
            self.buf.push(COMMA);
            self.write_key(name);
            self.write_value(value);
        }
    }

    fn write_value(&mut self, value: &FieldValue) {
        match value {
            FieldValue::Str(s) => self.write_string(s),
            FieldValue::Bool(b) => self.buf.push(if *b { TRUE } else { FALSE }),
            FieldValue::Int(n) => self.buf.extend_from_slice(n.to_string().as_bytes()),
            FieldValue::Float(n) => self.buf.extend_from_slice(n.to_string().as_bytes()),
            FieldValue::Timestamp(dt) => {
                let ticks = crate::models::value::ticks(dt);
                self.buf.extend_from_slice(ticks.to_string().as_bytes());
            }
            FieldValue::Choice(member) => self.write_string(member),
            FieldValue::Map(map) => {
                self.buf.push(OBJECT_START);
                for (i, (key, nested)) in map.iter().enumerate() {
                    if i > 0 {
                        self.buf.push(COMMA);
                    }
                    self.write_key(key);
                    self.write_value(nested);
                }
                self.buf.push(OBJECT_END);
            }
            FieldValue::List(items) => {
                self.write_array(items.len(), |writer, i| writer.write_value(&items[i]));
            }
            // Embedded node sequences are treated as already-deep: nothing
            // below them expands further.
            FieldValue::Nodes(nodes) => {
                self.write_array(nodes.len(), |writer, i| {
                    writer.write_node_at(Some(&nodes[i]), 2, true);
                });
            }
        }
    }

    fn write_array(&mut self, len: usize, mut write_item: impl FnMut(&mut Self, usize)) {
        self.buf.push(ARRAY_START);
        for i in 0..len {
            if i > 0 {
                self.buf.push(COMMA);
            }
            write_item(self, i);
        }
        self.buf.push(ARRAY_END);
    }

    fn write_key(&mut self, key: &str) {
        self.write_string(key);
        self.buf.push(COLON);
    }

    fn write_string(&mut self, value: &str) {
        self.buf.push(QUOTE);
        for ch in value.bytes() {
            match ch {
                b'\n' => self.buf.extend_from_slice(b"\\n"),
                b'\r' => self.buf.extend_from_slice(b"\\r"),
                b'\t' => self.buf.extend_from_slice(b"\\t"),
                b'"' => self.buf.extend_from_slice(b"\\\""),
                _ => self.buf.push(ch),
            }
        }
        self.buf.push(QUOTE);
    }
}
