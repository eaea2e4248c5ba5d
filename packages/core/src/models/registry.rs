//! Node Type Registry
//!
//! Maps a type name to a constructor and an ordered field-descriptor table.
//! The table is built once at startup and passed by reference to everything
//! that needs type resolution: the dispatcher (construction, field apply) and
//! the wire encoder (field order, null omission). There is no ambient global
//! lookup and no runtime reflection.
//!
//! The built-in catalog covers the content types a small site tree is made
//! of, plus the commerce types. Hosts can register additional types before
//! the server starts.

use std::collections::HashMap;

use crate::models::node::Node;
use crate::models::value::FieldKind;

/// A single declared field: wire name plus value kind.
///
/// The null-omission rule is uniform: a field with no value is an absent key
/// in the node's field map and an absent key on the wire.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDescriptor { name, kind }
    }
}

/// The declared shape of one node type.
#[derive(Debug, Clone)]
pub struct NodeTypeSpec {
    pub type_name: &'static str,
    /// Declaration order is encoding order.
    pub fields: Vec<FieldDescriptor>,
    /// Role required to receive nodes of this type, when set.
    pub required_role: Option<&'static str>,
}

impl NodeTypeSpec {
    pub fn new(type_name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        NodeTypeSpec {
            type_name,
            fields,
            required_role: None,
        }
    }

    pub fn with_required_role(mut self, role: &'static str) -> Self {
        self.required_role = Some(role);
        self
    }

    /// Case-insensitive descriptor lookup, the match rule field apply uses.
    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

/// Registry of every node type the container can hold.
#[derive(Debug, Default)]
pub struct NodeTypeRegistry {
    specs: HashMap<&'static str, NodeTypeSpec>,
}

impl NodeTypeRegistry {
    /// An empty registry; hosts register their own catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        use FieldKind::*;
        let mut registry = Self::new();
        registry.register(NodeTypeSpec::new(
            "site",
            vec![FieldDescriptor::new("name", Str)],
        ));
        registry.register(NodeTypeSpec::new(
            "page",
            vec![
                FieldDescriptor::new("name", Str),
                FieldDescriptor::new("route", Str),
                FieldDescriptor::new("published", Bool),
                FieldDescriptor::new("publishedAt", Timestamp),
                FieldDescriptor::new("requiredRole", Str),
            ],
        ));
        registry.register(NodeTypeSpec::new(
            "text",
            vec![FieldDescriptor::new("text", Str)],
        ));
        registry.register(NodeTypeSpec::new(
            "link",
            vec![
                FieldDescriptor::new("url", Str),
                FieldDescriptor::new("title", Str),
            ],
        ));
        registry.register(NodeTypeSpec::new(
            "image",
            vec![
                FieldDescriptor::new("sourceUrl", Str),
                FieldDescriptor::new("downloadUrl", Str),
                FieldDescriptor::new("width", Float),
                FieldDescriptor::new("height", Float),
                FieldDescriptor::new("alt", Str),
            ],
        ));
        registry.register(NodeTypeSpec::new(
            "question",
            vec![
                FieldDescriptor::new("title", Str),
                FieldDescriptor::new("answers", List),
            ],
        ));
        registry.register(NodeTypeSpec::new(
            "form-category",
            vec![FieldDescriptor::new("title", Str)],
        ));
        registry.register(NodeTypeSpec::new(
            "article",
            vec![
                FieldDescriptor::new("name", Str),
                FieldDescriptor::new("articleNr", Str),
                FieldDescriptor::new("price", Float),
                FieldDescriptor::new("tax", Float),
            ],
        ));
        registry.register(
            NodeTypeSpec::new(
                "order",
                vec![
                    FieldDescriptor::new("orderNr", Str),
                    FieldDescriptor::new(
                        "status",
                        Choice(&["pending", "confirmed", "shipped", "cancelled"]),
                    ),
                    FieldDescriptor::new("placedAt", Timestamp),
                    FieldDescriptor::new("lines", List),
                ],
            )
            .with_required_role("admin"),
        );
        registry
    }

    pub fn register(&mut self, spec: NodeTypeSpec) {
        self.specs.insert(spec.type_name, spec);
    }

    /// Construct a blank node of the given type, or `None` for an unknown
    /// type name.
    pub fn create(&self, type_name: &str) -> Option<Node> {
        self.specs
            .get(type_name)
            .map(|spec| Node::new(spec.type_name))
    }

    pub fn spec(&self, type_name: &str) -> Option<&NodeTypeSpec> {
        self.specs.get(type_name)
    }
}
