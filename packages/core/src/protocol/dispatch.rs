//! Request Dispatcher
//!
//! Translates one parsed [`Request`] into exactly one container mutation or
//! query and returns the id of the affected node, the node the caller
//! should re-encode and push. `None` means "nothing to push": an unknown id,
//! a payload that resolved to nothing, or an operation kind with no tree
//! effect. Auth frames never reach the dispatcher; the connection layer
//! consumes them.

use crate::models::NodeTypeRegistry;
use crate::protocol::request::{Request, RequestKind};
use crate::tree::{Container, MoveSpec};

/// Apply `request` to `container`, resolving node types through `registry`.
pub fn dispatch(
    container: &mut Container,
    registry: &NodeTypeRegistry,
    request: &Request,
) -> Option<String> {
    match request.kind {
        RequestKind::Get => container.get_by_id(&request.data).map(|node| node.id.clone()),
        RequestKind::Add => add(container, registry, request),
        RequestKind::Update => update(container, registry, request),
        RequestKind::Remove => {
            let id = request.json_str("id").filter(|id| !id.is_empty())?;
            container.remove(&id)
        }
        RequestKind::Move => {
            let payload = request.json.clone()?;
            let mv: MoveSpec = serde_json::from_value(serde_json::Value::Object(payload)).ok()?;
            container.move_node(&mv)
        }
        RequestKind::Link => link(container, request),
        RequestKind::Auth | RequestKind::Unknown => None,
    }
}

fn add(
    container: &mut Container,
    registry: &NodeTypeRegistry,
    request: &Request,
) -> Option<String> {
    // An unknown or absent parent falls back to the tree root.
    let parent_id = request
        .param("parentId")
        .filter(|id| container.get_by_id(id).is_some())
        .unwrap_or_else(|| container.root().id.clone());
    let type_name = request.param("type")?;
    let mut node = registry.create(&type_name)?;
    if let Some(payload) = &request.json {
        node.apply(payload, registry.spec(&type_name), &["id", "type"]);
    }
    container.add_child(&parent_id, node)
}

fn update(
    container: &mut Container,
    registry: &NodeTypeRegistry,
    request: &Request,
) -> Option<String> {
    let payload = request.json.as_ref()?;
    let id = request.json_str("id").filter(|id| !id.is_empty())?;
    let node_type = container.get_by_id(&id)?.node_type.clone();
    container.apply_update(&id, payload, registry.spec(&node_type))
}

fn link(container: &mut Container, request: &Request) -> Option<String> {
    let from = request.query.get("from").cloned()?;
    let to = request.query.get("to").cloned()?;
    if container.get_by_id(&from).is_none() || container.get_by_id(&to).is_none() {
        return None;
    }
    container.add_relation(from.clone(), to);
    Some(from)
}
