//! Request Parser
//!
//! Decodes a client frame into a typed [`Request`]. A frame is either an
//! auth token in the form `##token##`, or an operation character followed by
//! data:
//!
//! ```text
//! ?root                         get the node with id "root"
//! +{"type":"page","name":"A"}   add a page under the root
//! ={"id":"a","name":"B"}        update node "a"
//! -{"id":"a"}                   remove node "a"
//! !from=a&to=b:{}               link nodes "a" and "b"
//! >{"id":"a","oldParentId":..}  move node "a"
//! ```
//!
//! Data may carry a query string before the payload (`key=value` pairs
//! joined by `&`, terminated by a `:` that precedes the first `{`); a bare
//! key defaults to `"1"`. A payload containing `{` is parsed as JSON; a
//! payload that fails to parse is carried through as raw text with no
//! structured access, never a parse error.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::protocol::error::ProtocolError;

/// The operation a frame selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    Add,
    Update,
    Remove,
    Move,
    Link,
    Auth,
    Unknown,
}

fn kind_for(op: char) -> RequestKind {
    match op {
        '?' => RequestKind::Get,
        '+' => RequestKind::Add,
        '=' => RequestKind::Update,
        '-' => RequestKind::Remove,
        '>' => RequestKind::Move,
        '!' => RequestKind::Link,
        _ => RequestKind::Unknown,
    }
}

/// One decoded inbound frame, consumed once by the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    pub kind: RequestKind,
    /// Raw payload: a node id, a token, or JSON text.
    pub data: String,
    /// Structured payload, when `data` parsed as a JSON object.
    pub json: Option<Map<String, Value>>,
    /// Query key/value pairs preceding the payload.
    pub query: BTreeMap<String, String>,
}

impl Request {
    /// Parse a raw text frame.
    pub fn parse(frame: &str) -> Result<Request, ProtocolError> {
        if frame.chars().nth(1).is_none() {
            return Err(ProtocolError::malformed(frame));
        }

        if let Some(rest) = frame.strip_prefix("##") {
            let token = rest.strip_suffix("##").unwrap_or(rest);
            return Ok(Request {
                kind: RequestKind::Auth,
                data: token.to_string(),
                json: None,
                query: BTreeMap::new(),
            });
        }

        let op = frame.chars().next().expect("frame has at least two chars");
        let data = &frame[op.len_utf8()..];

        let (query, payload) = match (data.find(':'), data.find('{')) {
            (Some(colon), Some(brace)) if brace > colon && colon > 0 => {
                (parse_query(&data[..colon]), &data[colon + 1..])
            }
            _ => (BTreeMap::new(), data),
        };

        let json = if payload.contains('{') {
            match serde_json::from_str::<Value>(payload) {
                Ok(Value::Object(map)) => Some(map),
                // Corrupted payload: keep the raw text, drop the structure.
                _ => None,
            }
        } else {
            None
        };

        Ok(Request {
            kind: kind_for(op),
            data: payload.to_string(),
            json,
            query,
        })
    }

    /// JSON payload property rendered as a string, when present.
    pub fn json_str(&self, key: &str) -> Option<String> {
        match self.json.as_ref()?.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// A parameter resolved from the query string first, then the JSON
    /// payload. Empty values count as absent.
    pub fn param(&self, key: &str) -> Option<String> {
        self.query
            .get(key)
            .cloned()
            .or_else(|| self.json_str(key))
            .filter(|v| !v.is_empty())
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (part.to_string(), "1".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_char_of_request_is_request_kind() {
        let cases = [
            ("+", RequestKind::Add),
            ("?", RequestKind::Get),
            ("-", RequestKind::Remove),
            ("!", RequestKind::Link),
            ("=", RequestKind::Update),
            (">", RequestKind::Move),
            ("_", RequestKind::Unknown),
            ("##", RequestKind::Auth),
        ];
        for (prefix, kind) in cases {
            let request = Request::parse(&format!("{prefix}foo")).unwrap();
            assert_eq!(request.kind, kind, "prefix {prefix:?}");
        }
    }

    #[test]
    fn get_requests_parse_the_node_id() {
        let request = Request::parse("?root").unwrap();
        assert_eq!(request.kind, RequestKind::Get);
        assert_eq!(request.data, "root");
    }

    #[test]
    fn auth_requests_carry_the_token() {
        let request = Request::parse("##any-token##").unwrap();
        assert_eq!(request.kind, RequestKind::Auth);
        assert_eq!(request.data, "any-token");
    }

    #[test]
    fn add_requests_can_carry_json() {
        let request = Request::parse(r#"+{"foo":"bar"}"#).unwrap();
        assert_eq!(request.data, r#"{"foo":"bar"}"#);
        let json = request.json.unwrap();
        assert_eq!(json.get("foo").and_then(Value::as_str), Some("bar"));
    }

    #[test]
    fn any_request_can_have_a_query_before_the_payload() {
        // The query form requires an object at the end.
        let request = Request::parse("+from=me&neigh&to=you:{en_hest}").unwrap();
        assert_eq!(request.query.get("from").map(String::as_str), Some("me"));
        assert_eq!(request.query.get("to").map(String::as_str), Some("you"));
        assert_eq!(request.query.get("neigh").map(String::as_str), Some("1"));
        assert_eq!(request.data, "{en_hest}");
    }

    #[test]
    fn corrupted_json_keeps_the_raw_text_only() {
        let request = Request::parse("+{en_hest}").unwrap();
        assert_eq!(request.data, "{en_hest}");
        assert!(request.json.is_none());
    }

    #[test]
    fn a_colon_without_a_following_object_is_not_a_query() {
        let request = Request::parse("?some:id").unwrap();
        assert!(request.query.is_empty());
        assert_eq!(request.data, "some:id");
    }

    #[test]
    fn one_character_frames_are_malformed() {
        let err = Request::parse("+").unwrap_err();
        assert_eq!(err, ProtocolError::malformed("+"));
        assert!(Request::parse("").is_err());
    }

    #[test]
    fn params_resolve_query_first_then_json() {
        let request = Request::parse(r#"+type=page:{"type":"text","parentId":"root"}"#).unwrap();
        assert_eq!(request.param("type").as_deref(), Some("page"));
        assert_eq!(request.param("parentId").as_deref(), Some("root"));
        assert_eq!(request.param("missing"), None);
    }
}
