//! # Wire Protocol
//!
//! JSON message schema of the Strand WebSocket protocol.
//!
//! Requests are `{id, type, payload}`; replies are
//! `{id, event, status, payload}`. Event pushes reuse the reply envelope with
//! `event: true` and the subscription id as `id`.
//!
//! Decoding happens in two steps. The envelope and the request kind are
//! decoded up front into [`Request`]; batch items are kept as raw JSON and
//! decoded one by one by the dispatcher, so one bad item only fails itself.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strand_core::{
    Addr, ElementEvent, ElementType, LinkContent, ParamValue, Slot, StrandError, TemplateParams,
    TemplateSource, Triple,
};

// =============================================================================
// ENVELOPES
// =============================================================================

/// Incoming request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Outgoing reply or event push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub event: bool,
    pub status: bool,
    pub payload: Value,
}

impl Reply {
    #[must_use]
    pub fn ok(id: i64, payload: Value) -> Self {
        Self {
            id,
            event: false,
            status: true,
            payload,
        }
    }

    #[must_use]
    pub fn error(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            event: false,
            status: false,
            payload: Value::String(message.into()),
        }
    }

    /// Push message for a fired subscription.
    #[must_use]
    pub fn event(event: &ElementEvent) -> Self {
        Self {
            id: event.id.0 as i64,
            event: true,
            status: true,
            payload: json!([event.subject.0, event.edge.0, event.other.0]),
        }
    }
}

/// Best-effort recovery of the request id from an undecodable message.
#[must_use]
pub fn recover_id(text: &str) -> i64 {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("id").and_then(Value::as_i64))
        .unwrap_or(0)
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Keynodes(Vec<Value>),
    CreateElements(Vec<Value>),
    CheckElements(Vec<Value>),
    DeleteElements(Vec<Value>),
    SearchTemplate(TemplateRequest),
    GenerateTemplate(TemplateRequest),
    Content(Vec<Value>),
    Events(EventsRequest),
    /// A request type this server does not implement.
    Unknown(String),
}

impl Request {
    /// Decode the payload of a request of type `kind`.
    pub fn decode(kind: &str, payload: Value) -> Result<Self, StrandError> {
        Ok(match kind {
            "keynodes" => Self::Keynodes(list(kind, payload)?),
            "create_elements" => Self::CreateElements(list(kind, payload)?),
            "check_elements" => Self::CheckElements(list(kind, payload)?),
            "delete_elements" => Self::DeleteElements(list(kind, payload)?),
            "search_template" => Self::SearchTemplate(TemplateRequest::decode(&payload)?),
            "generate_template" => Self::GenerateTemplate(TemplateRequest::decode(&payload)?),
            "content" => Self::Content(list(kind, payload)?),
            "events" => Self::Events(
                serde_json::from_value(payload)
                    .map_err(|e| malformed(kind, &e.to_string()))?,
            ),
            other => Self::Unknown(other.to_string()),
        })
    }

    /// Wire name of the request type.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Keynodes(_) => "keynodes",
            Self::CreateElements(_) => "create_elements",
            Self::CheckElements(_) => "check_elements",
            Self::DeleteElements(_) => "delete_elements",
            Self::SearchTemplate(_) => "search_template",
            Self::GenerateTemplate(_) => "generate_template",
            Self::Content(_) => "content",
            Self::Events(_) => "events",
            Self::Unknown(kind) => kind,
        }
    }
}

fn list(kind: &str, payload: Value) -> Result<Vec<Value>, StrandError> {
    match payload {
        Value::Array(items) => Ok(items),
        _ => Err(malformed(kind, "payload must be a list")),
    }
}

fn malformed(kind: &str, detail: &str) -> StrandError {
    StrandError::SerializationError(format!("malformed {} request: {}", kind, detail))
}

// =============================================================================
// BATCH ITEMS
// =============================================================================

/// One `keynodes` command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum KeynodeCommand {
    Find {
        idtf: String,
    },
    Resolve {
        idtf: String,
        #[serde(rename = "elType", default = "default_keynode_type")]
        el_type: u16,
    },
}

fn default_keynode_type() -> u16 {
    ElementType::NODE_CONST.code()
}

/// One `create_elements` item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "el", rename_all = "lowercase")]
pub enum CreateItem {
    Node {
        #[serde(rename = "type")]
        ty: u16,
    },
    Link {
        #[serde(rename = "type", default)]
        ty: u16,
        content: Value,
    },
    Edge {
        #[serde(rename = "type")]
        ty: u16,
        src: EdgeEnd,
        trg: EdgeEnd,
    },
}

/// Edge endpoint: a raw address or an index into the batch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum EdgeEnd {
    Addr(u64),
    Ref(usize),
}

/// One `content` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ContentCommand {
    Set {
        addr: u64,
        #[serde(rename = "type", default)]
        kind: Option<String>,
        data: Value,
    },
    Get {
        addr: u64,
    },
    Find {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        data: Value,
    },
}

/// Payload of an `events` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventsRequest {
    #[serde(default)]
    pub create: Vec<EventSpec>,
    #[serde(default)]
    pub delete: Vec<u64>,
}

/// One subscription to create.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub addr: u64,
}

// =============================================================================
// LINK CONTENT
// =============================================================================

/// Convert JSON data to link content.
///
/// `kind` coerces the value (`int`, `float`, `string`); any other or missing
/// kind keeps the value's natural JSON type. Returns `None` for values that
/// cannot be link content.
#[must_use]
pub fn content_from_json(kind: Option<&str>, data: &Value) -> Option<LinkContent> {
    match (kind, data) {
        (Some("int"), Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(LinkContent::Int),
        (Some("int"), Value::String(s)) => s.trim().parse().ok().map(LinkContent::Int),
        (Some("float"), Value::Number(n)) => n.as_f64().map(LinkContent::Float),
        (Some("float"), Value::String(s)) => s.trim().parse().ok().map(LinkContent::Float),
        (Some("string"), Value::String(s)) => Some(LinkContent::String(s.clone())),
        (Some("string"), Value::Number(n)) => Some(LinkContent::String(n.to_string())),
        (Some("int" | "float" | "string"), _) => None,
        (_, Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(LinkContent::Int(i)),
            None => n.as_f64().map(LinkContent::Float),
        },
        (_, Value::String(s)) => Some(LinkContent::String(s.clone())),
        _ => None,
    }
}

/// Render link content as `{value, type}`.
#[must_use]
pub fn content_to_json(content: Option<&LinkContent>) -> Value {
    match content {
        Some(LinkContent::Int(i)) => json!({"value": i, "type": "int"}),
        Some(LinkContent::Float(f)) => json!({"value": f, "type": "float"}),
        Some(LinkContent::String(s)) => json!({"value": s, "type": "string"}),
        None => json!({"value": null, "type": null}),
    }
}

// =============================================================================
// TEMPLATE REQUESTS
// =============================================================================

/// Decoded payload of `search_template` and `generate_template`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest {
    pub source: TemplateSource,
    pub params: TemplateParams,
}

impl TemplateRequest {
    /// Decode any of the accepted payload forms:
    /// a triple list, a text template, `{type: "addr"|"idtf", value}`, or
    /// `{templ: <one of those>, params: {alias: value}}`.
    pub fn decode(payload: &Value) -> Result<Self, StrandError> {
        if let Some(templ) = payload.get("templ") {
            let params = match payload.get("params") {
                Some(Value::Null) | None => TemplateParams::new(),
                Some(params) => decode_params(params)?,
            };
            return Ok(Self {
                source: decode_source(templ)?,
                params,
            });
        }
        Ok(Self {
            source: decode_source(payload)?,
            params: TemplateParams::new(),
        })
    }
}

fn decode_source(value: &Value) -> Result<TemplateSource, StrandError> {
    match value {
        Value::Array(triples) => triples
            .iter()
            .map(decode_triple)
            .collect::<Result<Vec<_>, _>>()
            .map(TemplateSource::Triples),
        Value::String(text) => Ok(TemplateSource::Text(text.clone())),
        Value::Object(obj) => {
            let kind = obj.get("type").and_then(Value::as_str);
            let value = obj.get("value");
            match (kind, value) {
                (Some("addr"), Some(v)) => v
                    .as_u64()
                    .map(|a| TemplateSource::StructAddr(Addr(a)))
                    .ok_or_else(|| invalid_source("struct address must be an integer")),
                (Some("idtf"), Some(Value::String(idtf))) => {
                    Ok(TemplateSource::StructIdtf(idtf.clone()))
                }
                _ => Err(invalid_source("expected {type: \"addr\"|\"idtf\", value}")),
            }
        }
        _ => Err(invalid_source("unsupported template payload")),
    }
}

fn decode_triple(value: &Value) -> Result<Triple, StrandError> {
    let items = value
        .as_array()
        .filter(|items| items.len() >= 3)
        .ok_or_else(|| {
            StrandError::MalformedTemplate("each triple must list 3 slots".to_string())
        })?;
    // A fourth item carries search options, which are not interpreted.
    Ok(Triple::new(
        decode_slot(&items[0])?,
        decode_slot(&items[1])?,
        decode_slot(&items[2])?,
    ))
}

fn decode_slot(value: &Value) -> Result<Slot, StrandError> {
    let kind = value.get("type").and_then(Value::as_str);
    let raw = value.get("value");
    let alias = value
        .get("alias")
        .and_then(Value::as_str)
        .map(str::to_string);

    match (kind, raw) {
        (Some("addr"), Some(v)) => v
            .as_u64()
            .map(|a| Slot::Fixed {
                addr: Addr(a),
                alias,
            })
            .ok_or_else(|| slot_error("addr value must be an integer")),
        (Some("type"), Some(v)) => v
            .as_u64()
            .and_then(|t| u16::try_from(t).ok())
            .map(|t| Slot::Typed {
                ty: ElementType::new(t),
                alias,
            })
            .ok_or_else(|| slot_error("type value must be a type code")),
        (Some("alias"), Some(Value::String(name))) => Ok(Slot::AliasRef(name.clone())),
        _ => Err(slot_error("slot must be {type: \"addr\"|\"type\"|\"alias\", value}")),
    }
}

fn decode_params(value: &Value) -> Result<TemplateParams, StrandError> {
    let Value::Object(entries) = value else {
        return Err(StrandError::InvalidBinding(
            "params must be an object".to_string(),
        ));
    };
    let mut params = TemplateParams::new();
    for (alias, raw) in entries {
        let param = match raw {
            Value::String(idtf) => ParamValue::Idtf(idtf.clone()),
            Value::Number(n) => n.as_u64().map(|a| ParamValue::Addr(Addr(a))).ok_or_else(|| {
                StrandError::InvalidBinding(format!("alias '{}' has an invalid address", alias))
            })?,
            Value::Object(obj) => {
                let kind = obj.get("type").and_then(Value::as_str);
                let data = obj.get("data").unwrap_or(&Value::Null);
                content_from_json(kind, data)
                    .map(ParamValue::Content)
                    .ok_or_else(|| {
                        StrandError::InvalidBinding(format!(
                            "alias '{}' has unsupported content",
                            alias
                        ))
                    })?
            }
            _ => {
                return Err(StrandError::InvalidBinding(format!(
                    "alias '{}' has an unsupported value",
                    alias
                )));
            }
        };
        params.insert(alias.clone(), param);
    }
    Ok(params)
}

fn invalid_source(detail: &str) -> StrandError {
    StrandError::InvalidTemplateSource(detail.to_string())
}

fn slot_error(detail: &str) -> StrandError {
    StrandError::MalformedTemplate(detail.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
