//! TCMP wire codec
//!
//! Frames are JSON objects discriminated by a `type` field:
//! `{"type": "hello"|"welcome"|"heartbeat"|"bye"|"msg"|"bad", ...}`.
//! Unknown tags decode to [`ProtocolMessage::Unrecognized`]; whether that is
//! an error is a handling decision, not a codec one.

use crate::traits::{Result, TcmpError};
use serde_json::{json, Value};

/// A message received from or sent to the TCMP peer
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    /// Session-establishing request carrying the connection identity, the
    /// requested heartbeat cadence, and the access token
    Hello {
        id: String,
        timeout_ms: u64,
        token: Option<String>,
    },
    /// Handshake acknowledgment; may carry session attributes the higher
    /// layer needs and a negotiated heartbeat cadence
    Welcome {
        session_attributes: Option<Value>,
        negotiated_timeout_ms: Option<u64>,
    },
    /// Periodic liveness frame; never surfaced to the application
    Heartbeat,
    /// Peer signals intent to close; informational only
    Bye,
    /// Application message
    Msg { body: Value },
    /// Protocol-level rejection or complaint
    Bad { reason: String },
    /// A frame with a well-formed but unknown `type`
    Unrecognized { kind: String },
}

impl ProtocolMessage {
    /// Decode a raw frame.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| TcmpError::Parse(e.to_string()))?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TcmpError::Parse("frame has no \"type\" field".to_string()))?;

        Ok(match kind {
            "hello" => ProtocolMessage::Hello {
                id: value
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                timeout_ms: value.get("timeout").and_then(Value::as_u64).unwrap_or(0),
                token: value
                    .get("token")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "welcome" => ProtocolMessage::Welcome {
                session_attributes: value.get("session").cloned(),
                negotiated_timeout_ms: value.get("timeout").and_then(Value::as_u64),
            },
            "heartbeat" => ProtocolMessage::Heartbeat,
            "bye" => ProtocolMessage::Bye,
            "msg" => ProtocolMessage::Msg {
                body: value
                    .get("body")
                    .cloned()
                    .ok_or_else(|| TcmpError::Parse("msg frame has no body".to_string()))?,
            },
            "bad" => ProtocolMessage::Bad {
                reason: value
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            other => ProtocolMessage::Unrecognized {
                kind: other.to_string(),
            },
        })
    }

    /// Encode into the wire shape.
    pub fn encode(&self) -> String {
        match self {
            ProtocolMessage::Hello {
                id,
                timeout_ms,
                token,
            } => {
                let mut frame = json!({ "type": "hello", "id": id, "timeout": timeout_ms });
                if let Some(token) = token {
                    frame["token"] = Value::String(token.clone());
                }
                frame.to_string()
            }
            ProtocolMessage::Welcome {
                session_attributes,
                negotiated_timeout_ms,
            } => {
                let mut frame = json!({ "type": "welcome" });
                if let Some(session) = session_attributes {
                    frame["session"] = session.clone();
                }
                if let Some(timeout) = negotiated_timeout_ms {
                    frame["timeout"] = json!(timeout);
                }
                frame.to_string()
            }
            ProtocolMessage::Heartbeat => json!({ "type": "heartbeat" }).to_string(),
            ProtocolMessage::Bye => json!({ "type": "bye" }).to_string(),
            ProtocolMessage::Msg { body } => json!({ "type": "msg", "body": body }).to_string(),
            ProtocolMessage::Bad { reason } => {
                json!({ "type": "bad", "reason": reason }).to_string()
            }
            ProtocolMessage::Unrecognized { kind } => json!({ "type": kind }).to_string(),
        }
    }
}
