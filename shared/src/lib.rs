//! Wire protocol shared by the relay server and its clients.
//!
//! Every frame is a JSON text payload carrying a `type` discriminator.
//! Receivers must tolerate unknown `type` values, so decoding returns
//! `Ok(None)` for a well-formed frame whose type this side does not know.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Server-originated notice (welcome, join, leave).
    #[serde(rename = "system")]
    System {
        message: String,
        #[serde(serialize_with = "iso_millis")]
        timestamp: DateTime<Utc>,
    },
    /// A user-authored message, echoed to every connection including the author.
    #[serde(rename = "chat")]
    Chat {
        sender: String,
        message: String,
        #[serde(serialize_with = "iso_millis")]
        timestamp: DateTime<Utc>,
    },
    /// Number of live sessions at the moment of the broadcast.
    #[serde(rename = "userCount")]
    UserCount { count: usize },
    /// Ephemeral typing signal, never stored.
    #[serde(rename = "typing")]
    Typing {
        sender: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

impl ServerEvent {
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn chat(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Chat {
            sender: sender.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user_count(count: usize) -> Self {
        Self::UserCount { count }
    }

    pub fn typing(sender: impl Into<String>, is_typing: bool) -> Self {
        Self::Typing {
            sender: sender.into(),
            is_typing,
        }
    }

    /// Wire name of this event's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::Chat { .. } => "chat",
            Self::UserCount { .. } => "userCount",
            Self::Typing { .. } => "typing",
        }
    }
}

/// Events sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "chat")]
    Chat { message: String },
    #[serde(rename = "typing")]
    Typing {
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

impl ClientEvent {
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }

    pub fn typing(is_typing: bool) -> Self {
        Self::Typing { is_typing }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Typing { .. } => "typing",
        }
    }
}

/// Errors produced while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("malformed `{kind}` frame: {source}")]
    Shape {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A tagged event family with a closed set of known `type` values.
pub trait Frame: Serialize + DeserializeOwned {
    const KNOWN_TYPES: &'static [&'static str];

    /// Serialize to the JSON text sent on the wire.
    fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// Parse a text frame. Unknown `type` values yield `Ok(None)`.
    fn decode(text: &str) -> Result<Option<Self>, FrameError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(FrameError::Json)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(FrameError::MissingType)?;

        if !Self::KNOWN_TYPES.contains(&kind) {
            return Ok(None);
        }

        let kind = kind.to_string();
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| FrameError::Shape { kind, source })
    }
}

impl Frame for ServerEvent {
    const KNOWN_TYPES: &'static [&'static str] = &["system", "chat", "userCount", "typing"];
}

impl Frame for ClientEvent {
    const KNOWN_TYPES: &'static [&'static str] = &["chat", "typing"];
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T12:00:00.000Z`.
fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn to_value(event: &ServerEvent) -> Value {
        serde_json::from_str(&event.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_system_event_wire_shape() {
        let event = ServerEvent::System {
            message: "Welcome! You are Client 1".to_string(),
            timestamp: fixed_time(),
        };
        assert_eq!(
            to_value(&event),
            json!({
                "type": "system",
                "message": "Welcome! You are Client 1",
                "timestamp": "2024-01-01T12:00:00.000Z",
            })
        );
    }

    #[test]
    fn test_chat_event_wire_shape() {
        let event = ServerEvent::Chat {
            sender: "Client 2".to_string(),
            message: "hi".to_string(),
            timestamp: fixed_time(),
        };
        assert_eq!(
            to_value(&event),
            json!({
                "type": "chat",
                "sender": "Client 2",
                "message": "hi",
                "timestamp": "2024-01-01T12:00:00.000Z",
            })
        );
    }

    #[test]
    fn test_user_count_and_typing_wire_shape() {
        assert_eq!(
            to_value(&ServerEvent::user_count(3)),
            json!({ "type": "userCount", "count": 3 })
        );
        assert_eq!(
            to_value(&ServerEvent::typing("Client 4", true)),
            json!({ "type": "typing", "sender": "Client 4", "isTyping": true })
        );
    }

    #[test]
    fn test_server_event_decodes_timestamp_from_browser_format() {
        let decoded = ServerEvent::decode(
            r#"{"type":"chat","sender":"Client 1","message":"yo","timestamp":"2024-01-01T12:00:00.000Z"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            decoded,
            ServerEvent::Chat {
                sender: "Client 1".to_string(),
                message: "yo".to_string(),
                timestamp: fixed_time(),
            }
        );
    }

    #[test]
    fn test_client_event_decodes_known_types() {
        assert_eq!(
            ClientEvent::decode(r#"{"type":"chat","message":"hello"}"#).unwrap(),
            Some(ClientEvent::Chat {
                message: "hello".to_string()
            })
        );
        assert_eq!(
            ClientEvent::decode(r#"{"type":"typing","isTyping":false}"#).unwrap(),
            Some(ClientEvent::Typing { is_typing: false })
        );
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let decoded =
            ClientEvent::decode(r#"{"type":"chat","message":"hello","color":"red"}"#).unwrap();
        assert_eq!(
            decoded,
            Some(ClientEvent::Chat {
                message: "hello".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        assert_eq!(ClientEvent::decode(r#"{"type":"reaction","emoji":"+1"}"#).unwrap(), None);
        assert_eq!(ServerEvent::decode(r#"{"type":"kick"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        assert!(matches!(
            ClientEvent::decode("not json"),
            Err(FrameError::Json(_))
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"message":"no type"}"#),
            Err(FrameError::MissingType)
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"type":7}"#),
            Err(FrameError::MissingType)
        ));
        match ClientEvent::decode(r#"{"type":"typing","isTyping":"yes"}"#) {
            Err(FrameError::Shape { kind, .. }) => assert_eq!(kind, "typing"),
            other => panic!("Expected shape error, got: {:?}", other),
        }
        assert!(matches!(
            ClientEvent::decode(r#"{"type":"chat"}"#),
            Err(FrameError::Shape { .. })
        ));
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        for event in [
            ServerEvent::system("x"),
            ServerEvent::chat("a", "b"),
            ServerEvent::user_count(0),
            ServerEvent::typing("a", false),
        ] {
            assert_eq!(to_value(&event)["type"], event.kind());
        }
    }
}
