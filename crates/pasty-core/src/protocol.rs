//! Wire format: command envelopes in, paste-list snapshots out.
//!
//! Inbound frames are JSON objects `{id, user, action, text}`. Any
//! `network`/`device` fields a client sends are ignored; the server stamps
//! those from connection metadata. Outbound frames are JSON arrays of paste
//! records, newest first.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{Device, Group, PasteId};
use crate::paste::Paste;

/// Closed set of actions a client may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Add,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for Action {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "delete" => Ok(Self::Delete),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// A decoded client command. Group and device are not part of it: the
/// session that received the command supplies them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Add { user: String, text: String },
    Delete { id: PasteId },
}

impl Command {
    pub fn action(&self) -> Action {
        match self {
            Self::Add { .. } => Action::Add,
            Self::Delete { .. } => Action::Delete,
        }
    }

    /// Decode one inbound text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: ClientEnvelope = serde_json::from_str(frame)
            .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
        envelope.into_command()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing action")]
    MissingAction,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("delete without a resolvable id")]
    MissingId,

    #[error("add without text")]
    MissingText,
}

impl ProtocolError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MalformedJson(_) => "malformed_json",
            Self::MissingAction => "missing_action",
            Self::UnknownAction(_) => "unknown_action",
            Self::MissingId => "missing_id",
            Self::MissingText => "missing_text",
        }
    }
}

/// Raw client message as it appears on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ClientEnvelope {
    pub fn into_command(self) -> Result<Command, ProtocolError> {
        let action: Action = self.action.as_deref().ok_or(ProtocolError::MissingAction)?.parse()?;
        match action {
            Action::Add => {
                let text = self.text.ok_or(ProtocolError::MissingText)?;
                Ok(Command::Add {
                    user: self.user.unwrap_or_default(),
                    text,
                })
            }
            Action::Delete => {
                let id = self.id.as_ref().and_then(resolve_id).ok_or(ProtocolError::MissingId)?;
                Ok(Command::Delete { id })
            }
        }
    }
}

/// Accept a JSON integer or a string holding one.
fn resolve_id(raw: &serde_json::Value) -> Option<PasteId> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().map(PasteId),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok().map(PasteId),
        _ => None,
    }
}

/// Whether outbound paste records carry the `network` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkField {
    #[default]
    Include,
    Omit,
}

/// One element of an outbound snapshot.
#[derive(Debug, Serialize)]
pub struct PasteRecord<'a> {
    pub id: PasteId,
    pub created_at: DateTime<Utc>,
    pub user: &'a str,
    pub device: &'a Device,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<&'a Group>,
}

impl<'a> PasteRecord<'a> {
    pub fn from_paste(paste: &'a Paste, network: NetworkField) -> Self {
        Self {
            id: paste.id,
            created_at: paste.created_at,
            user: &paste.user,
            device: &paste.device,
            content: &paste.content,
            network: match network {
                NetworkField::Include => Some(&paste.group),
                NetworkField::Omit => None,
            },
        }
    }
}

/// Encode a snapshot (pastes already ordered newest first) as one text frame.
pub fn encode_snapshot(pastes: &[Paste], network: NetworkField) -> Result<String, serde_json::Error> {
    let records: Vec<PasteRecord<'_>> = pastes
        .iter()
        .map(|p| PasteRecord::from_paste(p, network))
        .collect();
    serde_json::to_string(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn paste(id: i64, content: &str) -> Paste {
        Paste {
            id: PasteId(id),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            group: Group::new("10.0.0.7"),
            user: "alice".into(),
            device: Device::new("Linux-Firefox"),
            content: content.into(),
        }
    }

    #[test]
    fn decode_add() {
        let cmd = Command::decode(r#"{"action":"add","user":"alice","text":"hello"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                user: "alice".into(),
                text: "hello".into()
            }
        );
        assert_eq!(cmd.action(), Action::Add);
    }

    #[test]
    fn decode_add_without_user_defaults_to_empty() {
        let cmd = Command::decode(r#"{"action":"add","text":"hi"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                user: String::new(),
                text: "hi".into()
            }
        );
    }

    #[test]
    fn decode_add_ignores_client_network_and_device() {
        let cmd = Command::decode(
            r#"{"action":"add","user":"u","text":"t","network":"spoofed","device":"spoofed"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                user: "u".into(),
                text: "t".into()
            }
        );
    }

    #[test]
    fn decode_add_without_text_fails() {
        let err = Command::decode(r#"{"action":"add","user":"alice"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingText));
    }

    #[test]
    fn decode_add_with_null_text_fails() {
        let err = Command::decode(r#"{"action":"add","text":null}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingText));
    }

    #[test]
    fn decode_delete_with_integer_id() {
        let cmd = Command::decode(r#"{"action":"delete","id":12}"#).unwrap();
        assert_eq!(cmd, Command::Delete { id: PasteId(12) });
    }

    #[test]
    fn decode_delete_with_numeric_string_id() {
        let cmd = Command::decode(r#"{"action":"delete","id":"12"}"#).unwrap();
        assert_eq!(cmd, Command::Delete { id: PasteId(12) });
    }

    #[test]
    fn decode_delete_without_id_fails() {
        let err = Command::decode(r#"{"action":"delete"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingId));
    }

    #[test]
    fn decode_delete_with_unresolvable_id_fails() {
        for frame in [
            r#"{"action":"delete","id":"abc"}"#,
            r#"{"action":"delete","id":1.5}"#,
            r#"{"action":"delete","id":true}"#,
            r#"{"action":"delete","id":null}"#,
        ] {
            let err = Command::decode(frame).unwrap_err();
            assert!(matches!(err, ProtocolError::MissingId), "frame: {frame}");
        }
    }

    #[test]
    fn decode_unknown_action_fails() {
        let err = Command::decode(r#"{"action":"edit","id":1}"#).unwrap_err();
        match err {
            ProtocolError::UnknownAction(tag) => assert_eq!(tag, "edit"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn action_tags_are_case_sensitive() {
        let err = Command::decode(r#"{"action":"ADD","text":"x"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownAction(_)));
    }

    #[test]
    fn decode_missing_action_fails() {
        let err = Command::decode(r#"{"text":"x"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingAction));
    }

    #[test]
    fn decode_garbage_fails() {
        for frame in ["", "not json", "[1,2,3]", "42"] {
            let err = Command::decode(frame).unwrap_err();
            assert_eq!(err.error_kind(), "malformed_json", "frame: {frame:?}");
        }
    }

    #[test]
    fn action_display_matches_wire_tag() {
        assert_eq!(Action::Add.to_string(), "add");
        assert_eq!(Action::Delete.to_string(), "delete");
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
    }

    #[test]
    fn snapshot_includes_network_when_configured() {
        let json = encode_snapshot(&[paste(3, "hello")], NetworkField::Include).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &parsed[0];
        assert_eq!(first["id"], 3);
        assert_eq!(first["user"], "alice");
        assert_eq!(first["device"], "Linux-Firefox");
        assert_eq!(first["content"], "hello");
        assert_eq!(first["network"], "10.0.0.7");
        assert_eq!(first["created_at"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn snapshot_omits_network_when_configured() {
        let json = encode_snapshot(&[paste(3, "hello")], NetworkField::Omit).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed[0].get("network").is_none());
    }

    #[test]
    fn snapshot_preserves_order() {
        let json =
            encode_snapshot(&[paste(9, "newest"), paste(2, "oldest")], NetworkField::Omit).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["content"], "newest");
        assert_eq!(parsed[1]["content"], "oldest");
    }

    #[test]
    fn empty_snapshot_is_empty_array() {
        assert_eq!(encode_snapshot(&[], NetworkField::Include).unwrap(), "[]");
    }
}
