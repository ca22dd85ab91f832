use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token balance granted to every new account.
pub const DEFAULT_TOKEN_BALANCE: i64 = 50_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: String,
    pub uid: String,
    pub token: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// A single generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub code: String,
}

impl FileEntry {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Path -> file content. Sorted so that persisted JSON is stable.
pub type FileMap = BTreeMap<String, FileEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    /// Id of the owning user.
    pub user: String,
    pub messages: Vec<Message>,
    pub file_data: Option<FileMap>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Workspace {
    /// A turn is pending when the most recent message came from the user.
    pub fn has_pending_turn(&self) -> bool {
        matches!(self.messages.last(), Some(m) if m.role == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(messages: Vec<Message>) -> Workspace {
        Workspace {
            id: "w1".into(),
            user: "u1".into(),
            messages,
            file_data: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn pending_turn_follows_last_role() {
        assert!(!workspace(vec![]).has_pending_turn());
        assert!(workspace(vec![Message::user("build a todo app")]).has_pending_turn());
        assert!(!workspace(vec![Message::user("hi"), Message::ai("hello")]).has_pending_turn());
    }

    #[test]
    fn message_without_timestamp_deserializes() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(msg.timestamp.is_none());

        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn workspace_uses_camel_case_fields() {
        let value = serde_json::to_value(workspace(vec![])).unwrap();
        assert!(value.get("fileData").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
