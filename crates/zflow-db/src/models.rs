//! Database row types. These map directly to SQLite rows; JSON columns are
//! kept as raw text until converted into `zflow-types` records.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

use zflow_types::models::{FileMap, Message, User, Workspace};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: String,
    pub uid: String,
    pub token: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

pub struct WorkspaceRow {
    pub id: String,
    pub user_id: String,
    pub messages: String,
    pub file_data: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: row.updated_at.as_deref().map(parse_timestamp).transpose()?,
            id: row.id,
            name: row.name,
            email: row.email,
            picture: row.picture,
            uid: row.uid,
            token: row.token,
        })
    }
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = anyhow::Error;

    fn try_from(row: WorkspaceRow) -> Result<Self> {
        let messages: Vec<Message> = serde_json::from_str(&row.messages)
            .with_context(|| format!("corrupt messages on workspace {}", row.id))?;
        let file_data: Option<FileMap> = row
            .file_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .with_context(|| format!("corrupt file_data on workspace {}", row.id))?;

        Ok(Workspace {
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: row.updated_at.as_deref().map(parse_timestamp).transpose()?,
            id: row.id,
            user: row.user_id,
            messages,
            file_data,
        })
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC, falling back to RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .with_context(|| format!("invalid timestamp '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let a = parse_timestamp("2025-01-02 03:04:05").unwrap();
        let b = parse_timestamp("2025-01-02T03:04:05Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn corrupt_messages_are_reported() {
        let row = WorkspaceRow {
            id: "w1".into(),
            user_id: "u1".into(),
            messages: "not json".into(),
            file_data: None,
            created_at: "2025-01-02 03:04:05".into(),
            updated_at: None,
        };
        let err = Workspace::try_from(row).unwrap_err();
        assert!(err.to_string().contains("w1"));
    }
}
