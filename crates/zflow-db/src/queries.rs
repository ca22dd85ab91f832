use crate::Database;
use crate::models::{UserRow, WorkspaceRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

use zflow_types::models::{DEFAULT_TOKEN_BALANCE, FileMap, Message, User, Workspace};

const USER_COLUMNS: &str = "id, name, email, picture, uid, token, created_at, updated_at";
const WORKSPACE_COLUMNS: &str = "id, user_id, messages, file_data, created_at, updated_at";

const CHARGE_TOKENS: &str = "UPDATE users
     SET token = MAX(token - ?2, 0), updated_at = datetime('now')
     WHERE id = ?1
     RETURNING token";
const WRITE_TURN: &str = "UPDATE workspaces
     SET messages = ?2, file_data = COALESCE(?3, file_data), updated_at = datetime('now')
     WHERE id = ?1";

impl Database {
    // -- Users --

    /// Insert a user unless one with the same email exists.
    /// Returns the id of the stored user either way.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        picture: &str,
        uid: &str,
    ) -> Result<String> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, picture, uid, token)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![id, name, email, picture, uid, DEFAULT_TOKEN_BALANCE],
            )?;

            if inserted == 0 {
                tracing::debug!("User {} already exists", email);
            }

            let stored_id =
                conn.query_row("SELECT id FROM users WHERE email = ?1", [email], |row| row.get(0))?;
            Ok(stored_id)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Overwrite a user's token balance. Returns false if the user is unknown.
    pub fn update_token(&self, user_id: &str, token: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET token = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![user_id, token],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deduct `amount` tokens, clamping the balance at zero.
    /// Returns the new balance, or `None` if the user is unknown.
    pub fn consume_tokens(&self, user_id: &str, amount: i64) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            conn.query_row(CHARGE_TOKENS, rusqlite::params![user_id, amount], |row| row.get(0))
                .optional()
        })
    }

    // -- Workspaces --

    pub fn create_workspace(&self, id: &str, user_id: &str, messages: &[Message]) -> Result<()> {
        let messages = serde_json::to_string(messages)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO workspaces (id, user_id, messages) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, messages],
            )?;
            Ok(())
        })
    }

    pub fn get_workspace(&self, id: &str) -> Result<Option<Workspace>> {
        let row = self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM workspaces WHERE id = ?1", WORKSPACE_COLUMNS);
            conn.query_row(&sql, [id], workspace_row).optional()
        })?;

        row.map(Workspace::try_from).transpose()
    }

    /// All workspaces owned by `user_id`, newest first.
    pub fn get_workspaces_for_user(&self, user_id: &str) -> Result<Vec<Workspace>> {
        let rows = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM workspaces WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                WORKSPACE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], workspace_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(Workspace::try_from).collect()
    }

    /// Replace the full message list. Returns false if the workspace is unknown.
    pub fn update_messages(&self, id: &str, messages: &[Message]) -> Result<bool> {
        self.update_turn(id, messages, None)
    }

    /// Replace the stored file map. Returns false if the workspace is unknown.
    pub fn update_files(&self, id: &str, files: &FileMap) -> Result<bool> {
        let files = serde_json::to_string(files)?;
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE workspaces SET file_data = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![id, files],
            )?;
            Ok(changed > 0)
        })
    }

    /// Write the messages and, when given, the file map in one statement.
    pub fn update_turn(
        &self,
        id: &str,
        messages: &[Message],
        files: Option<&FileMap>,
    ) -> Result<bool> {
        let messages = serde_json::to_string(messages)?;
        let files = files.map(serde_json::to_string).transpose()?;
        self.with_conn_mut(|conn| {
            let changed = conn.execute(WRITE_TURN, rusqlite::params![id, messages, files])?;
            Ok(changed > 0)
        })
    }

    /// Write a finished turn and charge `tokens` to `user_id` in one transaction.
    /// Returns false, with nothing written or charged, if the workspace is unknown.
    pub fn record_turn(
        &self,
        id: &str,
        user_id: &str,
        messages: &[Message],
        files: Option<&FileMap>,
        tokens: i64,
    ) -> Result<bool> {
        let messages = serde_json::to_string(messages)?;
        let files = files.map(serde_json::to_string).transpose()?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if tx.execute(WRITE_TURN, rusqlite::params![id, messages, files])? == 0 {
                return Ok(false);
            }
            if tokens > 0 {
                let balance: Option<i64> = tx
                    .query_row(CHARGE_TOKENS, rusqlite::params![user_id, tokens], |row| row.get(0))
                    .optional()?;
                tracing::debug!("User {} spent {} tokens, balance {:?}", user_id, tokens, balance);
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Returns false if there was nothing to delete.
    pub fn delete_workspace(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM workspaces WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                picture: row.get(3)?,
                uid: row.get(4)?,
                token: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })
        .optional()?;

    row.map(User::try_from).transpose()
}

fn workspace_row(row: &Row<'_>) -> rusqlite::Result<WorkspaceRow> {
    Ok(WorkspaceRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        messages: row.get(2)?,
        file_data: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use zflow_types::models::{FileEntry, Role};

    fn db_with_user() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4().to_string();
        let stored = db
            .create_user(&id, "Ada", "ada@example.com", "https://pic", "uid-1")
            .unwrap();
        assert_eq!(stored, id);
        (db, id)
    }

    #[test]
    fn create_user_is_idempotent_by_email() {
        let (db, id) = db_with_user();
        let again = db
            .create_user("other-id", "Ada L.", "ada@example.com", "", "uid-2")
            .unwrap();
        assert_eq!(again, id);

        let user = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "Ada");
        assert_eq!(user.token, DEFAULT_TOKEN_BALANCE);
        assert!(user.updated_at.is_none());
    }

    #[test]
    fn unknown_user_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
        assert!(db.get_user_by_id("missing").unwrap().is_none());
        assert!(!db.update_token("missing", 10).unwrap());
        assert!(db.consume_tokens("missing", 10).unwrap().is_none());
    }

    #[test]
    fn token_updates_and_consumption_clamp_at_zero() {
        let (db, id) = db_with_user();
        assert!(db.update_token(&id, 100).unwrap());
        assert_eq!(db.consume_tokens(&id, 40).unwrap(), Some(60));
        assert_eq!(db.consume_tokens(&id, 500).unwrap(), Some(0));

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.token, 0);
        assert!(user.updated_at.is_some());
    }

    #[test]
    fn workspace_lifecycle() {
        let (db, user_id) = db_with_user();
        let ws_id = Uuid::new_v4().to_string();
        db.create_workspace(&ws_id, &user_id, &[Message::user("build a todo app")])
            .unwrap();

        let ws = db.get_workspace(&ws_id).unwrap().unwrap();
        assert_eq!(ws.user, user_id);
        assert_eq!(ws.messages.len(), 1);
        assert!(ws.file_data.is_none());

        let messages = vec![Message::user("build a todo app"), Message::ai("Sure!")];
        assert!(db.update_messages(&ws_id, &messages).unwrap());

        let mut files = FileMap::new();
        files.insert("/App.js".into(), FileEntry::new("export default 1;"));
        assert!(db.update_files(&ws_id, &files).unwrap());

        let ws = db.get_workspace(&ws_id).unwrap().unwrap();
        assert_eq!(ws.messages[1].role, Role::Ai);
        assert_eq!(ws.file_data.as_ref(), Some(&files));

        assert!(db.delete_workspace(&ws_id).unwrap());
        assert!(db.get_workspace(&ws_id).unwrap().is_none());
        assert!(!db.delete_workspace(&ws_id).unwrap());
    }

    #[test]
    fn update_turn_keeps_files_when_none_given() {
        let (db, user_id) = db_with_user();
        db.create_workspace("w1", &user_id, &[]).unwrap();

        let mut files = FileMap::new();
        files.insert("/App.js".into(), FileEntry::new("a"));
        assert!(db.update_turn("w1", &[Message::user("x")], Some(&files)).unwrap());
        assert!(db.update_turn("w1", &[Message::user("x"), Message::ai("y")], None).unwrap());

        let ws = db.get_workspace("w1").unwrap().unwrap();
        assert_eq!(ws.messages.len(), 2);
        assert_eq!(ws.file_data, Some(files));
    }

    #[test]
    fn record_turn_writes_and_charges_together() {
        let (db, user_id) = db_with_user();
        db.create_workspace("w1", &user_id, &[Message::user("x")]).unwrap();

        let mut files = FileMap::new();
        files.insert("/App.js".into(), FileEntry::new("a"));
        let messages = [Message::user("x"), Message::ai("y")];
        assert!(db.record_turn("w1", &user_id, &messages, Some(&files), 25).unwrap());

        let ws = db.get_workspace("w1").unwrap().unwrap();
        assert_eq!(ws.messages.len(), 2);
        assert_eq!(ws.file_data, Some(files));
        let user = db.get_user_by_id(&user_id).unwrap().unwrap();
        assert_eq!(user.token, DEFAULT_TOKEN_BALANCE - 25);
    }

    #[test]
    fn record_turn_on_missing_workspace_charges_nothing() {
        let (db, user_id) = db_with_user();
        assert!(!db.record_turn("gone", &user_id, &[Message::user("x")], None, 25).unwrap());

        let user = db.get_user_by_id(&user_id).unwrap().unwrap();
        assert_eq!(user.token, DEFAULT_TOKEN_BALANCE);
        assert!(user.updated_at.is_none());
    }

    #[test]
    fn missing_workspace_is_none_not_error() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_workspace("does-not-exist").unwrap().is_none());
        assert!(!db.update_messages("does-not-exist", &[]).unwrap());
        assert!(!db.update_files("does-not-exist", &FileMap::new()).unwrap());
    }

    #[test]
    fn workspaces_listed_newest_first_per_user() {
        let (db, user_id) = db_with_user();
        let other = db.create_user("u2", "Bob", "bob@example.com", "", "uid-3").unwrap();

        db.create_workspace("first", &user_id, &[]).unwrap();
        db.create_workspace("second", &user_id, &[]).unwrap();
        db.create_workspace("theirs", &other, &[]).unwrap();

        let ids: Vec<String> = db
            .get_workspaces_for_user(&user_id)
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["second".to_string(), "first".to_string()]);
    }

    #[test]
    fn workspace_requires_existing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_workspace("w1", "ghost", &[]).is_err());
    }
}
