use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use steward_core::types::{ChatId, UserId};

use crate::error::Result;
use crate::types::{clamp_progress, ConversationEntry, Role, Task, TaskStatus, UserFact};

/// Conversations, user facts, and tasks. Per spec.md §4.2: write errors here
/// are logged and swallowed by the caller (best-effort audit trail), unlike
/// the state DB whose errors propagate.
pub struct MemoryStore {
    conn: Mutex<Connection>,
}

impl MemoryStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn append_conversation(&self, chat_id: &ChatId, role: Role, text: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations (chat_id, role, text, ts) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id.as_str(), role.to_string(), text, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent `limit` entries for `chat_id`, oldest first (ring retained
    /// unbounded; only the tail is surfaced per spec.md §3).
    pub fn recent_conversation(&self, chat_id: &ChatId, limit: u32) -> Result<Vec<ConversationEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, role, text, ts FROM conversations
             WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let mut rows: Vec<ConversationEntry> = stmt
            .query_map(params![chat_id.as_str(), limit], |row| {
                let role: String = row.get(2)?;
                let ts: String = row.get(4)?;
                Ok(ConversationEntry {
                    id: row.get(0)?,
                    chat_id: ChatId::from(row.get::<_, String>(1)?),
                    role: role.parse().unwrap_or(Role::User),
                    text: row.get(3)?,
                    ts: ts.parse().unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        rows.reverse();
        Ok(rows)
    }

    /// Upsert by exact `(userId, key)` — replaces the value if present.
    pub fn upsert_fact(&self, fact: &UserFact) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_facts (user_id, key, value, source, ts) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, source = excluded.source, ts = excluded.ts",
            params![
                fact.user_id.as_str(),
                fact.key,
                fact.value,
                fact.source,
                fact.ts.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn facts_for_user(&self, user_id: &UserId, limit: u32) -> Result<Vec<UserFact>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, key, value, source, ts FROM user_facts
             WHERE user_id = ?1 ORDER BY ts DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id.as_str(), limit], |row| {
                let ts: String = row.get(4)?;
                Ok(UserFact {
                    user_id: UserId::from(row.get::<_, String>(0)?),
                    key: row.get(1)?,
                    value: row.get(2)?,
                    source: row.get(3)?,
                    ts: ts.parse().unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    pub fn upsert_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let target_value = task.target_value.map(clamp_progress);
        let current_value = task.current_value.map(clamp_progress);
        conn.execute(
            "INSERT INTO tasks (id, user_id, description, status, target_value, current_value, unit, deadline, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                description = excluded.description,
                status = excluded.status,
                target_value = excluded.target_value,
                current_value = excluded.current_value,
                unit = excluded.unit,
                deadline = excluded.deadline,
                completed_at = excluded.completed_at",
            params![
                task.id,
                task.user_id.as_str(),
                task.description,
                task.status.to_string(),
                target_value,
                current_value,
                task.unit,
                task.deadline.map(|d| d.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.completed_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn active_tasks_for_user(&self, user_id: &UserId) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, description, status, target_value, current_value, unit, deadline, created_at, completed_at
             FROM tasks WHERE user_id = ?1 AND status = 'active' ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id.as_str()], row_to_task)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, description, status, target_value, current_value, unit, deadline, created_at, completed_at
             FROM tasks WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id], row_to_task).optional()?)
    }
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let created_at: String = row.get(8)?;
    let deadline: Option<String> = row.get(7)?;
    let completed_at: Option<String> = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: UserId::from(row.get::<_, String>(1)?),
        description: row.get(2)?,
        status: status.parse().unwrap_or(TaskStatus::Active),
        target_value: row.get(4)?,
        current_value: row.get(5)?,
        unit: row.get(6)?,
        deadline: deadline.and_then(|d| d.parse().ok()),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        completed_at: completed_at.and_then(|d| d.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    fn sample_task(id: &str, current_value: Option<f64>, target_value: Option<f64>) -> Task {
        Task {
            id: id.to_string(),
            user_id: UserId::from("u1"),
            description: "lose weight".to_string(),
            status: TaskStatus::Active,
            target_value,
            current_value,
            unit: Some("lbs".to_string()),
            deadline: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn upsert_task_clamps_negative_progress_to_zero() {
        let store = MemoryStore::in_memory().unwrap();
        store.upsert_task(&sample_task("t1", Some(-5.0), Some(-1.0))).unwrap();

        let task = store.get_task("t1").unwrap().unwrap();
        assert_eq!(task.current_value, Some(0.0));
        assert_eq!(task.target_value, Some(0.0));
    }

    #[test]
    fn upsert_task_leaves_non_negative_progress_untouched() {
        let store = MemoryStore::in_memory().unwrap();
        store.upsert_task(&sample_task("t2", Some(12.0), Some(20.0))).unwrap();

        let task = store.get_task("t2").unwrap().unwrap();
        assert_eq!(task.current_value, Some(12.0));
        assert_eq!(task.target_value, Some(20.0));
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id     TEXT NOT NULL,
            role        TEXT NOT NULL,
            text        TEXT NOT NULL,
            ts          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_chat ON conversations(chat_id, id DESC);

        CREATE TABLE IF NOT EXISTS user_facts (
            user_id     TEXT NOT NULL,
            key         TEXT NOT NULL,
            value       TEXT NOT NULL,
            source      TEXT NOT NULL,
            ts          TEXT NOT NULL,
            PRIMARY KEY (user_id, key)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL,
            description    TEXT NOT NULL,
            status         TEXT NOT NULL,
            target_value   REAL,
            current_value  REAL,
            unit           TEXT,
            deadline       TEXT,
            created_at     TEXT NOT NULL,
            completed_at   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, status);",
    )?;
    Ok(())
}
