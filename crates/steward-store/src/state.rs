use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use steward_core::types::{ChatId, Platform, UserId};

use crate::error::{Result, StoreError};
use crate::types::{
    Alert, AlertLevel, AlertTier, ChatBinding, ChatBindingType, FileOp, NotificationLevel, Outcome,
    OutcomeResult, PendingAction, PendingState, Plan,
};

/// Chat bindings, plans, outcomes, pending actions, alerts. Write errors
/// here propagate (spec.md §4.2) — this is the durable custodian of
/// operational state, not best-effort audit.
pub struct StateStore {
    conn: Mutex<Connection>,
}

impl StateStore {
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

    // ---- chat bindings (C3 backing store) ----

    pub fn bind_chat(&self, binding: &ChatBinding) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_bindings (platform, chat_id, binding_type, value, notification_level, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(platform, chat_id) DO UPDATE SET
                binding_type = excluded.binding_type,
                value = excluded.value,
                notification_level = excluded.notification_level",
            params![
                binding.platform.to_string(),
                binding.chat_id.as_str(),
                binding.binding_type.to_string(),
                binding.value,
                binding.notification_level.to_string(),
                binding.registered_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn lookup_binding(&self, platform: Platform, chat_id: &ChatId) -> Result<Option<ChatBinding>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT platform, chat_id, binding_type, value, notification_level, registered_at
             FROM chat_bindings WHERE platform = ?1 AND chat_id = ?2",
        )?;
        Ok(stmt
            .query_row(params![platform.to_string(), chat_id.as_str()], row_to_binding)
            .optional()?)
    }

    pub fn list_bindings(&self) -> Result<Vec<ChatBinding>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT platform, chat_id, binding_type, value, notification_level, registered_at FROM chat_bindings",
        )?;
        let rows = stmt.query_map([], row_to_binding)?.collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    // ---- pending actions (C9 backing store) ----

    /// Fails with `Busy` (mapped by the caller) unless `supersede` is set, in
    /// which case the existing pending row is atomically rejected first.
    pub fn propose_action(&self, action: &PendingAction, supersede: bool) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM pending_actions WHERE user_id = ?1 AND state = 'pending'",
                params![action.user_id.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(existing_id) = existing {
            if !supersede {
                return Err(StoreError::Busy);
            }
            tx.execute(
                "UPDATE pending_actions SET state = 'rejected' WHERE id = ?1",
                params![existing_id],
            )?;
        }
        tx.execute(
            "INSERT INTO pending_actions (id, user_id, kind, params, proposed_at, expires_at, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')",
            params![
                action.id,
                action.user_id.as_str(),
                action.kind,
                action.params.to_string(),
                action.proposed_at.to_rfc3339(),
                action.expires_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reads the current pending row for `user_id`, lazily flipping it to
    /// `expired` if read past `expires_at` (spec.md §3).
    pub fn current_pending(&self, user_id: &UserId) -> Result<Option<PendingAction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, params, proposed_at, expires_at, state
             FROM pending_actions WHERE user_id = ?1 AND state = 'pending'",
        )?;
        let row = stmt
            .query_row(params![user_id.as_str()], row_to_pending)
            .optional()?;
        match row {
            Some(mut p) if p.expires_at <= Utc::now() => {
                conn.execute(
                    "UPDATE pending_actions SET state = 'expired' WHERE id = ?1",
                    params![p.id],
                )?;
                p.state = PendingState::Expired;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub fn get_action(&self, id: &str) -> Result<Option<PendingAction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, params, proposed_at, expires_at, state
             FROM pending_actions WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id], row_to_pending).optional()?)
    }

    pub fn set_action_state(&self, id: &str, state: PendingState) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE pending_actions SET state = ?2 WHERE id = ?1",
            params![id, state.to_string()],
        )?;
        Ok(())
    }

    /// Sweep pass: flips every overdue `pending` row to `expired`. Returns
    /// the number of rows affected.
    pub fn reap_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE pending_actions SET state = 'expired' WHERE state = 'pending' AND expires_at <= ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(n)
    }

    /// Most recent `complete` row for `user_id` within the last 24h.
    pub fn last_complete_action(&self, user_id: &UserId) -> Result<Option<PendingAction>> {
        let conn = self.conn.lock().unwrap();
        let since = (Utc::now() - Duration::hours(24)).to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, params, proposed_at, expires_at, state
             FROM pending_actions
             WHERE user_id = ?1 AND state = 'complete' AND proposed_at >= ?2
             ORDER BY proposed_at DESC LIMIT 1",
        )?;
        Ok(stmt
            .query_row(params![user_id.as_str(), since], row_to_pending)
            .optional()?)
    }

    // ---- outcomes (C6 backing store) ----

    pub fn start_outcome(&self, outcome: &Outcome) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO outcomes (action_id, kind, started_at, completed_at, result, details, feedback)
             VALUES (?1, ?2, ?3, NULL, NULL, ?4, NULL)",
            params![
                outcome.action_id,
                outcome.kind,
                outcome.started_at.to_rfc3339(),
                outcome.details,
            ],
        )?;
        Ok(())
    }

    /// Idempotent on terminal state: a second call with the same result is a
    /// no-op; a conflicting result is a hard error (spec.md §4.6).
    pub fn complete_outcome(
        &self,
        action_id: &str,
        result: OutcomeResult,
        details: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<Option<String>> = conn
            .query_row(
                "SELECT result FROM outcomes WHERE action_id = ?1",
                params![action_id],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(Some(existing_result)) = existing {
            if existing_result == result.to_string() {
                return Ok(());
            }
            return Err(StoreError::ConflictingOutcome {
                action_id: action_id.to_string(),
                existing: existing_result,
                attempted: result.to_string(),
            });
        }
        conn.execute(
            "UPDATE outcomes SET completed_at = ?2, result = ?3, details = ?4 WHERE action_id = ?1",
            params![action_id, Utc::now().to_rfc3339(), result.to_string(), details],
        )?;
        Ok(())
    }

    pub fn record_feedback(&self, action_id: &str, feedback: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE outcomes SET feedback = ?2 WHERE action_id = ?1",
            params![action_id, feedback],
        )?;
        Ok(())
    }

    pub fn recent_outcomes(&self, limit: u32) -> Result<Vec<Outcome>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT action_id, kind, started_at, completed_at, result, details, feedback
             FROM outcomes ORDER BY started_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], row_to_outcome)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Same as [`Self::recent_outcomes`] but scoped to one user, joining
    /// through `pending_actions.id = outcomes.action_id` — outcomes carry
    /// no `user_id` of their own (spec.md §3's `formatForContext(userId, n)`).
    pub fn recent_outcomes_for_user(&self, user_id: &UserId, limit: u32) -> Result<Vec<Outcome>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT o.action_id, o.kind, o.started_at, o.completed_at, o.result, o.details, o.feedback
             FROM outcomes o
             JOIN pending_actions p ON p.id = o.action_id
             WHERE p.user_id = ?1
             ORDER BY o.started_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id.as_str(), limit], row_to_outcome)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    // ---- plans (C10 backing store) ----

    pub fn save_plan(&self, plan: &Plan) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let file_ops = serde_json::to_string(&plan.file_ops)?;
        conn.execute(
            "INSERT INTO plans (id, user_id, instruction_text, target_project, file_ops, status, created_at, pr_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET file_ops = excluded.file_ops, status = excluded.status, pr_url = excluded.pr_url",
            params![
                plan.id,
                plan.user_id.as_str(),
                plan.instruction_text,
                plan.target_project,
                file_ops,
                plan.status,
                plan.created_at.to_rfc3339(),
                plan.pr_url,
            ],
        )?;
        Ok(())
    }

    pub fn recent_plans(&self, limit: u32) -> Result<Vec<Plan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, instruction_text, target_project, file_ops, status, created_at, pr_url
             FROM plans ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], row_to_plan)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    pub fn recent_plans_for_user(&self, user_id: &UserId, limit: u32) -> Result<Vec<Plan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, instruction_text, target_project, file_ops, status, created_at, pr_url
             FROM plans WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id.as_str(), limit], row_to_plan)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    // ---- alerts (C11 backing store) ----

    pub fn save_alert(&self, alert: &Alert) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO alerts (id, level, body, tier, created_at, next_escalate_at, acknowledged_at, dedup_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET tier = excluded.tier, next_escalate_at = excluded.next_escalate_at,
                acknowledged_at = excluded.acknowledged_at",
            params![
                alert.id,
                alert.level.to_string(),
                alert.body,
                alert.tier.to_string(),
                alert.created_at.to_rfc3339(),
                alert.next_escalate_at.map(|t| t.to_rfc3339()),
                alert.acknowledged_at.map(|t| t.to_rfc3339()),
                alert.dedup_key,
            ],
        )?;
        Ok(())
    }

    /// A dedup key within the last 5 minutes collapses (spec.md §4.11).
    pub fn recent_alert_by_key(&self, dedup_key: &str) -> Result<Option<Alert>> {
        let conn = self.conn.lock().unwrap();
        let since = (Utc::now() - Duration::minutes(5)).to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT id, level, body, tier, created_at, next_escalate_at, acknowledged_at, dedup_key
             FROM alerts WHERE dedup_key = ?1 AND created_at >= ?2 ORDER BY created_at DESC LIMIT 1",
        )?;
        Ok(stmt
            .query_row(params![dedup_key, since], row_to_alert)
            .optional()?)
    }

    pub fn open_alerts_due(&self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, level, body, tier, created_at, next_escalate_at, acknowledged_at, dedup_key
             FROM alerts WHERE acknowledged_at IS NULL AND next_escalate_at IS NOT NULL AND next_escalate_at <= ?1",
        )?;
        let rows = stmt
            .query_map(params![now.to_rfc3339()], row_to_alert)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows)
    }

    pub fn ack_alert(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE alerts SET acknowledged_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn row_to_binding(row: &rusqlite::Row) -> rusqlite::Result<ChatBinding> {
    let platform: String = row.get(0)?;
    let binding_type: String = row.get(2)?;
    let notif: String = row.get(4)?;
    let registered_at: String = row.get(5)?;
    Ok(ChatBinding {
        platform: platform.parse().unwrap_or(Platform::Primary),
        chat_id: ChatId::from(row.get::<_, String>(1)?),
        binding_type: binding_type.parse().unwrap_or(ChatBindingType::Direct),
        value: row.get(3)?,
        notification_level: notif.parse().unwrap_or(NotificationLevel::All),
        registered_at: registered_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_pending(row: &rusqlite::Row) -> rusqlite::Result<PendingAction> {
    let params_text: String = row.get(3)?;
    let proposed_at: String = row.get(4)?;
    let expires_at: String = row.get(5)?;
    let state: String = row.get(6)?;
    Ok(PendingAction {
        id: row.get(0)?,
        user_id: UserId::from(row.get::<_, String>(1)?),
        kind: row.get(2)?,
        params: serde_json::from_str(&params_text).unwrap_or(serde_json::Value::Null),
        proposed_at: proposed_at.parse().unwrap_or_else(|_| Utc::now()),
        expires_at: expires_at.parse().unwrap_or_else(|_| Utc::now()),
        state: state.parse().unwrap_or(PendingState::Pending),
    })
}

fn row_to_outcome(row: &rusqlite::Row) -> rusqlite::Result<Outcome> {
    let started_at: String = row.get(2)?;
    let completed_at: Option<String> = row.get(3)?;
    let result: Option<String> = row.get(4)?;
    Ok(Outcome {
        action_id: row.get(0)?,
        kind: row.get(1)?,
        started_at: started_at.parse().unwrap_or_else(|_| Utc::now()),
        completed_at: completed_at.and_then(|t| t.parse().ok()),
        result: result.and_then(|r| r.parse().ok()),
        details: row.get(5)?,
        feedback: row.get(6)?,
    })
}

fn row_to_plan(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
    let file_ops_text: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let file_ops: Vec<FileOp> = serde_json::from_str(&file_ops_text).unwrap_or_default();
    Ok(Plan {
        id: row.get(0)?,
        user_id: UserId::from(row.get::<_, String>(1)?),
        instruction_text: row.get(2)?,
        target_project: row.get(3)?,
        file_ops,
        status: row.get(5)?,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        pr_url: row.get(7)?,
    })
}

fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<Alert> {
    let level: String = row.get(1)?;
    let tier: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let next_escalate_at: Option<String> = row.get(5)?;
    let acknowledged_at: Option<String> = row.get(6)?;
    Ok(Alert {
        id: row.get(0)?,
        level: level.parse().unwrap_or(AlertLevel::Info),
        body: row.get(2)?,
        tier: tier.parse().unwrap_or(AlertTier::Primary),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        next_escalate_at: next_escalate_at.and_then(|t| t.parse().ok()),
        acknowledged_at: acknowledged_at.and_then(|t| t.parse().ok()),
        dedup_key: row.get(7)?,
    })
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_bindings (
            platform            TEXT NOT NULL,
            chat_id             TEXT NOT NULL,
            binding_type        TEXT NOT NULL,
            value               TEXT NOT NULL,
            notification_level  TEXT NOT NULL,
            registered_at       TEXT NOT NULL,
            PRIMARY KEY (platform, chat_id)
        );

        CREATE TABLE IF NOT EXISTS pending_actions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            kind        TEXT NOT NULL,
            params      TEXT NOT NULL,
            proposed_at TEXT NOT NULL,
            expires_at  TEXT NOT NULL,
            state       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pending_user_state ON pending_actions(user_id, state);

        CREATE TABLE IF NOT EXISTS outcomes (
            action_id    TEXT PRIMARY KEY,
            kind         TEXT NOT NULL,
            started_at   TEXT NOT NULL,
            completed_at TEXT,
            result       TEXT,
            details      TEXT NOT NULL,
            feedback     TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_outcomes_started ON outcomes(started_at DESC);

        CREATE TABLE IF NOT EXISTS plans (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            instruction_text TEXT NOT NULL,
            target_project   TEXT NOT NULL,
            file_ops         TEXT NOT NULL,
            status           TEXT NOT NULL,
            created_at       TEXT NOT NULL,
            pr_url           TEXT
        );

        CREATE TABLE IF NOT EXISTS alerts (
            id                 TEXT PRIMARY KEY,
            level              TEXT NOT NULL,
            body               TEXT NOT NULL,
            tier               TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            next_escalate_at   TEXT,
            acknowledged_at    TEXT,
            dedup_key          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_alerts_dedup ON alerts(dedup_key, created_at DESC);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_action(user: &str, id: &str) -> PendingAction {
        PendingAction {
            id: id.to_string(),
            user_id: UserId::from(user),
            kind: "deploy".to_string(),
            params: serde_json::json!({"project": "projectX"}),
            proposed_at: Utc::now(),
            expires_at: Utc::now() + Duration::minutes(5),
            state: PendingState::Pending,
        }
    }

    #[test]
    fn at_most_one_pending_per_user() {
        let store = StateStore::in_memory().unwrap();
        store.propose_action(&sample_action("u1", "a1"), false).unwrap();
        let err = store
            .propose_action(&sample_action("u1", "a2"), false)
            .unwrap_err();
        assert!(matches!(err, StoreError::Busy));
    }

    #[test]
    fn supersede_rejects_existing() {
        let store = StateStore::in_memory().unwrap();
        store.propose_action(&sample_action("u1", "a1"), false).unwrap();
        store.propose_action(&sample_action("u1", "a2"), true).unwrap();
        let a1 = store.get_action("a1").unwrap().unwrap();
        assert_eq!(a1.state, PendingState::Rejected);
        let pending = store.current_pending(&UserId::from("u1")).unwrap().unwrap();
        assert_eq!(pending.id, "a2");
    }

    #[test]
    fn reading_past_expiry_flips_to_expired() {
        let store = StateStore::in_memory().unwrap();
        let mut action = sample_action("u1", "a1");
        action.expires_at = Utc::now() - Duration::minutes(1);
        store.propose_action(&action, false).unwrap();
        assert!(store.current_pending(&UserId::from("u1")).unwrap().is_none());
        let row = store.get_action("a1").unwrap().unwrap();
        assert_eq!(row.state, PendingState::Expired);
    }

    #[test]
    fn complete_outcome_idempotent_on_same_result() {
        let store = StateStore::in_memory().unwrap();
        store
            .start_outcome(&Outcome {
                action_id: "a1".to_string(),
                kind: "deploy".to_string(),
                started_at: Utc::now(),
                completed_at: None,
                result: None,
                details: String::new(),
                feedback: None,
            })
            .unwrap();
        store.complete_outcome("a1", OutcomeResult::Success, "done").unwrap();
        store.complete_outcome("a1", OutcomeResult::Success, "done").unwrap();
    }

    #[test]
    fn complete_outcome_conflicting_result_is_error() {
        let store = StateStore::in_memory().unwrap();
        store
            .start_outcome(&Outcome {
                action_id: "a1".to_string(),
                kind: "deploy".to_string(),
                started_at: Utc::now(),
                completed_at: None,
                result: None,
                details: String::new(),
                feedback: None,
            })
            .unwrap();
        store.complete_outcome("a1", OutcomeResult::Success, "done").unwrap();
        let err = store.complete_outcome("a1", OutcomeResult::Failed, "oops").unwrap_err();
        assert!(matches!(err, StoreError::ConflictingOutcome { .. }));
    }

    #[test]
    fn recent_plans_for_user_excludes_other_users() {
        let store = StateStore::in_memory().unwrap();
        let sample_plan = |user: &str, id: &str| Plan {
            id: id.to_string(),
            user_id: UserId::from(user),
            instruction_text: "do the thing".to_string(),
            target_project: "projectX".to_string(),
            file_ops: Vec::new(),
            status: "complete".to_string(),
            created_at: Utc::now(),
            pr_url: None,
        };
        store.save_plan(&sample_plan("u1", "p1")).unwrap();
        store.save_plan(&sample_plan("u2", "p2")).unwrap();

        let u1_plans = store.recent_plans_for_user(&UserId::from("u1"), 10).unwrap();
        assert_eq!(u1_plans.len(), 1);
        assert_eq!(u1_plans[0].id, "p1");
    }

    #[test]
    fn bind_then_lookup_round_trips() {
        let store = StateStore::in_memory().unwrap();
        let binding = ChatBinding {
            platform: Platform::Primary,
            chat_id: ChatId::from("c1"),
            binding_type: ChatBindingType::Repo,
            value: "projectX".to_string(),
            notification_level: NotificationLevel::All,
            registered_at: Utc::now(),
        };
        store.bind_chat(&binding).unwrap();
        let looked_up = store
            .lookup_binding(Platform::Primary, &ChatId::from("c1"))
            .unwrap()
            .unwrap();
        assert_eq!(looked_up.binding_type, ChatBindingType::Repo);
        assert_eq!(looked_up.value, "projectX");
    }

    #[test]
    fn dedup_key_within_five_minutes_is_visible() {
        let store = StateStore::in_memory().unwrap();
        let alert = Alert {
            id: "al1".to_string(),
            level: AlertLevel::Critical,
            body: "disk full".to_string(),
            tier: AlertTier::Primary,
            created_at: Utc::now(),
            next_escalate_at: None,
            acknowledged_at: None,
            dedup_key: "disk-full".to_string(),
        };
        store.save_alert(&alert).unwrap();
        let found = store.recent_alert_by_key("disk-full").unwrap();
        assert!(found.is_some());
    }
}
