use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    db::init_db,
    error::{Result, SchedulerError},
    handler::HandlerRegistry,
    schedule::compute_next_run,
    types::{Job, JobStatus, Schedule},
};

/// Bounds how many handlers run concurrently — spec.md §4.12 "worker pool
/// (default 4)".
const DEFAULT_WORKER_POOL: usize = 4;

/// Shared handle for job management (list/add/remove) while the engine loop runs.
///
/// Uses its own `Connection` so WS handlers can manage jobs without conflicting
/// with the engine's polling queries.
pub struct SchedulerHandle {
    conn: Arc<Mutex<Connection>>,
}

impl SchedulerHandle {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn add_job(&self, name: &str, handler_ref: &str, schedule: Schedule, action: &str) -> Result<Job> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let next = compute_next_run(&schedule, now).map(|dt| dt.to_rfc3339());
        let id = Uuid::new_v4().to_string();
        let schedule_json = serde_json::to_string(&schedule)
            .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        conn.execute(
            "INSERT INTO jobs
             (id, name, handler_ref, schedule, action, status, enabled, last_run, next_run,
              run_count, max_runs, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,'pending',1,NULL,?6,0,NULL,?7,?7)",
            rusqlite::params![id, name, handler_ref, schedule_json, action, next, now_str],
        )?;
        info!(job_id = %id, %name, %handler_ref, "job added via handle");
        Ok(Job {
            id,
            name: name.to_string(),
            handler_ref: handler_ref.to_string(),
            schedule,
            action: action.to_string(),
            status: JobStatus::Pending,
            enabled: true,
            last_run: None,
            next_run: next,
            run_count: 0,
            max_runs: None,
            created_at: now_str.clone(),
            updated_at: now_str,
        })
    }

    pub fn remove_job(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, "job removed via handle");
        Ok(())
    }

    /// Pause or resume a job without deleting it — its schedule, history,
    /// and `next_run` are untouched.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE jobs SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![enabled, now, id],
        )?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, enabled, "job enabled flag changed via handle");
        Ok(())
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, handler_ref, schedule, action, status, enabled, last_run, next_run,
                    run_count, max_runs, created_at, updated_at
             FROM jobs ORDER BY created_at",
        )?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .filter_map(|r| r.ok().flatten())
            .collect();
        Ok(jobs)
    }
}

#[allow(clippy::type_complexity)]
fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Option<Job>> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let handler_ref: String = row.get(2)?;
    let sched_json: String = row.get(3)?;
    let action: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let enabled: bool = row.get(6)?;
    let last_run: Option<String> = row.get(7)?;
    let next_run: Option<String> = row.get(8)?;
    let run_count: u32 = row.get(9)?;
    let max_runs: Option<u32> = row.get(10)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    let Ok(schedule) = serde_json::from_str::<Schedule>(&sched_json) else {
        return Ok(None);
    };
    let Ok(status) = status_str.parse::<JobStatus>() else {
        return Ok(None);
    };

    Ok(Some(Job {
        id,
        name,
        handler_ref,
        schedule,
        action,
        status,
        enabled,
        last_run,
        next_run,
        run_count,
        max_runs,
        created_at,
        updated_at,
    }))
}

/// Core scheduler: persists jobs to SQLite and drives execution at ±1 s precision.
pub struct SchedulerEngine {
    conn: Connection,
    /// If set, fired jobs are also sent here (e.g. for a WS dashboard feed).
    fired_tx: Option<mpsc::Sender<Job>>,
    /// `handlerRef` -> handler table — spec.md §4.12.
    handlers: HandlerRegistry,
    /// Bounds concurrent handler invocations.
    worker_permits: Arc<Semaphore>,
}

impl SchedulerEngine {
    /// Create a new engine, initialising the DB schema if needed.
    ///
    /// Pass `Some(tx)` to also receive a copy of every fired [`Job`] via mpsc.
    /// The sender is non-blocking (`try_send`) so the tick loop is never stalled.
    pub fn new(
        conn: Connection,
        fired_tx: Option<mpsc::Sender<Job>>,
        handlers: HandlerRegistry,
    ) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn,
            fired_tx,
            handlers,
            worker_permits: Arc::new(Semaphore::new(DEFAULT_WORKER_POOL)),
        })
    }

    /// Add a new job. Returns the fully populated [`Job`] record.
    pub fn add_job(&self, name: &str, handler_ref: &str, schedule: Schedule, action: &str) -> Result<Job> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let next = compute_next_run(&schedule, now).map(|dt| dt.to_rfc3339());
        let id = Uuid::new_v4().to_string();
        let schedule_json = serde_json::to_string(&schedule)
            .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO jobs
             (id, name, handler_ref, schedule, action, status, enabled, last_run, next_run,
              run_count, max_runs, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,'pending',1,NULL,?6,0,NULL,?7,?7)",
            rusqlite::params![id, name, handler_ref, schedule_json, action, next, now_str],
        )?;

        info!(job_id = %id, %name, %handler_ref, "job added");

        Ok(Job {
            id,
            name: name.to_string(),
            handler_ref: handler_ref.to_string(),
            schedule,
            action: action.to_string(),
            status: JobStatus::Pending,
            enabled: true,
            last_run: None,
            next_run: next,
            run_count: 0,
            max_runs: None,
            created_at: now_str.clone(),
            updated_at: now_str,
        })
    }

    /// Remove a job by ID. Returns `JobNotFound` if no row is deleted.
    pub fn remove_job(&self, id: &str) -> Result<()> {
        let n = self.conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, "job removed");
        Ok(())
    }

    /// Pause or resume a job without deleting it.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE jobs SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![enabled, now, id],
        )?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, enabled, "job enabled flag changed");
        Ok(())
    }

    /// Return all known jobs ordered by creation time.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, handler_ref, schedule, action, status, enabled, last_run, next_run,
                    run_count, max_runs, created_at, updated_at
             FROM jobs ORDER BY created_at",
        )?;

        let jobs = stmt
            .query_map([], row_to_job)?
            .filter_map(|r| r.ok().flatten())
            .collect();

        Ok(jobs)
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        self.mark_missed_on_startup();

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// On startup, mark any pending job whose next_run is in the past as Missed.
    fn mark_missed_on_startup(&mut self) {
        let now = Utc::now().to_rfc3339();
        match self.conn.execute(
            "UPDATE jobs SET status = 'missed', updated_at = ?1
             WHERE status = 'pending' AND next_run IS NOT NULL AND next_run < ?1",
            [&now],
        ) {
            Ok(n) if n > 0 => warn!(count = n, "jobs marked missed on startup"),
            Err(e) => error!("missed-on-startup query failed: {e}"),
            _ => {}
        }
    }

    /// Process all jobs whose next_run has arrived.
    fn tick(&mut self) -> Result<()> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        // Collect eagerly inside the block so `stmt` is dropped before we
        // borrow `self.conn` again for the UPDATE below.
        // Columns: id, name, handler_ref, schedule, action, run_count, max_runs
        let due: Vec<(String, String, String, String, String, u32, Option<u32>)> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT id, name, handler_ref, schedule, action, run_count, max_runs FROM jobs
                 WHERE status = 'pending' AND enabled = 1
                   AND next_run IS NOT NULL AND next_run <= ?1",
            )?;
            let rows: Vec<_> = stmt
                .query_map([&now_str], |row| {
                    Ok((
                        row.get::<_, String>(0)?,      // id
                        row.get::<_, String>(1)?,      // name
                        row.get::<_, String>(2)?,      // handler_ref
                        row.get::<_, String>(3)?,      // schedule JSON
                        row.get::<_, String>(4)?,      // action JSON
                        row.get::<_, u32>(5)?,         // run_count
                        row.get::<_, Option<u32>>(6)?, // max_runs
                    ))
                })?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        for (id, name, handler_ref, sched_json, action, run_count, max_runs) in due {
            let schedule: Schedule = match serde_json::from_str(&sched_json) {
                Ok(s) => s,
                Err(e) => {
                    error!(job_id = %id, "bad schedule JSON: {e}");
                    continue;
                }
            };

            let new_count = run_count + 1;
            // next is None when the schedule is exhausted (Once after first fire,
            // or max_runs reached). In both cases mark the job completed.
            let next = if max_runs.is_some_and(|m| new_count >= m) {
                None
            } else {
                compute_next_run(&schedule, now).map(|dt| dt.to_rfc3339())
            };
            // Completed when there is no future run; pending when there is a next_run.
            let new_status = if next.is_none() {
                "completed"
            } else {
                "pending"
            };

            info!(job_id = %id, %name, run = new_count, next_status = %new_status, "executing job");

            self.conn.execute(
                "UPDATE jobs SET status=?1, last_run=?2, next_run=?3,
                  run_count=?4, updated_at=?2
                 WHERE id=?5",
                rusqlite::params![new_status, now_str, next, new_count, id],
            )?;

            let job = Job {
                id: id.clone(),
                name: name.clone(),
                handler_ref: handler_ref.clone(),
                schedule,
                action: action.clone(),
                status: JobStatus::Pending,
                enabled: true,
                last_run: Some(now_str.clone()),
                next_run: next.clone(),
                run_count: new_count,
                max_runs,
                created_at: String::new(),
                updated_at: now_str.clone(),
            };

            // Forward a copy for any external feed (e.g. a WS dashboard).
            if let Some(ref tx) = self.fired_tx {
                if tx.try_send(job.clone()).is_err() {
                    warn!(job_id = %id, "delivery channel full or closed — job dropped");
                }
            }

            // Dispatch to the registered handler on the bounded worker pool.
            // `next_run` was already advanced past `now` above, so the same
            // row can't be re-selected on the next tick even if this
            // handler invocation is still running — per-handler serialization
            // falls out of that, not from a separate lock.
            match self.handlers.get(&job.handler_ref) {
                Some(handler) => {
                    let permits = self.worker_permits.clone();
                    tokio::spawn(async move {
                        let _permit = permits.acquire_owned().await;
                        if let Err(e) = handler.handle(&job).await {
                            error!(job_id = %job.id, handler_ref = %job.handler_ref, "handler failed: {e}");
                        }
                    });
                }
                None => warn!(job_id = %id, handler_ref = %handler_ref, "no handler registered"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_job_keeps_name_and_handler_ref_distinct() {
        let handle = SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap();
        let job = handle
            .add_job("Morning brief", "morningBrief", Schedule::Interval { every_secs: 60 }, "{}")
            .unwrap();
        assert_eq!(job.name, "Morning brief");
        assert_eq!(job.handler_ref, "morningBrief");
        assert!(job.enabled);
    }

    #[test]
    fn set_enabled_persists_across_list_jobs() {
        let handle = SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap();
        let job = handle
            .add_job("deadline check", "deadlineCheck", Schedule::Interval { every_secs: 60 }, "{}")
            .unwrap();

        handle.set_enabled(&job.id, false).unwrap();
        let jobs = handle.list_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].enabled);

        handle.set_enabled(&job.id, true).unwrap();
        let jobs = handle.list_jobs().unwrap();
        assert!(jobs[0].enabled);
    }

    #[test]
    fn set_enabled_unknown_job_errors() {
        let handle = SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap();
        assert!(handle.set_enabled("missing", false).is_err());
    }

    #[test]
    fn disabled_job_due_now_is_not_picked_up_by_tick() {
        let conn = Connection::open_in_memory().unwrap();
        let mut engine = SchedulerEngine::new(conn, None, HandlerRegistry::new()).unwrap();
        let now = Utc::now().to_rfc3339();
        engine
            .conn
            .execute(
                "INSERT INTO jobs (id, name, handler_ref, schedule, action, status, enabled,
                    last_run, next_run, run_count, max_runs, created_at, updated_at)
                 VALUES ('j1','deadline check','deadlineCheck',
                    '{\"kind\":\"interval\",\"every_secs\":60}','{}',
                    'pending', 0, NULL, ?1, 0, NULL, ?1, ?1)",
                [&now],
            )
            .unwrap();

        engine.tick().unwrap();

        let jobs = engine.list_jobs().unwrap();
        assert_eq!(jobs[0].status, JobStatus::Pending);
        assert_eq!(jobs[0].run_count, 0);
    }
}
