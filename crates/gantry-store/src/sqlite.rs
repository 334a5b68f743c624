use std::path::Path;

use chrono::{DateTime, Utc};
use gantry_types::{Job, Run, Status, Timestamp};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::storage::{RunFilter, RunStorage, initial_job_status};
use crate::{ActionsConfig, Result, StoreError};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

const RUN_COLUMNS: &str = "id, title, repo_id, owner_id, workflow_id, idx, trigger_user_id, \
     ref_name, commit_sha, is_fork_pull_request, event, trigger_event, event_payload, \
     status, created, updated, started, stopped";

const JOB_COLUMNS: &str = "id, run_id, repo_id, owner_id, commit_sha, is_fork_pull_request, \
     name, attempt, workflow_payload, job_id, needs, runs_on, status, created, updated, \
     started, stopped";

/// `('waiting', 'running', 'blocked')`, for `status IN ...` clauses.
fn active_statuses() -> String {
    let quoted: Vec<_> = Status::active()
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    format!("({})", quoted.join(", "))
}

/// SQLite-backed [`RunStorage`].
///
/// Thread-safe via an internal `Mutex<Connection>`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Migration(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        tracing::debug!(path = %path.display(), "Opened run store");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        let conn = self.conn.get_mut();
        embedded::migrations::runner()
            .run(conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl RunStorage for SqliteStore {
    fn insert_run(&self, mut run: Run, mut jobs: Vec<Job>) -> Result<(Run, Vec<Job>)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let now = Utc::now();
        run.index = tx.query_row(
            "SELECT COALESCE(MAX(idx), 0) + 1 FROM runs WHERE repo_id = ?1",
            params![run.repo_id],
            |row| row.get(0),
        )?;
        run.created = now;
        run.updated = now;

        tx.execute(
            "INSERT INTO runs (title, repo_id, owner_id, workflow_id, idx, trigger_user_id,
                               ref_name, commit_sha, is_fork_pull_request, event, trigger_event,
                               event_payload, status, created, updated, started, stopped)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                run.title,
                run.repo_id,
                run.owner_id,
                run.workflow_id,
                run.index,
                run.trigger_user_id,
                run.ref_name,
                run.commit_sha,
                run.is_fork_pull_request,
                run.event,
                run.trigger_event,
                run.event_payload,
                run.status.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                run.started.map(|t| t.to_rfc3339()),
                run.stopped.map(|t| t.to_rfc3339()),
            ],
        )?;
        run.id = tx.last_insert_rowid();

        for job in &mut jobs {
            job.run_id = run.id;
            job.repo_id = run.repo_id;
            job.owner_id = run.owner_id;
            job.commit_sha = run.commit_sha.clone();
            job.is_fork_pull_request = run.is_fork_pull_request;
            job.status = initial_job_status(job);
            job.created = now;
            job.updated = now;

            tx.execute(
                "INSERT INTO jobs (run_id, repo_id, owner_id, commit_sha, is_fork_pull_request,
                                   name, attempt, workflow_payload, job_id, needs, runs_on,
                                   status, created, updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    job.run_id,
                    job.repo_id,
                    job.owner_id,
                    job.commit_sha,
                    job.is_fork_pull_request,
                    job.name,
                    job.attempt,
                    job.workflow_payload,
                    job.job_id,
                    serde_json::to_string(&job.needs)?,
                    serde_json::to_string(&job.runs_on)?,
                    job.status.as_str(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;
            job.id = tx.last_insert_rowid();
        }

        tx.commit()?;
        tracing::debug!(
            run_id = run.id,
            repo_id = run.repo_id,
            index = run.index,
            jobs = jobs.len(),
            "Inserted run"
        );
        Ok((run, jobs))
    }

    fn get_run(&self, id: i64) -> Result<Run> {
        self.conn()
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![id],
                row_to_run,
            )
            .optional()?
            .ok_or_else(|| StoreError::run_not_found(id))
    }

    fn list_runs(&self, repo_id: i64, limit: usize) -> Result<Vec<Run>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs WHERE repo_id = ?1 ORDER BY idx DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![repo_id, limit as i64], row_to_run)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_active_runs(&self, filter: &RunFilter) -> Result<Vec<Run>> {
        let active = active_statuses();
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs
             WHERE repo_id = ?1
               AND (?2 IS NULL OR ref_name = ?2)
               AND (?3 IS NULL OR workflow_id = ?3)
               AND (?4 IS NULL OR event = ?4)
               AND status IN {active}
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(
            params![
                filter.repo_id,
                filter.ref_name,
                filter.workflow_id,
                filter.event
            ],
            row_to_run,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn cancel_run(&self, run_id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let active = active_statuses();

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM runs WHERE id = ?1", params![run_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::run_not_found(run_id));
        }

        let jobs = tx.execute(
            &format!(
                "UPDATE jobs SET status = 'cancelled', stopped = ?2, updated = ?2
                 WHERE run_id = ?1 AND status IN {active}"
            ),
            params![run_id, now],
        )?;
        let runs = tx.execute(
            &format!(
                "UPDATE runs SET status = 'cancelled', stopped = ?2, updated = ?2
                 WHERE id = ?1 AND status IN {active}"
            ),
            params![run_id, now],
        )?;
        tx.commit()?;

        tracing::debug!(run_id, jobs, "Cancelled run");
        Ok(runs > 0)
    }

    fn find_jobs(&self, run_id: i64) -> Result<Vec<Job>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE run_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![run_id], row_to_job)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn actions_config(&self, repo_id: i64) -> Result<ActionsConfig> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT config FROM actions_config WHERE repo_id = ?1",
                params![repo_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(ActionsConfig::default()),
        }
    }

    fn set_actions_config(&self, repo_id: i64, config: &ActionsConfig) -> Result<()> {
        let json = serde_json::to_string(config)?;
        self.conn().execute(
            "INSERT INTO actions_config (repo_id, config) VALUES (?1, ?2)
             ON CONFLICT (repo_id) DO UPDATE SET config = excluded.config",
            params![repo_id, json],
        )?;
        Ok(())
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_opt_dt(s: Option<String>) -> Option<Timestamp> {
    s.map(|s| parse_dt(&s))
}

fn parse_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<Status> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<Run> {
    Ok(Run {
        id: row.get(0)?,
        title: row.get(1)?,
        repo_id: row.get(2)?,
        owner_id: row.get(3)?,
        workflow_id: row.get(4)?,
        index: row.get(5)?,
        trigger_user_id: row.get(6)?,
        ref_name: row.get(7)?,
        commit_sha: row.get(8)?,
        is_fork_pull_request: row.get(9)?,
        event: row.get(10)?,
        trigger_event: row.get(11)?,
        event_payload: row.get(12)?,
        status: parse_status(row, 13)?,
        created: parse_dt(&row.get::<_, String>(14)?),
        updated: parse_dt(&row.get::<_, String>(15)?),
        started: parse_opt_dt(row.get(16)?),
        stopped: parse_opt_dt(row.get(17)?),
    })
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        run_id: row.get(1)?,
        repo_id: row.get(2)?,
        owner_id: row.get(3)?,
        commit_sha: row.get(4)?,
        is_fork_pull_request: row.get(5)?,
        name: row.get(6)?,
        attempt: row.get(7)?,
        workflow_payload: row.get(8)?,
        job_id: row.get(9)?,
        needs: parse_list(row, 10)?,
        runs_on: parse_list(row, 11)?,
        status: parse_status(row, 12)?,
        created: parse_dt(&row.get::<_, String>(13)?),
        updated: parse_dt(&row.get::<_, String>(14)?),
        started: parse_opt_dt(row.get(15)?),
        stopped: parse_opt_dt(row.get(16)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(repo_id: i64, workflow_id: &str, ref_name: &str) -> Run {
        Run {
            title: "fix bug".into(),
            repo_id,
            owner_id: 7,
            workflow_id: workflow_id.into(),
            trigger_user_id: 3,
            ref_name: ref_name.into(),
            commit_sha: "abc123".into(),
            event: "workflow_dispatch".into(),
            trigger_event: "workflow_dispatch".into(),
            event_payload: "{}".into(),
            status: Status::Waiting,
            ..Default::default()
        }
    }

    fn job(job_id: &str, needs: &[&str]) -> Job {
        Job {
            name: job_id.into(),
            job_id: job_id.into(),
            workflow_payload: format!("jobs:\n  {job_id}: {{}}\n"),
            needs: needs.iter().map(|n| n.to_string()).collect(),
            runs_on: vec!["ubuntu-latest".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_assigns_ids_and_statuses() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (run, jobs) = store
            .insert_run(
                run(1, "build.yml", "refs/heads/main"),
                vec![job("build", &[]), job("deploy", &["build"])],
            )
            .unwrap();

        assert!(run.id > 0);
        assert_eq!(run.index, 1);
        assert_eq!(jobs[0].status, Status::Waiting);
        assert_eq!(jobs[1].status, Status::Blocked);
        assert!(jobs.iter().all(|j| j.run_id == run.id && j.commit_sha == "abc123"));

        let loaded = store.get_run(run.id).unwrap();
        assert_eq!(loaded.title, "fix bug");
        assert_eq!(loaded.status, Status::Waiting);

        let found = store.find_jobs(run.id).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].needs, ["build"]);
        assert_eq!(found[1].runs_on, ["ubuntu-latest"]);
        assert_eq!(store.load_run_for_job(&found[0]).unwrap().id, run.id);
    }

    #[test]
    fn test_failed_job_insert_leaves_no_run() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn()
            .execute_batch(
                "CREATE TRIGGER reject_jobs BEFORE INSERT ON jobs
                 BEGIN SELECT RAISE(ABORT, 'jobs rejected'); END;",
            )
            .unwrap();

        let err = store
            .insert_run(run(1, "build.yml", "refs/heads/main"), vec![job("build", &[])])
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(store.list_runs(1, 10).unwrap().is_empty());

        store
            .conn()
            .execute_batch("DROP TRIGGER reject_jobs;")
            .unwrap();
        let (run, jobs) = store
            .insert_run(run(1, "build.yml", "refs/heads/main"), vec![job("build", &[])])
            .unwrap();
        assert_eq!(run.index, 1);
        let found: Vec<_> = store.find_jobs(run.id).unwrap().iter().map(|j| j.id).collect();
        assert_eq!(found, [jobs[0].id]);
    }

    #[test]
    fn test_index_is_per_repository() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (a1, _) = store.insert_run(run(1, "a.yml", "refs/heads/main"), vec![]).unwrap();
        let (b1, _) = store.insert_run(run(2, "a.yml", "refs/heads/main"), vec![]).unwrap();
        let (a2, _) = store.insert_run(run(1, "a.yml", "refs/heads/main"), vec![]).unwrap();
        assert_eq!((a1.index, b1.index, a2.index), (1, 1, 2));

        let listed = store.list_runs(1, 10).unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, [a2.id, a1.id]);
        assert_eq!(store.list_runs(1, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_find_active_and_cancel() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (first, _) = store
            .insert_run(
                run(1, "build.yml", "refs/heads/main"),
                vec![job("build", &[]), job("deploy", &["build"])],
            )
            .unwrap();
        store
            .insert_run(run(1, "build.yml", "refs/heads/dev"), vec![])
            .unwrap();

        let filter = RunFilter::same_workflow(&first);
        let active = store.find_active_runs(&filter).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first.id);

        assert!(store.cancel_run(first.id).unwrap());
        assert!(!store.cancel_run(first.id).unwrap());

        let cancelled = store.get_run(first.id).unwrap();
        assert_eq!(cancelled.status, Status::Cancelled);
        assert!(cancelled.stopped.is_some());
        assert!(
            store
                .find_jobs(first.id)
                .unwrap()
                .iter()
                .all(|j| j.status == Status::Cancelled && j.stopped.is_some())
        );
        assert!(store.find_active_runs(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_missing_run() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_run(42).unwrap_err().is_not_found());
        assert!(store.cancel_run(42).unwrap_err().is_not_found());
    }

    #[test]
    fn test_actions_config_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.actions_config(1).unwrap(), ActionsConfig::default());

        let mut cfg = ActionsConfig::default();
        cfg.disable_workflow("build.yml");
        store.set_actions_config(1, &cfg).unwrap();
        cfg.enable_workflow("build.yml");
        cfg.disable_workflow("deploy.yml");
        store.set_actions_config(1, &cfg).unwrap();

        let loaded = store.actions_config(1).unwrap();
        assert!(loaded.is_workflow_disabled("deploy.yml"));
        assert!(!loaded.is_workflow_disabled("build.yml"));
        assert_eq!(store.actions_config(2).unwrap(), ActionsConfig::default());
    }
}
