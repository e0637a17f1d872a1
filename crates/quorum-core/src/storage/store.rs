//! The store adapter (C2, spec.md §4.2), backed by SQLite via `rusqlite`.
//!
//! Grounded on `verdict-core::storage::store::Store`: a `Clone`-able handle wrapping
//! `Arc<Mutex<Connection>>`. A single shared connection behind a mutex is what makes
//! `claim_pending`'s "select-and-update in one statement" actually atomic across
//! concurrent callers within one process (spec.md §4.2's claim contract); multiple
//! worker *processes* still rely on SQLite's own transaction isolation the same way
//! the original relied on Supabase/Postgres's.

use crate::errors::StoreError;
use crate::model::{Assignment, Evaluation, Job, JobCounts, JobStatus, Judge, Submission, SubmissionData, Verdict};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

fn now_rfc3339ish() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(super::schema::DDL)?;
        Ok(())
    }

    // ---- submissions (C9) ----------------------------------------------------

    /// Batch upsert on primary key `id` (spec.md §4.9 step 5).
    pub fn upsert_submissions(&self, submissions: &[Submission]) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        for s in submissions {
            let data_json = serde_json::to_string(&s.data)
                .map_err(|e| StoreError::InvalidRow(e.to_string()))?;
            conn.execute(
                "INSERT INTO submissions (id, queue_id, labeling_task_id, created_at, data, answer_simhash, simhash_bucket)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    queue_id = excluded.queue_id,
                    labeling_task_id = excluded.labeling_task_id,
                    created_at = excluded.created_at,
                    data = excluded.data,
                    answer_simhash = excluded.answer_simhash,
                    simhash_bucket = excluded.simhash_bucket",
                params![
                    s.id,
                    s.queue_id,
                    s.labeling_task_id,
                    s.created_at,
                    data_json,
                    s.answer_simhash,
                    s.simhash_bucket,
                ],
            )?;
        }
        Ok(())
    }

    pub fn get_submission(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, queue_id, labeling_task_id, created_at, data, answer_simhash, simhash_bucket
             FROM submissions WHERE id = ?1",
            params![id],
            row_to_submission,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// One page of a queue's submissions, ordered by id for stable pagination
    /// (spec.md §4.6 step 2).
    pub fn submissions_page(
        &self,
        queue_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Submission>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, queue_id, labeling_task_id, created_at, data, answer_simhash, simhash_bucket
             FROM submissions WHERE queue_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![queue_id, limit, offset], row_to_submission)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn count_submissions(&self, queue_id: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM submissions WHERE queue_id = ?1",
            params![queue_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Union of question ids across a queue's submissions (supplemented from the
    /// original's `list_questions`; SPEC_FULL.md §2).
    pub fn queue_question_ids(&self, queue_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM submissions WHERE queue_id = ?1")?;
        let rows = stmt.query_map(params![queue_id], |row| row.get::<_, String>(0))?;

        let mut ids = std::collections::BTreeSet::new();
        for r in rows {
            let raw = r?;
            let Ok(data) = serde_json::from_str::<SubmissionData>(&raw) else {
                continue;
            };
            for q in &data.questions {
                let qdata = q.get("data").unwrap_or(q);
                if let Some(id) = qdata.get("id").and_then(|v| v.as_str()) {
                    ids.insert(id.to_string());
                }
            }
        }
        Ok(ids.into_iter().collect())
    }

    // ---- judges (CRUD, external per spec.md §6, consumed read-only by the core) ----

    pub fn upsert_judge(&self, judge: &Judge) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO judges (id, name, system_prompt, model, active, provider)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                system_prompt = excluded.system_prompt,
                model = excluded.model,
                active = excluded.active,
                provider = excluded.provider",
            params![
                judge.id,
                judge.name,
                judge.system_prompt,
                judge.model,
                judge.active,
                judge.provider
            ],
        )?;
        Ok(())
    }

    pub fn delete_judge(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM judges WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn get_judge(&self, id: &str) -> Result<Option<Judge>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, system_prompt, model, active, provider FROM judges WHERE id = ?1",
            params![id],
            row_to_judge,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Loads the full judges catalog into memory (spec.md §4.8 step 1).
    pub fn list_judges(&self) -> Result<HashMap<String, Judge>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name, system_prompt, model, active, provider FROM judges")?;
        let rows = stmt.query_map([], row_to_judge)?;
        let mut out = HashMap::new();
        for r in rows {
            let j = r?;
            out.insert(j.id.clone(), j);
        }
        Ok(out)
    }

    // ---- assignments ------------------------------------------------------------

    /// Replaces a queue's assignment set wholesale: old rows deleted first, then the
    /// new set inserted (spec.md §3, §6). The delete+insert runs inside a single
    /// transaction so a crash mid-replace cannot leave the queue with zero
    /// assignments.
    pub fn save_assignments(&self, queue_id: &str, assignments: &[Assignment]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM assignments WHERE queue_id = ?1", params![queue_id])?;
        for a in assignments {
            tx.execute(
                "INSERT INTO assignments (id, queue_id, question_id, judge_id) VALUES (?1, ?2, ?3, ?4)",
                params![a.id, a.queue_id, a.question_id, a.judge_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_assignments(&self, queue_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, queue_id, question_id, judge_id FROM assignments WHERE queue_id = ?1",
        )?;
        let rows = stmt.query_map(params![queue_id], |row| {
            Ok(Assignment {
                id: row.get(0)?,
                queue_id: row.get(1)?,
                question_id: row.get(2)?,
                judge_id: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn count_assignments(&self, queue_id: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE queue_id = ?1",
            params![queue_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ---- jobs (C6, C8) -----------------------------------------------------------

    /// Flushes a batch of freshly materialized jobs (spec.md §4.6 step 4).
    pub fn insert_jobs(&self, jobs: &[Job]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for j in jobs {
            let data_json = serde_json::to_string(&j.submission_data)
                .map_err(|e| StoreError::InvalidRow(e.to_string()))?;
            tx.execute(
                "INSERT INTO judge_jobs (id, submission_id, submission_data, question_id, judge_id, queue_id, status, attempts, last_error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    j.id,
                    j.submission_id,
                    data_json,
                    j.question_id,
                    j.judge_id,
                    j.queue_id,
                    j.status.as_str(),
                    j.attempts,
                    j.last_error,
                    j.created_at,
                    j.updated_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Atomically claims up to `limit` pending jobs, marking them `running` in the
    /// same statement (spec.md §4.2's claim contract, §4.8 step 2). Safe against
    /// concurrent claimers in this process because all callers share one connection
    /// behind `conn`'s mutex; safe against concurrent worker *processes* because
    /// SQLite serializes writers.
    pub fn claim_pending(&self, limit: u32) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let updated_at = now_rfc3339ish();
        let mut stmt = conn.prepare(
            "UPDATE judge_jobs
             SET status = 'running', updated_at = ?1
             WHERE id IN (SELECT id FROM judge_jobs WHERE status = 'pending' ORDER BY created_at LIMIT ?2)
             RETURNING id, submission_id, submission_data, question_id, judge_id, queue_id, status, attempts, last_error, created_at, updated_at",
        )?;
        let rows = stmt.query_map(params![updated_at, limit], row_to_job)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn mark_job_done(&self, job_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE judge_jobs SET status = 'done', updated_at = ?2 WHERE id = ?1",
            params![job_id, now_rfc3339ish()],
        )?;
        Ok(())
    }

    /// Persists a failed dispatch attempt (spec.md §4.8 step 5): increments
    /// `attempts`, transitions to `failed` once `attempts >= max_attempts`, else
    /// returns the job to `pending` for the next poll.
    pub fn record_job_failure(
        &self,
        job_id: &str,
        attempts: u32,
        max_attempts: u32,
        last_error: &str,
    ) -> Result<JobStatus, StoreError> {
        let status = if attempts >= max_attempts {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE judge_jobs SET status = ?2, attempts = ?3, last_error = ?4, updated_at = ?5 WHERE id = ?1",
            params![job_id, status.as_str(), attempts, last_error, now_rfc3339ish()],
        )?;
        Ok(status)
    }

    /// Job status counts for a queue (C10, spec.md §4.10).
    pub fn job_counts(&self, queue_id: &str) -> Result<JobCounts, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut counts = JobCounts::default();
        for status in ["pending", "running", "done", "failed"] {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM judge_jobs WHERE queue_id = ?1 AND status = ?2",
                params![queue_id, status],
                |row| row.get(0),
            )?;
            match status {
                "pending" => counts.pending = n as u64,
                "running" => counts.running = n as u64,
                "done" => counts.done = n as u64,
                "failed" => counts.failed = n as u64,
                _ => unreachable!(),
            }
        }
        Ok(counts)
    }

    /// Per-table row counts for a queue (supplemented from the original's
    /// `debug_queue`; SPEC_FULL.md §2).
    pub fn queue_summary(&self, queue_id: &str) -> Result<HashMap<String, u64>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut summary = HashMap::new();
        for table in ["submissions", "assignments", "judge_jobs"] {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE queue_id = ?1"),
                params![queue_id],
                |row| row.get(0),
            )?;
            summary.insert(table.to_string(), n as u64);
        }
        Ok(summary)
    }

    // ---- evaluations (C7) --------------------------------------------------------

    pub fn get_evaluation(
        &self,
        submission_id: &str,
        question_id: &str,
        judge_id: &str,
    ) -> Result<Option<Evaluation>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT submission_id, question_id, judge_id, queue_id, verdict, reasoning, reasoning_simhash, created_at, updated_at
             FROM evaluations WHERE submission_id = ?1 AND question_id = ?2 AND judge_id = ?3",
            params![submission_id, question_id, judge_id],
            row_to_evaluation,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Idempotent upsert keyed by `(submission_id, question_id, judge_id)`
    /// (spec.md §4.7). Returns `true` if a row was inserted or changed, `false` on a
    /// true no-op (every candidate field already matched the stored row).
    pub fn upsert_evaluation(&self, eval: &Evaluation) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let existing = conn
            .query_row(
                "SELECT verdict, reasoning, reasoning_simhash, queue_id FROM evaluations
                 WHERE submission_id = ?1 AND question_id = ?2 AND judge_id = ?3",
                params![eval.submission_id, eval.question_id, eval.judge_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO evaluations (submission_id, question_id, judge_id, queue_id, verdict, reasoning, reasoning_simhash, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
                    params![
                        eval.submission_id,
                        eval.question_id,
                        eval.judge_id,
                        eval.queue_id,
                        eval.verdict.as_str(),
                        eval.reasoning,
                        eval.reasoning_simhash,
                        eval.created_at,
                    ],
                )?;
                Ok(true)
            }
            Some((old_verdict, old_reasoning, old_simhash, old_queue_id)) => {
                let verdict_changed = old_verdict != eval.verdict.as_str();
                let reasoning_changed = old_reasoning != eval.reasoning;
                let simhash_changed = old_simhash != eval.reasoning_simhash;
                let queue_changed = old_queue_id != eval.queue_id;

                if !verdict_changed && !reasoning_changed && !simhash_changed && !queue_changed {
                    return Ok(false);
                }

                conn.execute(
                    "UPDATE evaluations SET verdict = ?4, reasoning = ?5, reasoning_simhash = ?6, queue_id = ?7, updated_at = ?8
                     WHERE submission_id = ?1 AND question_id = ?2 AND judge_id = ?3",
                    params![
                        eval.submission_id,
                        eval.question_id,
                        eval.judge_id,
                        eval.verdict.as_str(),
                        eval.reasoning,
                        eval.reasoning_simhash,
                        eval.queue_id,
                        now_rfc3339ish(),
                    ],
                )?;
                Ok(true)
            }
        }
    }

    /// Paginated evaluation listing with the §6 filter set.
    #[allow(clippy::too_many_arguments)]
    pub fn list_evaluations(
        &self,
        queue_id: Option<&str>,
        judge_id: Option<&str>,
        question_id: Option<&str>,
        verdict: Option<Verdict>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Evaluation>, u64), StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = queue_id {
            clauses.push("queue_id = ?".to_string());
            args.push(Box::new(q.to_string()));
        }
        if let Some(j) = judge_id {
            clauses.push("judge_id = ?".to_string());
            args.push(Box::new(j.to_string()));
        }
        if let Some(q) = question_id {
            clauses.push("question_id = ?".to_string());
            args.push(Box::new(q.to_string()));
        }
        if let Some(v) = verdict {
            clauses.push("verdict = ?".to_string());
            args.push(Box::new(v.as_str().to_string()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM evaluations {where_clause}");
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, param_refs.as_slice(), |row| row.get(0))?;

        let offset = (page.saturating_sub(1)) * limit;
        let select_sql = format!(
            "SELECT submission_id, question_id, judge_id, queue_id, verdict, reasoning, reasoning_simhash, created_at, updated_at
             FROM evaluations {where_clause} ORDER BY submission_id, question_id, judge_id LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&select_sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), row_to_evaluation)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok((out, total as u64))
    }
}

fn row_to_submission(row: &rusqlite::Row) -> rusqlite::Result<Submission> {
    let data_json: String = row.get(4)?;
    let data: SubmissionData = serde_json::from_str(&data_json).unwrap_or_default();
    Ok(Submission {
        id: row.get(0)?,
        queue_id: row.get(1)?,
        labeling_task_id: row.get(2)?,
        created_at: row.get(3)?,
        data,
        answer_simhash: row.get(5)?,
        simhash_bucket: row.get(6)?,
    })
}

fn row_to_judge(row: &rusqlite::Row) -> rusqlite::Result<Judge> {
    Ok(Judge {
        id: row.get(0)?,
        name: row.get(1)?,
        system_prompt: row.get(2)?,
        model: row.get(3)?,
        active: row.get(4)?,
        provider: row.get(5)?,
    })
}

fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
    let data_json: String = row.get(2)?;
    let submission_data: SubmissionData = serde_json::from_str(&data_json).unwrap_or_default();
    let status_str: String = row.get(6)?;
    Ok(Job {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        submission_data,
        question_id: row.get(3)?,
        judge_id: row.get(4)?,
        queue_id: row.get(5)?,
        status: JobStatus::parse(&status_str).unwrap_or(JobStatus::Pending),
        attempts: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn row_to_evaluation(row: &rusqlite::Row) -> rusqlite::Result<Evaluation> {
    let verdict_str: String = row.get(4)?;
    Ok(Evaluation {
        submission_id: row.get(0)?,
        question_id: row.get(1)?,
        judge_id: row.get(2)?,
        queue_id: row.get(3)?,
        verdict: Verdict::parse(&verdict_str).unwrap_or(Verdict::Inconclusive),
        reasoning: row.get(5)?,
        reasoning_simhash: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
