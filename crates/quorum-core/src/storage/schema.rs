//! SQLite DDL for the store adapter (C2), grounded on `verdict-core`'s
//! `storage::schema::DDL` constant in shape (a single `execute_batch`-able script
//! with `IF NOT EXISTS` guards).

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS submissions (
  id TEXT PRIMARY KEY,
  queue_id TEXT NOT NULL,
  labeling_task_id TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  data TEXT NOT NULL,
  answer_simhash INTEGER,
  simhash_bucket INTEGER
);

CREATE INDEX IF NOT EXISTS idx_submissions_queue ON submissions(queue_id);
CREATE INDEX IF NOT EXISTS idx_submissions_bucket ON submissions(simhash_bucket);

CREATE TABLE IF NOT EXISTS judges (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  system_prompt TEXT NOT NULL,
  model TEXT NOT NULL,
  active INTEGER NOT NULL DEFAULT 1,
  provider TEXT
);

CREATE TABLE IF NOT EXISTS assignments (
  id TEXT PRIMARY KEY,
  queue_id TEXT NOT NULL,
  question_id TEXT NOT NULL,
  judge_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assignments_queue ON assignments(queue_id);

CREATE TABLE IF NOT EXISTS judge_jobs (
  id TEXT PRIMARY KEY,
  submission_id TEXT NOT NULL,
  submission_data TEXT NOT NULL,
  question_id TEXT NOT NULL,
  judge_id TEXT NOT NULL,
  queue_id TEXT NOT NULL,
  status TEXT NOT NULL,
  attempts INTEGER NOT NULL DEFAULT 0,
  last_error TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_queue_status ON judge_jobs(queue_id, status);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON judge_jobs(status);

CREATE TABLE IF NOT EXISTS evaluations (
  submission_id TEXT NOT NULL,
  question_id TEXT NOT NULL,
  judge_id TEXT NOT NULL,
  queue_id TEXT NOT NULL,
  verdict TEXT NOT NULL,
  reasoning TEXT NOT NULL,
  reasoning_simhash INTEGER NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT,
  PRIMARY KEY (submission_id, question_id, judge_id)
);

CREATE INDEX IF NOT EXISTS idx_evaluations_queue ON evaluations(queue_id);
"#;
