//! Command-line surface, grounded on `assay-cli::cli::args`'s
//! `Cli`/`Subcommand`/per-variant-struct shape.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quorum",
    version,
    about = "Judge evaluation pipeline: ingest submissions, fan out judge jobs, run workers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to the SQLite database file. Overrides `DATABASE_PATH`.
    #[arg(long, global = true, env = "DATABASE_PATH")]
    pub database_path: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bulk-ingest submissions from a JSON file (C9).
    Ingest(IngestArgs),
    /// Manage judges.
    Judges(JudgesArgs),
    /// Manage a queue's question/judge assignments.
    Assignments(AssignmentsArgs),
    /// Materialize judge jobs for a queue (C6).
    Run(RunArgs),
    /// Run the worker dispatch loop (C8). Runs until killed.
    Worker(WorkerArgs),
    /// List recorded evaluations.
    Evaluations(EvaluationsArgs),
    /// Report job status for a queue (C10).
    Status(StatusArgs),
}

#[derive(Parser)]
pub struct IngestArgs {
    /// Path to a JSON file containing an array of submissions.
    pub file: PathBuf,
}

#[derive(Parser)]
pub struct JudgesArgs {
    #[command(subcommand)]
    pub cmd: JudgesCmd,
}

#[derive(Subcommand)]
pub enum JudgesCmd {
    /// Create or update a judge.
    Upsert(JudgeUpsertArgs),
    /// List all judges.
    List,
    /// Show one judge.
    Get { id: String },
    /// Delete a judge.
    Delete { id: String },
    /// List the union of question ids across a queue's submissions.
    Questions { queue_id: String },
}

#[derive(Parser)]
pub struct JudgeUpsertArgs {
    pub id: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub system_prompt: String,
    #[arg(long)]
    pub model: String,
    #[arg(long, default_value_t = true)]
    pub active: bool,
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Parser)]
pub struct AssignmentsArgs {
    #[command(subcommand)]
    pub cmd: AssignmentsCmd,
}

#[derive(Subcommand)]
pub enum AssignmentsCmd {
    /// Replace a queue's assignment set from a JSON file of `{question_id, judge_id}` pairs.
    Save { queue_id: String, file: PathBuf },
    /// List a queue's current assignments.
    List { queue_id: String },
}

#[derive(Parser)]
pub struct RunArgs {
    pub queue_id: String,
}

#[derive(Parser)]
pub struct WorkerArgs {}

#[derive(Parser)]
pub struct EvaluationsArgs {
    #[arg(long)]
    pub queue_id: Option<String>,
    #[arg(long)]
    pub judge_id: Option<String>,
    #[arg(long)]
    pub question_id: Option<String>,
    #[arg(long)]
    pub verdict: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Parser)]
pub struct StatusArgs {
    pub queue_id: String,
    /// Print per-table row counts instead of job status counts.
    #[arg(long)]
    pub summary: bool,
    /// Poll once per second until the queue drains.
    #[arg(long)]
    pub watch: bool,
}
