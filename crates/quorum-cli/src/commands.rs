//! Command dispatch, grounded on `assay-cli::cli::commands::dispatch`'s
//! "one async fn routes every subcommand, returns a process exit code" shape.

use crate::args::{AssignmentsCmd, Cli, Command, JudgesCmd};
use anyhow::{Context, Result};
use quorum_core::{
    config::Config,
    ingest::{self, SubmissionInput},
    materializer, status,
    storage::Store,
    worker,
    model::{Assignment, Judge, Verdict},
};
use std::path::Path;
use uuid::Uuid;

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;

pub async fn dispatch(cli: Cli) -> Result<i32> {
    let mut config = Config::from_env();
    if let Some(path) = cli.database_path {
        config.database_path = path;
    }

    let store = Store::open(Path::new(&config.database_path))
        .context("failed to open database")?;
    store.init_schema().context("failed to initialize schema")?;

    match cli.cmd {
        Command::Ingest(args) => run_ingest(&store, &config, &args.file),
        Command::Judges(args) => run_judges(&store, args.cmd),
        Command::Assignments(args) => run_assignments(&store, args.cmd),
        Command::Run(args) => run_materialize(&store, &config, &args.queue_id),
        Command::Worker(_) => worker::run(store, config).await,
        Command::Evaluations(args) => run_evaluations(&store, &config, args),
        Command::Status(args) => run_status(&store, args).await,
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<i32> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(EXIT_OK)
}

fn run_ingest(store: &Store, config: &Config, file: &Path) -> Result<i32> {
    let raw = std::fs::read_to_string(file).context("failed to read ingest file")?;
    let inputs: Vec<SubmissionInput> = serde_json::from_str(&raw).context("invalid submission JSON")?;
    match ingest::ingest_submissions(store, inputs, config.upload_batch_size) {
        Ok(result) => print_json(&result),
        Err(e) => {
            eprintln!("ingest failed: {e}");
            Ok(EXIT_ERROR)
        }
    }
}

fn run_judges(store: &Store, cmd: JudgesCmd) -> Result<i32> {
    match cmd {
        JudgesCmd::Upsert(args) => {
            let judge = Judge {
                id: args.id,
                name: args.name,
                system_prompt: args.system_prompt,
                model: args.model,
                active: args.active,
                provider: args.provider,
            };
            store.upsert_judge(&judge)?;
            print_json(&judge)
        }
        JudgesCmd::List => {
            let judges = store.list_judges()?;
            let mut values: Vec<_> = judges.into_values().collect();
            values.sort_by(|a, b| a.id.cmp(&b.id));
            print_json(&values)
        }
        JudgesCmd::Get { id } => match store.get_judge(&id)? {
            Some(judge) => print_json(&judge),
            None => {
                eprintln!("judge '{id}' not found");
                Ok(EXIT_ERROR)
            }
        },
        JudgesCmd::Delete { id } => {
            store.delete_judge(&id)?;
            Ok(EXIT_OK)
        }
        JudgesCmd::Questions { queue_id } => {
            let ids = store.queue_question_ids(&queue_id)?;
            print_json(&ids)
        }
    }
}

#[derive(serde::Deserialize)]
struct AssignmentInput {
    question_id: String,
    judge_id: String,
}

fn run_assignments(store: &Store, cmd: AssignmentsCmd) -> Result<i32> {
    match cmd {
        AssignmentsCmd::Save { queue_id, file } => {
            let raw = std::fs::read_to_string(&file).context("failed to read assignments file")?;
            let inputs: Vec<AssignmentInput> =
                serde_json::from_str(&raw).context("invalid assignments JSON")?;
            let assignments: Vec<Assignment> = inputs
                .into_iter()
                .map(|a| Assignment {
                    id: Uuid::new_v4().to_string(),
                    queue_id: queue_id.clone(),
                    question_id: a.question_id,
                    judge_id: a.judge_id,
                })
                .collect();
            store.save_assignments(&queue_id, &assignments)?;
            print_json(&assignments)
        }
        AssignmentsCmd::List { queue_id } => {
            let assignments = store.list_assignments(&queue_id)?;
            print_json(&assignments)
        }
    }
}

fn run_materialize(store: &Store, config: &Config, queue_id: &str) -> Result<i32> {
    let result = materializer::materialize_queue(store, queue_id, config.run_judges_page, config.job_batch_size)?;
    print_json(&result)
}

fn run_evaluations(store: &Store, config: &Config, args: crate::args::EvaluationsArgs) -> Result<i32> {
    let verdict = args
        .verdict
        .as_deref()
        .map(|v| Verdict::parse(v).context("invalid verdict filter"))
        .transpose()?;
    let limit = args.limit.unwrap_or(config.evaluations_page_limit);
    let (rows, total) = store.list_evaluations(
        args.queue_id.as_deref(),
        args.judge_id.as_deref(),
        args.question_id.as_deref(),
        verdict,
        args.page,
        limit,
    )?;
    print_json(&serde_json::json!({ "evaluations": rows, "total": total }))
}

async fn run_status(store: &Store, args: crate::args::StatusArgs) -> Result<i32> {
    if args.summary {
        let summary = store.queue_summary(&args.queue_id)?;
        return print_json(&summary);
    }

    if args.watch {
        let mut rx = status::watch_job_status(store.clone(), args.queue_id.clone());
        while let Some(payload) = rx.recv().await {
            println!("{}", serde_json::to_string(&payload?)?);
        }
        return Ok(EXIT_OK);
    }

    let payload = status::job_status(store, &args.queue_id)?;
    print_json(&payload)
}
