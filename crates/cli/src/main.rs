// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fm: operator CLI for the foreman orchestrator.
//!
//! Drives the engine directly against a project root — useful for
//! bootstrapping a workspace and for manual leader actions without going
//! through the JSON-RPC surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fm_core::{Policy, Report, Workstream};
use fm_daemon::engine::Engine;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fm", about = "Foreman multi-agent orchestrator", version)]
struct Cli {
    /// Workspace root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Path to the policy JSON (default: <root>/config/policy.json)
    #[arg(long)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize state and bus artifacts
    Bootstrap,

    /// Create and assign a task
    CreateTask {
        #[arg(long)]
        title: String,
        #[arg(long)]
        workstream: Workstream,
        #[arg(long, default_value = "")]
        description: String,
        /// Acceptance criteria (repeatable)
        #[arg(long = "accept")]
        accept: Vec<String>,
        #[arg(long)]
        owner: Option<String>,
    },

    /// List tasks
    ListTasks,

    /// Ingest an agent report from a JSON file
    IngestReport {
        #[arg(long)]
        file: PathBuf,
    },

    /// Record a validation result
    Validate {
        #[arg(long)]
        task_id: String,
        #[arg(long, conflicts_with = "fail")]
        pass: bool,
        #[arg(long)]
        fail: bool,
        #[arg(long)]
        notes: String,
    },

    /// Record an architecture consensus vote
    DecideArchitecture {
        #[arg(long)]
        topic: String,
        /// Option string (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,
        /// JSON object: {"codex": "optionA", ...}
        #[arg(long)]
        votes: String,
        /// JSON object: {"codex": "...", ...}
        #[arg(long, default_value = "{}")]
        rationale: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let policy_path = cli
        .policy
        .clone()
        .unwrap_or_else(|| cli.root.join("config").join("policy.json"));
    let policy = if policy_path.exists() {
        Policy::load(&policy_path)
            .with_context(|| format!("loading policy {}", policy_path.display()))?
    } else {
        Policy::default()
    };
    let engine = Engine::open(&cli.root, policy)?;

    match cli.command {
        Command::Bootstrap => {
            engine.bootstrap()?;
            println!(
                "Bootstrapped with policy '{}' and manager '{}'",
                engine.policy().name,
                engine.leader()?
            );
        }

        Command::CreateTask { title, workstream, description, accept, owner } => {
            let accept = if accept.is_empty() {
                vec![
                    "Tests pass".to_string(),
                    "Acceptance criteria satisfied".to_string(),
                ]
            } else {
                accept
            };
            let created =
                engine.create_task(&title, workstream, &description, accept, owner)?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }

        Command::ListTasks => {
            let tasks = engine.list_tasks(None, None)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }

        Command::IngestReport { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading report {}", file.display()))?;
            let report: Report =
                serde_json::from_str(&raw).context("parsing report JSON")?;
            let accepted = engine.ingest_report(&report)?;
            println!("{}", serde_json::to_string_pretty(&accepted)?);
        }

        Command::Validate { task_id, pass, fail, notes } => {
            if pass == fail {
                bail!("specify exactly one of --pass or --fail");
            }
            let leader = engine.leader()?;
            let outcome = engine.validate_task(&task_id, pass, &notes, &leader)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::DecideArchitecture { topic, options, votes, rationale } => {
            let votes: BTreeMap<String, String> =
                serde_json::from_str(&votes).context("parsing --votes JSON")?;
            let rationale: BTreeMap<String, String> =
                serde_json::from_str(&rationale).context("parsing --rationale JSON")?;
            let outcome =
                engine.record_architecture_decision(&topic, &options, &votes, &rationale)?;
            println!("{}", outcome.path.display());
        }
    }
    Ok(())
}
