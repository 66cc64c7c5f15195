// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool surface: registry, argument parsing, dispatch into the engine,
//! and the audit/debug-trace wrappers around every call.

use crate::engine::{Engine, EngineError, LiveStatusArgs};
use fm_core::{
    BlockerStatus, BugStatus, Clock, Report, Role, Severity, TaskId, TaskStatus, TestSummary,
    Workstream,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Shared context for request handlers.
pub struct ServerCtx<C: Clock> {
    pub engine: Arc<Engine<C>>,
    pub policy_path: PathBuf,
    pub verbose_paths: bool,
    /// Interval of the in-process auto-cycle task, when one is running.
    pub auto_cycle: Option<Duration>,
}

/// Substrings marking audit fields that must never be logged in clear.
const REDACT_KEYS: [&str; 6] = [
    "token",
    "secret",
    "password",
    "api_key",
    "authorization",
    "auth",
];

/// Handle one `tools/call`, auditing the outcome either way.
pub(crate) async fn handle_tool_call<C: Clock>(
    ctx: &ServerCtx<C>,
    id: Value,
    params: &Value,
) -> Value {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let started = std::time::Instant::now();

    match dispatch(ctx, &name, &args).await {
        Ok(payload) => {
            audit(ctx, &name, &args, "ok", Some(&payload), None);
            debug_trace(ctx, &name, &id, &args, "ok", started, Some(&payload), None);
            let text = serde_json::to_string_pretty(&payload).unwrap_or_default();
            super::ok_result(
                id,
                json!({"content": [{"type": "text", "text": text}]}),
            )
        }
        Err(error) => {
            let message = error.to_string();
            audit(ctx, &name, &args, "error", None, Some(&message));
            debug_trace(ctx, &name, &id, &args, "error", started, None, Some(&message));
            super::error_response(id, -32603, message)
        }
    }
}

async fn dispatch<C: Clock>(
    ctx: &ServerCtx<C>,
    name: &str,
    args: &Value,
) -> Result<Value, EngineError> {
    let engine = &ctx.engine;
    match name {
        "guide" => guide_payload(engine),

        "bootstrap" => {
            engine.bootstrap()?;
            Ok(json!({
                "ok": true,
                "policy": &engine.policy().name,
                "manager": engine.leader()?,
            }))
        }

        "status" => status_payload(ctx),

        "get_roles" => to_json(&engine.roles()?),

        "set_role" => {
            let role: Role = req_parsed(args, "role")?;
            let roles =
                engine.set_role(&req_str(args, "agent")?, role, &req_str(args, "source")?)?;
            to_json(&roles)
        }

        "register_agent" => {
            let entry = engine.register_agent(&req_str(args, "agent")?, opt_map(args, "metadata"))?;
            to_json(&entry)
        }

        "heartbeat" => {
            let entry = engine.heartbeat(&req_str(args, "agent")?, opt_map(args, "metadata"))?;
            to_json(&entry)
        }

        "connect_team_members" => {
            let outcome = engine
                .connect_team_members(
                    &req_str(args, "source")?,
                    &req_str_list(args, "team_members")?,
                    Duration::from_secs(opt_u64(args, "timeout_seconds", 60).max(1)),
                    Duration::from_secs(opt_u64(args, "poll_interval_seconds", 2).max(1)),
                    opt_u64(args, "stale_after_seconds", 600),
                )
                .await?;
            to_json(&outcome)
        }

        "connect_to_leader" => {
            let report = engine.connect_to_leader(
                &req_str(args, "agent")?,
                opt_map(args, "metadata"),
                &opt_str(args, "status").unwrap_or_else(|| "idle".to_string()),
                opt_bool(args, "announce", true),
                opt_str(args, "source").as_deref(),
                opt_str(args, "project_override").as_deref(),
            )?;
            to_json(&report)
        }

        "set_agent_project_context" => {
            let entry = engine.set_agent_project_context(
                &req_str(args, "agent")?,
                &req_str(args, "project_root")?,
                opt_str(args, "cwd").as_deref(),
                &req_str(args, "source")?,
            )?;
            to_json(&entry)
        }

        "list_agents" => {
            let views = engine.list_agents(
                opt_bool(args, "active_only", false),
                args.get("stale_after_seconds").and_then(Value::as_u64),
                true,
            )?;
            to_json(&views)
        }

        "discover_agents" => {
            let discovered = engine.discover_agents(
                opt_bool(args, "active_only", false),
                args.get("stale_after_seconds").and_then(Value::as_u64),
            )?;
            to_json(&discovered)
        }

        "create_task" => {
            let workstream: Workstream = req_parsed(args, "workstream")?;
            let acceptance = match args.get("acceptance_criteria") {
                None | Some(Value::Null) => vec![
                    "Tests pass".to_string(),
                    "Acceptance criteria satisfied".to_string(),
                ],
                Some(Value::String(single)) => vec![single.clone()],
                Some(other) => parsed("acceptance_criteria", other)?,
            };
            let created = engine.create_task(
                &req_str(args, "title")?,
                workstream,
                &opt_str(args, "description").unwrap_or_default(),
                acceptance,
                opt_str(args, "owner"),
            )?;
            to_json(&created)
        }

        "dedupe_tasks" => {
            let source = source_or_leader(engine, args)?;
            to_json(&engine.dedupe_open_tasks(&source)?)
        }

        "list_tasks" => {
            let status: Option<TaskStatus> = opt_parsed(args, "status")?;
            to_json(&engine.list_tasks(status, opt_str(args, "owner").as_deref())?)
        }

        "get_tasks_for_agent" => {
            let status: Option<TaskStatus> = opt_parsed(args, "status")?;
            let agent = req_str(args, "agent")?;
            to_json(&engine.list_tasks(status, Some(&agent))?)
        }

        "claim_next_task" => {
            match engine.claim_next(&req_str(args, "agent")?)? {
                Some(task) => to_json(&task),
                None => Ok(json!({
                    "task": null,
                    "message": "No claimable task",
                    "retry_hint": {
                        "strategy": "event_poll_then_backoff",
                        "poll_timeout_ms": 120_000,
                        "backoff_seconds": 15,
                    },
                })),
            }
        }

        "set_claim_override" => engine.set_claim_override(
            &req_str(args, "agent")?,
            &req_str(args, "task_id")?,
            &req_str(args, "source")?,
        ),

        "update_task_status" => {
            let status: TaskStatus = req_parsed(args, "status")?;
            let task = engine.set_task_status(
                &req_str(args, "task_id")?,
                status,
                &req_str(args, "source")?,
                &opt_str(args, "note").unwrap_or_default(),
            )?;
            to_json(&task)
        }

        "submit_report" => submit_report(ctx, args).await,

        "validate_task" => {
            let outcome = engine.validate_task(
                &req_str(args, "task_id")?,
                req_bool(args, "passed")?,
                &req_str(args, "notes")?,
                &req_str(args, "source")?,
            )?;
            to_json(&outcome)
        }

        "list_bugs" => {
            let status: Option<BugStatus> = opt_parsed(args, "status")?;
            to_json(&engine.list_bugs(status, opt_str(args, "owner").as_deref())?)
        }

        "raise_blocker" => {
            let severity: Severity = opt_parsed(args, "severity")?.unwrap_or_default();
            let blocker = engine.raise_blocker(
                &req_str(args, "task_id")?,
                &req_str(args, "agent")?,
                &req_str(args, "question")?,
                opt_str_list(args, "options"),
                severity,
            )?;
            to_json(&blocker)
        }

        "list_blockers" => {
            let status: Option<BlockerStatus> = opt_parsed(args, "status")?;
            to_json(&engine.list_blockers(status, opt_str(args, "agent").as_deref())?)
        }

        "resolve_blocker" => {
            let resolved = engine.resolve_blocker(
                &req_str(args, "blocker_id")?,
                &req_str(args, "resolution")?,
                &req_str(args, "source")?,
            )?;
            to_json(&resolved)
        }

        "publish_event" => {
            let event = engine.publish_event(
                &req_str(args, "type")?,
                &req_str(args, "source")?,
                opt_map(args, "payload"),
                &opt_str_list(args, "audience"),
            )?;
            to_json(&event)
        }

        "poll_events" => {
            let polled = engine
                .poll_events(
                    &req_str(args, "agent")?,
                    args.get("cursor").and_then(Value::as_u64),
                    opt_u64(args, "limit", 50) as usize,
                    Duration::from_millis(opt_u64(args, "timeout_ms", 0)),
                    opt_bool(args, "auto_advance", true),
                )
                .await?;
            to_json(&polled)
        }

        "ack_event" => to_json(&engine.ack_event(
            &req_str(args, "agent")?,
            &req_str(args, "event_id")?,
        )?),

        "get_agent_cursor" => {
            let agent = req_str(args, "agent")?;
            let cursor = engine.get_agent_cursor(&agent)?;
            Ok(json!({"agent": agent, "cursor": cursor}))
        }

        "manager_cycle" => {
            let cycle = engine.manager_cycle(opt_bool(args, "strict", false)).await?;
            to_json(&cycle)
        }

        "reassign_stale_tasks" => {
            let source = source_or_leader(engine, args)?;
            let reassigned = engine.reassign_stale_tasks(
                &source,
                opt_u64(args, "stale_after_seconds", 600),
                opt_bool(args, "include_blocked", true),
            )?;
            to_json(&reassigned)
        }

        "decide_architecture" => {
            let options: Vec<String> = req_parsed(args, "options")?;
            let votes: BTreeMap<String, String> = req_parsed(args, "votes")?;
            let rationale: BTreeMap<String, String> =
                opt_parsed(args, "rationale")?.unwrap_or_default();
            let outcome = engine.record_architecture_decision(
                &req_str(args, "topic")?,
                &options,
                &votes,
                &rationale,
            )?;
            to_json(&outcome)
        }

        "list_audit_logs" => {
            let logs = engine.bus().read_audit(
                opt_u64(args, "limit", 100) as usize,
                opt_str(args, "tool").as_deref(),
                opt_str(args, "status").as_deref(),
            )?;
            to_json(&logs)
        }

        "enable_debug_logging" => {
            let source = source_or_leader(engine, args)?;
            let window = engine
                .enable_debug_logging(opt_u64(args, "duration_minutes", 15), &source);
            Ok(json!({
                "ok": true,
                "message": "Debug logging enabled for tool calls",
                "debug_window": window,
                "query_hint": {
                    "tool": "list_audit_logs",
                    "note": "Search category=tool_debug_trace in bus/audit.jsonl for full traces.",
                },
            }))
        }

        "debug_logging_status" => to_json(&engine.debug_window_state()),

        "live_status_report" => {
            let status_args: LiveStatusArgs = parsed("arguments", args)?;
            to_json(&engine.live_status_report(&status_args)?)
        }

        other => Err(EngineError::Validation(format!("Unknown tool: {other}"))),
    }
}

/// `submit_report`: a rejected ingest becomes a pending retry entry instead
/// of an error; with auto-validation enabled a strict manager cycle runs
/// inline and the reporter's next task is auto-claimed.
async fn submit_report<C: Clock>(
    ctx: &ServerCtx<C>,
    args: &Value,
) -> Result<Value, EngineError> {
    let engine = &ctx.engine;
    let agent = req_str(args, "agent")?;
    let test_summary: TestSummary = req_parsed(args, "test_summary")?;
    let report = Report {
        task_id: TaskId::from_string(req_str(args, "task_id")?),
        agent: agent.clone(),
        commit_sha: req_str_allow_empty(args, "commit_sha")?,
        status: req_str(args, "status")?,
        test_summary,
        artifacts: opt_str_list(args, "artifacts"),
        notes: opt_str(args, "notes").unwrap_or_default(),
    };

    let mut result = match engine.ingest_report(&report) {
        Ok(accepted) => to_json(&accepted)?,
        Err(error) => {
            let message = error.to_string();
            let entry = engine.enqueue_report_retry(report, &message)?;
            json!({
                "queued_for_retry": true,
                "queue_entry": entry,
                "submit_error": message,
            })
        }
    };

    if engine.policy().auto_validate_on_submit() {
        let cycle = engine.manager_cycle(true).await?;
        // Best-effort: a reporter whose own claim is rejected still gets the
        // submit outcome, just without a follow-up task.
        let auto_claim = engine.claim_next(&agent).unwrap_or_default();
        result = json!({
            "report": result,
            "auto_manager_cycle": {
                "enabled": true,
                "processed_reports": cycle.processed_reports,
                "pending_total": cycle.pending_total,
            },
            "auto_claim_next": auto_claim,
        });
    }
    Ok(result)
}

fn guide_payload<C: Clock>(engine: &Engine<C>) -> Result<Value, EngineError> {
    let roles = engine.roles()?;
    Ok(json!({
        "purpose": "Tool-first multi-agent orchestration for leader/team-member loops.",
        "roles": {
            "manager": &roles.leader,
            "team_members": &roles.team_members,
        },
        "required_sequences": {
            "manager": [
                "bootstrap",
                "create_task (repeat per work unit)",
                "list_blockers (ask the user for required inputs)",
                "resolve_blocker (write the decision back)",
                "manager_cycle (poll until no pending tasks)",
                "decide_architecture (when a decision is required)",
            ],
            "team_member": [
                "connect_to_leader",
                "claim_next_task",
                "poll_events (wait for leader instructions)",
                "implement + test + commit",
                "submit_report",
                "raise_blocker (when blocked on missing input/access/decision)",
            ],
        },
        "report_contract": {
            "required_fields": [
                "task_id",
                "agent",
                "commit_sha",
                "status",
                "test_summary.command",
                "test_summary.passed",
                "test_summary.failed",
            ],
        },
        "notes": [
            "Never claim done without submit_report.",
            "The leader validates every reported task.",
            "Validation failure opens the bug loop; pass closes the task and related bugs.",
            "Use raise_blocker for any user-dependent decision or access issue.",
        ],
    }))
}

fn status_payload<C: Clock>(ctx: &ServerCtx<C>) -> Result<Value, EngineError> {
    let engine = &ctx.engine;
    let tasks = engine.list_tasks(None, None)?;
    let bugs = engine.list_bugs(None, None)?;
    let agents = engine.list_agents(true, None, false)?;
    let roles = engine.roles()?;
    let live = engine.live_status_report(&LiveStatusArgs::default())?;

    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    for task in &tasks {
        *by_status.entry(task.status.to_string()).or_default() += 1;
    }

    let mut payload = json!({
        "server": super::SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "root_name": engine
            .root()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "policy_name": engine.policy().name,
        "manager": &roles.leader,
        "roles": &roles,
        "task_count": tasks.len(),
        "task_status_counts": by_status,
        "bug_count": bugs.len(),
        "active_agents": agents.iter().map(|view| &view.agent).collect::<Vec<_>>(),
        "active_agent_contexts": agents
            .iter()
            .map(|view| {
                json!({
                    "agent": &view.agent,
                    "status": view.status,
                    "project_root": &view.project_root,
                    "cwd": &view.cwd,
                })
            })
            .collect::<Vec<_>>(),
        "live_status_text": live.report_text,
        "live_status": live.report,
        "agent_connection_contexts": live.agent_connection_contexts,
        "recommended_status_cadence_seconds": live.recommended_cadence_seconds,
        "auto_manager_cycle": {
            "running": ctx.auto_cycle.is_some(),
            "interval_seconds": ctx.auto_cycle.map(|interval| interval.as_secs()),
        },
    });
    if ctx.verbose_paths {
        if let Some(object) = payload.as_object_mut() {
            object.insert("root".to_string(), json!(engine.root().display().to_string()));
            object.insert(
                "policy".to_string(),
                json!(ctx.policy_path.display().to_string()),
            );
        }
    }
    Ok(payload)
}

fn audit<C: Clock>(
    ctx: &ServerCtx<C>,
    tool: &str,
    args: &Value,
    status: &str,
    result: Option<&Value>,
    error: Option<&str>,
) {
    // Best-effort: an unwritable audit log must not fail the call.
    let _ = ctx.engine.bus().append_audit(&json!({
        "category": "tool_call",
        "tool": tool,
        "status": status,
        "args": redact(args),
        "result": result.map(redact),
        "error": error,
    }));
}

#[allow(clippy::too_many_arguments)]
fn debug_trace<C: Clock>(
    ctx: &ServerCtx<C>,
    tool: &str,
    request_id: &Value,
    args: &Value,
    status: &str,
    started: std::time::Instant,
    result: Option<&Value>,
    error: Option<&str>,
) {
    let window = ctx.engine.debug_window_state();
    if !window.enabled {
        return;
    }
    let _ = ctx.engine.bus().append_audit(&json!({
        "category": "tool_debug_trace",
        "tool": tool,
        "request_id": request_id.to_string(),
        "status": status,
        "duration_ms": started.elapsed().as_millis() as u64,
        "args": redact(args),
        "result": result.map(redact),
        "error": error,
        "debug_window": window,
    }));
}

/// Replace values under sensitive keys, recursively.
fn redact(value: &Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, item)| {
                    let lowered = key.to_lowercase();
                    if REDACT_KEYS.iter().any(|marker| lowered.contains(marker)) {
                        (key.clone(), json!("***redacted***"))
                    } else {
                        (key.clone(), redact(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value)
        .map_err(|error| EngineError::Storage(fm_storage::StorageError::Json(error)))
}

fn req_str(args: &Value, key: &str) -> Result<String, EngineError> {
    match args.get(key).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(EngineError::Validation(format!(
            "missing required argument: {key}"
        ))),
    }
}

/// Required string that may be empty — emptiness is judged downstream so the
/// failure lands in the retry queue rather than on the caller.
fn req_str_allow_empty(args: &Value, key: &str) -> Result<String, EngineError> {
    match args.get(key).and_then(Value::as_str) {
        Some(value) => Ok(value.to_string()),
        None => Err(EngineError::Validation(format!(
            "missing required argument: {key}"
        ))),
    }
}

fn req_bool(args: &Value, key: &str) -> Result<bool, EngineError> {
    args.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| EngineError::Validation(format!("missing required argument: {key}")))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|value| !value.trim().is_empty())
}

fn opt_bool(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn opt_u64(args: &Value, key: &str, default: u64) -> u64 {
    args.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn opt_map(args: &Value, key: &str) -> Map<String, Value> {
    args.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn opt_str_list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn req_str_list(args: &Value, key: &str) -> Result<Vec<String>, EngineError> {
    match args.get(key) {
        Some(Value::Array(_)) => Ok(opt_str_list(args, key)),
        _ => Err(EngineError::Validation(format!(
            "missing required argument: {key}"
        ))),
    }
}

fn parsed<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, EngineError> {
    serde_json::from_value(value.clone())
        .map_err(|error| EngineError::Validation(format!("invalid {key}: {error}")))
}

fn req_parsed<T: DeserializeOwned>(args: &Value, key: &str) -> Result<T, EngineError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(EngineError::Validation(format!(
            "missing required argument: {key}"
        ))),
        Some(value) => parsed(key, value),
    }
}

fn opt_parsed<T: DeserializeOwned>(args: &Value, key: &str) -> Result<Option<T>, EngineError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parsed(key, value).map(Some),
    }
}

fn source_or_leader<C: Clock>(
    engine: &Engine<C>,
    args: &Value,
) -> Result<String, EngineError> {
    match opt_str(args, "source") {
        Some(source) => Ok(source),
        None => engine.leader(),
    }
}

/// Tool registry exposed by `tools/list`.
pub(crate) fn tool_specs() -> Vec<Value> {
    fn spec(name: &str, description: &str, schema: Value) -> Value {
        json!({"name": name, "description": description, "inputSchema": schema})
    }
    fn empty() -> Value {
        json!({"type": "object", "properties": {}})
    }
    fn object(properties: Value, required: &[&str]) -> Value {
        if required.is_empty() {
            json!({"type": "object", "properties": properties})
        } else {
            json!({"type": "object", "properties": properties, "required": required})
        }
    }

    vec![
        spec(
            "guide",
            "Return the orchestration playbook: roles, required sequences, and the report contract.",
            empty(),
        ),
        spec(
            "status",
            "Redacted orchestrator status plus the ready-to-paste live status report. Set ORCHESTRATOR_STATUS_VERBOSE_PATHS=1 for full paths.",
            empty(),
        ),
        spec(
            "get_roles",
            "Current role assignments (leader, team_members). Leader defaults from policy.",
            empty(),
        ),
        spec(
            "set_role",
            "Leader-only runtime role change. role=leader or role=team_member.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "role": {"type": "string", "description": "leader|team_member"},
                    "source": {"type": "string"},
                }),
                &["agent", "role", "source"],
            ),
        ),
        spec(
            "register_agent",
            "Register an agent in the collaboration pool.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "metadata": {
                        "type": "object",
                        "default": {},
                        "description": "Identity payload; recognized keys include client, model, cwd, project_root, session_id.",
                    },
                }),
                &["agent"],
            ),
        ),
        spec(
            "heartbeat",
            "Update the last-seen heartbeat for an agent, shallow-merging metadata.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "metadata": {"type": "object", "default": {}},
                }),
                &["agent"],
            ),
        ),
        spec(
            "connect_team_members",
            "Leader one-shot activation handshake. Connected means active, verified, and same-project.",
            object(
                json!({
                    "source": {"type": "string", "description": "Leader agent id."},
                    "team_members": {"type": "array", "items": {"type": "string"}},
                    "timeout_seconds": {"type": "integer", "default": 60},
                    "poll_interval_seconds": {"type": "integer", "default": 2},
                    "stale_after_seconds": {"type": "integer", "default": 600},
                }),
                &["source", "team_members"],
            ),
        ),
        spec(
            "connect_to_leader",
            "Team-member attach flow with identity verification. connected=true only for a verified, same-project caller.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "metadata": {
                        "type": "object",
                        "default": {},
                        "description": "Required for verified=true: client, model, cwd, permissions_mode, sandbox_mode, session_id, connection_id, server_version, verification_source.",
                    },
                    "status": {"type": "string", "default": "idle"},
                    "announce": {"type": "boolean", "default": true},
                    "source": {"type": "string", "description": "Must match agent unless the leader overrides."},
                    "project_override": {"type": "string", "description": "Leader-only project_root correction."},
                }),
                &["agent"],
            ),
        ),
        spec(
            "set_agent_project_context",
            "Leader-only project context correction used by same-project verification.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "project_root": {"type": "string"},
                    "cwd": {"type": "string", "description": "Defaults to project_root."},
                    "source": {"type": "string"},
                }),
                &["agent", "project_root", "source"],
            ),
        ),
        spec(
            "list_agents",
            "List registered agents with active/offline status, identity, and verification details.",
            object(
                json!({
                    "active_only": {"type": "boolean", "default": false},
                    "stale_after_seconds": {"type": "integer", "default": 600},
                }),
                &[],
            ),
        ),
        spec(
            "discover_agents",
            "Registered agents plus names inferred from events and task ownership.",
            object(
                json!({
                    "active_only": {"type": "boolean", "default": false},
                    "stale_after_seconds": {"type": "integer", "default": 600},
                }),
                &[],
            ),
        ),
        spec(
            "bootstrap",
            "Initialize orchestrator state for a new project session. Call once before creating tasks.",
            empty(),
        ),
        spec(
            "create_task",
            "Create a task, routing the owner via policy unless an owner override is given.",
            object(
                json!({
                    "title": {"type": "string"},
                    "workstream": {"type": "string", "description": "backend|frontend|qa|devops|default"},
                    "description": {"type": "string", "default": ""},
                    "acceptance_criteria": {"type": "array", "items": {"type": "string"}},
                    "owner": {"type": "string", "description": "Optional explicit owner override."},
                }),
                &["title", "workstream"],
            ),
        ),
        spec(
            "dedupe_tasks",
            "Close duplicate open tasks (same normalized title/workstream/owner), keeping the oldest.",
            object(json!({"source": {"type": "string"}}), &[]),
        ),
        spec(
            "list_tasks",
            "List tasks, optionally filtered by status or owner.",
            object(
                json!({
                    "status": {"type": "string", "description": "assigned|in_progress|blocked|reported|bug_open|done|duplicate_closed"},
                    "owner": {"type": "string"},
                }),
                &[],
            ),
        ),
        spec(
            "get_tasks_for_agent",
            "Tasks owned by one agent, optionally filtered by status.",
            object(
                json!({"agent": {"type": "string"}, "status": {"type": "string"}}),
                &["agent"],
            ),
        ),
        spec(
            "claim_next_task",
            "Claim the next assigned or bug_open task for an agent and move it to in_progress.",
            object(json!({"agent": {"type": "string"}}), &["agent"]),
        ),
        spec(
            "set_claim_override",
            "Leader-enforced claim target: the agent's next claim picks this task first.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "task_id": {"type": "string"},
                    "source": {"type": "string"},
                }),
                &["agent", "task_id", "source"],
            ),
        ),
        spec(
            "update_task_status",
            "Free-form lifecycle status change. Not for completion: use submit_report.",
            object(
                json!({
                    "task_id": {"type": "string"},
                    "status": {"type": "string"},
                    "source": {"type": "string"},
                    "note": {"type": "string", "default": ""},
                }),
                &["task_id", "status", "source"],
            ),
        ),
        spec(
            "submit_report",
            "Submit a delivery report. Mandatory before claiming completion; rejected reports queue for retry.",
            object(
                json!({
                    "task_id": {"type": "string"},
                    "agent": {"type": "string", "description": "Must match the task owner."},
                    "commit_sha": {"type": "string"},
                    "status": {"type": "string", "description": "done|blocked|needs_review"},
                    "test_summary": {
                        "type": "object",
                        "properties": {
                            "command": {"type": "string"},
                            "passed": {"type": "integer"},
                            "failed": {"type": "integer"},
                        },
                        "required": ["command", "passed", "failed"],
                    },
                    "artifacts": {"type": "array", "items": {"type": "string"}},
                    "notes": {"type": "string", "default": ""},
                }),
                &["task_id", "agent", "commit_sha", "status", "test_summary"],
            ),
        ),
        spec(
            "validate_task",
            "Leader validation. passed=true closes the task and its bugs; passed=false opens the bug loop.",
            object(
                json!({
                    "task_id": {"type": "string"},
                    "passed": {"type": "boolean"},
                    "notes": {"type": "string"},
                    "source": {"type": "string"},
                }),
                &["task_id", "passed", "notes", "source"],
            ),
        ),
        spec(
            "list_bugs",
            "List validation-generated bugs, optionally filtered by status/owner.",
            object(
                json!({"status": {"type": "string"}, "owner": {"type": "string"}}),
                &[],
            ),
        ),
        spec(
            "raise_blocker",
            "Owner raises a structured blocker needing leader/user input; marks the task blocked.",
            object(
                json!({
                    "task_id": {"type": "string"},
                    "agent": {"type": "string"},
                    "question": {"type": "string"},
                    "options": {"type": "array", "items": {"type": "string"}},
                    "severity": {"type": "string", "default": "medium"},
                }),
                &["task_id", "agent", "question"],
            ),
        ),
        spec(
            "list_blockers",
            "List blockers raised by team members.",
            object(
                json!({"status": {"type": "string"}, "agent": {"type": "string"}}),
                &[],
            ),
        ),
        spec(
            "resolve_blocker",
            "Resolve a blocker with a decision and resume the blocked task.",
            object(
                json!({
                    "blocker_id": {"type": "string"},
                    "resolution": {"type": "string"},
                    "source": {"type": "string"},
                }),
                &["blocker_id", "resolution", "source"],
            ),
        ),
        spec(
            "publish_event",
            "Publish an event to the collaboration bus.",
            object(
                json!({
                    "type": {"type": "string"},
                    "source": {"type": "string"},
                    "payload": {"type": "object", "default": {}},
                    "audience": {"type": "array", "items": {"type": "string"}},
                }),
                &["type", "source"],
            ),
        ),
        spec(
            "poll_events",
            "Poll events with cursor-based replay and optional long-poll timeout.",
            object(
                json!({
                    "agent": {"type": "string"},
                    "cursor": {"type": "integer", "description": "Defaults to the stored agent cursor."},
                    "limit": {"type": "integer", "default": 50},
                    "timeout_ms": {"type": "integer", "default": 0},
                    "auto_advance": {"type": "boolean", "default": true},
                }),
                &["agent"],
            ),
        ),
        spec(
            "ack_event",
            "Acknowledge a specific event id for an agent.",
            object(
                json!({"agent": {"type": "string"}, "event_id": {"type": "string"}}),
                &["agent", "event_id"],
            ),
        ),
        spec(
            "get_agent_cursor",
            "Current event cursor offset for an agent.",
            object(json!({"agent": {"type": "string"}}), &["agent"]),
        ),
        spec(
            "manager_cycle",
            "Run one manager cycle: drain retries, validate reports, reconnect stale owners, recover stalled tasks, publish contracts.",
            object(
                json!({"strict": {"type": "boolean", "default": false}}),
                &[],
            ),
        ),
        spec(
            "reassign_stale_tasks",
            "Reassign stale-owner tasks to other active team members so execution continues.",
            object(
                json!({
                    "source": {"type": "string"},
                    "stale_after_seconds": {"type": "integer", "default": 600},
                    "include_blocked": {"type": "boolean", "default": true},
                }),
                &[],
            ),
        ),
        spec(
            "decide_architecture",
            "Record an equal-rights architecture decision and write the ADR artifact under decisions/.",
            object(
                json!({
                    "topic": {"type": "string"},
                    "options": {"type": "array", "items": {"type": "string"}},
                    "votes": {"type": "object", "description": "{agent: option}"},
                    "rationale": {"type": "object", "description": "{agent: rationale}"},
                }),
                &["topic", "options", "votes"],
            ),
        ),
        spec(
            "list_audit_logs",
            "List append-only audit records (tool calls, status, args, results/errors).",
            object(
                json!({
                    "limit": {"type": "integer", "default": 100},
                    "tool": {"type": "string"},
                    "status": {"type": "string", "description": "ok|error"},
                }),
                &[],
            ),
        ),
        spec(
            "enable_debug_logging",
            "Enable high-detail tool debug tracing for a bounded window (default 15 minutes).",
            object(
                json!({
                    "duration_minutes": {"type": "integer", "default": 15},
                    "source": {"type": "string"},
                }),
                &[],
            ),
        ),
        spec(
            "debug_logging_status",
            "Current debug-logging window status and remaining time.",
            empty(),
        ),
        spec(
            "live_status_report",
            "Generate the leader's live status update in the percentage + pipeline format.",
            object(
                json!({
                    "overall_percent": {"type": "integer"},
                    "phase_1_percent": {"type": "integer"},
                    "phase_2_percent": {"type": "integer"},
                    "phase_3_percent": {"type": "integer"},
                    "backend_task_id": {"type": "string"},
                    "backend_percent": {"type": "integer"},
                    "frontend_task_id": {"type": "string"},
                    "frontend_percent": {"type": "integer"},
                    "qa_percent": {"type": "integer"},
                }),
                &[],
            ),
        ),
    ]
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
