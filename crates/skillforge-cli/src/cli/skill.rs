//! Skill command handlers: list, show, run, compose, check, and watch.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::Value;
use skillforge_core::skill::definition::DefinitionSkill;
use skillforge_core::skill::{CompositionMode, LoadFailure};
use skillforge_infra::skill::scanner::SKILL_FILE;
use skillforge_infra::skill::start_skill_watcher;
use skillforge_types::skill::{SkillParams, SkillResult};
use tracing::Instrument;
use uuid::Uuid;

use crate::state::{AppState, LoadSummary};

/// Output switches shared by every handler.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub async fn handle_list(state: &AppState, tag: Option<&str>, out: Output) -> Result<bool> {
    load_quietly(state).await?;

    let summaries: Vec<_> = state
        .registry
        .list_summaries(state.config.summary_description_limit)
        .into_iter()
        .filter(|s| tag.is_none_or(|t| s.tags.iter().any(|st| st == t)))
        .collect();

    if out.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(true);
    }
    if out.quiet {
        return Ok(true);
    }

    if summaries.is_empty() {
        println!();
        println!(
            "  No skills found in {}.",
            style(state.scanner.root().display()).bold()
        );
        println!();
        return Ok(true);
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(Color::Cyan),
            Cell::new("Version"),
            Cell::new("Tags"),
            Cell::new("Description"),
        ]);

    for s in &summaries {
        table.add_row(vec![
            Cell::new(&s.id).fg(Color::Green),
            Cell::new(&s.version),
            Cell::new(s.tags.join(", ")),
            Cell::new(&s.description),
        ]);
    }

    println!("{table}");
    println!(
        "  {} skill(s) from {}",
        summaries.len(),
        style(state.scanner.root().display()).dim()
    );
    Ok(true)
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

pub async fn handle_show(state: &AppState, id: &str, out: Output) -> Result<bool> {
    load_quietly(state).await?;

    let Some(activation) = state.registry.activate(id) else {
        bail!("Skill '{id}' is not loaded. Run 'sforge check' to see why.");
    };

    if out.json {
        println!("{}", serde_json::to_string_pretty(&activation)?);
        return Ok(true);
    }
    if out.quiet {
        return Ok(true);
    }

    println!();
    println!(
        "  {} {}",
        style(&activation.name).bold().cyan(),
        style(format!("v{}", activation.version)).dim()
    );
    println!("  {}", activation.description);
    if !activation.dependencies.is_empty() {
        println!(
            "  {} {}",
            style("Depends on:").bold(),
            activation.dependencies.join(", ")
        );
    }
    let dependents = state.registry.dependents_of(id);
    if !dependents.is_empty() {
        println!("  {} {}", style("Used by:").bold(), dependents.join(", "));
    }
    for dir in &activation.resource_dirs {
        println!("  {} {}", style("Resources:").bold(), dir.display());
    }
    if !activation.body.is_empty() {
        println!();
        println!("{}", activation.body.trim_end());
    }
    println!();
    Ok(true)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub async fn handle_run(
    state: &AppState,
    id: &str,
    params: Vec<(String, Value)>,
    out: Output,
) -> Result<bool> {
    load_quietly(state).await?;
    run_and_print(state, id, params.into_iter().collect(), out).await
}

async fn run_and_print(state: &AppState, id: &str, params: SkillParams, out: Output) -> Result<bool> {
    let span = tracing::info_span!("sforge.run", run_id = %Uuid::now_v7(), skill = %id);
    let result = state
        .registry
        .execute(id, &state.ctx, &params)
        .instrument(span)
        .await?;

    print_result(id, &result, out)?;
    Ok(result.is_success())
}

fn print_result(id: &str, result: &SkillResult, out: Output) -> Result<()> {
    if out.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.is_success() {
        if !out.quiet {
            println!("{} {}", style("ok").green().bold(), style(id).bold());
        }
    } else {
        eprintln!(
            "{} {}: {}",
            style("failed").red().bold(),
            style(id).bold(),
            result.message().unwrap_or("no message")
        );
    }
    if out.quiet {
        return Ok(());
    }

    match result.data() {
        Some(Value::String(text)) => println!("{}", text.trim_end()),
        Some(data) => println!("{}", serde_json::to_string_pretty(data)?),
        None => {}
    }
    if result.is_success() {
        if let Some(message) = result.message() {
            println!("{}", style(message).dim());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Compose
// ---------------------------------------------------------------------------

pub async fn handle_compose(
    state: &AppState,
    id: &str,
    components: Vec<String>,
    mode: CompositionMode,
    then_run: bool,
    params: Vec<(String, Value)>,
    out: Output,
) -> Result<bool> {
    load_quietly(state).await?;

    let built = match mode {
        CompositionMode::Sequential => state.composer.sequential(id, components, &state.ctx).await,
        CompositionMode::Parallel => state.composer.parallel(id, components, &state.ctx).await,
    };
    built.with_context(|| format!("Failed to build composite '{id}'"))?;

    if then_run {
        return run_and_print(state, id, params.into_iter().collect(), out).await;
    }

    let activation = state
        .registry
        .activate(id)
        .with_context(|| format!("Composite '{id}' disappeared after registration"))?;
    if out.json {
        println!("{}", serde_json::to_string_pretty(&activation)?);
    } else if !out.quiet {
        println!(
            "{} {mode} composite {} over {}",
            style("Built").green().bold(),
            style(id).bold(),
            activation.dependencies.join(", ")
        );
        println!(
            "  {}",
            style("Composites live for this invocation only; use --then-run to execute.").dim()
        );
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

pub async fn handle_check(state: &AppState, out: Output) -> Result<bool> {
    let summary = state.load_skills().await?;
    let rows = check_rows(&summary);
    let healthy = summary.failed() == 0;

    if out.json {
        let json: Vec<Value> = rows
            .iter()
            .map(|(id, reason)| {
                serde_json::json!({
                    "id": id,
                    "loaded": reason.is_none(),
                    "reason": reason,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(healthy);
    }

    if !out.quiet {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Id").fg(Color::Cyan),
                Cell::new("Status"),
                Cell::new("Reason"),
            ]);
        for (id, reason) in &rows {
            let status = match reason {
                None => Cell::new("loaded").fg(Color::Green),
                Some(_) => Cell::new("failed").fg(Color::Red),
            };
            table.add_row(vec![
                Cell::new(id),
                status,
                Cell::new(reason.as_deref().unwrap_or("")),
            ]);
        }
        println!("{table}");
    }

    let line = format!("{} loaded, {} failed", summary.loaded(), summary.failed());
    if healthy {
        if !out.quiet {
            println!("  {}", style(line).green());
        }
    } else {
        eprintln!("  {}", style(line).red());
    }
    Ok(healthy)
}

/// One `(id, failure reason)` row per scanned skill, sorted by id.
fn check_rows(summary: &LoadSummary) -> Vec<(String, Option<String>)> {
    let mut rows: Vec<(String, Option<String>)> = summary
        .outcomes
        .iter()
        .map(|(id, outcome)| (id.clone(), outcome.as_ref().err().map(describe_failure)))
        .chain(
            summary
                .skipped
                .iter()
                .map(|(dir, reason)| (dir.clone(), Some(reason.clone()))),
        )
        .collect();
    rows.sort();
    rows
}

fn describe_failure(failure: &LoadFailure) -> String {
    match failure {
        LoadFailure::Cycle(members) => format!("part of a dependency cycle ({})", members.join(", ")),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// What the watcher did for one changed skill directory.
#[derive(Debug, PartialEq, Eq)]
pub enum WatchAction {
    Reloaded,
    Unloaded,
    Failed(String),
}

pub async fn handle_watch(state: &AppState, out: Output) -> Result<bool> {
    let summary = state.load_skills().await?;
    let root = state.scanner.root().to_path_buf();
    tokio::fs::create_dir_all(&root)
        .await
        .with_context(|| format!("Failed to create {}", root.display()))?;

    let debounce = Duration::from_millis(state.config.watch.debounce_ms);
    let (_handle, mut rx) = start_skill_watcher(&root, debounce)?;

    if !out.quiet && !out.json {
        println!(
            "  Watching {} ({} loaded, {} failed). Press Ctrl-C to stop.",
            style(root.display()).bold(),
            summary.loaded(),
            summary.failed()
        );
    }

    loop {
        tokio::select! {
            changed = rx.recv() => {
                let Some(names) = changed else { break };
                for (name, action) in apply_changes(state, &names).await {
                    report_watch_action(&name, &action, out);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("skill watcher stopped");
    Ok(true)
}

/// Re-parse each changed skill directory and swap it into the registry, or
/// unload it when its definition is gone.
pub async fn apply_changes(state: &AppState, names: &BTreeSet<String>) -> Vec<(String, WatchAction)> {
    let mut actions = Vec::with_capacity(names.len());
    for name in names {
        let present = state.scanner.skill_dir(name).join(SKILL_FILE).exists();
        let action = if !present {
            if !state.registry.contains(name) {
                continue;
            }
            if state.loader.unload(name, &state.ctx).await {
                WatchAction::Unloaded
            } else {
                WatchAction::Failed(format!(
                    "still required by {}",
                    state.registry.dependents_of(name).join(", ")
                ))
            }
        } else {
            match state.scanner.load_definition(name) {
                Ok(def) => {
                    if state.loader.reload(DefinitionSkill::new(def).boxed(), &state.ctx).await {
                        WatchAction::Reloaded
                    } else {
                        WatchAction::Failed("reload rejected by the registry".to_string())
                    }
                }
                Err(e) => WatchAction::Failed(format!("{e:#}")),
            }
        };
        actions.push((name.clone(), action));
    }
    actions
}

fn report_watch_action(name: &str, action: &WatchAction, out: Output) {
    if out.json {
        let (status, reason) = match action {
            WatchAction::Reloaded => ("reloaded", None),
            WatchAction::Unloaded => ("unloaded", None),
            WatchAction::Failed(reason) => ("failed", Some(reason.as_str())),
        };
        println!("{}", serde_json::json!({"id": name, "status": status, "reason": reason}));
        return;
    }
    match action {
        WatchAction::Reloaded if !out.quiet => println!("  {} {name}", style("reloaded").green()),
        WatchAction::Unloaded if !out.quiet => println!("  {} {name}", style("unloaded").yellow()),
        WatchAction::Failed(reason) => eprintln!("  {} {name}: {reason}", style("failed").red()),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load the skills directory, logging (not printing) per-skill failures.
async fn load_quietly(state: &AppState) -> Result<()> {
    let summary = state.load_skills().await?;
    if summary.failed() > 0 {
        tracing::warn!(
            failed = summary.failed(),
            "some skills failed to load; run 'sforge check' for details"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
