//! skillforge CLI entry point.
//!
//! Binary name: `sforge`
//!
//! Parses CLI arguments, initializes tracing and the registry, then
//! dispatches to the matching command handler.

mod cli;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use skillforge_core::skill::CompositionMode;
use skillforge_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::skill::Output;
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,skillforge_core=debug,skillforge_infra=debug",
        _ => "trace",
    };
    if let Err(e) = init_tracing(filter, cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "sforge", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let state = AppState::init(cli.skills_dir.clone()).await;
    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    let outcome = match cli.command {
        Commands::List { tag } => cli::skill::handle_list(&state, tag.as_deref(), out).await,
        Commands::Show { id } => cli::skill::handle_show(&state, &id, out).await,
        Commands::Run { id, params } => cli::skill::handle_run(&state, &id, params, out).await,
        Commands::Compose {
            id,
            components,
            parallel,
            then_run,
            params,
            ..
        } => {
            let mode = if parallel {
                CompositionMode::Parallel
            } else {
                CompositionMode::Sequential
            };
            cli::skill::handle_compose(&state, &id, components, mode, then_run, params, out).await
        }
        Commands::Check => cli::skill::handle_check(&state, out).await,
        Commands::Watch => cli::skill::handle_watch(&state, out).await,
        Commands::Completions { .. } => Ok(true),
    };

    shutdown_tracing();

    match outcome? {
        true => Ok(ExitCode::SUCCESS),
        false => Ok(ExitCode::FAILURE),
    }
}
