//! CLI command definitions for the `sforge` binary.
//!
//! Uses clap derive macros for argument parsing. Every command except
//! `completions` loads the skills directory into a fresh registry first.

pub mod skill;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value;

/// Discover, compose, and run skills from a skills directory.
#[derive(Parser)]
#[command(name = "sforge", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Skills directory (overrides `skills_dir` in config.toml).
    #[arg(long, global = true, env = "SKILLFORGE_SKILLS_DIR")]
    pub skills_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List loaded skills with short descriptions.
    #[command(alias = "ls")]
    List {
        /// Only show skills carrying this tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show the full activation payload of a skill.
    Show {
        /// Skill identifier.
        id: String,
    },

    /// Execute a skill.
    Run {
        /// Skill identifier.
        id: String,

        /// Parameter as key=value; the value is parsed as JSON when possible.
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Build a composite skill from loaded skills and register it.
    #[command(group(ArgGroup::new("mode").required(true).args(["sequential", "parallel"])))]
    Compose {
        /// Identifier of the new composite.
        id: String,

        /// Component skill identifiers, in order.
        #[arg(required = true, num_args = 1..)]
        components: Vec<String>,

        /// Run components in order, stopping at the first failure.
        #[arg(long)]
        sequential: bool,

        /// Run all components concurrently and collect every result.
        #[arg(long)]
        parallel: bool,

        /// Execute the composite right after registering it.
        #[arg(long)]
        then_run: bool,

        /// Parameter passed to every component when running.
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Load every skill and report per-skill outcomes.
    Check,

    /// Load every skill, then reload skills as their directories change.
    Watch,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse `key=value`. Values that are valid JSON keep their type; anything
/// else is taken as a string.
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{raw}': expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid parameter '{raw}': empty key"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_param_keeps_json_types() {
        assert_eq!(parse_param("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert_eq!(parse_param("flag=true").unwrap(), ("flag".to_string(), json!(true)));
        assert_eq!(
            parse_param("obj={\"a\":1}").unwrap(),
            ("obj".to_string(), json!({"a": 1}))
        );
        assert_eq!(
            parse_param("name=hello world").unwrap(),
            ("name".to_string(), json!("hello world"))
        );
        assert_eq!(parse_param("eq=a=b").unwrap(), ("eq".to_string(), json!("a=b")));
        assert_eq!(parse_param("empty=").unwrap(), ("empty".to_string(), json!("")));
    }

    #[test]
    fn parse_param_rejects_malformed() {
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=3").is_err());
    }

    #[test]
    fn compose_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["sforge", "compose", "combo", "a", "b"]).is_err());
        assert!(
            Cli::try_parse_from(["sforge", "compose", "combo", "a", "--sequential", "--parallel"])
                .is_err()
        );

        let cli = Cli::try_parse_from(["sforge", "compose", "combo", "a", "b", "--parallel", "--then-run"])
            .unwrap();
        match cli.command {
            Commands::Compose {
                components,
                parallel,
                sequential,
                then_run,
                ..
            } => {
                assert_eq!(components, ["a", "b"]);
                assert!(parallel && !sequential && then_run);
            }
            _ => panic!("expected compose"),
        }
    }

    #[test]
    fn run_collects_params() {
        let cli = Cli::try_parse_from(["sforge", "--json", "run", "echo", "-p", "x=1", "--param", "y=two"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run { id, params } => {
                assert_eq!(id, "echo");
                assert_eq!(params, vec![("x".to_string(), json!(1)), ("y".to_string(), json!("two"))]);
            }
            _ => panic!("expected run"),
        }
    }
}
