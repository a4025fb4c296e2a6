//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dashboard-linter",
    version,
    about = "Lint Grafana dashboards",
    long_about = "dashboard-linter checks Grafana dashboards for templating and PromQL conventions.\n\nViolations can be excluded or downgraded to warnings with a .lint file next to the dashboards.",
    after_help = "Examples:\n  dashboard-linter lint dashboards/node.json\n  dashboard-linter lint 'dashboards/*.json' --strict\n  dashboard-linter lint node.json --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version
    #[command(
        about = "Show version",
        long_about = "Print the current dashboard-linter version."
    )]
    Version,
    /// Lint dashboards
    #[command(
        about = "Run lint rules",
        long_about = "Evaluate every built-in rule against each dashboard. The lint configuration is read from the dashboard's directory unless --config is given.",
        after_help = "Exit status: 0 when no result reaches the failing severity (error, or warning with --strict), 1 otherwise, 2 on usage or load errors."
    )]
    Lint {
        #[arg(required = true, help = "Dashboard JSON files or glob patterns")]
        paths: Vec<String>,
        #[arg(long, help = "Directory containing the .lint configuration")]
        config: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Fail on warnings as well as errors")]
        strict: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Also print passing results")]
        verbose: bool,
    },
}
