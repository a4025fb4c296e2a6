//! dashboard-linter CLI binary entry point.
//! Loads dashboards, resolves their lint configuration and prints results.

use clap::Parser;
use dashboard_linter::cli::{Cli, Commands};
use dashboard_linter::config::{self, ConfigurationFile, Effective};
use dashboard_linter::lint::run_lint;
use dashboard_linter::load::{expand_paths, load_dashboard};
use dashboard_linter::models::Dashboard;
use dashboard_linter::output;
use dashboard_linter::results::ResultSet;
use dashboard_linter::rules::builtin_rules;
use dashboard_linter::utils::{display_path, error_prefix, info_prefix, note_prefix};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DASHBOARD_LINTER_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", error_prefix(), msg);
    std::process::exit(2);
}

/// Dashboards sharing one configuration directory.
struct Group {
    config_dir: PathBuf,
    dashboards: Vec<Dashboard>,
}

fn group_dashboards(eff: &Effective, paths: &[PathBuf]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for path in paths {
        let dashboard = match load_dashboard(path) {
            Ok(d) => d,
            Err(e) => fail(e),
        };
        info!(path = %display_path(path), "linting dashboard");
        let dir = eff.config_dir_for(path);
        match groups.iter_mut().find(|g| g.config_dir == dir) {
            Some(g) => g.dashboards.push(dashboard),
            None => groups.push(Group {
                config_dir: dir,
                dashboards: vec![dashboard],
            }),
        }
    }
    groups
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Lint {
            paths,
            config: config_arg,
            output,
            strict,
            verbose,
        } => {
            let eff = config::resolve_effective(
                output.as_deref(),
                strict,
                verbose,
                config_arg.as_deref(),
            );
            if eff.output != "human" && eff.output != "json" {
                fail(format!("unknown output mode '{}' (expected human|json)", eff.output));
            }
            if let Some(dir) = &eff.config_dir {
                if !dir.is_dir() {
                    fail(format!("configuration directory not found: {}", display_path(dir)));
                }
                if eff.output != "json" {
                    eprintln!(
                        "{} using lint configuration from {}",
                        info_prefix(),
                        display_path(dir)
                    );
                }
            }
            let files = match expand_paths(&paths) {
                Ok(f) => f,
                Err(e) => fail(e),
            };
            let groups = group_dashboards(&eff, &files);

            let mut configs = Vec::with_capacity(groups.len());
            for g in &groups {
                match ConfigurationFile::load(&g.config_dir) {
                    Ok(c) => {
                        let found = g.config_dir.join(config::CONFIG_FILE).is_file()
                            || g.config_dir.join(config::CONFIG_FILE_TOML).is_file();
                        if eff.output != "json" && !found {
                            eprintln!(
                                "{} no lint configuration in {}; reporting every violation",
                                note_prefix(),
                                display_path(&g.config_dir)
                            );
                        }
                        configs.push(c);
                    }
                    Err(e) => {
                        warn!(dir = %g.config_dir.display(), "malformed lint configuration");
                        fail(e);
                    }
                }
            }

            let rules = builtin_rules();
            let mut all = ResultSet::new();
            for (g, c) in groups.iter().zip(configs) {
                let rs = run_lint(&rules, &g.dashboards, Some(c));
                all.extend(rs.results().iter().cloned());
            }
            output::print_lint(&all, &eff.output, eff.verbose);
            if all.maximum_severity() >= eff.failure_threshold() {
                std::process::exit(1);
            }
        }
    }
}
