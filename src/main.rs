// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use ory_finalizers::{
    config::{KubeconfigSource, SweepConfig},
    constants::DEFAULT_CRD_NAME,
    finalizers::{DefaultFinalizersHandler, FinalizersHandler, SweepReport},
};
use std::path::PathBuf;
use tracing::{debug, info};

/// Clear stuck finalizers from every instance of a CRD so it can be deleted.
#[derive(Debug, Parser)]
#[command(name = "ory-finalizers", version, about)]
struct Cli {
    /// Kubeconfig file (defaults to KUBECONFIG, ~/.kube/config, then in-cluster)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// CustomResourceDefinition whose instances are swept
    #[arg(long, default_value = DEFAULT_CRD_NAME)]
    crd: String,

    /// Report what would be cleared without updating anything
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            crd_name: self.crd.clone(),
            kubeconfig: self
                .kubeconfig
                .clone()
                .map_or(KubeconfigSource::Infer, KubeconfigSource::File),
            context: self.context.clone(),
            dry_run: self.dry_run,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Completions { shell }) = &cli.command {
        clap_complete::generate(
            *shell,
            &mut Cli::command(),
            "ory-finalizers",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("ory-finalizers")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    init_logging();

    let config = cli.sweep_config();
    info!(crd = %config.crd_name, dry_run = config.dry_run, "Starting finalizer sweep");

    let report = DefaultFinalizersHandler::new()
        .find_and_delete_finalizers(&config)
        .await
        .with_context(|| format!("failed to remove finalizers for {}", config.crd_name))?;

    debug!(?report, "Finalizer sweep finished");
    print_report(&report, cli.output)?;

    Ok(())
}

/// Initialize logging on stderr so that stdout carries only the report.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json`.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

fn print_report(report: &SweepReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            for line in render_text(report) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn render_text(report: &SweepReport) -> Vec<String> {
    let Some(resource) = &report.resource else {
        return vec![format!(
            "CustomResourceDefinition {} not found, nothing to do",
            report.crd_name
        )];
    };

    let verb = if report.dry_run {
        "would clear"
    } else {
        "cleared"
    };
    let mut lines = vec![format!(
        "{resource}: {verb} finalizers on {} of {} instances",
        report.cleared.len(),
        report.instances
    )];
    lines.extend(report.cleared.iter().map(|instance| format!("  {instance}")));
    lines
}
