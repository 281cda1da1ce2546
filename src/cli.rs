use crate::engine::HttpBackend;
use crate::error::CheckError;
use crate::model::{CheckConfig, DEFAULT_BASE_URL};
use crate::orchestrator::CheckOrchestrator;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "mention-check",
    version,
    about = "Check whether a brand is mentioned for a prompt, with optional TUI"
)]
pub struct Cli {
    /// Base URL of the evaluation backend
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Prompt to evaluate (repeat to run several checks in order)
    #[arg(long = "prompt")]
    pub prompts: Vec<String>,

    /// Brand name to look for
    #[arg(long)]
    pub brand: Option<String>,

    /// Print the history as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Per-request timeout; unlimited when unset
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Write the history as CSV after a non-interactive run
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }
}

/// Build a `CheckConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> CheckConfig {
    CheckConfig {
        base_url: args.base_url.clone(),
        timeout: args.timeout.map(Into::into),
        ..CheckConfig::default()
    }
}

/// Install the tracing subscriber.
///
/// Interactive mode owns the terminal, so without `--log-file` nothing is installed.
pub fn init_logging(args: &Cli) -> Result<()> {
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let res = match args.log_file.as_deref() {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
        None if args.is_interactive() => return Ok(()),
        None => builder
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
    };
    res.map_err(|e| anyhow::anyhow!("init logging: {e}"))
}

pub async fn run(args: Cli) -> Result<()> {
    init_logging(&args)?;
    tracing::debug!(base_url = %args.base_url, "starting");

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_one_shot(args).await;
        }
    }

    run_one_shot(args).await
}

/// Run every `--prompt` against `--brand`, then print and export the history.
async fn run_one_shot(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let backend = HttpBackend::new(&cfg)?;
    let mut orchestrator = CheckOrchestrator::new(Arc::new(backend));

    let brand = args.brand.clone().unwrap_or_default();
    let prompts = if args.prompts.is_empty() {
        vec![String::new()]
    } else {
        args.prompts.clone()
    };

    let mut failed = 0usize;
    // First rejected submission; reported only after the output is written.
    let mut rejected: Option<CheckError> = None;
    for prompt in &prompts {
        match orchestrator.submit_check(prompt, &brand).await {
            Ok(_) => {}
            Err(e) if e.is_recorded() => failed += 1,
            Err(e) => {
                rejected.get_or_insert(e);
            }
        }
    }

    let (out_tx, out_handle) = spawn_output_writer();
    if args.json {
        let out = serde_json::to_string_pretty(&orchestrator.history().records())?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(
            &brand,
            orchestrator.history(),
            orchestrator.last_error(),
        );
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    let exported = match args.export_csv.as_deref() {
        Some(path) => orchestrator.export_csv(path).map(|()| {
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Exported CSV: {}",
                path.display()
            )));
        }),
        None => Ok(()),
    };

    drop(out_tx);
    let _ = out_handle.await;

    exported?;

    if let Some(e) = rejected {
        return Err(e.into());
    }
    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} check(s) failed",
            failed,
            prompts.len()
        ));
    }
    Ok(())
}
