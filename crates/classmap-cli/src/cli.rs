//! Command-line interface for the classmap utility
//!
//! Provides a CLI to extract class diagrams from TypeScript workspaces and to
//! keep one up to date while files change.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::source::{translate_event, DirectorySource};
use classmap::core::logging::init_logging;
use classmap::core::Database;
use classmap::diagram::{DiagramModel, DiagramUpdate};
use classmap::graph::{diff, ChangeEvent};
use classmap::render_changes;
use classmap::sync::{CommitReport, SyncService, Workspace};
use classmap::{Diagnostic, SyncConfig};

/// Classmap - Keep a class diagram in sync with TypeScript sources
#[derive(Parser)]
#[command(name = "classmap")]
#[command(about = "Extract and watch class diagrams of TypeScript workspaces")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Workspace configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Output encodings
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON, one document per result
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the class diagram of a directory once
    Scan {
        /// Workspace root
        dir: PathBuf,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the changes between the diagrams of two directories
    Diff {
        /// Workspace root before the change
        old: PathBuf,

        /// Workspace root after the change
        new: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Watch a directory and print every diagram update
    Watch {
        /// Workspace root
        dir: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Exit after this many diagram updates
        #[arg(long)]
        max_updates: Option<usize>,
    },
}

/// Main CLI application
pub struct ClassmapApp {
    config: SyncConfig,
}

impl ClassmapApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Read a TOML workspace configuration
    pub fn load_config(path: &Path) -> Result<SyncConfig> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        SyncConfig::from_toml_str(&text)
            .map_err(|e| anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level_str = std::env::var("CLASSMAP_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("CLASSMAP_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Classmap v{}", env!("CARGO_PKG_VERSION"));
        }

        if let Some(path) = &cli.config {
            self.config = Self::load_config(path)?;
            if cli.verbose {
                eprintln!("Loaded config from {}", path.display());
            }
        }

        match cli.command {
            Commands::Scan {
                dir,
                output,
                format,
            } => self.scan_command(&dir, output, format, cli.verbose),
            Commands::Diff { old, new, format } => self.diff_command(&old, &new, format),
            Commands::Watch {
                dir,
                format,
                max_updates,
            } => self.watch_command(&dir, format, max_updates),
        }
    }

    /// Load every source file of `dir` and commit one run
    pub fn load_workspace(&self, dir: &Path) -> Result<(Workspace, CommitReport)> {
        let source = DirectorySource::new(dir)?;
        let mut workspace = Workspace::new(self.config.clone())?;
        workspace.load_from(&source)?;
        let report = workspace.recompute()?;
        Ok((workspace, report))
    }

    /// Handle the scan command
    fn scan_command(
        &self,
        dir: &Path,
        output: Option<PathBuf>,
        format: OutputFormat,
        verbose: bool,
    ) -> Result<()> {
        let (workspace, report) = self.load_workspace(dir)?;
        let diagram = workspace.current_diagram();

        if verbose {
            eprintln!(
                "Scanned {} files: {} nodes, {} edges",
                workspace.files().count(),
                diagram.node_count(),
                diagram.edge_count()
            );
        }

        let content = match format {
            OutputFormat::Text => {
                eprint!("{}", render_diagnostics(&report.diagnostics));
                render_text(&diagram)
            }
            OutputFormat::Json => {
                let document = serde_json::json!({
                    "version": diagram.version,
                    "diagram": diagram.as_ref(),
                    "diagnostics": report.diagnostics,
                });
                serde_json::to_string_pretty(&document)?
            }
        };
        self.write_output(output, &content)
    }

    /// Handle the diff command
    fn diff_command(&self, old: &Path, new: &Path, format: OutputFormat) -> Result<()> {
        let (before, _) = self.load_workspace(old)?;
        let (after, _) = self.load_workspace(new)?;
        let changes = diff(&before.graph(), &after.graph());
        info!(events = changes.len(), "Computed change set");

        let content = match format {
            OutputFormat::Text => render_changes(&changes),
            OutputFormat::Json => serde_json::to_string_pretty(&changes.events)?,
        };
        self.write_output(None, &content)
    }

    /// Handle the watch command
    fn watch_command(
        &self,
        dir: &Path,
        format: OutputFormat,
        max_updates: Option<usize>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.watch(dir, format, max_updates))
    }

    async fn watch(
        &self,
        dir: &Path,
        format: OutputFormat,
        max_updates: Option<usize>,
    ) -> Result<()> {
        let source = DirectorySource::new(dir)?;
        let mut workspace = Workspace::new(self.config.clone())?;
        workspace.load_from(&source)?;
        let mut known: BTreeSet<String> = workspace.files().map(str::to_string).collect();

        let service = SyncService::start(workspace);
        let mut updates = service.store().subscribe();

        let (event_tx, mut event_rx) = mpsc::channel(1024);
        let _watcher = create_fs_watcher(source.root(), event_tx)?;
        info!(root = %source.root().display(), "Watching for changes");

        service.flush().await?;

        let mut printed = 0;
        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => match event {
                    Ok(event) => {
                        for change in translate_event(&source, &event, &mut known) {
                            service.notify(change).await?;
                        }
                    }
                    Err(error) => warn!(%error, "Watcher error"),
                },
                update = updates.recv() => match update {
                    Ok(DiagramUpdate::Changed { version, events }) => {
                        print_update(version, &events, format)?;
                        printed += 1;
                        if max_updates.is_some_and(|max| printed >= max) {
                            break;
                        }
                    }
                    Ok(DiagramUpdate::NodeMoved { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped diagram updates"),
                    Err(RecvError::Closed) => break,
                },
            }
        }

        service.shutdown().await?;
        Ok(())
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let stdout_content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", stdout_content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for ClassmapApp {
    fn default() -> Self {
        Self::new()
    }
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default().with_poll_interval(Duration::from_secs(1)),
    )
    .map_err(|e| anyhow!("watcher init failed: {}", e))?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| anyhow!("failed to watch {}: {}", root.display(), e))?;
    Ok(watcher)
}

fn print_update(version: u64, events: &[ChangeEvent], format: OutputFormat) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Text => {
            writeln!(stdout, "# version {}", version)?;
            for event in events {
                writeln!(stdout, "{}", event)?;
            }
        }
        OutputFormat::Json => {
            let line = serde_json::json!({ "version": version, "events": events });
            writeln!(stdout, "{}", line)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Plain-text listing of a diagram: nodes with geometry and members, then
/// styled edges
pub fn render_text(diagram: &DiagramModel) -> String {
    let mut out = String::new();
    for node in diagram.nodes() {
        let _ = write!(out, "{} {}", node.kind, node.id);
        if node.is_abstract {
            out.push_str(" {abstract}");
        }
        if node.conflicting {
            out.push_str(" {conflict}");
        }
        let _ = writeln!(
            out,
            " @ ({}, {}) {}x{}",
            node.x, node.y, node.width, node.height
        );
        for member in &node.members {
            let _ = writeln!(out, "    {}", member);
        }
    }
    for edge in diagram.edges() {
        let _ = write!(out, "{} -[{}]-> {}", edge.source, edge.kind, edge.target);
        if let Some(multiplicity) = &edge.multiplicity {
            let _ = write!(out, " ({})", multiplicity);
        }
        let _ = writeln!(out, " [{:?} {:?}]", edge.style.line, edge.style.head);
    }
    out
}

/// One line per diagnostic
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("{}\n", d)).collect()
}
