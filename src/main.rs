//! codectx CLI - print the code context a span of source depends on

use anyhow::Context;
use clap::{Parser, Subcommand};
use codectx::config::{load_config, ResolverConfig};
use codectx::output::is_quiet;
use codectx::symbol::LineIndex;
use codectx::ui;
use codectx::{ContextResolver, ResolveRequest, ResolvedContext};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codectx")]
#[command(version)]
#[command(about = "Scope-aware code context resolution")]
#[command(long_about = r#"
codectx finds the definitions a span of code depends on: functions it
calls, variables it reads, and what those read in turn, following
imports, requires and includes across files up to a bounded depth.

Example usage:
  codectx resolve src/main.lua --lines 10:12
  codectx resolve app/views.py --span 120:480 --json
  codectx outline src/main.lua
  codectx includes src/engine/core.cpp
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./codectx.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace folder, repeat for several (overrides the config file)
    #[arg(short, long, global = true)]
    workspace: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the context of a span
    Resolve {
        /// File containing the span
        file: PathBuf,

        /// Byte span START:END (end exclusive)
        #[arg(long, conflicts_with = "lines", required_unless_present = "lines")]
        span: Option<Span>,

        /// Line span A:B (1-based, inclusive)
        #[arg(long)]
        lines: Option<Span>,

        /// Maximum number of include hops
        #[arg(short, long)]
        depth: Option<usize>,

        /// Print the file -> items map as JSON
        #[arg(long)]
        json: bool,

        /// One list of items, deduplicated by file and line range
        #[arg(long)]
        flat: bool,
    },

    /// Show the definition tree of a file
    Outline {
        file: PathBuf,
    },

    /// Show the includes of a file and where they resolve
    Includes {
        file: PathBuf,
    },
}

/// `A:B` pair given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl FromStr for Span {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("expected START:END, got '{}'", s))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid number '{}': {}", part, e))
        };
        Ok(Self {
            start: parse(start)?,
            end: parse(end)?,
        })
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(&cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Absolute form of a command-line path, so included files and the origin share one key.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Resolve {
            file,
            span,
            lines,
            depth,
            json,
            flat,
        } => {
            let resolver = ContextResolver::new(resolver_config(cli, *depth)?);
            let file = &absolute(file);

            let request = match (span, lines) {
                (Some(span), _) => ResolveRequest::new(file, span.start, span.end),
                (None, Some(lines)) => {
                    if lines.start == 0 || lines.start > lines.end {
                        anyhow::bail!("invalid line span {}:{}", lines.start, lines.end);
                    }
                    let source = resolver
                        .load_source(file)
                        .with_context(|| format!("failed to read {}", file.display()))?;
                    let index = LineIndex::new(&source);
                    let (start, end) = (index.line_start(lines.start), index.line_end(lines.end));
                    ResolveRequest::new(file, start, end).with_source(source)
                }
                (None, None) => anyhow::bail!("either --span or --lines is required"),
            };

            let context = resolver.resolve(&request);
            if *json {
                println!("{}", serde_json::to_string_pretty(&context)?);
            } else {
                print_context(file, &request, &context, *flat, resolver.config().max_depth);
            }
        }

        Commands::Outline { file } => {
            let resolver = ContextResolver::new(resolver_config(cli, None)?);
            let file = &absolute(file);
            let outline = resolver
                .outline(file)
                .with_context(|| format!("failed to outline {}", file.display()))?;

            if !is_quiet() {
                ui::header(&format!("Outline of {}", file.display()));
            }
            let rows = outline.walk();
            if rows.is_empty() {
                ui::warn("No definitions found.");
            }
            for (depth, item) in rows {
                ui::outline_row(depth, item);
            }
        }

        Commands::Includes { file } => {
            let resolver = ContextResolver::new(resolver_config(cli, None)?);
            let file = &absolute(file);
            let includes = resolver
                .includes(file)
                .with_context(|| format!("failed to read {}", file.display()))?;

            if !is_quiet() {
                ui::header(&format!("Includes of {}", file.display()));
            }
            if includes.is_empty() {
                ui::warn("No includes found.");
            }
            for entry in &includes {
                ui::include_row(&entry.include, entry.resolved.as_deref());
            }
        }
    }

    Ok(())
}

/// Config file values, overridden by command-line flags.
fn resolver_config(cli: &Cli, depth: Option<usize>) -> anyhow::Result<ResolverConfig> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("config file {} does not exist", path.display());
        }
    }
    let mut config = load_config(cli.config.as_deref())
        .context("failed to load config")?
        .unwrap_or_default();

    if !cli.workspace.is_empty() {
        config.workspace = cli.workspace.iter().map(|folder| absolute(folder)).collect();
    }
    if let Some(depth) = depth {
        config.max_depth = depth;
    }
    tracing::debug!(?config, "resolver config");
    Ok(config)
}

fn print_context(file: &Path, request: &ResolveRequest, context: &ResolvedContext, flat: bool, max_depth: usize) {
    if !is_quiet() {
        ui::header(&format!(
            "Context for {} [{}..{})",
            file.display(),
            request.start,
            request.end
        ));
    }

    if context.is_empty() {
        ui::warn("No context found.");
        return;
    }

    if flat {
        println!();
        for (path, item) in context.deduplicated() {
            ui::item_heading(item, Some(path));
            ui::excerpt(item);
        }
    } else {
        for file in context.files() {
            ui::file_heading(&file.path);
            for item in &file.items {
                ui::item_heading(item, None);
                ui::excerpt(item);
            }
        }
    }

    if !is_quiet() {
        ui::section("Summary");
        println!(
            "{}",
            ui::summary_table(&[
                ("Files", context.files().len().to_string()),
                ("Items", context.item_count().to_string()),
                ("Max depth", max_depth.to_string()),
            ])
        );
        ui::success(&format!("Resolved {} item(s)", context.item_count()));
    }
}
