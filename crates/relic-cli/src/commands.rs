use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;

use relic_cache::{Cache, CacheLock, CheckoutStrategy, LocalCache};
use relic_index::{Index, PathSet};
use relic_stage::{Stage, StageDefinition};
use relic_types::Checksum;

use crate::cli::*;
use crate::config::Config;

const RELIC_DIR: &str = ".relic";
const CONFIG_FILE: &str = ".relic/config.toml";
const INDEX_FILE: &str = ".relic/index";
const LOCK_FILE: &str = ".relic/lock";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(_) => cmd_init(),
        Command::Commit(args) => cmd_commit(args),
        Command::Checkout(args) => cmd_checkout(args),
        Command::Status(args) => cmd_status(args),
    }
}

fn cmd_init() -> anyhow::Result<()> {
    let config = Config::default();
    fs::create_dir_all(&config.cache)
        .with_context(|| format!("creating cache directory {:?}", config.cache))?;
    config.save(Path::new(CONFIG_FILE))?;
    let index_path = Path::new(INDEX_FILE);
    if !index_path.exists() {
        fs::write(index_path, "").context("creating empty index")?;
    }
    println!(
        "{} Initialized relic project in {}",
        "✓".green().bold(),
        RELIC_DIR.bold()
    );
    Ok(())
}

fn open_project() -> anyhow::Result<(LocalCache, Index<Stage>)> {
    let config = Config::load(Path::new(CONFIG_FILE))?;
    let cache = LocalCache::new(config.cache)?;
    let index = Index::from_file(Path::new(INDEX_FILE))?;
    Ok((cache, index))
}

fn working_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("resolving working directory")
}

/// Resolve the stage paths a command operates on: the explicit arguments,
/// or every indexed stage when none are given.
fn stage_args(index: &Index<Stage>, paths: Vec<String>) -> Vec<String> {
    if paths.is_empty() {
        index.paths().map(str::to_string).collect()
    } else {
        paths
    }
}

fn cmd_commit(args: CommitArgs) -> anyhow::Result<()> {
    let strategy = if args.copy {
        CheckoutStrategy::Copy
    } else {
        CheckoutStrategy::Link
    };
    let (cache, mut index) = open_project()?;
    let _lock = CacheLock::acquire(LOCK_FILE)?;
    let working_dir = working_dir()?;

    for path in stage_args(&index, args.paths) {
        let mut stage = Stage::from_file(Path::new(&path))?;
        for artifact in &mut stage.outputs {
            cache.commit(&working_dir, artifact, strategy)?;
            println!(
                "  {} {} {}",
                "committed:".green(),
                artifact.path,
                artifact
                    .checksum
                    .as_ref()
                    .map(Checksum::short)
                    .unwrap_or("")
                    .dimmed()
            );
        }
        // Persist the updated checksums, then make sure the stage is
        // part of the index going forward.
        stage.to_file(Path::new(&path))?;
        index.register(&path);
    }
    index.to_file(Path::new(INDEX_FILE))?;
    Ok(())
}

fn cmd_checkout(args: CheckoutArgs) -> anyhow::Result<()> {
    let strategy = if args.copy {
        CheckoutStrategy::Copy
    } else {
        CheckoutStrategy::Link
    };
    let (cache, mut index) = open_project()?;
    let _lock = CacheLock::acquire(LOCK_FILE)?;
    let working_dir = working_dir()?;

    // With no explicit stages every indexed stage is restored anyway, so
    // the single-stage flag has nothing to scope and is ignored.
    let mut single_stage = args.single_stage;
    let paths = if args.paths.is_empty() {
        single_stage = false;
        stage_args(&index, Vec::new())
    } else {
        args.paths
    };

    tracing::debug!(stages = paths.len(), %strategy, "starting checkout");
    let mut checked_out = PathSet::new();
    for path in &paths {
        let mut in_progress = PathSet::new();
        index.checkout(
            path,
            &cache,
            &working_dir,
            strategy,
            !single_stage,
            &mut checked_out,
            &mut in_progress,
        )?;
        println!("  {} {}", "restored:".green(), path);
    }
    Ok(())
}

fn cmd_status(args: StatusArgs) -> anyhow::Result<()> {
    let (cache, index) = open_project()?;
    let working_dir = working_dir()?;

    for path in stage_args(&index, args.paths) {
        let stage = Stage::from_file(Path::new(&path))?;
        println!("{}", path.bold());
        for artifact in stage.outputs() {
            let status = cache.status(&working_dir, artifact)?;
            let label = status.to_string();
            let colored_label = if label.starts_with("up-to-date") {
                label.green()
            } else if label.starts_with("uncommitted") || label.starts_with("modified") {
                label.yellow()
            } else {
                label.red()
            };
            println!("  {}  {}", artifact.path, colored_label);
        }
    }
    Ok(())
}
