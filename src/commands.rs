//! CLI command implementations

use anyhow::Context;
use std::path::{Component, Path, PathBuf};
use strata_core::{render_delta, EvolutionTracker, StrataConfig};
use strata_indexer::resolver::relative_path;
use strata_indexer::RunOptions;

use crate::render::render_report;

pub fn analyze(
    root: PathBuf,
    full: bool,
    dry_run: bool,
    graph_out: Option<PathBuf>,
    report_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = StrataConfig::load(&root).context("Failed to load configuration")?;
    let graph_path = graph_out.unwrap_or_else(|| root.join(&config.output.graph_file));
    let report_path = report_out.unwrap_or_else(|| root.join(&config.output.report_file));

    // Outputs redirected inside the root must still be left out of the scan.
    if let Some(rel) = path_within(&root, &graph_path) {
        config.output.graph_file = rel;
    }
    if let Some(rel) = path_within(&root, &report_path) {
        config.output.report_file = rel;
    }

    let options = RunOptions {
        full,
        dry_run,
        config: Some(config),
    };
    let output = strata_indexer::run(&root, &options)
        .with_context(|| format!("Failed to analyze {}", root.display()))?;

    let evolution = render_delta(&output.history);
    let report = render_report(&output.summary, evolution.as_ref());

    if dry_run {
        println!("{report}");
        return Ok(());
    }

    write_output(&graph_path, &output.export.to_json_pretty()?)?;
    write_output(&report_path, &report)?;

    tracing::info!(
        "Wrote {} ({} files, {} dependencies) and {}",
        graph_path.display(),
        output.summary.total_files,
        output.summary.total_edges,
        report_path.display()
    );
    if output.summary.skipped_count > 0 {
        tracing::warn!("{} files were skipped; see the report", output.summary.skipped_count);
    }
    Ok(())
}

pub fn evolution(root: PathBuf) -> anyhow::Result<()> {
    let config = StrataConfig::load(&root).context("Failed to load configuration")?;
    let history = EvolutionTracker::new(&root, config.history.cap).load_history();

    match render_delta(&history) {
        Some(report) => print!("{}", report.render_markdown()),
        None => println!(
            "Evolution needs at least two recorded runs ({} so far). Run `strata analyze` again later.",
            history.len()
        ),
    }
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());

    strata_core::clear_cache(&root).with_context(|| format!("Failed to clear cache in {}", root.display()))?;

    tracing::info!("Cache cleared");
    Ok(())
}

/// `path` in repository form, if it lies below `root`.
fn path_within(root: &Path, path: &Path) -> Option<String> {
    let root = std::path::absolute(root).ok()?;
    let path = std::path::absolute(path).ok()?;
    relative_path(&normalize_dots(&root), &normalize_dots(&path))
}

fn normalize_dots(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
