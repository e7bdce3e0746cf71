//! Markdown rendering of the summary report

use std::fmt::Write;

use strata_core::{EvolutionReport, LayerStrategy, SummaryReport};

pub fn render_report(summary: &SummaryReport, evolution: Option<&EvolutionReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Dependency Analysis\n");

    let _ = writeln!(out, "## Overview\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Files | {} |", summary.total_files);
    let _ = writeln!(out, "| Dependencies | {} |", summary.total_edges);
    let _ = writeln!(out, "| Dependencies after resolution | {} |", summary.surviving_edges);
    let _ = writeln!(out, "| Cycles | {} |", summary.cycle_count);
    let _ = writeln!(out, "| Circular clusters | {} |", summary.clusters.len());
    let _ = writeln!(out, "| Void directories | {} |", summary.void_dir_count);
    let _ = writeln!(out, "| Cache hit rate | {:.1}% |", summary.cache_hit_rate);
    let _ = writeln!(out, "| Files skipped | {} |\n", summary.skipped_count);

    if !summary.category_distribution.is_empty() {
        let _ = writeln!(out, "## Categories\n");
        for (category, count) in &summary.category_distribution {
            let _ = writeln!(out, "- **{category}:** {count}");
        }
        out.push('\n');
    }

    if !summary.top_dependents.is_empty() {
        let _ = writeln!(out, "## Most Depended-Upon Files\n");
        let _ = writeln!(out, "| File | Dependents | Category | Layer |");
        let _ = writeln!(out, "|------|------------|----------|-------|");
        for ranked in &summary.top_dependents {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} | {} |",
                ranked.path, ranked.dependents, ranked.category, ranked.layer
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Circular Dependencies\n");
    if summary.clusters.is_empty() {
        let _ = writeln!(out, "No circular dependencies found.\n");
    }
    for (i, cluster) in summary.clusters.iter().enumerate() {
        let status = if cluster.resolved { "resolved" } else { "unresolved" };
        let _ = writeln!(
            out,
            "### Cluster {} ({} files, {}, {})\n",
            i + 1,
            cluster.members.len(),
            cluster.strategy.as_str(),
            status
        );
        let members: Vec<String> = cluster.members.iter().map(|m| format!("`{m}`")).collect();
        let _ = writeln!(out, "**Members:** {}\n", members.join(", "));
        if !cluster.break_edges.is_empty() {
            let _ = writeln!(out, "**Edges broken:**\n");
            for (source, target) in &cluster.break_edges {
                let _ = writeln!(out, "- `{source}` -> `{target}`");
            }
            out.push('\n');
        }
        if !cluster.cycles.is_empty() {
            let _ = writeln!(out, "**Cycles:**\n");
            for cycle in &cluster.cycles {
                let mut path: Vec<&str> = cycle.iter().map(String::as_str).collect();
                if let Some(first) = cycle.first() {
                    path.push(first);
                }
                let _ = writeln!(out, "- {}", path.join(" -> "));
            }
            out.push('\n');
        }
    }
    if !summary.strategy_counts.is_empty() {
        let counts: Vec<String> = summary
            .strategy_counts
            .iter()
            .map(|(strategy, count)| format!("{strategy}: {count}"))
            .collect();
        let _ = writeln!(out, "**Strategies:** {}\n", counts.join(", "));
    }

    let _ = writeln!(out, "## Layers\n");
    match summary.layering.strategy {
        LayerStrategy::Topological => {
            let _ = writeln!(out, "Exact topological layering.\n");
        }
        LayerStrategy::Relaxation { passes, converged } => {
            let outcome = if converged { "converged" } else { "stopped at the pass limit" };
            let _ = writeln!(out, "Bounded relaxation: {passes} passes, {outcome}.\n");
        }
    }
    for (layer, count) in &summary.layer_histogram {
        let _ = writeln!(out, "- Layer {layer}: {count} files");
    }
    out.push('\n');
    if !summary.layering.unsettled.is_empty() {
        let _ = writeln!(out, "Files with best-effort layers:\n");
        for path in &summary.layering.unsettled {
            let _ = writeln!(out, "- `{path}`");
        }
        out.push('\n');
    }

    let validation = &summary.validation;
    let _ = writeln!(out, "## Graph Validation\n");
    let _ = writeln!(out, "- **Weakly connected:** {}", yes_no(validation.weakly_connected));
    let _ = writeln!(out, "- **Acyclic after resolution:** {}", yes_no(validation.acyclic_after_resolution));
    let _ = writeln!(
        out,
        "- **Components:** {} (largest {} files)\n",
        validation.component_count, validation.largest_component_size
    );

    if !summary.scan.void_dirs.is_empty() {
        let _ = writeln!(out, "## Void Directories\n");
        for dir in &summary.scan.void_dirs {
            let _ = writeln!(out, "- `{dir}/`");
        }
        out.push('\n');
    }

    if !summary.skipped_files.is_empty() {
        let _ = writeln!(out, "## Skipped Files\n");
        for error in &summary.skipped_files {
            let _ = writeln!(out, "- `{}` ({}): {}", error.path, error.stage, error.message);
        }
        out.push('\n');
    }

    if let Some(evolution) = evolution {
        out.push_str(&evolution.render_markdown());
    }

    out
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
