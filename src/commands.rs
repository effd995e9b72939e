//! CLI command implementations

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use arbor_analyzer::{Analyzer, AnalyzerConfig, Workspace};
use arbor_core::{CodeGraph, find_cycle_groups, graph_cache_path, load_graph, save_graph};

pub fn analyze(
    root: PathBuf,
    workspace: PathBuf,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => AnalyzerConfig::load(&path)?,
        None => AnalyzerConfig::discover(&root)?,
    };
    let workspace = Workspace::load(&workspace)?;

    let analyzer = Analyzer::new(config).on_progress(|progress| {
        tracing::debug!("Analyzed {}/{} elements", progress.analyzed, progress.total);
    });
    let graph = analyzer.analyze(&workspace)?;

    let out = out.unwrap_or_else(|| graph_cache_path(&root));
    save_graph(&graph, &out)?;

    tracing::info!(
        "Saved {} elements, {} dependencies to {}",
        graph.element_count(),
        graph.dependency_count(),
        out.display()
    );
    Ok(())
}

fn open_graph(root: &Path, graph: Option<PathBuf>) -> anyhow::Result<(PathBuf, CodeGraph)> {
    let path = graph.unwrap_or_else(|| graph_cache_path(root));
    let loaded = load_graph(&path).with_context(|| format!("cannot open graph {}", path.display()))?;
    Ok((path, loaded))
}

pub fn stats(root: PathBuf, graph: Option<PathBuf>) -> anyhow::Result<()> {
    let (path, graph) = open_graph(&root, graph)?;

    let mut elements = BTreeMap::new();
    for element in graph.elements() {
        *elements.entry(element.kind).or_insert(0usize) += 1;
    }
    let mut dependencies = BTreeMap::new();
    for dependency in graph.dependencies() {
        *dependencies.entry(dependency.kind).or_insert(0usize) += 1;
    }

    println!("{}", path.display());
    println!("  elements: {}", graph.element_count());
    for (kind, count) in &elements {
        println!("    {:<12} {}", kind.to_string(), count);
    }
    println!("  dependencies: {}", graph.dependency_count());
    for (kind, count) in &dependencies {
        println!("    {:<12} {}", kind.to_string(), count);
    }
    Ok(())
}

pub fn cycles(root: PathBuf, graph: Option<PathBuf>) -> anyhow::Result<()> {
    let (_, graph) = open_graph(&root, graph)?;
    let groups = find_cycle_groups(&graph);

    if groups.is_empty() {
        println!("No dependency cycles");
        return Ok(());
    }
    for (i, group) in groups.iter().enumerate() {
        println!("Cycle {} ({} elements)", i + 1, group.elements.len());
        for id in &group.elements {
            if let Some(element) = graph.element(*id) {
                println!("  {} {}", element.kind, element.full_name);
            }
        }
    }
    Ok(())
}

pub fn prune(path: PathBuf, full_names: Vec<String>) -> anyhow::Result<()> {
    let mut graph = load_graph(&path).with_context(|| format!("cannot open graph {}", path.display()))?;

    let mut ids = HashSet::new();
    for name in &full_names {
        let element = graph
            .find_by_full_name(name)
            .with_context(|| format!("no element named {name}"))?;
        ids.insert(element.id);
    }

    let removed = graph.remove_elements(&ids);
    save_graph(&graph, &path)?;

    tracing::info!("Removed {} elements from {}", removed.len(), path.display());
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());

    arbor_core::clear_cache(&root)?;

    tracing::info!("Cache cleared");
    Ok(())
}
