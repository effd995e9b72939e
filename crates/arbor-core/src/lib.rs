//! Arbor Core: code element forest, typed dependency graph, and persistence

pub mod cache;
pub mod cycles;
pub mod error;
pub mod flat;
pub mod graph;
pub mod model;

#[cfg(test)]
mod tests;

pub use cache::{CACHE_DIR, GRAPH_CACHE, GraphFile, GraphFormat, cache_dir, clear_cache, ensure_cache_dir, graph_cache_path, load_graph, save_graph};
pub use cycles::{CycleGroup, find_cycle_groups};
pub use error::{GraphError, Result};
pub use flat::{DependencyRecord, ElementRecord, FlatGraph, ParentLink};
pub use graph::CodeGraph;
pub use model::{CodeElement, Dependency, DependencyKind, ElementId, ElementKind, SourceLocation};
