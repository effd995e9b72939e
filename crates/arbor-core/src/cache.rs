//! Graph persistence

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::flat::FlatGraph;
use crate::graph::CodeGraph;

/// Cache directory: .arbor/
pub const CACHE_DIR: &str = ".arbor";

/// Graph cache file
pub const GRAPH_CACHE: &str = "graph.json";

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get graph cache file path
pub fn graph_cache_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(GRAPH_CACHE)
}

/// Ensure cache directory exists
pub fn ensure_cache_dir(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if !cache.exists() {
        std::fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}

/// On-disk encoding, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Binary,
}

impl GraphFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => GraphFormat::Json,
            _ => GraphFormat::Binary,
        }
    }
}

/// A saved graph with a small header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub version: String,
    pub saved_at: String,
    pub graph: FlatGraph,
}

fn io_error(path: &Path, source: std::io::Error) -> GraphError {
    GraphError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Serialize a graph to `path`, creating parent directories as needed.
pub fn save_graph(graph: &CodeGraph, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let file = GraphFile {
        version: env!("CARGO_PKG_VERSION").to_string(),
        saved_at: chrono::Utc::now().to_rfc3339(),
        graph: FlatGraph::from_graph(graph),
    };

    let bytes = match GraphFormat::from_path(path) {
        GraphFormat::Json => serde_json::to_vec_pretty(&file)?,
        GraphFormat::Binary => bincode::serialize(&file)?,
    };
    std::fs::write(path, bytes).map_err(|e| io_error(path, e))?;

    tracing::debug!(
        "Graph saved to {} ({} elements, {} dependencies)",
        path.display(),
        graph.element_count(),
        graph.dependency_count()
    );
    Ok(())
}

/// Load a graph saved with [`save_graph`].
pub fn load_graph(path: &Path) -> Result<CodeGraph> {
    let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
    let file: GraphFile = match GraphFormat::from_path(path) {
        GraphFormat::Json => serde_json::from_slice(&bytes)?,
        GraphFormat::Binary => bincode::deserialize(&bytes)?,
    };

    tracing::debug!(
        "Graph loaded from {} (saved {} by v{})",
        path.display(),
        file.saved_at,
        file.version
    );
    file.graph.into_graph()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use tempfile::TempDir;

    fn small_graph() -> CodeGraph {
        let mut graph = CodeGraph::new();
        let asm = graph
            .create_element(ElementKind::Assembly, "Lib", "Lib", None)
            .unwrap();
        let a = graph
            .create_element(ElementKind::Class, "A", "Lib.A", Some(asm))
            .unwrap();
        let b = graph
            .create_element(ElementKind::Class, "B", "Lib.B", Some(asm))
            .unwrap();
        graph
            .add_dependency(a, b, DependencyKind::Inherits, [SourceLocation::new("A.cs", 1, 1)])
            .unwrap();
        graph
    }

    #[test]
    fn test_json_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = graph_cache_path(temp_dir.path());

        save_graph(&small_graph(), &path).unwrap();
        assert!(path.exists());

        let loaded = load_graph(&path).unwrap();
        assert_eq!(loaded.element_count(), 3);
        assert_eq!(loaded.dependency_count(), 1);
    }

    #[test]
    fn test_binary_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("graph.bin");

        save_graph(&small_graph(), &path).unwrap();
        let loaded = load_graph(&path).unwrap();

        let a = loaded.find_by_full_name("Lib.A").unwrap();
        let b = loaded.find_by_full_name("Lib.B").unwrap();
        assert!(loaded.has_dependency(a.id, b.id, DependencyKind::Inherits));
    }

    #[test]
    fn test_clear_cache() {
        let temp_dir = TempDir::new().unwrap();
        ensure_cache_dir(temp_dir.path()).unwrap();
        assert!(cache_dir(temp_dir.path()).exists());

        clear_cache(temp_dir.path()).unwrap();
        assert!(!cache_dir(temp_dir.path()).exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_graph(&temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, GraphError::Io { .. }));
    }
}
