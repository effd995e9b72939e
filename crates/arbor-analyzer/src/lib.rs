//! Arbor Analyzer: builds a typed, hierarchical dependency graph from a symbol provider
//!
//! The analysis runs in two phases over one provider snapshot:
//!
//! 1. **Hierarchy**: every included compilation unit contributes its
//!    declarations as elements (assembly → namespaces → types → members).
//! 2. **Dependencies**: every element is analyzed for the relationships its
//!    symbol has to other elements (calls, creations, inheritance, ...).

pub mod config;
pub mod dependencies;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod provider;
pub mod symbols;
pub mod workspace;


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_core::{CodeGraph, ElementId};
use rayon::prelude::*;
use tracing::info;

pub use config::{AnalyzerConfig, CONFIG_FILE, ProjectFilter};
pub use dependencies::{AnalysisTarget, DependencyAnalyzer, Findings, PendingDependency};
pub use error::{AnalyzerError, Result};
pub use hierarchy::{AnalysisRun, GLOBAL_NAMESPACE, TOP_LEVEL_METHOD, TOP_LEVEL_TYPE};
pub use model::*;
pub use provider::SymbolProvider;
pub use symbols::{ElementOrigin, SymbolTable, symbol_key};
pub use workspace::{Workspace, WorkspaceBuilder, WorkspaceFile};

/// Progress of the dependency phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisProgress {
    pub analyzed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(AnalysisProgress) + Send + Sync>;

pub struct Analyzer {
    config: AnalyzerConfig,
    progress: Option<ProgressCallback>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Analyzer {
            config,
            progress: None,
        }
    }

    /// Called every `progress_stride` analyzed elements.
    pub fn on_progress(mut self, callback: impl Fn(AnalysisProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run both phases and return the finished graph.
    pub fn analyze(&self, provider: &dyn SymbolProvider) -> Result<CodeGraph> {
        let filter = self.config.project_filter()?;
        let mut run = AnalysisRun::new(provider);

        info!("Phase 1: building hierarchy");
        hierarchy::build_hierarchy(&mut run, &filter)?;

        info!(
            "Phase 2: analyzing dependencies of {} elements{}",
            run.graph.element_count(),
            if self.config.parallel { " (parallel)" } else { "" }
        );
        let findings = self.collect_findings(&run);

        let mut graph = run.graph;
        for found in findings {
            found.apply(&mut graph)?;
        }

        info!(
            "Analysis complete: {} elements, {} dependencies",
            graph.element_count(),
            graph.dependency_count()
        );
        Ok(graph)
    }

    /// Analyze every element; results come back in element id order
    /// regardless of how the work was scheduled.
    fn collect_findings(&self, run: &AnalysisRun<'_>) -> Vec<Findings> {
        let analyzer = DependencyAnalyzer::new(run);
        let ids = run.graph.element_ids();
        let total = ids.len();
        let analyzed = AtomicUsize::new(0);

        let analyze = |id: &ElementId| {
            let findings = analyzer.analyze_element(*id);
            let done = analyzed.fetch_add(1, Ordering::Relaxed) + 1;
            self.report(done, total);
            findings
        };

        if self.config.parallel {
            ids.par_iter().map(analyze).collect()
        } else {
            ids.iter().map(analyze).collect()
        }
    }

    fn report(&self, analyzed: usize, total: usize) {
        let stride = self.config.progress_stride;
        if stride == 0 || analyzed % stride != 0 {
            return;
        }
        if let Some(callback) = &self.progress {
            callback(AnalysisProgress { analyzed, total });
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

/// Analyze with default configuration.
pub fn analyze(provider: &dyn SymbolProvider) -> Result<CodeGraph> {
    Analyzer::default().analyze(provider)
}
