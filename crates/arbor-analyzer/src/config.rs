//! Analyzer configuration (`arbor.toml`)

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};

pub const CONFIG_FILE: &str = "arbor.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Project names (glob patterns) left out of the graph.
    pub excluded_projects: Vec<String>,
    /// Report progress every N analyzed elements; 0 disables reporting.
    pub progress_stride: usize,
    /// Run dependency analysis on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            excluded_projects: Vec::new(),
            progress_stride: 10,
            parallel: false,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded analyzer config from {}", path.display());
        Ok(config)
    }

    /// Load `arbor.toml` from `root` if present, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn project_filter(&self) -> Result<ProjectFilter> {
        ProjectFilter::new(&self.excluded_projects)
    }
}

/// Decides which projects take part in an analysis.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    excluded: GlobSet,
}

impl ProjectFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(ProjectFilter {
            excluded: builder.build()?,
        })
    }

    pub fn is_included(&self, project: &str) -> bool {
        !self.excluded.is_match(project)
    }
}
