use std::path::PathBuf;

use arbor_core::GraphError;
use thiserror::Error;

use crate::model::SymbolId;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("failed to read workspace {path}: {source}")]
    WorkspaceLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workspace {path}: {source}")]
    WorkspaceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid project pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error("compilation unit {file} belongs to unknown assembly ({assembly})")]
    UnknownAssembly { assembly: SymbolId, file: PathBuf },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
