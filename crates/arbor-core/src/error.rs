use std::path::PathBuf;

use thiserror::Error;

use crate::model::ElementId;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("element not found: {0}")]
    UnknownElement(ElementId),

    #[error("moving {child} under {parent} would create a hierarchy cycle")]
    HierarchyCycle { child: ElementId, parent: ElementId },

    #[error("{child} is linked to both {first} and {second}")]
    ConflictingParent {
        child: ElementId,
        first: ElementId,
        second: ElementId,
    },

    #[error("graph file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("graph json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph binary encoding: {0}")]
    Binary(#[from] bincode::Error),
}
