//! Core data structures for the code graph

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique, stable identifier for a code element.
///
/// Minted once by the owning [`CodeGraph`](crate::CodeGraph) and never reused
/// for the lifetime of that graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminates what kind of code entity an element represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    // ── Structural ──────────────────────────────────────────
    Assembly,
    Namespace,

    // ── Types ───────────────────────────────────────────────
    Class,
    Struct,
    Interface,
    Record,
    Enum,
    Delegate,

    // ── Members ─────────────────────────────────────────────
    Method,
    Property,
    Field,
    Event,
}

impl ElementKind {
    /// Whether elements of this kind are types (can own members).
    pub fn is_type(self) -> bool {
        matches!(
            self,
            ElementKind::Class
                | ElementKind::Struct
                | ElementKind::Interface
                | ElementKind::Record
                | ElementKind::Enum
                | ElementKind::Delegate
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What kind of relationship a dependency represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    Calls,
    Creates,
    Uses,
    Inherits,
    Implements,
    Overrides,
    UsesAttribute,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A position in source. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A typed, directed edge between two code elements.
///
/// Owned by its source element. The target may dangle after a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub source: ElementId,
    pub target: ElementId,
    pub kind: DependencyKind,
    /// Where in source this relationship is expressed.
    pub source_locations: BTreeSet<SourceLocation>,
}

impl Dependency {
    pub fn new(source: ElementId, target: ElementId, kind: DependencyKind) -> Self {
        Dependency {
            source,
            target,
            kind,
            source_locations: BTreeSet::new(),
        }
    }

    /// Whether this edge touches any of the given ids.
    pub fn touches(&self, ids: &HashSet<ElementId>) -> bool {
        ids.contains(&self.source) || ids.contains(&self.target)
    }
}

/// A single node in the code graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    pub full_name: String,
    pub parent: Option<ElementId>,
    pub children: BTreeSet<ElementId>,
    pub dependencies: Vec<Dependency>,
    pub source_locations: BTreeSet<SourceLocation>,
    pub attributes: BTreeSet<String>,
}

impl CodeElement {
    pub fn new(
        id: ElementId,
        kind: ElementKind,
        name: impl Into<String>,
        full_name: impl Into<String>,
        parent: Option<ElementId>,
    ) -> Self {
        CodeElement {
            id,
            kind,
            name: name.into(),
            full_name: full_name.into(),
            parent,
            children: BTreeSet::new(),
            dependencies: Vec::new(),
            source_locations: BTreeSet::new(),
            attributes: BTreeSet::new(),
        }
    }

    /// Copy identity, kind, names, locations and attributes.
    /// Hierarchy links and dependencies are not carried over.
    pub fn clone_detached(&self) -> Self {
        CodeElement {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            parent: None,
            children: BTreeSet::new(),
            dependencies: Vec::new(),
            source_locations: self.source_locations.clone(),
            attributes: self.attributes.clone(),
        }
    }

    /// Find an outgoing dependency by target and kind.
    pub fn dependency(&self, target: ElementId, kind: DependencyKind) -> Option<&Dependency> {
        self.dependencies
            .iter()
            .find(|d| d.target == target && d.kind == kind)
    }
}
