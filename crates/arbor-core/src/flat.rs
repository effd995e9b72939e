//! Flat, non-recursive records for persisting and exchanging a graph
//!
//! A graph is written as three record lists. Reading it back takes two
//! passes: elements first, then parent links and dependencies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::CodeGraph;
use crate::model::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub source_locations: BTreeSet<SourceLocation>,
    #[serde(default)]
    pub attributes: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub child: ElementId,
    pub parent: ElementId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub source: ElementId,
    pub target: ElementId,
    pub kind: DependencyKind,
    #[serde(default)]
    pub source_locations: BTreeSet<SourceLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatGraph {
    pub elements: Vec<ElementRecord>,
    pub children: Vec<ParentLink>,
    pub dependencies: Vec<DependencyRecord>,
}

impl FlatGraph {
    /// Flatten the element forest and edge lists.
    pub fn from_graph(graph: &CodeGraph) -> Self {
        let elements = graph
            .elements()
            .map(|e| ElementRecord {
                id: e.id,
                kind: e.kind,
                name: e.name.clone(),
                full_name: e.full_name.clone(),
                source_locations: e.source_locations.clone(),
                attributes: e.attributes.clone(),
            })
            .collect();

        // Links come from the child sets, so orphaned elements produce none.
        let children = graph
            .elements()
            .flat_map(|parent| {
                parent
                    .children
                    .iter()
                    .filter(|child| graph.contains(**child))
                    .map(move |&child| ParentLink {
                        child,
                        parent: parent.id,
                    })
            })
            .collect();

        let dependencies = graph
            .dependencies()
            .map(|d| DependencyRecord {
                source: d.source,
                target: d.target,
                kind: d.kind,
                source_locations: d.source_locations.clone(),
            })
            .collect();

        FlatGraph {
            elements,
            children,
            dependencies,
        }
    }

    /// Rebuild an equivalent graph.
    pub fn into_graph(self) -> Result<CodeGraph> {
        let mut graph = CodeGraph::new();

        // Pass one: elements
        for record in self.elements {
            let mut element =
                CodeElement::new(record.id, record.kind, record.name, record.full_name, None);
            element.source_locations = record.source_locations;
            element.attributes = record.attributes;
            graph.insert_element(element);
        }

        // Pass two: hierarchy and dependencies
        for link in self.children {
            let child = graph
                .element(link.child)
                .ok_or(GraphError::UnknownElement(link.child))?;
            if !graph.contains(link.parent) {
                return Err(GraphError::UnknownElement(link.parent));
            }
            // A child has exactly one parent
            if let Some(first) = child.parent.filter(|p| *p != link.parent) {
                return Err(GraphError::ConflictingParent {
                    child: link.child,
                    first,
                    second: link.parent,
                });
            }
            if let Some(parent) = graph.element_mut(link.parent) {
                parent.children.insert(link.child);
            }
            if let Some(child) = graph.element_mut(link.child) {
                child.parent = Some(link.parent);
            }
        }

        for record in self.dependencies {
            graph.add_dependency(
                record.source,
                record.target,
                record.kind,
                record.source_locations,
            )?;
        }

        Ok(graph)
    }
}

impl From<&CodeGraph> for FlatGraph {
    fn from(graph: &CodeGraph) -> Self {
        FlatGraph::from_graph(graph)
    }
}
