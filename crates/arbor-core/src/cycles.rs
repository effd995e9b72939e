//! Dependency cycle groups

use std::collections::HashMap;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::CodeGraph;
use crate::model::ElementId;

/// Elements that depend on each other, directly or transitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleGroup {
    /// Sorted ascending.
    pub elements: Vec<ElementId>,
}

/// Project the live dependency edges into a petgraph `DiGraph`.
/// Dangling edges (target removed) are skipped.
pub fn dependency_digraph(graph: &CodeGraph) -> (DiGraph<ElementId, ()>, HashMap<ElementId, NodeIndex>) {
    let mut digraph = DiGraph::with_capacity(graph.element_count(), graph.dependency_count());
    let mut index = HashMap::with_capacity(graph.element_count());

    for element in graph.elements() {
        index.insert(element.id, digraph.add_node(element.id));
    }
    for dependency in graph.dependencies() {
        if let (Some(&source), Some(&target)) =
            (index.get(&dependency.source), index.get(&dependency.target))
        {
            digraph.add_edge(source, target, ());
        }
    }

    (digraph, index)
}

/// Strongly connected components with more than one element, plus
/// elements that depend on themselves.
pub fn find_cycle_groups(graph: &CodeGraph) -> Vec<CycleGroup> {
    let (digraph, _) = dependency_digraph(graph);

    let mut groups: Vec<CycleGroup> = kosaraju_scc(&digraph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&idx| digraph.contains_edge(idx, idx))
        })
        .map(|component| {
            let mut elements: Vec<ElementId> =
                component.into_iter().map(|idx| digraph[idx]).collect();
            elements.sort();
            CycleGroup { elements }
        })
        .collect();

    groups.sort_by_key(|g| g.elements.first().copied());
    tracing::debug!("Found {} dependency cycle groups", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependencyKind, ElementKind};

    fn graph_with_classes(n: usize) -> (CodeGraph, Vec<ElementId>) {
        let mut graph = CodeGraph::new();
        let asm = graph
            .create_element(ElementKind::Assembly, "App", "App", None)
            .unwrap();
        let ids = (0..n)
            .map(|i| {
                graph
                    .create_element(
                        ElementKind::Class,
                        format!("C{i}"),
                        format!("App.C{i}"),
                        Some(asm),
                    )
                    .unwrap()
            })
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_mutual_dependency_forms_group() {
        let (mut graph, ids) = graph_with_classes(3);
        graph.add_dependency(ids[0], ids[1], DependencyKind::Uses, []).unwrap();
        graph.add_dependency(ids[1], ids[0], DependencyKind::Calls, []).unwrap();
        graph.add_dependency(ids[1], ids[2], DependencyKind::Uses, []).unwrap();

        let groups = find_cycle_groups(&graph);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].elements, vec![ids[0], ids[1]]);
    }

    #[test]
    fn test_acyclic_graph_has_no_groups() {
        let (mut graph, ids) = graph_with_classes(3);
        graph.add_dependency(ids[0], ids[1], DependencyKind::Uses, []).unwrap();
        graph.add_dependency(ids[1], ids[2], DependencyKind::Uses, []).unwrap();

        assert!(find_cycle_groups(&graph).is_empty());
    }

    #[test]
    fn test_self_dependency_is_a_group() {
        let (mut graph, ids) = graph_with_classes(1);
        graph.add_dependency(ids[0], ids[0], DependencyKind::Calls, []).unwrap();

        let groups = find_cycle_groups(&graph);
        assert_eq!(groups, vec![CycleGroup { elements: vec![ids[0]] }]);
    }

    #[test]
    fn test_hierarchy_is_not_a_cycle() {
        let (graph, _) = graph_with_classes(2);
        assert!(find_cycle_groups(&graph).is_empty());
    }
}
