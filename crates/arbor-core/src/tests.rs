//! Unit tests for arbor-core

use crate::*;
use std::collections::{BTreeSet, HashSet};

/// App ─┬─ Domain ─┬─ Order ── Save
///      │          └─ Customer
///      └─ Util
struct Fixture {
    graph: CodeGraph,
    app: ElementId,
    domain: ElementId,
    order: ElementId,
    save: ElementId,
    customer: ElementId,
    util: ElementId,
}

fn fixture() -> Fixture {
    let mut graph = CodeGraph::new();
    let app = graph.create_element(ElementKind::Assembly, "App", "App", None).unwrap();
    let domain = graph
        .create_element(ElementKind::Namespace, "Domain", "App.Domain", Some(app))
        .unwrap();
    let order = graph
        .create_element(ElementKind::Class, "Order", "App.Domain.Order", Some(domain))
        .unwrap();
    let save = graph
        .create_element(ElementKind::Method, "Save", "App.Domain.Order.Save", Some(order))
        .unwrap();
    let customer = graph
        .create_element(ElementKind::Class, "Customer", "App.Domain.Customer", Some(domain))
        .unwrap();
    let util = graph
        .create_element(ElementKind::Namespace, "Util", "App.Util", Some(app))
        .unwrap();

    graph.add_dependency(save, customer, DependencyKind::Uses, []).unwrap();
    graph.add_dependency(customer, order, DependencyKind::Creates, []).unwrap();
    graph.add_dependency(util, save, DependencyKind::Calls, []).unwrap();

    Fixture { graph, app, domain, order, save, customer, util }
}

fn assert_hierarchy_symmetric(graph: &CodeGraph) {
    for element in graph.elements() {
        if let Some(parent) = element.parent {
            let parent = graph.element(parent).expect("live parent");
            assert!(parent.children.contains(&element.id), "{} missing from parent", element.full_name);
        }
        for child in &element.children {
            let child = graph.element(*child).expect("live child");
            assert_eq!(child.parent, Some(element.id), "{} has wrong parent", child.full_name);
        }
    }
}

#[test]
fn test_create_element_links_parent() {
    let f = fixture();
    assert_eq!(f.graph.element_count(), 6);
    assert_hierarchy_symmetric(&f.graph);

    let order = f.graph.element(f.order).unwrap();
    assert_eq!(order.parent, Some(f.domain));
    assert!(order.children.contains(&f.save));
    assert_eq!(f.graph.roots().count(), 1);
}

#[test]
fn test_create_element_with_unknown_parent_fails() {
    let mut graph = CodeGraph::new();
    let err = graph
        .create_element(ElementKind::Class, "X", "X", Some(ElementId(77)))
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownElement(ElementId(77))));
    assert_eq!(graph.element_count(), 0);
}

#[test]
fn test_ids_are_never_reused() {
    let mut f = fixture();
    f.graph.remove_element(f.util);
    let fresh = f.graph.create_element(ElementKind::Namespace, "New", "App.New", Some(f.app)).unwrap();
    assert!(fresh > f.util);
}

#[test]
fn test_duplicate_dependency_merges_locations() {
    let mut f = fixture();
    let first = SourceLocation::new("Order.cs", 10, 5);
    let second = SourceLocation::new("Order.cs", 14, 5);

    assert!(f.graph.add_dependency(f.save, f.order, DependencyKind::Calls, [first.clone()]).unwrap());
    assert!(!f.graph.add_dependency(f.save, f.order, DependencyKind::Calls, [second.clone(), first.clone()]).unwrap());

    let save = f.graph.element(f.save).unwrap();
    let calls: Vec<_> = save
        .dependencies
        .iter()
        .filter(|d| d.target == f.order && d.kind == DependencyKind::Calls)
        .collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source_locations.len(), 2);
    assert!(calls[0].source_locations.contains(&first));
    assert!(calls[0].source_locations.contains(&second));

    // Same endpoints, different kind: a separate edge
    assert!(f.graph.add_dependency(f.save, f.order, DependencyKind::Uses, []).unwrap());
    assert_eq!(f.graph.element(f.save).unwrap().dependencies.len(), 3);
}

#[test]
fn test_add_dependency_from_unknown_source_fails() {
    let mut f = fixture();
    let err = f
        .graph
        .add_dependency(ElementId(500), f.order, DependencyKind::Uses, [])
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownElement(ElementId(500))));
}

#[test]
fn test_remove_element_orphans_children_and_drops_edges() {
    let mut f = fixture();
    let removed = f.graph.remove_element(f.order).unwrap();
    assert_eq!(removed.id, f.order);

    assert!(f.graph.element(f.order).is_none());

    // Child orphaned, not deleted
    let save = f.graph.element(f.save).unwrap();
    assert_eq!(save.parent, None);

    // Parent no longer lists it
    assert!(!f.graph.element(f.domain).unwrap().children.contains(&f.order));

    // Edges into the removed element are gone, others stay
    assert!(!f.graph.has_dependency(f.customer, f.order, DependencyKind::Creates));
    assert!(f.graph.has_dependency(f.save, f.customer, DependencyKind::Uses));
    assert!(f.graph.dependencies().all(|d| d.source != f.order && d.target != f.order));
}

#[test]
fn test_remove_set_of_elements() {
    let mut f = fixture();
    let ids = HashSet::from([f.domain, f.save]);
    let removed = f.graph.remove_elements(&ids);
    assert_eq!(removed.len(), 2);

    assert_eq!(f.graph.element_count(), 4);
    assert_eq!(f.graph.element(f.order).unwrap().parent, None);
    assert_eq!(f.graph.element(f.customer).unwrap().parent, None);
    assert_eq!(f.graph.element(f.app).unwrap().children, BTreeSet::from([f.util]));
    assert!(!f.graph.has_dependency(f.util, f.save, DependencyKind::Calls));
    assert!(f.graph.has_dependency(f.customer, f.order, DependencyKind::Creates));
    assert_hierarchy_symmetric(&f.graph);
}

#[test]
fn test_remove_dependencies() {
    let mut f = fixture();
    let dependency = Dependency::new(f.save, f.customer, DependencyKind::Uses);
    assert_eq!(f.graph.remove_dependencies(&[dependency]), 1);
    assert!(!f.graph.has_dependency(f.save, f.customer, DependencyKind::Uses));
    assert_eq!(f.graph.dependency_count(), 2);
}

#[test]
fn test_dfs_visits_children_before_parent() {
    let f = fixture();
    let mut order = Vec::new();
    f.graph.dfs_hierarchy(|e| order.push(e.id));

    assert_eq!(order.len(), f.graph.element_count());
    let position = |id: ElementId| order.iter().position(|x| *x == id).unwrap();
    assert!(position(f.save) < position(f.order));
    assert!(position(f.order) < position(f.domain));
    assert!(position(f.domain) < position(f.app));
    assert!(position(f.util) < position(f.app));
}

#[test]
fn test_dfs_visits_orphans_once() {
    let mut f = fixture();
    f.graph.remove_element(f.domain);

    let mut seen = Vec::new();
    f.graph.dfs_hierarchy(|e| seen.push(e.id));
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(seen.len(), unique.len());
    assert_eq!(seen.len(), 5);
}

#[test]
fn test_ancestors() {
    let f = fixture();
    assert_eq!(f.graph.ancestors(f.save), vec![f.order, f.domain, f.app]);
    assert!(f.graph.ancestors(f.app).is_empty());
}

#[test]
fn test_move_to_relinks() {
    let mut f = fixture();
    f.graph.move_to(f.customer, f.util).unwrap();

    assert_eq!(f.graph.element(f.customer).unwrap().parent, Some(f.util));
    assert!(!f.graph.element(f.domain).unwrap().children.contains(&f.customer));
    assert_hierarchy_symmetric(&f.graph);
}

#[test]
fn test_move_to_rejects_cycles() {
    let mut f = fixture();
    let err = f.graph.move_to(f.domain, f.save).unwrap_err();
    assert!(matches!(err, GraphError::HierarchyCycle { .. }));

    let err = f.graph.move_to(f.order, f.order).unwrap_err();
    assert!(matches!(err, GraphError::HierarchyCycle { .. }));

    // Unchanged
    assert_eq!(f.graph.element(f.domain).unwrap().parent, Some(f.app));
}

#[test]
fn test_integrate_is_idempotent() {
    let f = fixture();
    let mut working = CodeGraph::new();
    let original = f.graph.element(f.order).unwrap();

    working.integrate(original);
    working.integrate(original);

    assert_eq!(working.element_count(), 1);
    let clone = working.element(f.order).unwrap();
    assert_eq!(clone.full_name, "App.Domain.Order");
    assert_eq!(clone.parent, None);
    assert!(clone.children.is_empty());
    assert!(clone.dependencies.is_empty());
}

#[test]
fn test_integrate_links_present_parent_and_children() {
    let f = fixture();
    let mut working = CodeGraph::new();

    // Child first, then grandparent, then the middle element.
    working.integrate(f.graph.element(f.save).unwrap());
    working.integrate(f.graph.element(f.domain).unwrap());
    working.integrate(f.graph.element(f.order).unwrap());

    let order = working.element(f.order).unwrap();
    assert_eq!(order.parent, Some(f.domain));
    assert_eq!(order.children, BTreeSet::from([f.save]));
    assert_eq!(working.element(f.save).unwrap().parent, Some(f.order));
    assert_eq!(working.element(f.domain).unwrap().parent, None);
    assert_hierarchy_symmetric(&working);
}

#[test]
fn test_integrate_all_attaches_dependencies() {
    let f = fixture();
    let mut working = CodeGraph::new();
    let elements = [
        f.graph.element(f.customer).unwrap(),
        f.graph.element(f.order).unwrap(),
    ];
    let dependencies = f
        .graph
        .element(f.customer)
        .unwrap()
        .dependencies
        .clone();

    working.integrate_all(elements, dependencies.clone()).unwrap();
    working.integrate_all(elements, dependencies).unwrap();

    assert_eq!(working.element_count(), 2);
    assert_eq!(working.dependency_count(), 1);
    assert!(working.has_dependency(f.customer, f.order, DependencyKind::Creates));

    // Fresh ids never collide with integrated ones
    let fresh = working
        .create_element(ElementKind::Class, "Local", "Local", None)
        .unwrap();
    assert!(fresh > f.order && fresh > f.customer);
}

#[test]
fn test_integrate_all_rejects_dependency_without_source() {
    let f = fixture();
    let mut working = CodeGraph::new();
    let dependency = Dependency::new(f.util, f.save, DependencyKind::Calls);

    let err = working.integrate_all(Vec::<&CodeElement>::new(), [dependency]).unwrap_err();
    assert!(matches!(err, GraphError::UnknownElement(_)));
}

#[test]
fn test_queries() {
    let f = fixture();
    assert_eq!(f.graph.elements_of_kind(ElementKind::Class).count(), 2);
    assert_eq!(f.graph.find_by_full_name("App.Util").map(|e| e.id), Some(f.util));
    assert!(f.graph.find_by_full_name("App.Nope").is_none());
    assert_eq!(f.graph.dependencies_to(f.save).count(), 1);
    assert_eq!(f.graph.element_ids().len(), 6);
}

#[test]
fn test_element_id_serialization() {
    let id = ElementId(42);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "42");
    let back: ElementId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}
