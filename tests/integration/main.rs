//! Integration tests for Arbor
//!
//! These tests drive the analyzer, the graph and persistence together, and the
//! CLI binary end to end.

use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use arbor_analyzer::{
    Analyzer, AnalyzerConfig, CompilationUnit, Declaration, MethodInfo, Occurrence, Parameter, SymbolId,
    Syntax, TypeRef, Workspace, WorkspaceBuilder, analyze,
};
use arbor_core::{
    CodeElement, CodeGraph, DependencyKind, ElementKind, FlatGraph, SourceLocation, find_cycle_groups,
    load_graph, save_graph,
};
use tempfile::TempDir;

fn call(method: SymbolId, file: &str, line: u32) -> Occurrence {
    Occurrence {
        location: SourceLocation::new(file, line, 5),
        syntax: Syntax::Invocation {
            method: Some(method),
            type_arguments: Vec::new(),
            callee: None,
        },
    }
}

/// Billing.Invoice.Total ⇄ Billing.Ledger.Post, plus Invoice : Document
fn billing_workspace() -> Workspace {
    let mut ws = WorkspaceBuilder::new();
    let app = ws.assembly("Billing");
    let ns = ws.namespace("Accounts", app);

    let document = ws.class("Document", ns);
    let invoice = ws.class("Invoice", ns);
    ws.set_base(invoice, TypeRef::named(document));
    let ledger = ws.class("Ledger", ns);

    let total = ws.method(
        "Total",
        invoice,
        MethodInfo {
            parameters: vec![Parameter::new("ledger", TypeRef::named(ledger))],
            ..MethodInfo::default()
        },
    );
    let post = ws.method("Post", ledger, MethodInfo::default());
    ws.body("Invoice.cs", vec![call(post, "Invoice.cs", 12)], Some(total));
    ws.body("Ledger.cs", vec![call(total, "Ledger.cs", 8)], Some(post));

    let unit = |file: &str, members: Vec<Declaration>| CompilationUnit {
        project: "Billing".to_string(),
        assembly: app,
        file: file.into(),
        declarations: vec![Declaration::new(ns).with_members(members)],
        top_level_statements: Vec::new(),
    };
    ws.unit(unit(
        "Invoice.cs",
        vec![
            Declaration::new(document),
            Declaration::new(invoice).with_members(vec![Declaration::new(total)]),
        ],
    ));
    ws.unit(unit(
        "Ledger.cs",
        vec![Declaration::new(ledger).with_members(vec![Declaration::new(post)])],
    ));
    ws.build()
}

fn named<'g>(graph: &'g CodeGraph, full_name: &str) -> &'g CodeElement {
    graph
        .find_by_full_name(full_name)
        .unwrap_or_else(|| panic!("no element named {full_name}"))
}

fn assert_same_graph(left: &CodeGraph, right: &CodeGraph) {
    assert_eq!(left.element_ids(), right.element_ids());
    for element in left.elements() {
        let other = right.element(element.id).expect("element survives");
        assert_eq!(element, other);
    }
}

/// Test that the analyzed graph survives a save/load cycle in both formats
#[test]
fn test_analyze_save_load_round_trip() {
    let graph = analyze(&billing_workspace()).unwrap();
    assert!(graph.dependency_count() > 0);

    let temp_dir = TempDir::new().unwrap();
    for file in ["graph.json", "graph.bin"] {
        let path = temp_dir.path().join(file);
        save_graph(&graph, &path).unwrap();
        let loaded = load_graph(&path).unwrap();
        assert_same_graph(&graph, &loaded);
    }
}

/// Test that the flat records rebuild the same forest and edges
#[test]
fn test_flat_records_rebuild_graph() {
    let graph = analyze(&billing_workspace()).unwrap();
    let flat = FlatGraph::from_graph(&graph);
    assert_eq!(flat.elements.len(), graph.element_count());
    assert_eq!(flat.dependencies.len(), graph.dependency_count());

    let rebuilt = flat.into_graph().unwrap();
    assert_same_graph(&graph, &rebuilt);
}

/// Test that mutually calling methods form one cycle group
#[test]
fn test_cycle_groups_from_analysis() {
    let graph = analyze(&billing_workspace()).unwrap();
    let groups = find_cycle_groups(&graph);

    assert_eq!(groups.len(), 1);
    let names: HashSet<&str> = groups[0]
        .elements
        .iter()
        .filter_map(|id| graph.element(*id))
        .map(|e| e.full_name.as_str())
        .collect();
    assert_eq!(
        names,
        HashSet::from(["Billing.Accounts.Invoice.Total", "Billing.Accounts.Ledger.Post"])
    );
}

/// Test that a subset of a larger graph can be rebuilt element by element
#[test]
fn test_integrate_subset_into_working_graph() {
    let full = analyze(&billing_workspace()).unwrap();
    let invoice = named(&full, "Billing.Accounts.Invoice");
    let total = named(&full, "Billing.Accounts.Invoice.Total");
    let ledger = named(&full, "Billing.Accounts.Ledger");

    let picked: HashSet<_> = [invoice.id, total.id, ledger.id].into();
    let dependencies: Vec<_> = full
        .dependencies()
        .filter(|d| picked.contains(&d.source) && picked.contains(&d.target))
        .cloned()
        .collect();

    let mut working = CodeGraph::new();
    working
        .integrate_all([total, invoice, ledger], dependencies.clone())
        .unwrap();
    working.integrate_all([invoice], dependencies).unwrap();

    assert_eq!(working.element_count(), 3);
    assert_eq!(working.element(total.id).unwrap().parent, Some(invoice.id));
    assert_eq!(working.element(invoice.id).unwrap().parent, None);
    assert!(working.has_dependency(total.id, ledger.id, DependencyKind::Uses));
    assert_eq!(working.dependency_count(), 1);
}

/// Test that removing a namespace orphans its types and drops edges into it
#[test]
fn test_remove_namespace_from_analyzed_graph() {
    let mut graph = analyze(&billing_workspace()).unwrap();
    let accounts = named(&graph, "Billing.Accounts").id;
    let post = named(&graph, "Billing.Accounts.Ledger.Post").id;

    graph.remove_elements(&HashSet::from([accounts, post]));

    assert!(graph.element(accounts).is_none());
    assert_eq!(named(&graph, "Billing.Accounts.Invoice").parent, None);
    assert!(named(&graph, "Billing.Accounts.Ledger").children.is_empty());
    assert!(graph.dependencies().all(|d| d.target != post && d.source != post));
    assert!(find_cycle_groups(&graph).is_empty());
}

/// Test that parallel analysis of a loaded workspace matches sequential
#[test]
fn test_parallel_analysis_of_loaded_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("workspace.json");
    std::fs::write(&path, billing_workspace().to_json().unwrap()).unwrap();
    let workspace = Workspace::load(&path).unwrap();

    let sequential = analyze(&workspace).unwrap();
    let parallel = Analyzer::new(AnalyzerConfig {
        parallel: true,
        ..AnalyzerConfig::default()
    })
    .analyze(&workspace)
    .unwrap();
    assert_same_graph(&sequential, &parallel);

    let invoice = named(&sequential, "Billing.Accounts.Invoice");
    assert_eq!(invoice.kind, ElementKind::Class);
    assert!(sequential.has_dependency(
        invoice.id,
        named(&sequential, "Billing.Accounts.Document").id,
        DependencyKind::Inherits
    ));
}

fn arbor(root: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute arbor")
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let temp_dir = TempDir::new().unwrap();
    let output = arbor(temp_dir.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("arbor"));
    assert!(stdout.contains("analyze"));
}

/// Test analyze → stats → cycles → prune → clear through the binary
#[test]
fn test_cli_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let workspace = root.join("workspace.json");
    std::fs::write(&workspace, billing_workspace().to_json().unwrap()).unwrap();
    std::fs::write(root.join("arbor.toml"), "progress_stride = 1\n").unwrap();

    let output = arbor(root, &["analyze", workspace.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let graph_path = root.join(".arbor").join("graph.json");
    assert!(graph_path.exists());

    let output = arbor(root, &["stats"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Method"));
    assert!(stdout.contains("Calls"));

    let output = arbor(root, &["cycles"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Billing.Accounts.Ledger.Post"));

    let output = arbor(
        root,
        &["prune", graph_path.to_str().unwrap(), "Billing.Accounts.Ledger.Post"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let pruned = load_graph(&graph_path).unwrap();
    assert!(pruned.find_by_full_name("Billing.Accounts.Ledger.Post").is_none());

    let output = arbor(root, &["prune", graph_path.to_str().unwrap(), "No.Such.Element"]);
    assert!(!output.status.success());

    let output = arbor(root, &["clear"]);
    assert!(output.status.success());
    assert!(!root.join(".arbor").exists());
}
