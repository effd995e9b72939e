//! Phase 1: the containment hierarchy
//!
//! Walks every included compilation unit's declaration tree and creates one
//! element per declared symbol, deduplicated by symbol key so partial
//! declarations and namespaces spread over many files collapse into one
//! element carrying all their locations.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use arbor_core::{CodeGraph, ElementId, ElementKind, SourceLocation};
use tracing::{debug, info, warn};

use crate::config::ProjectFilter;
use crate::error::{AnalyzerError, Result};
use crate::model::*;
use crate::provider::SymbolProvider;
use crate::symbols::{ElementOrigin, SymbolTable, symbol_key};

pub const GLOBAL_NAMESPACE: &str = "global";
pub const TOP_LEVEL_TYPE: &str = "GlobalStatements";
pub const TOP_LEVEL_METHOD: &str = "Execute";

/// State shared by both phases of one analysis.
pub struct AnalysisRun<'p> {
    pub provider: &'p dyn SymbolProvider,
    pub graph: CodeGraph,
    pub symbols: SymbolTable,
    /// Files of included projects; bodies elsewhere have no semantic context.
    pub included_files: HashSet<PathBuf>,
    /// Top-level statement bodies per assembly.
    pub top_level_statements: BTreeMap<SymbolId, Vec<BodyId>>,
}

impl<'p> AnalysisRun<'p> {
    pub fn new(provider: &'p dyn SymbolProvider) -> Self {
        AnalysisRun {
            provider,
            graph: CodeGraph::new(),
            symbols: SymbolTable::new(),
            included_files: HashSet::new(),
            top_level_statements: BTreeMap::new(),
        }
    }
}

/// Element kind for a symbol, or `None` if the symbol never becomes an element.
pub fn element_kind(symbol: &Symbol) -> Option<ElementKind> {
    let kind = match &symbol.kind {
        SymbolKind::Assembly => ElementKind::Assembly,
        SymbolKind::Namespace { is_global: false } => ElementKind::Namespace,
        SymbolKind::Namespace { is_global: true } => return None,
        SymbolKind::Type(info) => match info.type_kind {
            TypeKind::Class => ElementKind::Class,
            TypeKind::Struct => ElementKind::Struct,
            TypeKind::Interface => ElementKind::Interface,
            TypeKind::Record => ElementKind::Record,
            TypeKind::Enum => ElementKind::Enum,
            TypeKind::Delegate => ElementKind::Delegate,
        },
        SymbolKind::Method(_) => ElementKind::Method,
        SymbolKind::Property(_) => ElementKind::Property,
        SymbolKind::Field(_) => ElementKind::Field,
        SymbolKind::Event(_) => ElementKind::Event,
        SymbolKind::TypeParameter => return None,
    };
    Some(kind)
}

/// Build the hierarchy for every compilation unit the filter lets through.
pub fn build_hierarchy(run: &mut AnalysisRun<'_>, filter: &ProjectFilter) -> Result<()> {
    let provider = run.provider;
    let mut skipped = 0usize;

    for unit in provider.compilation_units() {
        if !filter.is_included(&unit.project) {
            skipped += 1;
            continue;
        }
        run.included_files.insert(unit.file.clone());

        let assembly = get_or_create(run, unit.assembly, None, None)?.ok_or_else(|| {
            AnalyzerError::UnknownAssembly {
                assembly: unit.assembly,
                file: unit.file.clone(),
            }
        })?;

        for declaration in &unit.declarations {
            declare(run, declaration, assembly, assembly)?;
        }

        if !unit.top_level_statements.is_empty() {
            run.top_level_statements
                .entry(unit.assembly)
                .or_default()
                .extend(unit.top_level_statements.iter().copied());
        }
    }
    if skipped > 0 {
        debug!("Skipped {} compilation units of excluded projects", skipped);
    }

    synthesize_top_level_code(run)?;
    if insert_global_namespaces(run)? {
        debug!("Inserted global namespaces");
    }

    info!("Hierarchy built: {} elements", run.graph.element_count());
    Ok(())
}

fn declare(
    run: &mut AnalysisRun<'_>,
    declaration: &Declaration,
    parent: ElementId,
    assembly: ElementId,
) -> Result<()> {
    let provider = run.provider;
    let Some(symbol) = provider.symbol(declaration.symbol) else {
        warn!("Declaration refers to unknown {}", declaration.symbol);
        return Ok(());
    };

    let element = match symbol.kind {
        SymbolKind::Namespace { is_global: true } => Some(assembly),
        SymbolKind::Namespace { is_global: false } => {
            namespace_chain(run, declaration.symbol, assembly, declaration.location.clone())?
        }
        _ => get_or_create(run, declaration.symbol, Some(parent), declaration.location.clone())?,
    };

    let Some(element) = element else {
        return Ok(());
    };
    for member in &declaration.members {
        declare(run, member, element, assembly)?;
    }
    Ok(())
}

/// Materialize `A.B.C` as three nested namespace elements under the assembly.
/// Only the innermost one receives the declaration's location.
fn namespace_chain(
    run: &mut AnalysisRun<'_>,
    namespace: SymbolId,
    assembly: ElementId,
    location: Option<SourceLocation>,
) -> Result<Option<ElementId>> {
    let provider = run.provider;
    let mut chain = Vec::new();
    let mut current = Some(namespace);
    while let Some(symbol) = current.and_then(|id| provider.symbol(id)) {
        if !matches!(symbol.kind, SymbolKind::Namespace { is_global: false }) {
            break;
        }
        chain.push(symbol.id);
        current = symbol.containing;
    }

    let mut parent = assembly;
    for id in chain.into_iter().rev() {
        let location = if id == namespace { location.clone() } else { None };
        match get_or_create(run, id, Some(parent), location)? {
            Some(element) => parent = element,
            None => return Ok(None),
        }
    }
    Ok(Some(parent))
}

/// Element for `symbol`, created under `parent` on first sight. A later
/// sighting only contributes its location.
fn get_or_create(
    run: &mut AnalysisRun<'_>,
    symbol_id: SymbolId,
    parent: Option<ElementId>,
    location: Option<SourceLocation>,
) -> Result<Option<ElementId>> {
    let provider = run.provider;
    let Some(symbol) = provider.symbol(symbol_id) else {
        return Ok(None);
    };
    let Some(kind) = element_kind(symbol) else {
        return Ok(None);
    };
    let Some(key) = symbol_key(provider, symbol_id) else {
        return Ok(None);
    };

    let element = match run.symbols.lookup(&key) {
        Some(existing) => existing,
        None => {
            let full_name = provider.qualified_name(symbol_id);
            let created = run
                .graph
                .create_element(kind, symbol.name.clone(), full_name, parent)?;
            run.symbols.insert(key, created, symbol_id);
            created
        }
    };

    if let Some(location) = location {
        if let Some(element) = run.graph.element_mut(element) {
            element.source_locations.insert(location);
        }
    }
    Ok(Some(element))
}

/// One `GlobalStatements.Execute` pair per assembly with top-level statements.
fn synthesize_top_level_code(run: &mut AnalysisRun<'_>) -> Result<()> {
    let assemblies: Vec<SymbolId> = run.top_level_statements.keys().copied().collect();
    for assembly in assemblies {
        let Some(assembly_element) = run.symbols.resolve(run.provider, assembly) else {
            continue;
        };
        let assembly_name = run
            .graph
            .element(assembly_element)
            .map(|e| e.full_name.clone())
            .unwrap_or_default();

        let type_name = format!("{assembly_name}.{TOP_LEVEL_TYPE}");
        let holder = run.graph.create_element(
            ElementKind::Class,
            TOP_LEVEL_TYPE,
            type_name.clone(),
            Some(assembly_element),
        )?;
        run.symbols.record_origin(holder, ElementOrigin::TopLevelType);

        let method = run.graph.create_element(
            ElementKind::Method,
            TOP_LEVEL_METHOD,
            format!("{type_name}.{TOP_LEVEL_METHOD}"),
            Some(holder),
        )?;
        run.symbols
            .record_origin(method, ElementOrigin::TopLevelStatements { assembly });
        debug!("Top-level statements of {} placed in {}", assembly_name, type_name);
    }
    Ok(())
}

/// If any assembly holds something other than a namespace, put a `global`
/// namespace under every assembly and move all former children into it.
/// Returns whether the namespaces were inserted.
pub fn insert_global_namespaces(run: &mut AnalysisRun<'_>) -> Result<bool> {
    let graph = &run.graph;
    let assemblies: Vec<ElementId> = graph
        .elements_of_kind(ElementKind::Assembly)
        .map(|e| e.id)
        .collect();

    let needed = assemblies.iter().any(|assembly| {
        graph.element(*assembly).is_some_and(|a| {
            a.children.iter().any(|child| {
                graph
                    .element(*child)
                    .is_some_and(|c| c.kind != ElementKind::Namespace)
            })
        })
    });
    if !needed {
        return Ok(false);
    }

    for assembly in assemblies {
        let Some(element) = run.graph.element(assembly) else {
            continue;
        };
        let children: Vec<ElementId> = element.children.iter().copied().collect();
        let full_name = format!("{}.{GLOBAL_NAMESPACE}", element.full_name);

        let global = run.graph.create_element(
            ElementKind::Namespace,
            GLOBAL_NAMESPACE,
            full_name,
            Some(assembly),
        )?;
        run.symbols.record_origin(global, ElementOrigin::GlobalNamespace);
        for child in children {
            run.graph.move_to(child, global)?;
        }
    }
    Ok(true)
}
