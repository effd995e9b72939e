//! Phase 2: dependency discovery
//!
//! Each element is analyzed on its own and yields a `Findings` buffer; the
//! buffers are applied to the graph afterwards by a single writer. Analysis
//! only reads the graph's symbol table, so elements can be processed in any
//! order or in parallel.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use arbor_core::{CodeGraph, DependencyKind, ElementId, SourceLocation};
use tracing::debug;

use crate::error::Result;
use crate::hierarchy::AnalysisRun;
use crate::model::*;
use crate::provider::SymbolProvider;
use crate::symbols::{ElementOrigin, SymbolTable};

/// A dependency discovered for an element, not yet in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDependency {
    pub source: ElementId,
    pub target: ElementId,
    pub kind: DependencyKind,
    pub locations: Vec<SourceLocation>,
}

/// Everything discovered while analyzing one element.
#[derive(Debug, Default)]
pub struct Findings {
    pub dependencies: Vec<PendingDependency>,
    /// Attribute names observed on the element.
    pub attributes: Vec<(ElementId, String)>,
}

impl Findings {
    fn depend(
        &mut self,
        source: ElementId,
        target: ElementId,
        kind: DependencyKind,
        locations: impl IntoIterator<Item = SourceLocation>,
    ) {
        self.dependencies.push(PendingDependency {
            source,
            target,
            kind,
            locations: locations.into_iter().collect(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.attributes.is_empty()
    }

    /// Merge into the graph; duplicate edges fold their locations together.
    pub fn apply(self, graph: &mut CodeGraph) -> Result<()> {
        for (element, name) in self.attributes {
            if let Some(element) = graph.element_mut(element) {
                element.attributes.insert(name);
            }
        }
        for dependency in self.dependencies {
            graph.add_dependency(
                dependency.source,
                dependency.target,
                dependency.kind,
                dependency.locations,
            )?;
        }
        Ok(())
    }
}

/// What kind of analysis an element receives.
pub enum AnalysisTarget<'s> {
    Event(&'s EventInfo),
    Delegate(&'s TypeInfo),
    NamedType(&'s TypeInfo),
    Method(SymbolId, &'s MethodInfo),
    Property(&'s PropertyInfo),
    Field(&'s FieldInfo),
    /// The placeholder method of an assembly's top-level statements.
    TopLevelCode { assembly: SymbolId },
    /// Assemblies, namespaces and other containers.
    Structural,
}

pub struct DependencyAnalyzer<'a> {
    provider: &'a dyn SymbolProvider,
    symbols: &'a SymbolTable,
    included_files: &'a HashSet<PathBuf>,
    top_level_statements: &'a BTreeMap<SymbolId, Vec<BodyId>>,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(run: &'a AnalysisRun<'a>) -> Self {
        DependencyAnalyzer {
            provider: run.provider,
            symbols: &run.symbols,
            included_files: &run.included_files,
            top_level_statements: &run.top_level_statements,
        }
    }

    pub fn analyze_element(&self, element: ElementId) -> Findings {
        let mut findings = Findings::default();
        let Some(origin) = self.symbols.origin(element) else {
            debug!("No origin recorded for element {}", element);
            return findings;
        };
        let symbol = match origin {
            ElementOrigin::Symbol(id) => self.provider.symbol(id),
            _ => None,
        };

        match target_of(origin, symbol) {
            AnalysisTarget::Event(info) => self.analyze_event(element, info, &mut findings),
            AnalysisTarget::Delegate(info) => self.analyze_delegate(element, info, &mut findings),
            AnalysisTarget::NamedType(info) => self.analyze_inheritance(element, info, &mut findings),
            AnalysisTarget::Method(id, info) => self.analyze_method(element, id, info, &mut findings),
            AnalysisTarget::Property(info) => self.analyze_property(element, info, &mut findings),
            AnalysisTarget::Field(info) => {
                self.add_type_dependency(element, &info.field_type, DependencyKind::Uses, None, &mut findings)
            }
            AnalysisTarget::TopLevelCode { assembly } => {
                for body in self.top_level_statements.get(&assembly).into_iter().flatten() {
                    self.walk_body(element, *body, &mut findings);
                }
            }
            AnalysisTarget::Structural => {}
        }

        if let Some(symbol) = symbol {
            self.analyze_attributes(element, symbol, &mut findings);
        }
        findings
    }

    fn resolve(&self, symbol: SymbolId) -> Option<ElementId> {
        self.symbols.resolve(self.provider, symbol)
    }

    /// The member's own element or, for an accessor, the element of the
    /// property or event it belongs to.
    fn resolve_declared(&self, member: SymbolId) -> Option<ElementId> {
        self.resolve(member).or_else(|| {
            self.provider
                .symbol(member)
                .and_then(Symbol::method_info)
                .and_then(|info| info.associated)
                .and_then(|owner| self.resolve(owner))
        })
    }

    /// Like `resolve_declared`, falling back to the containing type when the
    /// member itself is not tracked.
    fn resolve_member(&self, member: SymbolId) -> Option<ElementId> {
        self.resolve_declared(member).or_else(|| {
            self.provider
                .containing_type(member)
                .and_then(|ty| self.resolve(ty))
        })
    }

    fn is_interface(&self, ty: SymbolId) -> bool {
        self.provider
            .symbol(ty)
            .and_then(Symbol::type_info)
            .is_some_and(|info| info.type_kind == TypeKind::Interface)
    }

    fn symbol_locations(&self, symbol: SymbolId) -> Vec<SourceLocation> {
        self.provider
            .symbol(symbol)
            .map(|s| s.locations.clone())
            .unwrap_or_default()
    }

    fn add_type_dependency(
        &self,
        source: ElementId,
        ty: &TypeRef,
        kind: DependencyKind,
        location: Option<&SourceLocation>,
        findings: &mut Findings,
    ) {
        match ty {
            // Element types are used, even when the array is created.
            TypeRef::Array(element) | TypeRef::Pointer(element) => {
                self.add_type_dependency(source, element, DependencyKind::Uses, location, findings)
            }
            TypeRef::Named {
                symbol,
                type_arguments,
            } => {
                if let Some(target) = self.resolve(*symbol) {
                    findings.depend(source, target, kind, location.cloned());
                }
                // External generics like List<Order> still reach internal arguments
                for argument in type_arguments {
                    self.add_type_dependency(source, argument, DependencyKind::Uses, location, findings);
                }
            }
            TypeRef::TypeParameter(symbol) => {
                if let Some(target) = self.resolve(*symbol) {
                    findings.depend(source, target, kind, location.cloned());
                }
            }
            TypeRef::FunctionPointer | TypeRef::Dynamic => {}
        }
    }

    fn analyze_inheritance(&self, source: ElementId, info: &TypeInfo, findings: &mut Findings) {
        if let Some(base) = &info.base_type {
            if !self.is_object_root(base) {
                self.add_type_dependency(source, base, DependencyKind::Inherits, None, findings);
            }
        }
        for interface in &info.interfaces {
            self.add_type_dependency(source, interface, DependencyKind::Implements, None, findings);
        }
    }

    fn is_object_root(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named { symbol, .. } => self
                .provider
                .symbol(*symbol)
                .and_then(Symbol::type_info)
                .is_some_and(|info| info.is_object_root),
            _ => false,
        }
    }

    fn analyze_delegate(&self, source: ElementId, info: &TypeInfo, findings: &mut Findings) {
        let Some(invoke) = info
            .delegate_invoke
            .and_then(|id| self.provider.symbol(id))
            .and_then(Symbol::method_info)
        else {
            debug!("Delegate element {} has no invoke signature", source);
            return;
        };
        if let Some(return_type) = &invoke.return_type {
            self.add_type_dependency(source, return_type, DependencyKind::Uses, None, findings);
        }
        for parameter in &invoke.parameters {
            self.add_type_dependency(source, &parameter.ty, DependencyKind::Uses, None, findings);
        }
    }

    fn analyze_event(&self, source: ElementId, info: &EventInfo, findings: &mut Findings) {
        self.add_type_dependency(source, &info.event_type, DependencyKind::Uses, None, findings);

        for accessor in [info.add_method, info.remove_method].into_iter().flatten() {
            if let Some(method) = self.provider.symbol(accessor).and_then(Symbol::method_info) {
                self.analyze_method(source, accessor, method, findings);
            }
        }
    }

    fn analyze_method(&self, source: ElementId, method: SymbolId, info: &MethodInfo, findings: &mut Findings) {
        for parameter in &info.parameters {
            self.add_type_dependency(source, &parameter.ty, DependencyKind::Uses, None, findings);
        }
        if let Some(return_type) = &info.return_type {
            self.add_type_dependency(source, return_type, DependencyKind::Uses, None, findings);
        }

        if let Some(declaring) = self.provider.containing_type(method) {
            let in_interface = self.is_interface(declaring);
            if in_interface || info.is_abstract {
                self.find_implementations(source, method, declaring, in_interface, findings);
            }
        }

        if info.is_override {
            if let Some(overridden) = info.overridden {
                if let Some(target) = self.resolve_member(overridden) {
                    findings.depend(source, target, DependencyKind::Overrides, self.symbol_locations(method));
                }
            }
        }

        for body in &info.bodies {
            self.walk_body(source, *body, findings);
        }
    }

    /// Implements edges from every implementing member to this interface or
    /// abstract method. The edge points from implementation to declaration.
    fn find_implementations(
        &self,
        declaration: ElementId,
        method: SymbolId,
        declaring: SymbolId,
        in_interface: bool,
        findings: &mut Findings,
    ) {
        // Derived interfaces re-declare members, they do not implement them
        let implementers: Vec<SymbolId> = if in_interface {
            self.provider
                .types_implementing(declaring)
                .into_iter()
                .filter(|ty| !self.is_interface(*ty))
                .collect()
        } else {
            self.provider.types_derived_from(declaring)
        };

        for ty in implementers {
            let Some(implementation) = self.provider.find_implementation(ty, method) else {
                continue;
            };
            if let Some(implementing) = self.resolve_declared(implementation) {
                findings.depend(
                    implementing,
                    declaration,
                    DependencyKind::Implements,
                    self.symbol_locations(implementation),
                );
            }
        }
    }

    fn analyze_property(&self, source: ElementId, info: &PropertyInfo, findings: &mut Findings) {
        for parameter in &info.parameters {
            self.add_type_dependency(source, &parameter.ty, DependencyKind::Uses, None, findings);
        }
        self.add_type_dependency(source, &info.property_type, DependencyKind::Uses, None, findings);

        for accessor in [info.getter, info.setter].into_iter().flatten() {
            if let Some(method) = self.provider.symbol(accessor).and_then(Symbol::method_info) {
                self.analyze_method(source, accessor, method, findings);
            }
        }
        for body in &info.bodies {
            self.walk_body(source, *body, findings);
        }
    }

    fn analyze_attributes(&self, source: ElementId, symbol: &Symbol, findings: &mut Findings) {
        for usage in &symbol.attributes {
            if let Some(class) = self.provider.symbol(usage.class) {
                findings.attributes.push((source, class.name.clone()));
            }
            self.add_type_dependency(
                source,
                &TypeRef::named(usage.class),
                DependencyKind::UsesAttribute,
                usage.location.as_ref(),
                findings,
            );
        }
    }

    fn walk_body(&self, source: ElementId, body: BodyId, findings: &mut Findings) {
        let Some(body) = self.provider.body(body) else {
            debug!("Body {:?} of element {} is unavailable", body, source);
            return;
        };
        if !self.included_files.contains(&body.file) {
            debug!("No semantic context for {}, skipping body", body.file.display());
            return;
        }
        for occurrence in &body.occurrences {
            self.analyze_occurrence(source, occurrence, findings);
        }
    }

    fn analyze_occurrence(&self, source: ElementId, occurrence: &Occurrence, findings: &mut Findings) {
        let location = &occurrence.location;
        match &occurrence.syntax {
            Syntax::ObjectCreation { created } => {
                if let Some(created) = created {
                    self.add_type_dependency(source, created, DependencyKind::Creates, Some(location), findings);
                }
            }
            Syntax::Invocation {
                method,
                type_arguments,
                callee,
            } => {
                if let Some(method) = method.filter(|m| self.is_method(*m)) {
                    self.add_call(source, method, location, findings);
                    for argument in type_arguments {
                        self.add_type_dependency(source, argument, DependencyKind::Uses, Some(location), findings);
                    }
                }
                if let Some(event) = callee.and_then(|c| self.event_behind(c)) {
                    self.add_member_usage(source, event, findings);
                }
            }
            Syntax::Identifier { symbol } => {
                if let Some(field) = symbol.filter(|s| self.is_field(*s)) {
                    self.add_member_usage(source, field, findings);
                }
            }
            Syntax::MemberAccess { symbol } => {
                let Some(member) = *symbol else { return };
                match self.provider.symbol(member).map(|s| &s.kind) {
                    Some(SymbolKind::Property(_)) => {
                        if let Some(target) = self.resolve_member(member) {
                            findings.depend(source, target, DependencyKind::Calls, [location.clone()]);
                        }
                    }
                    Some(SymbolKind::Field(_)) => self.add_member_usage(source, member, findings),
                    _ => {}
                }
            }
            Syntax::Assignment { operator, left } => {
                if matches!(operator, AssignmentOperator::Add | AssignmentOperator::Subtract) {
                    if let Some(event) = left.filter(|s| self.is_event(*s)) {
                        self.add_member_usage(source, event, findings);
                    }
                }
            }
        }
    }

    fn add_call(&self, source: ElementId, method: SymbolId, location: &SourceLocation, findings: &mut Findings) {
        let method = self
            .provider
            .symbol(method)
            .and_then(Symbol::method_info)
            .filter(|info| info.is_extension)
            .and_then(|info| info.reduced_from)
            .unwrap_or(method);
        if let Some(target) = self.resolve_member(method) {
            findings.depend(source, target, DependencyKind::Calls, [location.clone()]);
        }
    }

    /// Uses edge to a field or event, without location.
    fn add_member_usage(&self, source: ElementId, member: SymbolId, findings: &mut Findings) {
        if let Some(target) = self.resolve_member(member) {
            findings.depend(source, target, DependencyKind::Uses, []);
        }
    }

    /// The event an invoked expression stands for: the event itself or one of its accessors.
    fn event_behind(&self, callee: SymbolId) -> Option<SymbolId> {
        let symbol = self.provider.symbol(callee)?;
        match &symbol.kind {
            SymbolKind::Event(_) => Some(callee),
            SymbolKind::Method(info) => info.associated.filter(|a| self.is_event(*a)),
            _ => None,
        }
    }

    fn is_method(&self, id: SymbolId) -> bool {
        matches!(self.provider.symbol(id).map(|s| &s.kind), Some(SymbolKind::Method(_)))
    }

    fn is_field(&self, id: SymbolId) -> bool {
        matches!(self.provider.symbol(id).map(|s| &s.kind), Some(SymbolKind::Field(_)))
    }

    fn is_event(&self, id: SymbolId) -> bool {
        matches!(self.provider.symbol(id).map(|s| &s.kind), Some(SymbolKind::Event(_)))
    }
}

/// Category of analysis for an element, from its origin and symbol.
pub fn target_of<'s>(origin: ElementOrigin, symbol: Option<&'s Symbol>) -> AnalysisTarget<'s> {
    match origin {
        ElementOrigin::TopLevelStatements { assembly } => return AnalysisTarget::TopLevelCode { assembly },
        ElementOrigin::TopLevelType | ElementOrigin::GlobalNamespace => return AnalysisTarget::Structural,
        ElementOrigin::Symbol(_) => {}
    }
    let Some(symbol) = symbol else {
        return AnalysisTarget::Structural;
    };
    match &symbol.kind {
        SymbolKind::Event(info) => AnalysisTarget::Event(info),
        SymbolKind::Type(info) if info.type_kind == TypeKind::Delegate => AnalysisTarget::Delegate(info),
        SymbolKind::Type(info) => AnalysisTarget::NamedType(info),
        SymbolKind::Method(info) => AnalysisTarget::Method(symbol.id, info),
        SymbolKind::Property(info) => AnalysisTarget::Property(info),
        SymbolKind::Field(info) => AnalysisTarget::Field(info),
        SymbolKind::Assembly | SymbolKind::Namespace { .. } | SymbolKind::TypeParameter => {
            AnalysisTarget::Structural
        }
    }
}
