//! In-memory symbol provider backed by a JSON workspace file
//!
//! A workspace file is what a language front end exports: every symbol, every
//! compilation unit, and every body. `WorkspaceBuilder` produces the same
//! structure programmatically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use arbor_core::SourceLocation;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};
use crate::model::*;
use crate::provider::SymbolProvider;

/// On-disk shape of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub units: Vec<CompilationUnit>,
    #[serde(default)]
    pub bodies: Vec<Body>,
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    data: WorkspaceFile,
    symbol_index: HashMap<SymbolId, usize>,
    body_index: HashMap<BodyId, usize>,
    members: HashMap<SymbolId, Vec<SymbolId>>,
    named_types: Vec<SymbolId>,
}

impl Workspace {
    pub fn new(data: WorkspaceFile) -> Self {
        let symbol_index = data
            .symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();
        let body_index = data
            .bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, i))
            .collect();

        let mut members: HashMap<SymbolId, Vec<SymbolId>> = HashMap::new();
        for symbol in &data.symbols {
            if let Some(container) = symbol.containing {
                members.entry(container).or_default().push(symbol.id);
            }
        }
        let named_types = data
            .symbols
            .iter()
            .filter(|s| s.is_type())
            .map(|s| s.id)
            .collect();

        Workspace {
            data,
            symbol_index,
            body_index,
            members,
            named_types,
        }
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::WorkspaceLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let workspace = Self::from_json(&text).map_err(|source| AnalyzerError::WorkspaceParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            "Loaded workspace {}: {} symbols, {} compilation units, {} bodies",
            path.display(),
            workspace.data.symbols.len(),
            workspace.data.units.len(),
            workspace.data.bodies.len()
        );
        Ok(workspace)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.data)
    }

    pub fn data(&self) -> &WorkspaceFile {
        &self.data
    }

    pub fn symbol_count(&self) -> usize {
        self.data.symbols.len()
    }

    /// Projects in first-seen order.
    pub fn projects(&self) -> Vec<&str> {
        let mut projects: Vec<&str> = Vec::new();
        for unit in &self.data.units {
            if !projects.contains(&unit.project.as_str()) {
                projects.push(&unit.project);
            }
        }
        projects
    }
}

impl SymbolProvider for Workspace {
    fn compilation_units(&self) -> &[CompilationUnit] {
        &self.data.units
    }

    fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbol_index.get(&id).map(|&i| &self.data.symbols[i])
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        self.body_index.get(&id).map(|&i| &self.data.bodies[i])
    }

    fn all_named_types(&self) -> Vec<SymbolId> {
        self.named_types.clone()
    }

    fn members(&self, container: SymbolId) -> Vec<SymbolId> {
        self.members.get(&container).cloned().unwrap_or_default()
    }
}

/// Assembles a workspace symbol by symbol.
///
/// Symbols placed directly under an assembly land in that assembly's global
/// namespace, the way a compiler models them.
#[derive(Debug, Default)]
pub struct WorkspaceBuilder {
    data: WorkspaceFile,
    global_namespaces: HashMap<SymbolId, SymbolId>,
    next_symbol: u32,
    next_body: u32,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol with no container adjustment.
    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        containing: Option<SymbolId>,
        kind: SymbolKind,
    ) -> SymbolId {
        let id = SymbolId(self.next_symbol);
        self.next_symbol += 1;
        self.data.symbols.push(Symbol {
            id,
            name: name.into(),
            containing,
            kind,
            attributes: Vec::new(),
            locations: Vec::new(),
        });
        id
    }

    fn container(&self, id: SymbolId) -> SymbolId {
        self.global_namespaces.get(&id).copied().unwrap_or(id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.data.symbols.iter_mut().find(|s| s.id == id)
    }

    /// An assembly together with its (unnamed) global namespace.
    pub fn assembly(&mut self, name: impl Into<String>) -> SymbolId {
        let assembly = self.add_symbol(name, None, SymbolKind::Assembly);
        let global = self.add_symbol(
            "",
            Some(assembly),
            SymbolKind::Namespace { is_global: true },
        );
        self.global_namespaces.insert(assembly, global);
        assembly
    }

    pub fn global_namespace(&self, assembly: SymbolId) -> Option<SymbolId> {
        self.global_namespaces.get(&assembly).copied()
    }

    pub fn namespace(&mut self, name: impl Into<String>, containing: SymbolId) -> SymbolId {
        let containing = self.container(containing);
        self.add_symbol(
            name,
            Some(containing),
            SymbolKind::Namespace { is_global: false },
        )
    }

    pub fn named_type(
        &mut self,
        name: impl Into<String>,
        containing: SymbolId,
        type_kind: TypeKind,
    ) -> SymbolId {
        let containing = self.container(containing);
        self.add_symbol(name, Some(containing), SymbolKind::Type(TypeInfo::new(type_kind)))
    }

    pub fn class(&mut self, name: impl Into<String>, containing: SymbolId) -> SymbolId {
        self.named_type(name, containing, TypeKind::Class)
    }

    pub fn interface(&mut self, name: impl Into<String>, containing: SymbolId) -> SymbolId {
        self.named_type(name, containing, TypeKind::Interface)
    }

    pub fn type_parameter(&mut self, name: impl Into<String>, containing: SymbolId) -> SymbolId {
        let parameter = self.add_symbol(name, Some(containing), SymbolKind::TypeParameter);
        if let Some(SymbolKind::Type(info)) = self.symbol_mut(containing).map(|s| &mut s.kind) {
            info.type_parameters.push(parameter);
        }
        parameter
    }

    pub fn method(&mut self, name: impl Into<String>, containing: SymbolId, info: MethodInfo) -> SymbolId {
        self.add_symbol(name, Some(containing), SymbolKind::Method(info))
    }

    /// A property; its getter and setter are linked back to it.
    pub fn property(
        &mut self,
        name: impl Into<String>,
        containing: SymbolId,
        info: PropertyInfo,
    ) -> SymbolId {
        let accessors = [info.getter, info.setter];
        let property = self.add_symbol(name, Some(containing), SymbolKind::Property(info));
        self.link_accessors(property, accessors);
        property
    }

    pub fn field(&mut self, name: impl Into<String>, containing: SymbolId, field_type: TypeRef) -> SymbolId {
        self.add_symbol(name, Some(containing), SymbolKind::Field(FieldInfo { field_type }))
    }

    pub fn event(&mut self, name: impl Into<String>, containing: SymbolId, info: EventInfo) -> SymbolId {
        let accessors = [info.add_method, info.remove_method];
        let event = self.add_symbol(name, Some(containing), SymbolKind::Event(info));
        self.link_accessors(event, accessors);
        event
    }

    fn link_accessors(&mut self, owner: SymbolId, accessors: [Option<SymbolId>; 2]) {
        for accessor in accessors.into_iter().flatten() {
            if let Some(SymbolKind::Method(info)) = self.symbol_mut(accessor).map(|s| &mut s.kind) {
                info.associated = Some(owner);
            }
        }
    }

    fn type_info_mut(&mut self, ty: SymbolId) -> Option<&mut TypeInfo> {
        match self.symbol_mut(ty).map(|s| &mut s.kind) {
            Some(SymbolKind::Type(info)) => Some(info),
            _ => None,
        }
    }

    pub fn set_base(&mut self, ty: SymbolId, base: TypeRef) {
        if let Some(info) = self.type_info_mut(ty) {
            info.base_type = Some(base);
        }
    }

    pub fn add_interface(&mut self, ty: SymbolId, interface: TypeRef) {
        if let Some(info) = self.type_info_mut(ty) {
            info.interfaces.push(interface);
        }
    }

    pub fn mark_object_root(&mut self, ty: SymbolId) {
        if let Some(info) = self.type_info_mut(ty) {
            info.is_object_root = true;
        }
    }

    pub fn set_delegate_invoke(&mut self, delegate: SymbolId, invoke: SymbolId) {
        if let Some(info) = self.type_info_mut(delegate) {
            info.delegate_invoke = Some(invoke);
        }
    }

    pub fn add_attribute(&mut self, symbol: SymbolId, class: SymbolId, location: Option<SourceLocation>) {
        if let Some(symbol) = self.symbol_mut(symbol) {
            symbol.attributes.push(AttributeUsage { class, location });
        }
    }

    pub fn add_location(&mut self, symbol: SymbolId, location: SourceLocation) {
        if let Some(symbol) = self.symbol_mut(symbol) {
            symbol.locations.push(location);
        }
    }

    /// Add a body and attach it to `owner` (a method or property), if given.
    pub fn body(
        &mut self,
        file: impl Into<PathBuf>,
        occurrences: Vec<Occurrence>,
        owner: Option<SymbolId>,
    ) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.data.bodies.push(Body {
            id,
            file: file.into(),
            occurrences,
        });
        match owner.and_then(|owner| self.symbol_mut(owner)).map(|s| &mut s.kind) {
            Some(SymbolKind::Method(info)) => info.bodies.push(id),
            Some(SymbolKind::Property(info)) => info.bodies.push(id),
            _ => {}
        }
        id
    }

    pub fn unit(&mut self, unit: CompilationUnit) {
        self.data.units.push(unit);
    }

    pub fn build(self) -> Workspace {
        Workspace::new(self.data)
    }
}
