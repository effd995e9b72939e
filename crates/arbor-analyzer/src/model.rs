//! Symbol model exchanged with a symbol provider
//!
//! This is the semantic view of a codebase a front end hands to the
//! analyzer: symbols with their containment chain, resolved type references,
//! compilation units with their declaration trees, and method bodies reduced
//! to the syntactic occurrences the analyzer cares about.

use std::fmt;
use std::path::PathBuf;

use arbor_core::SourceLocation;
use serde::{Deserialize, Serialize};

/// Handle to a symbol, owned by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symbol {}", self.0)
    }
}

/// Handle to a body (method, accessor, or top-level statement block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
    Delegate,
}

/// A resolved reference to a type, as it appears in a signature or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Named {
        symbol: SymbolId,
        #[serde(default)]
        type_arguments: Vec<TypeRef>,
    },
    Array(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    FunctionPointer,
    Dynamic,
    TypeParameter(SymbolId),
}

impl TypeRef {
    pub fn named(symbol: SymbolId) -> Self {
        TypeRef::Named {
            symbol,
            type_arguments: Vec::new(),
        }
    }

    pub fn generic(symbol: SymbolId, type_arguments: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            symbol,
            type_arguments,
        }
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn pointer_to(pointee: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(pointee))
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, TypeRef::Named { type_arguments, .. } if !type_arguments.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub type_kind: TypeKind,
    #[serde(default)]
    pub base_type: Option<TypeRef>,
    /// Directly implemented interfaces.
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub type_parameters: Vec<SymbolId>,
    /// The universal base type (`object`); never produces an Inherits edge.
    #[serde(default)]
    pub is_object_root: bool,
    /// For delegates: the synthesized `Invoke` method carrying the signature.
    #[serde(default)]
    pub delegate_invoke: Option<SymbolId>,
}

impl TypeInfo {
    pub fn new(type_kind: TypeKind) -> Self {
        TypeInfo {
            type_kind,
            base_type: None,
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
            is_object_root: false,
            delegate_invoke: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodInfo {
    pub parameters: Vec<Parameter>,
    /// `None` for void.
    pub return_type: Option<TypeRef>,
    pub is_abstract: bool,
    pub is_override: bool,
    pub overridden: Option<SymbolId>,
    pub is_extension: bool,
    /// For a reduced extension method: the original static definition.
    pub reduced_from: Option<SymbolId>,
    pub type_arguments: Vec<TypeRef>,
    /// Event or property this accessor belongs to.
    pub associated: Option<SymbolId>,
    /// Interface members implemented explicitly.
    pub explicit_implementations: Vec<SymbolId>,
    pub bodies: Vec<BodyId>,
}

impl MethodInfo {
    pub fn returns_void(&self) -> bool {
        self.return_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub property_type: TypeRef,
    /// Indexer parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub getter: Option<SymbolId>,
    #[serde(default)]
    pub setter: Option<SymbolId>,
    /// Expression bodies attached to the property itself.
    #[serde(default)]
    pub bodies: Vec<BodyId>,
}

impl PropertyInfo {
    pub fn new(property_type: TypeRef) -> Self {
        PropertyInfo {
            property_type,
            parameters: Vec::new(),
            getter: None,
            setter: None,
            bodies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field_type: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_type: TypeRef,
    #[serde(default)]
    pub add_method: Option<SymbolId>,
    #[serde(default)]
    pub remove_method: Option<SymbolId>,
}

impl EventInfo {
    pub fn new(event_type: TypeRef) -> Self {
        EventInfo {
            event_type,
            add_method: None,
            remove_method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SymbolKind {
    Assembly,
    Namespace {
        #[serde(default)]
        is_global: bool,
    },
    Type(TypeInfo),
    Method(MethodInfo),
    Property(PropertyInfo),
    Field(FieldInfo),
    Event(EventInfo),
    TypeParameter,
}

impl SymbolKind {
    /// Kind label used in symbol keys.
    pub fn label(&self) -> &'static str {
        match self {
            SymbolKind::Assembly => "Assembly",
            SymbolKind::Namespace { .. } => "Namespace",
            SymbolKind::Type(_) => "NamedType",
            SymbolKind::Method(_) => "Method",
            SymbolKind::Property(_) => "Property",
            SymbolKind::Field(_) => "Field",
            SymbolKind::Event(_) => "Event",
            SymbolKind::TypeParameter => "TypeParameter",
        }
    }
}

/// An attribute applied to a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeUsage {
    pub class: SymbolId,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    #[serde(default)]
    pub containing: Option<SymbolId>,
    pub kind: SymbolKind,
    #[serde(default)]
    pub attributes: Vec<AttributeUsage>,
    /// Declaring locations; several for partial declarations.
    #[serde(default)]
    pub locations: Vec<SourceLocation>,
}

impl Symbol {
    pub fn type_info(&self) -> Option<&TypeInfo> {
        match &self.kind {
            SymbolKind::Type(info) => Some(info),
            _ => None,
        }
    }

    pub fn method_info(&self) -> Option<&MethodInfo> {
        match &self.kind {
            SymbolKind::Method(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Type(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOperator {
    Simple,
    Add,
    Subtract,
    Other,
}

/// A syntactic construct inside a body, already resolved by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Syntax {
    ObjectCreation {
        #[serde(default)]
        created: Option<TypeRef>,
    },
    Invocation {
        /// The method the call binds to.
        #[serde(default)]
        method: Option<SymbolId>,
        /// Generic arguments at the call site.
        #[serde(default)]
        type_arguments: Vec<TypeRef>,
        /// What the invoked expression itself resolves to (e.g. an event).
        #[serde(default)]
        callee: Option<SymbolId>,
    },
    Identifier {
        #[serde(default)]
        symbol: Option<SymbolId>,
    },
    MemberAccess {
        #[serde(default)]
        symbol: Option<SymbolId>,
    },
    Assignment {
        operator: AssignmentOperator,
        #[serde(default)]
        left: Option<SymbolId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub location: SourceLocation,
    pub syntax: Syntax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub file: PathBuf,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

/// A declaration node of a compilation unit's syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub symbol: SymbolId,
    #[serde(default)]
    pub location: Option<SourceLocation>,
    #[serde(default)]
    pub members: Vec<Declaration>,
}

impl Declaration {
    pub fn new(symbol: SymbolId) -> Self {
        Declaration {
            symbol,
            location: None,
            members: Vec::new(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_members(mut self, members: Vec<Declaration>) -> Self {
        self.members = members;
        self
    }
}

/// One source file of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub project: String,
    pub assembly: SymbolId,
    pub file: PathBuf,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    /// Statements outside any declared type or method.
    #[serde(default)]
    pub top_level_statements: Vec<BodyId>,
}
