//! Symbol table for cross-element resolution

use arbor_core::ElementId;
use dashmap::DashMap;

use crate::model::{SymbolId, SymbolKind};
use crate::provider::SymbolProvider;

/// What an element was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementOrigin {
    Symbol(SymbolId),
    /// The placeholder class holding an assembly's top-level statements.
    TopLevelType,
    /// The placeholder method standing for an assembly's top-level statements.
    TopLevelStatements { assembly: SymbolId },
    /// The synthesized `global` namespace.
    GlobalNamespace,
}

/// Symbol table mapping symbol keys to ElementIds. Thread-safe for concurrent access.
pub struct SymbolTable {
    elements: DashMap<String, ElementId>,
    origins: DashMap<ElementId, ElementOrigin>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            elements: DashMap::new(),
            origins: DashMap::new(),
        }
    }

    /// Insert the element created for a symbol.
    pub fn insert(&self, key: String, element: ElementId, symbol: SymbolId) {
        self.elements.insert(key, element);
        self.origins.insert(element, ElementOrigin::Symbol(symbol));
    }

    /// Record a synthesized element, which has no key.
    pub fn record_origin(&self, element: ElementId, origin: ElementOrigin) {
        self.origins.insert(element, origin);
    }

    /// Look up an element by symbol key.
    pub fn lookup(&self, key: &str) -> Option<ElementId> {
        self.elements.get(key).map(|r| *r.value())
    }

    pub fn origin(&self, element: ElementId) -> Option<ElementOrigin> {
        self.origins.get(&element).map(|r| *r.value())
    }

    /// Element already created for `symbol`, if any.
    pub fn resolve(&self, provider: &dyn SymbolProvider, symbol: SymbolId) -> Option<ElementId> {
        symbol_key(provider, symbol).and_then(|key| self.lookup(&key))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a symbol across compilation units: qualified name plus kind,
/// with parameter types for methods so overloads stay apart.
///
/// `Shop.Order.Save(Shop.Order, int)` → `Shop.Order.Save_Shop.Order_ int_Method`
pub fn symbol_key(provider: &dyn SymbolProvider, id: SymbolId) -> Option<String> {
    let symbol = provider.symbol(id)?;
    let full_name = provider.qualified_name(id);
    let key = match &symbol.kind {
        SymbolKind::Method(info) => {
            let parameters: Vec<String> = info
                .parameters
                .iter()
                .map(|p| provider.type_display(&p.ty))
                .collect();
            format!("{full_name}_{}_{}", parameters.join("_ "), symbol.kind.label())
        }
        kind => format!("{full_name}_{}", kind.label()),
    };
    Some(key)
}
