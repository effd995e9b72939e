//! The capability seam between a language front end and the analyzer
//!
//! A front end implements the four required methods; everything else the
//! analyzer needs (qualified names, inheritance walks, implementation lookup)
//! is derived from them by the provided methods, which a front end with a
//! richer semantic model may override.

use std::collections::{HashMap, HashSet};

use crate::model::*;

/// Upper bound on containment / inheritance chain walks.
const MAX_CHAIN: usize = 256;

pub trait SymbolProvider: Send + Sync {
    fn compilation_units(&self) -> &[CompilationUnit];

    fn symbol(&self, id: SymbolId) -> Option<&Symbol>;

    fn body(&self, id: BodyId) -> Option<&Body>;

    /// Every named type known to the provider, in a stable order.
    fn all_named_types(&self) -> Vec<SymbolId>;

    /// Symbols directly contained by `container`.
    fn members(&self, container: SymbolId) -> Vec<SymbolId>;

    /// Dotted path from the outermost non-empty container down to the symbol.
    fn qualified_name(&self, id: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(symbol) = current.and_then(|id| self.symbol(id)) {
            if !symbol.name.is_empty() {
                parts.push(symbol.name.as_str());
            }
            if parts.len() >= MAX_CHAIN {
                break;
            }
            current = symbol.containing;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Nearest enclosing named type.
    fn containing_type(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = self.symbol(id)?.containing;
        for _ in 0..MAX_CHAIN {
            let symbol = self.symbol(current?)?;
            if symbol.is_type() {
                return Some(symbol.id);
            }
            current = symbol.containing;
        }
        None
    }

    fn type_display(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named {
                symbol,
                type_arguments,
            } => {
                let name = self.qualified_name(*symbol);
                if type_arguments.is_empty() {
                    name
                } else {
                    let args: Vec<String> =
                        type_arguments.iter().map(|arg| self.type_display(arg)).collect();
                    format!("{name}<{}>", args.join(", "))
                }
            }
            TypeRef::Array(element) => format!("{}[]", self.type_display(element)),
            TypeRef::Pointer(pointee) => format!("{}*", self.type_display(pointee)),
            TypeRef::FunctionPointer => "delegate*".to_string(),
            TypeRef::Dynamic => "dynamic".to_string(),
            TypeRef::TypeParameter(id) => self
                .symbol(*id)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
        }
    }

    /// Base types from the direct base upward.
    fn base_chain(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut chain = Vec::new();
        let mut current = ty;
        while let Some(TypeRef::Named { symbol, .. }) = self
            .symbol(current)
            .and_then(Symbol::type_info)
            .and_then(|info| info.base_type.as_ref())
        {
            if *symbol == ty || chain.contains(symbol) || chain.len() >= MAX_CHAIN {
                break;
            }
            chain.push(*symbol);
            current = *symbol;
        }
        chain
    }

    /// Every interface the type implements, directly, through its bases,
    /// or through other interfaces.
    fn all_interfaces(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<SymbolId> = std::iter::once(ty).chain(self.base_chain(ty)).collect();
        pending.reverse();

        while let Some(current) = pending.pop() {
            let Some(info) = self.symbol(current).and_then(Symbol::type_info) else {
                continue;
            };
            for interface in &info.interfaces {
                if let TypeRef::Named { symbol, .. } = interface {
                    if seen.insert(*symbol) {
                        found.push(*symbol);
                        pending.push(*symbol);
                    }
                }
            }
        }
        found
    }

    fn types_implementing(&self, interface: SymbolId) -> Vec<SymbolId> {
        self.all_named_types()
            .into_iter()
            .filter(|ty| *ty != interface && self.all_interfaces(*ty).contains(&interface))
            .collect()
    }

    fn types_derived_from(&self, base: SymbolId) -> Vec<SymbolId> {
        self.all_named_types()
            .into_iter()
            .filter(|ty| self.base_chain(*ty).contains(&base))
            .collect()
    }

    /// Arguments `ty` supplies for the type parameters of `generic`, found
    /// through its bases and interfaces. Empty when `ty` does not derive
    /// from `generic` or `generic` is not generic.
    fn type_arguments_for(&self, ty: SymbolId, generic: SymbolId) -> HashMap<SymbolId, TypeRef> {
        let mut seen = HashSet::from([ty]);
        let mut pending = vec![(ty, HashMap::new())];

        while let Some((current, bindings)) = pending.pop() {
            let Some(info) = self.symbol(current).and_then(Symbol::type_info) else {
                continue;
            };
            for supertype in info.base_type.iter().chain(&info.interfaces) {
                let TypeRef::Named {
                    symbol,
                    type_arguments,
                } = supertype
                else {
                    continue;
                };
                let parameters = self
                    .symbol(*symbol)
                    .and_then(Symbol::type_info)
                    .map(|info| info.type_parameters.as_slice())
                    .unwrap_or_default();
                let bound: HashMap<SymbolId, TypeRef> = parameters
                    .iter()
                    .copied()
                    .zip(type_arguments.iter().map(|arg| substitute(arg, &bindings)))
                    .collect();
                if *symbol == generic {
                    return bound;
                }
                if seen.len() < MAX_CHAIN && seen.insert(*symbol) {
                    pending.push((*symbol, bound));
                }
            }
        }
        HashMap::new()
    }

    /// The member of `ty` (or of one of its bases) that provides `member`,
    /// an interface method or an abstract method. Never `member` itself.
    fn find_implementation(&self, ty: SymbolId, member: SymbolId) -> Option<SymbolId> {
        let target = self.symbol(member)?;
        let target_info = target.method_info()?;
        let declaring = self.containing_type(member)?;
        let interface_member = self
            .symbol(declaring)
            .and_then(Symbol::type_info)
            .is_some_and(|info| info.type_kind == TypeKind::Interface);
        let declared = if interface_member {
            self.type_arguments_for(ty, declaring)
        } else {
            HashMap::new()
        };

        for owner in std::iter::once(ty).chain(self.base_chain(ty)) {
            let inherited = if owner == ty {
                HashMap::new()
            } else {
                self.type_arguments_for(ty, owner)
            };
            let candidates: Vec<(&Symbol, &MethodInfo)> = self
                .members(owner)
                .into_iter()
                .filter(|id| *id != member)
                .filter_map(|id| self.symbol(id))
                .filter_map(|symbol| symbol.method_info().map(|info| (symbol, info)))
                .collect();

            // An explicit implementation wins over a same-named public method
            if let Some((symbol, _)) = candidates.iter().find(|(symbol, info)| {
                info.explicit_implementations.contains(&member) || self.overrides(symbol.id, member)
            }) {
                return Some(symbol.id);
            }
            if interface_member {
                if let Some((symbol, _)) = candidates.iter().find(|(symbol, info)| {
                    symbol.name == target.name
                        && self.same_parameters(info, &inherited, target_info, &declared)
                }) {
                    return Some(symbol.id);
                }
            }
        }
        None
    }

    /// Whether `method` overrides `base`, directly or through intermediate overrides.
    fn overrides(&self, method: SymbolId, base: SymbolId) -> bool {
        let mut current = self.symbol(method).and_then(Symbol::method_info);
        for _ in 0..MAX_CHAIN {
            let Some(overridden) = current.and_then(|info| info.overridden) else {
                return false;
            };
            if overridden == base {
                return true;
            }
            current = self.symbol(overridden).and_then(Symbol::method_info);
        }
        false
    }

    /// Parameter lists match once each side's type parameters are replaced
    /// by the arguments bound to them.
    fn same_parameters(
        &self,
        left: &MethodInfo,
        left_bindings: &HashMap<SymbolId, TypeRef>,
        right: &MethodInfo,
        right_bindings: &HashMap<SymbolId, TypeRef>,
    ) -> bool {
        left.parameters.len() == right.parameters.len()
            && left.parameters.iter().zip(&right.parameters).all(|(l, r)| {
                self.type_display(&substitute(&l.ty, left_bindings))
                    == self.type_display(&substitute(&r.ty, right_bindings))
            })
    }
}

/// `ty` with bound type parameters replaced by their arguments.
pub fn substitute(ty: &TypeRef, bindings: &HashMap<SymbolId, TypeRef>) -> TypeRef {
    match ty {
        TypeRef::TypeParameter(id) => bindings.get(id).cloned().unwrap_or_else(|| ty.clone()),
        TypeRef::Named {
            symbol,
            type_arguments,
        } => TypeRef::generic(
            *symbol,
            type_arguments.iter().map(|arg| substitute(arg, bindings)).collect(),
        ),
        TypeRef::Array(element) => TypeRef::array_of(substitute(element, bindings)),
        TypeRef::Pointer(pointee) => TypeRef::pointer_to(substitute(pointee, bindings)),
        TypeRef::FunctionPointer | TypeRef::Dynamic => ty.clone(),
    }
}
