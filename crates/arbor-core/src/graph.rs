//! The code graph: an element forest plus a typed dependency multigraph

use std::collections::{BTreeMap, HashSet};

use crate::error::{GraphError, Result};
use crate::model::*;

/// Owns all code elements, keyed by id.
///
/// The parent/child relation is a forest stored on the elements themselves.
/// Dependencies live in each source element's edge list and may form cycles.
#[derive(Clone, Default)]
pub struct CodeGraph {
    nodes: BTreeMap<ElementId, CodeElement>,
    next_id: u64,
}

impl std::fmt::Debug for CodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGraph")
            .field("element_count", &self.element_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

impl CodeGraph {
    pub fn new() -> Self {
        CodeGraph {
            nodes: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn mint_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    fn reserve_id(&mut self, id: ElementId) {
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }
    }

    /// Create a new element under `parent` (or as a root). Returns its fresh id.
    pub fn create_element(
        &mut self,
        kind: ElementKind,
        name: impl Into<String>,
        full_name: impl Into<String>,
        parent: Option<ElementId>,
    ) -> Result<ElementId> {
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                return Err(GraphError::UnknownElement(parent_id));
            }
        }

        let id = self.mint_id();
        let element = CodeElement::new(id, kind, name, full_name, parent);
        self.nodes.insert(id, element);
        if let Some(parent_id) = parent {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.insert(id);
            }
        }
        Ok(id)
    }

    /// Insert a fully formed element as is. Hierarchy links are not checked.
    /// Returns the element previously stored under the same id, if any.
    pub fn insert_element(&mut self, element: CodeElement) -> Option<CodeElement> {
        self.reserve_id(element.id);
        self.nodes.insert(element.id, element)
    }

    /// Get an element by id.
    pub fn element(&self, id: ElementId) -> Option<&CodeElement> {
        self.nodes.get(&id)
    }

    /// Get a mutable element by id.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut CodeElement> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.nodes.values().map(|e| e.dependencies.len()).sum()
    }

    /// Iterate over all elements in id order.
    pub fn elements(&self) -> impl Iterator<Item = &CodeElement> {
        self.nodes.values()
    }

    /// All element ids in ascending order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.nodes.keys().copied().collect()
    }

    /// Iterate over all dependencies, grouped by source element.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.nodes.values().flat_map(|e| e.dependencies.iter())
    }

    /// Get all dependencies pointing at a target.
    pub fn dependencies_to(&self, target: ElementId) -> impl Iterator<Item = &Dependency> {
        self.dependencies().filter(move |d| d.target == target)
    }

    /// Check if a dependency of the given kind exists between two elements.
    pub fn has_dependency(&self, source: ElementId, target: ElementId, kind: DependencyKind) -> bool {
        self.nodes
            .get(&source)
            .is_some_and(|e| e.dependency(target, kind).is_some())
    }

    /// Elements without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &CodeElement> {
        self.nodes.values().filter(|e| e.parent.is_none())
    }

    /// Get all elements of a specific kind.
    pub fn elements_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &CodeElement> {
        self.nodes.values().filter(move |e| e.kind == kind)
    }

    /// Find an element by fully qualified name (first match in id order).
    pub fn find_by_full_name(&self, full_name: &str) -> Option<&CodeElement> {
        self.nodes.values().find(|e| e.full_name == full_name)
    }

    /// Parent chain of an element, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(&id).and_then(|e| e.parent);

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            ancestors.push(parent_id);
            current = self.nodes.get(&parent_id).and_then(|e| e.parent);
        }

        ancestors
    }

    /// Record a dependency. A second discovery of the same
    /// (source, target, kind) merges its locations into the existing edge.
    /// Returns `true` when a new edge was created.
    pub fn add_dependency(
        &mut self,
        source: ElementId,
        target: ElementId,
        kind: DependencyKind,
        locations: impl IntoIterator<Item = SourceLocation>,
    ) -> Result<bool> {
        let element = self
            .nodes
            .get_mut(&source)
            .ok_or(GraphError::UnknownElement(source))?;

        if let Some(existing) = element
            .dependencies
            .iter_mut()
            .find(|d| d.target == target && d.kind == kind)
        {
            existing.source_locations.extend(locations);
            return Ok(false);
        }

        let mut dependency = Dependency::new(source, target, kind);
        dependency.source_locations.extend(locations);
        element.dependencies.push(dependency);
        Ok(true)
    }

    /// Attach a complete dependency to its source element, merging duplicates.
    pub fn attach_dependency(&mut self, dependency: Dependency) -> Result<bool> {
        let Dependency {
            source,
            target,
            kind,
            source_locations,
        } = dependency;
        self.add_dependency(source, target, kind, source_locations)
    }

    /// Remove specific edges, matched by (source, target, kind).
    /// Returns how many were removed.
    pub fn remove_dependencies(&mut self, dependencies: &[Dependency]) -> usize {
        let mut removed = 0;
        for dependency in dependencies {
            if let Some(source) = self.nodes.get_mut(&dependency.source) {
                let before = source.dependencies.len();
                source
                    .dependencies
                    .retain(|d| !(d.target == dependency.target && d.kind == dependency.kind));
                removed += before - source.dependencies.len();
            }
        }
        removed
    }

    /// Re-link `child` under `new_parent`, detaching it from its old parent.
    pub fn move_to(&mut self, child: ElementId, new_parent: ElementId) -> Result<()> {
        if !self.nodes.contains_key(&new_parent) {
            return Err(GraphError::UnknownElement(new_parent));
        }
        let old_parent = self
            .nodes
            .get(&child)
            .ok_or(GraphError::UnknownElement(child))?
            .parent;

        if child == new_parent || self.ancestors(new_parent).contains(&child) {
            return Err(GraphError::HierarchyCycle {
                child,
                parent: new_parent,
            });
        }

        if let Some(old) = old_parent.and_then(|id| self.nodes.get_mut(&id)) {
            old.children.remove(&child);
        }
        if let Some(element) = self.nodes.get_mut(&child) {
            element.parent = Some(new_parent);
        }
        if let Some(parent) = self.nodes.get_mut(&new_parent) {
            parent.children.insert(child);
        }
        Ok(())
    }

    /// Depth-first walk of the hierarchy; children are visited before their parent.
    /// Every live element is visited exactly once.
    pub fn dfs_hierarchy(&self, mut visit: impl FnMut(&CodeElement)) {
        for id in self.hierarchy_order() {
            if let Some(element) = self.nodes.get(&id) {
                visit(element);
            }
        }
    }

    fn hierarchy_order(&self) -> Vec<ElementId> {
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());

        for &start in self.nodes.keys() {
            if !visited.insert(start) {
                continue;
            }
            let mut stack = vec![(start, false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    order.push(id);
                    continue;
                }
                stack.push((id, true));
                if let Some(element) = self.nodes.get(&id) {
                    for child in element.children.iter().rev() {
                        if self.nodes.contains_key(child) && visited.insert(*child) {
                            stack.push((*child, false));
                        }
                    }
                }
            }
        }

        order
    }

    /// Remove one element. See [`CodeGraph::remove_elements`].
    pub fn remove_element(&mut self, id: ElementId) -> Option<CodeElement> {
        let ids = HashSet::from([id]);
        self.remove_elements(&ids).pop()
    }

    /// Remove a set of elements.
    ///
    /// Children of a removed element are orphaned, not deleted. Every
    /// dependency touching a removed id is dropped from the remaining elements.
    pub fn remove_elements(&mut self, ids: &HashSet<ElementId>) -> Vec<CodeElement> {
        let removed: Vec<CodeElement> = ids
            .iter()
            .filter_map(|id| self.nodes.remove(id))
            .collect();

        for id in self.hierarchy_order() {
            if let Some(element) = self.nodes.get_mut(&id) {
                if element.parent.is_some_and(|p| ids.contains(&p)) {
                    element.parent = None;
                }
                element.children.retain(|c| !ids.contains(c));
                element.dependencies.retain(|d| !d.touches(ids));
            }
        }

        tracing::debug!("Removed {} elements", removed.len());
        removed
    }

    /// Integrate an element taken from another graph (usually a larger
    /// analyzed snapshot). The clone is linked to whichever of its original
    /// parent and children are already present. Idempotent per id.
    pub fn integrate(&mut self, original: &CodeElement) -> &CodeElement {
        let id = original.id;
        if !self.nodes.contains_key(&id) {
            let mut element = original.clone_detached();

            if let Some(parent) = original.parent.and_then(|p| self.nodes.get_mut(&p)) {
                parent.children.insert(id);
                element.parent = Some(parent.id);
            }

            for child_id in &original.children {
                if let Some(child) = self.nodes.get_mut(child_id) {
                    if child.parent.is_none_or(|p| p == id) {
                        child.parent = Some(id);
                        element.children.insert(*child_id);
                    }
                }
            }

            self.insert_element(element);
        }
        &self.nodes[&id]
    }

    /// Integrate several elements, then attach the supplied dependencies to
    /// their (now present) source elements.
    pub fn integrate_all<'a>(
        &mut self,
        originals: impl IntoIterator<Item = &'a CodeElement>,
        dependencies: impl IntoIterator<Item = Dependency>,
    ) -> Result<()> {
        for original in originals {
            self.integrate(original);
        }
        for dependency in dependencies {
            self.attach_dependency(dependency)?;
        }
        Ok(())
    }
}
