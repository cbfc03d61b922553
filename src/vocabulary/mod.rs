//! schema.org vocabulary registry.
//!
//! Types form a DAG through their parent sets (schema.org allows several
//! parents, e.g. `LocalBusiness` is both an `Organization` and a `Place`).
//! The registry is loaded once from a versioned snapshot and is read-only
//! afterwards; ancestor closures and effective constraint sets are memoized
//! in lock-free maps so concurrent analyses can share one instance.

pub mod definition;

use once_cell::sync::OnceCell;
use papaya::HashMap as PapayaMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, SchemaMarkupError};

pub use definition::{PropertyRange, PropertyShape, RangeKind, VocabularyType};
use definition::VocabularySnapshot;

const EMBEDDED_SNAPSHOT: &str = include_str!("../../vocabulary/schemaorg.json");

static EMBEDDED_REGISTRY: OnceCell<Arc<VocabularyRegistry>> = OnceCell::new();

/// Effective constraints of a type after inheritance.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConstraints {
    pub type_names: Vec<String>,
    /// Declaration order, ancestors first; drives issue ordering
    pub property_order: Vec<String>,
    pub required: Vec<String>,
    pub recommended: Vec<String>,
    shapes: HashMap<String, PropertyRange>,
    positions: HashMap<String, usize>,
}

impl ResolvedConstraints {
    fn new(
        type_names: Vec<String>,
        property_order: Vec<String>,
        required: Vec<String>,
        recommended: Vec<String>,
        shapes: HashMap<String, PropertyRange>,
    ) -> Self {
        let positions = property_order
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        let mut constraints = Self {
            type_names,
            property_order,
            required,
            recommended,
            shapes,
            positions,
        };
        constraints.sort_requirements();
        constraints
    }

    /// No type information at all (unknown or missing type).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.type_names.is_empty()
    }

    pub fn position(&self, property: &str) -> Option<usize> {
        self.positions.get(property).copied()
    }

    /// Shape declared by the type chain (closest declaration wins).
    pub fn shape(&self, property: &str) -> Option<&PropertyRange> {
        self.shapes.get(property)
    }

    pub fn declares(&self, property: &str) -> bool {
        self.positions.contains_key(property)
    }

    /// Combine the constraints of a multi-typed entity. The first type's
    /// shapes win on conflicts.
    pub fn merge(parts: &[Arc<ResolvedConstraints>]) -> Self {
        let mut type_names = Vec::new();
        let mut property_order: Vec<String> = Vec::new();
        let mut required: Vec<String> = Vec::new();
        let mut recommended: Vec<String> = Vec::new();
        let mut shapes = HashMap::new();

        for part in parts {
            type_names.extend(part.type_names.iter().cloned());
            for name in &part.property_order {
                if !property_order.contains(name) {
                    property_order.push(name.clone());
                }
            }
            for (name, range) in &part.shapes {
                shapes.entry(name.clone()).or_insert_with(|| range.clone());
            }
            for name in &part.required {
                if !required.contains(name) {
                    required.push(name.clone());
                }
            }
            for name in &part.recommended {
                if !recommended.contains(name) {
                    recommended.push(name.clone());
                }
            }
        }
        recommended.retain(|name| !required.contains(name));

        Self::new(type_names, property_order, required, recommended, shapes)
    }

    fn sort_requirements(&mut self) {
        let positions = &self.positions;
        let key = |name: &String| positions.get(name).copied().unwrap_or(usize::MAX);
        self.required.sort_by_key(key);
        self.recommended.sort_by_key(key);
    }
}

#[derive(Debug)]
pub struct VocabularyRegistry {
    version: String,
    types: HashMap<String, VocabularyType>,
    global_shapes: HashMap<String, PropertyRange>,
    ancestor_cache: PapayaMap<String, Arc<Vec<String>>>,
    constraint_cache: PapayaMap<String, Arc<ResolvedConstraints>>,
}

impl VocabularyRegistry {
    /// The snapshot compiled into the crate, loaded once per process.
    pub fn embedded() -> Result<Arc<Self>> {
        EMBEDDED_REGISTRY
            .get_or_try_init(|| Self::from_json(EMBEDDED_SNAPSHOT).map(Arc::new))
            .cloned()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: VocabularySnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn from_snapshot(snapshot: VocabularySnapshot) -> Result<Self> {
        let mut types = HashMap::with_capacity(snapshot.types.len());
        for entry in snapshot.types {
            let vocabulary_type = entry.into_vocabulary_type()?;
            let name = vocabulary_type.name.clone();
            if types.insert(name.clone(), vocabulary_type).is_some() {
                return Err(SchemaMarkupError::vocabulary(format!(
                    "type '{name}' is declared twice"
                )));
            }
        }

        let mut global_shapes = HashMap::new();
        for declaration in &snapshot.global {
            let shape = PropertyShape::parse(declaration)?;
            global_shapes.insert(shape.name, shape.range);
        }

        let registry = Self {
            version: snapshot.version,
            types,
            global_shapes,
            ancestor_cache: PapayaMap::new(),
            constraint_cache: PapayaMap::new(),
        };
        registry.check_integrity()?;

        tracing::info!(
            "Loaded vocabulary {} with {} types",
            registry.version,
            registry.types.len()
        );
        Ok(registry)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// The type as declared. Unknown names are not an error here.
    pub fn lookup(&self, type_name: &str) -> Option<&VocabularyType> {
        self.types.get(type_name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Shape that applies to a property regardless of the owning type.
    pub fn global_shape(&self, property: &str) -> Option<&PropertyRange> {
        self.global_shapes.get(property)
    }

    /// The type itself followed by every ancestor, nearest first.
    pub fn ancestors(&self, type_name: &str) -> Arc<Vec<String>> {
        if !self.types.contains_key(type_name) {
            return Arc::new(vec![type_name.to_string()]);
        }
        if let Some(cached) = self.ancestor_cache.pin().get(type_name) {
            return cached.clone();
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(type_name.to_string());

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(definition) = self.types.get(&current) {
                for parent in &definition.parent_types {
                    if !seen.contains(parent) {
                        queue.push_back(parent.clone());
                    }
                }
            }
            order.push(current);
        }

        let order = Arc::new(order);
        self.ancestor_cache
            .pin()
            .insert(type_name.to_string(), order.clone());
        order
    }

    /// Reflexive, transitive subtype test over all parent sets.
    pub fn is_subtype_of(&self, child: &str, parent: &str) -> bool {
        if child == parent {
            return true;
        }
        self.ancestors(child).iter().any(|ancestor| ancestor == parent)
    }

    /// Effective constraints for a known type, or `None` if the type is unknown.
    pub fn constraints(&self, type_name: &str) -> Option<Arc<ResolvedConstraints>> {
        if !self.types.contains_key(type_name) {
            return None;
        }
        if let Some(cached) = self.constraint_cache.pin().get(type_name) {
            return Some(cached.clone());
        }

        let constraints = Arc::new(self.compute_constraints(type_name));
        self.constraint_cache
            .pin()
            .insert(type_name.to_string(), constraints.clone());
        Some(constraints)
    }

    /// Combined constraints of every known type in `types`; unknown names are skipped.
    pub fn constraints_for_types(&self, types: &[String]) -> Arc<ResolvedConstraints> {
        let mut parts: Vec<_> = types
            .iter()
            .filter_map(|type_name| self.constraints(type_name))
            .collect();
        match parts.len() {
            0 => Arc::new(ResolvedConstraints::empty()),
            1 => parts.remove(0),
            _ => Arc::new(ResolvedConstraints::merge(&parts)),
        }
    }

    /// Effective shape of `property` on a type set: type chain first, then global.
    pub fn shape_for<'a>(
        &'a self,
        constraints: &'a ResolvedConstraints,
        property: &str,
    ) -> Option<&'a PropertyRange> {
        constraints
            .shape(property)
            .or_else(|| self.global_shape(property))
    }

    fn compute_constraints(&self, type_name: &str) -> ResolvedConstraints {
        let mut property_order = Vec::new();
        let mut visited = HashSet::new();
        self.linearize(type_name, &mut property_order, &mut visited);

        let mut shapes = HashMap::new();
        for ancestor in self.ancestors(type_name).iter() {
            if let Some(definition) = self.types.get(ancestor) {
                for shape in &definition.property_shapes {
                    shapes
                        .entry(shape.name.clone())
                        .or_insert_with(|| shape.range.clone());
                }
            }
        }

        let (required, recommended) = self.effective_requirements(type_name);

        ResolvedConstraints::new(
            vec![type_name.to_string()],
            property_order,
            required.into_iter().collect(),
            recommended.into_iter().collect(),
            shapes,
        )
    }

    fn linearize(&self, type_name: &str, order: &mut Vec<String>, visited: &mut HashSet<String>) {
        if !visited.insert(type_name.to_string()) {
            return;
        }
        let Some(definition) = self.types.get(type_name) else {
            return;
        };
        for parent in &definition.parent_types {
            self.linearize(parent, order, visited);
        }
        for shape in &definition.property_shapes {
            if !order.contains(&shape.name) {
                order.push(shape.name.clone());
            }
        }
    }

    fn effective_requirements(&self, type_name: &str) -> (HashSet<String>, HashSet<String>) {
        let Some(definition) = self.types.get(type_name) else {
            return (HashSet::new(), HashSet::new());
        };

        let mut required = HashSet::new();
        let mut recommended = HashSet::new();
        for parent in &definition.parent_types {
            let (parent_required, parent_recommended) = self.effective_requirements(parent);
            required.extend(parent_required);
            recommended.extend(parent_recommended);
        }
        for relaxed in &definition.relaxed_properties {
            required.remove(relaxed);
            recommended.remove(relaxed);
        }
        required.extend(definition.required_properties.iter().cloned());
        recommended.extend(definition.recommended_properties.iter().cloned());
        recommended.retain(|name| !required.contains(name));

        (required, recommended)
    }

    fn check_integrity(&self) -> Result<()> {
        for definition in self.types.values() {
            for parent in &definition.parent_types {
                if !self.types.contains_key(parent) {
                    return Err(SchemaMarkupError::vocabulary(format!(
                        "type '{}' has unknown parent '{parent}'",
                        definition.name
                    )));
                }
            }
        }

        self.check_acyclic()?;

        let check_range = |owner: &str, shape: &PropertyShape| -> Result<()> {
            for entity in shape.range.entity_types() {
                if !self.types.contains_key(entity) {
                    return Err(SchemaMarkupError::vocabulary(format!(
                        "property '{owner}.{}' expects unknown type '{entity}'",
                        shape.name
                    )));
                }
            }
            Ok(())
        };

        for (name, range) in &self.global_shapes {
            check_range(
                "*",
                &PropertyShape {
                    name: name.clone(),
                    range: range.clone(),
                },
            )?;
        }

        for definition in self.types.values() {
            for shape in &definition.property_shapes {
                check_range(&definition.name, shape)?;
            }

            let mut declared = Vec::new();
            self.linearize(&definition.name, &mut declared, &mut HashSet::new());
            let requirements = definition
                .required_properties
                .iter()
                .chain(&definition.recommended_properties)
                .chain(&definition.relaxed_properties);
            for property in requirements {
                if !declared.contains(property) {
                    return Err(SchemaMarkupError::vocabulary(format!(
                        "type '{}' constrains undeclared property '{property}'",
                        definition.name
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            registry: &'a VocabularyRegistry,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
        ) -> Result<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(SchemaMarkupError::vocabulary(format!(
                        "type hierarchy contains a cycle through '{name}'"
                    )));
                }
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            if let Some(definition) = registry.types.get(name) {
                for parent in &definition.parent_types {
                    visit(registry, parent, marks)?;
                }
            }
            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for name in self.types.keys() {
            visit(self, name, &mut marks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_snapshot_loads_once() {
        let first = VocabularyRegistry::embedded().unwrap();
        let second = VocabularyRegistry::embedded().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.contains("Product"));
        assert!(!first.version().is_empty());
    }

    #[test]
    fn test_cycle_in_parents_is_rejected() {
        let json = r#"{
            "version": "test",
            "types": [
                {"name": "A", "parents": ["B"]},
                {"name": "B", "parents": ["A"]}
            ]
        }"#;
        let err = VocabularyRegistry::from_json(json).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_undeclared_requirement_is_rejected() {
        let json = r#"{
            "version": "test",
            "types": [{"name": "A", "required": ["missing"], "properties": ["name:Text"]}]
        }"#;
        assert!(VocabularyRegistry::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_range_type_is_rejected() {
        let json = r#"{
            "version": "test",
            "types": [{"name": "A", "properties": ["owner:Nobody"]}]
        }"#;
        assert!(VocabularyRegistry::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_type_lookup_is_not_an_error() {
        let registry = VocabularyRegistry::embedded().unwrap();
        assert!(registry.lookup("FooBarBaz").is_none());
        assert!(registry.constraints("FooBarBaz").is_none());
        assert!(!registry.is_subtype_of("FooBarBaz", "Thing"));
        assert!(registry.is_subtype_of("FooBarBaz", "FooBarBaz"));
    }
}
