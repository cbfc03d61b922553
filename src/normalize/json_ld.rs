// JSON-LD documents to entity trees

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use super::Normalizer;
use super::names::{canonical_name, is_schema_context, is_schema_iri};
use crate::extract::RawCandidate;
use crate::types::{CandidateRef, EntityNode, Issue, IssueCode, PropertyValue, TypeSource};

type JsonObject = Map<String, Value>;

/// A top-level node and the document context it inherits.
struct RootNode<'a> {
    object: &'a JsonObject,
    has_context: bool,
}

pub(super) fn normalize(
    normalizer: &Normalizer,
    candidate: &RawCandidate,
    source: CandidateRef,
) -> Result<Vec<EntityNode>, String> {
    let document: Value = serde_json::from_str(&candidate.raw_text)
        .map_err(|err| format!("JSON-LD block {} is not valid JSON: {err}", candidate.index))?;

    let roots = collect_roots(&document, false)?;
    let mut index = HashMap::new();
    for root in &roots {
        index_identified(root.object, &mut index);
    }

    let mut converter = Converter {
        normalizer,
        source,
        index,
        visiting: Vec::new(),
        embedded: HashSet::new(),
        expanded: HashSet::new(),
        built: 0,
    };

    let mut converted = Vec::with_capacity(roots.len());
    for root in &roots {
        converter.embedded.clear();
        converter.expanded.clear();
        let mut node = converter.convert_node(root.object, None, 0);
        let explicit_iri = raw_types(root.object).iter().any(|raw| is_schema_iri(raw));
        if !root.has_context && !explicit_iri && !candidate.standalone {
            node.diagnostics.push(Issue::warning(
                IssueCode::MissingContext,
                "JSON-LD block does not declare a schema.org @context",
            ));
        }
        let embedded = std::mem::take(&mut converter.embedded);
        converted.push((node, embedded));
    }

    Ok(select_top_level(converted))
}

/// Drop nodes that another reported node already embeds through an `@id`
/// reference. When nodes only reference each other, the first one wins.
fn select_top_level(converted: Vec<(EntityNode, HashSet<String>)>) -> Vec<EntityNode> {
    let embedded_by_others = |position: usize, id: &str| {
        converted
            .iter()
            .enumerate()
            .any(|(other, (_, embedded))| other != position && embedded.contains(id))
    };

    let mut keep: Vec<bool> = converted
        .iter()
        .enumerate()
        .map(|(position, (node, _))| match &node.id {
            Some(id) => !embedded_by_others(position, id),
            None => true,
        })
        .collect();

    let mut covered: HashSet<&str> = HashSet::new();
    for (position, (_, embedded)) in converted.iter().enumerate() {
        if keep[position] {
            covered.extend(embedded.iter().map(String::as_str));
        }
    }
    for position in 0..converted.len() {
        if keep[position] {
            continue;
        }
        let (node, embedded) = &converted[position];
        let already = node.id.as_deref().is_some_and(|id| covered.contains(id));
        if !already {
            keep[position] = true;
            covered.extend(embedded.iter().map(String::as_str));
        }
    }

    converted
        .into_iter()
        .zip(keep)
        .filter_map(|((node, _), keep)| keep.then_some(node))
        .collect()
}

fn collect_roots(document: &Value, inherited_context: bool) -> Result<Vec<RootNode<'_>>, String> {
    match document {
        Value::Array(items) => {
            let mut roots = Vec::new();
            for item in items {
                roots.extend(collect_roots(item, inherited_context)?);
            }
            Ok(roots)
        }
        Value::Object(object) => {
            let has_context =
                inherited_context || object.get("@context").is_some_and(is_schema_context);
            match object.get("@graph") {
                Some(graph) => {
                    let mut roots = collect_roots(graph, has_context)?;
                    if object.contains_key("@type") {
                        roots.insert(0, RootNode { object, has_context });
                    }
                    Ok(roots)
                }
                None => Ok(vec![RootNode { object, has_context }]),
            }
        }
        _ => Err("JSON-LD document must be an object or an array of objects".to_string()),
    }
}

/// Every node object carrying an `@id` and some content, at any depth.
fn index_identified<'a>(object: &'a JsonObject, index: &mut HashMap<String, &'a JsonObject>) {
    if let Some(id) = object.get("@id").and_then(Value::as_str) {
        if !is_reference(object) {
            index.entry(id.to_string()).or_insert(object);
        }
    }
    for (key, value) in object {
        if key == "@context" {
            continue;
        }
        let mut stack = vec![value];
        while let Some(value) = stack.pop() {
            match value {
                Value::Object(nested) => index_identified(nested, index),
                Value::Array(items) => stack.extend(items.iter()),
                _ => {}
            }
        }
    }
}

/// `{"@id": "..."}` with nothing else describing the node.
fn is_reference(object: &JsonObject) -> bool {
    object.contains_key("@id")
        && object
            .keys()
            .all(|key| key == "@id" || key == "@context")
}

fn raw_types(object: &JsonObject) -> Vec<&str> {
    match object.get("@type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn canonical_types(object: &JsonObject) -> Vec<String> {
    raw_types(object)
        .into_iter()
        .map(canonical_name)
        .filter(|name| !name.is_empty())
        .collect()
}

struct Converter<'n, 'a> {
    normalizer: &'n Normalizer,
    source: CandidateRef,
    index: HashMap<String, &'a JsonObject>,
    /// `@id`s on the current path from the root
    visiting: Vec<String>,
    /// `@id`s resolved from references while converting the current root
    embedded: HashSet<String>,
    /// `@id`s already converted in full under the current root
    expanded: HashSet<String>,
    /// Entity nodes built for the whole block
    built: usize,
}

impl<'a> Converter<'_, 'a> {
    fn convert_node(
        &mut self,
        object: &'a JsonObject,
        implied: Option<String>,
        depth: usize,
    ) -> EntityNode {
        let types = canonical_types(object);
        let mut node = EntityNode::new(types, self.source);
        if node.types.is_empty() {
            if let Some(implied) = implied {
                node.types.push(implied);
                node.type_source = TypeSource::Implied;
            }
        }
        self.built += 1;

        let id = object.get("@id").and_then(Value::as_str).map(str::to_string);
        if let Some(id) = &id {
            self.visiting.push(id.clone());
            self.expanded.insert(id.clone());
        }
        node.id = id.clone();

        for (key, value) in object {
            if key.starts_with('@') {
                continue;
            }
            let name = canonical_name(key);
            let mut issues = Vec::new();
            let parent_types = node.types.clone();
            if let Some(converted) =
                self.convert_value(&parent_types, &name, name.clone(), value, depth, &mut issues)
            {
                node.push_property(name, converted);
            }
            node.diagnostics.extend(issues);
        }

        if id.is_some() {
            self.visiting.pop();
        }
        node
    }

    fn convert_value(
        &mut self,
        parent_types: &[String],
        property: &str,
        path: String,
        value: &'a Value,
        depth: usize,
        issues: &mut Vec<Issue>,
    ) -> Option<PropertyValue> {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(PropertyValue::Boolean(*flag)),
            Value::Number(number) => Some(PropertyValue::Number(number.clone())),
            Value::String(text) => Some(PropertyValue::Text(text.clone())),
            Value::Array(items) => {
                let values: Vec<PropertyValue> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(position, item)| {
                        let item_path = format!("{property}[{position}]");
                        self.convert_value(parent_types, property, item_path, item, depth, issues)
                    })
                    .collect();
                Some(PropertyValue::List(values))
            }
            Value::Object(object) => {
                if let Some(literal) = object.get("@value") {
                    return self.convert_value(parent_types, property, path, literal, depth, issues);
                }
                if let Some(list) = object.get("@list").or_else(|| object.get("@set")) {
                    return self.convert_value(parent_types, property, path, list, depth, issues);
                }

                let id = object.get("@id").and_then(Value::as_str);
                if let Some(id) = id {
                    if self.visiting.iter().any(|open| open == id) {
                        issues.push(
                            Issue::error(
                                IssueCode::CyclicReference,
                                format!("Reference to '{id}' loops back to an enclosing entity"),
                            )
                            .with_property(path),
                        );
                        return None;
                    }
                }

                let target = match id {
                    Some(id) if is_reference(object) => match self.index.get(id).copied() {
                        Some(target) => {
                            self.embedded.insert(id.to_string());
                            target
                        }
                        None => return Some(PropertyValue::Text(id.to_string())),
                    },
                    _ => object,
                };

                let implied = self.normalizer.implied_type(parent_types, property);
                if let Some(id) = id.filter(|id| self.expanded.contains(*id)) {
                    if is_reference(object) {
                        let types = canonical_types(target);
                        let types = if types.is_empty() {
                            implied.into_iter().collect()
                        } else {
                            types
                        };
                        let stub = EntityNode::reference_to(id, types, self.source);
                        return Some(PropertyValue::Entity(Box::new(stub)));
                    }
                }

                if let Some(issue) = self.normalizer.depth_exceeded(depth + 1) {
                    issues.push(issue.with_property(path));
                    return None;
                }
                if let Some(issue) = self.normalizer.entity_limit_reached(self.built) {
                    issues.push(issue.with_property(path));
                    return None;
                }

                let nested = self.convert_node(target, implied, depth + 1);
                Some(PropertyValue::Entity(Box::new(nested)))
            }
        }
    }
}
