// RDFa Lite resources to entity trees

use scraper::ElementRef;

use super::names::{canonical_name, resolve_rdfa_term};
use super::{Normalizer, attribute_value, collapsed_text, first_match, parse_item};
use crate::extract::RawCandidate;
use crate::types::{CandidateRef, EntityNode, PropertyValue, TypeSource};

pub(super) fn normalize(
    normalizer: &Normalizer,
    candidate: &RawCandidate,
    source: CandidateRef,
) -> Result<Vec<EntityNode>, String> {
    let document = parse_item(&candidate.raw_text);
    let root = first_match(&document, "[typeof]")?
        .ok_or_else(|| format!("RDFa block {} has no typed resource", candidate.index))?;

    let walker = ResourceWalker { normalizer, source };
    let terms = TermContext {
        vocab: candidate.inherited_vocab.as_deref(),
        prefixes: Vec::new(),
    };
    Ok(vec![walker.convert_resource(root, &terms, None, 0)])
}

/// `vocab` and `prefix` mappings in effect at an element.
#[derive(Debug, Clone, Default)]
struct TermContext<'a> {
    vocab: Option<&'a str>,
    prefixes: Vec<(&'a str, &'a str)>,
}

impl<'a> TermContext<'a> {
    fn enter(&self, element: &ElementRef<'a>) -> Self {
        let mut context = self.clone();
        if let Some(vocab) = element.value().attr("vocab") {
            context.vocab = Some(vocab);
        }
        if let Some(declaration) = element.value().attr("prefix") {
            context.prefixes.extend(parse_prefixes(declaration));
        }
        context
    }

    fn resolve(&self, term: &str) -> String {
        let term = term.trim();
        if let Some((prefix, rest)) = term.split_once(':') {
            if !rest.starts_with("//") {
                // Later declarations shadow earlier ones
                let mapped = self
                    .prefixes
                    .iter()
                    .rev()
                    .find(|(declared, _)| *declared == prefix);
                if let Some((_, iri)) = mapped {
                    return canonical_name(&format!("{iri}{rest}"));
                }
            }
        }
        resolve_rdfa_term(term, self.vocab)
    }

    fn resolve_all(&self, raw: &str) -> Vec<String> {
        raw.split_whitespace()
            .map(|term| self.resolve(term))
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// `prefix="s: https://schema.org/ foaf: http://xmlns.com/foaf/0.1/"`
fn parse_prefixes(declaration: &str) -> Vec<(&str, &str)> {
    let mut tokens = declaration.split_whitespace();
    let mut prefixes = Vec::new();
    while let Some(token) = tokens.next() {
        let Some(prefix) = token.strip_suffix(':') else {
            continue;
        };
        if let Some(iri) = tokens.next() {
            prefixes.push((prefix, iri));
        }
    }
    prefixes
}

struct ResourceWalker<'n> {
    normalizer: &'n Normalizer,
    source: CandidateRef,
}

impl ResourceWalker<'_> {
    fn convert_resource<'a>(
        &self,
        element: ElementRef<'a>,
        terms: &TermContext<'a>,
        implied: Option<String>,
        depth: usize,
    ) -> EntityNode {
        let terms = terms.enter(&element);
        let types = element
            .value()
            .attr("typeof")
            .map(|raw| terms.resolve_all(raw))
            .unwrap_or_default();

        let mut node = EntityNode::new(types, self.source);
        if node.types.is_empty() {
            if let Some(implied) = implied {
                node.types.push(implied);
                node.type_source = TypeSource::Implied;
            }
        }
        node.id = element
            .value()
            .attr("resource")
            .or_else(|| element.value().attr("about"))
            .map(str::to_string);

        self.collect_properties(element, &terms, &mut node, depth);
        node
    }

    fn collect_properties<'a>(
        &self,
        scope: ElementRef<'a>,
        terms: &TermContext<'a>,
        node: &mut EntityNode,
        depth: usize,
    ) {
        for child in scope.children().filter_map(ElementRef::wrap) {
            let is_resource = child.value().attr("typeof").is_some();
            let names = match child.value().attr("property") {
                Some(raw) => terms.enter(&child).resolve_all(raw),
                None => Vec::new(),
            };

            if names.is_empty() {
                if !is_resource {
                    self.collect_properties(child, &terms.enter(&child), node, depth);
                }
                continue;
            }

            for name in names {
                let value = if is_resource {
                    if let Some(issue) = self.normalizer.depth_exceeded(depth + 1) {
                        node.diagnostics.push(issue.with_property(name.as_str()));
                        continue;
                    }
                    let implied = self.normalizer.implied_type(&node.types, &name);
                    let nested = self.convert_resource(child, terms, implied, depth + 1);
                    PropertyValue::Entity(Box::new(nested))
                } else {
                    PropertyValue::Text(literal_value(&child))
                };
                node.push_property(name, value);
            }
            if !is_resource {
                self.collect_properties(child, &terms.enter(&child), node, depth);
            }
        }
    }
}

fn literal_value(element: &ElementRef<'_>) -> String {
    let value = element.value();
    if let Some(content) = value.attr("content") {
        return content.trim().to_string();
    }
    if let Some(resource) = value.attr("resource").or_else(|| value.attr("href")) {
        return resource.trim().to_string();
    }
    attribute_value(element).unwrap_or_else(|| collapsed_text(element))
}
