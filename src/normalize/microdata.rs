// Microdata items to entity trees

use scraper::ElementRef;

use super::names::{canonical_name, split_names};
use super::{Normalizer, attribute_value, collapsed_text, first_match, parse_item};
use crate::extract::RawCandidate;
use crate::types::{CandidateRef, EntityNode, PropertyValue, TypeSource};

pub(super) fn normalize(
    normalizer: &Normalizer,
    candidate: &RawCandidate,
    source: CandidateRef,
) -> Result<Vec<EntityNode>, String> {
    let document = parse_item(&candidate.raw_text);
    let root = first_match(&document, "[itemscope]")?
        .ok_or_else(|| format!("Microdata block {} has no item", candidate.index))?;

    let walker = ItemWalker { normalizer, source };
    Ok(vec![walker.convert_item(root, None, 0)])
}

struct ItemWalker<'n> {
    normalizer: &'n Normalizer,
    source: CandidateRef,
}

impl ItemWalker<'_> {
    fn convert_item(&self, element: ElementRef<'_>, implied: Option<String>, depth: usize) -> EntityNode {
        let types = element
            .value()
            .attr("itemtype")
            .map(split_names)
            .unwrap_or_default();
        let mut node = EntityNode::new(types, self.source);
        if node.types.is_empty() {
            if let Some(implied) = implied {
                node.types.push(implied);
                node.type_source = TypeSource::Implied;
            }
        }
        node.id = element.value().attr("itemid").map(str::to_string);

        self.collect_properties(element, &mut node, depth);
        node
    }

    /// Walk descendants, stopping at nested items: their properties are theirs.
    fn collect_properties(&self, scope: ElementRef<'_>, node: &mut EntityNode, depth: usize) {
        for child in scope.children().filter_map(ElementRef::wrap) {
            let is_item = child.value().attr("itemscope").is_some();
            let names = child.value().attr("itemprop").map(|raw| {
                raw.split_whitespace()
                    .map(canonical_name)
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
            });

            match names {
                Some(names) if !names.is_empty() => {
                    for name in names {
                        if let Some(value) = self.property_value(child, node, &name, is_item, depth)
                        {
                            node.push_property(name, value);
                        }
                    }
                    if !is_item {
                        self.collect_properties(child, node, depth);
                    }
                }
                _ if is_item => {}
                _ => self.collect_properties(child, node, depth),
            }
        }
    }

    fn property_value(
        &self,
        element: ElementRef<'_>,
        node: &mut EntityNode,
        name: &str,
        is_item: bool,
        depth: usize,
    ) -> Option<PropertyValue> {
        if !is_item {
            let text = attribute_value(&element).unwrap_or_else(|| collapsed_text(&element));
            return Some(PropertyValue::Text(text));
        }

        if let Some(issue) = self.normalizer.depth_exceeded(depth + 1) {
            node.diagnostics.push(issue.with_property(name));
            return None;
        }
        let implied = self.normalizer.implied_type(&node.types, name);
        let nested = self.convert_item(element, implied, depth + 1);
        Some(PropertyValue::Entity(Box::new(nested)))
    }
}
