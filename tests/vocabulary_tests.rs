mod common;

use common::*;
use schema_markup::*;
use serde_json::json;

#[test]
fn test_embedded_vocabulary_loads_once() {
    let first = VocabularyRegistry::embedded().unwrap();
    let second = VocabularyRegistry::embedded().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(first.len() > 40);
    assert!(first.contains("Thing"));
    assert!(!first.contains("FooBarBaz"));
}

#[test]
fn test_multiple_inheritance_subtyping() {
    let registry = VocabularyRegistry::embedded().unwrap();

    assert!(registry.is_subtype_of("LocalBusiness", "Organization"));
    assert!(registry.is_subtype_of("LocalBusiness", "Place"));
    assert!(registry.is_subtype_of("Restaurant", "Thing"));
    assert!(registry.is_subtype_of("HowToStep", "CreativeWork"));
    assert!(registry.is_subtype_of("Offer", "Offer"));
    assert!(!registry.is_subtype_of("Organization", "LocalBusiness"));
    assert!(!registry.is_subtype_of("Person", "Organization"));

    let ancestors = registry.ancestors("LocalBusiness");
    assert_eq!(ancestors[0], "LocalBusiness");
    assert_eq!(ancestors.last().map(String::as_str), Some("Thing"));
    assert_eq!(
        ancestors.iter().filter(|name| name.as_str() == "Thing").count(),
        1
    );
}

#[test]
fn test_constraints_accumulate_over_ancestors() {
    let registry = VocabularyRegistry::embedded().unwrap();
    let restaurant = registry.constraints("Restaurant").unwrap();

    assert!(restaurant.required.contains(&"name".to_string()));
    assert!(restaurant.required.contains(&"address".to_string()));
    assert!(restaurant.recommended.contains(&"menu".to_string()));
    assert!(restaurant.recommended.contains(&"servesCuisine".to_string()));
    assert!(restaurant.declares("geo"));
    assert!(restaurant.declares("legalName"));

    // ancestors declare first
    let name = restaurant.position("name").unwrap();
    let cuisine = restaurant.position("servesCuisine").unwrap();
    assert!(name < cuisine);
}

#[test]
fn test_relaxed_requirements_are_dropped() {
    let registry = VocabularyRegistry::embedded().unwrap();

    let aggregate = registry.constraints("AggregateOffer").unwrap();
    assert!(aggregate.required.contains(&"lowPrice".to_string()));
    assert!(!aggregate.required.contains(&"price".to_string()));
    assert!(aggregate.required.contains(&"priceCurrency".to_string()));
}

#[test]
fn test_type_specific_shape_wins_over_global() {
    let registry = VocabularyRegistry::embedded().unwrap();

    let list_item = registry.constraints("ListItem").unwrap();
    let range = registry.shape_for(&list_item, "position").unwrap();
    assert!(range.accepts_text());

    let offer = registry.constraints("Offer").unwrap();
    let range = registry.shape_for(&offer, "position").unwrap();
    assert_eq!(range.kinds, vec![RangeKind::Integer]);
}

#[tokio::test]
async fn test_shape_tie_break_in_validation() {
    let input = json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": [
            {"@type": "ListItem", "position": "first", "name": "Home", "item": "https://acme.test/"},
            {"@type": "ListItem", "position": 2, "name": "Shop", "item": "https://acme.test/shop"}
        ]
    })
    .to_string();
    let results = analyze(&AnalysisInput::html(input)).await.unwrap();
    assert!(results[0].valid);

    let input = json!({
        "@context": "https://schema.org",
        "@type": "Offer",
        "price": 10,
        "priceCurrency": "EUR",
        "position": "first"
    })
    .to_string();
    let results = analyze(&AnalysisInput::html(input)).await.unwrap();
    assert!(!results[0].valid);
    assert!(results[0].issues.iter().any(|issue| {
        issue.code == IssueCode::InvalidValueFormat
            && issue.affected_property.as_deref() == Some("position")
    }));
}

#[tokio::test]
async fn test_subtype_accepted_where_parent_expected() {
    let input = json!({
        "@context": "https://schema.org",
        "@type": "Event",
        "name": "Launch",
        "startDate": "2026-05-01T18:00:00+02:00",
        "location": {"@type": "Restaurant", "name": "Corner Cafe", "address": "1 Main St"}
    })
    .to_string();

    let results = analyze(&AnalysisInput::html(input)).await.unwrap();
    let event = &results[0];
    assert!(event.valid);
    assert!(!codes(event).contains(&IssueCode::UnexpectedEntityType));
}

#[tokio::test]
async fn test_incompatible_nested_type_is_flagged() {
    let input = json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": "Widget",
        "offers": {"@type": "Person", "name": "Ada"}
    })
    .to_string();

    let results = analyze(&AnalysisInput::html(input)).await.unwrap();
    let product = &results[0];
    assert!(product.issues.iter().any(|issue| {
        issue.code == IssueCode::UnexpectedEntityType
            && issue.level == IssueLevel::Warning
            && issue.affected_property.as_deref() == Some("offers")
    }));
}

#[tokio::test]
async fn test_multi_typed_entity_merges_constraints() {
    let input = json!({
        "@context": "https://schema.org",
        "@type": ["Product", "Offer"],
        "name": "Widget",
        "price": 5
    })
    .to_string();

    let results = analyze(&AnalysisInput::html(input)).await.unwrap();
    let entity = &results[0];
    assert_eq!(entity.entity_type, "Product");
    assert!(entity.issues.iter().any(|issue| {
        issue.code == IssueCode::MissingRequiredProperty
            && issue.affected_property.as_deref() == Some("priceCurrency")
    }));
    assert!(!codes(entity).contains(&IssueCode::UnknownType));
}
