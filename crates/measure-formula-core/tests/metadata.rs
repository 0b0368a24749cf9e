//! Metadata resolution through the public API

use measure_formula_core::{
    field, Backend, DataType, Dimension, FieldKind, FieldReference, Measure, MetadataProvider,
    MetadataSnapshot, StructureMembers,
};
use pretty_assertions::assert_eq;

fn model() -> MetadataSnapshot {
    MetadataSnapshot::from_members(
        Backend::Hana,
        [
            Dimension::new("CITY").with_alias("City").with_property("Name"),
            Dimension::new("CALDAY").with_alias("Day").date_like(),
        ],
        [
            Measure::new("SALES").with_alias("Sales"),
            Measure::new("COST").with_alias("Cost"),
            Measure::new("MARGIN")
                .with_alias("Margin")
                .with_formula(r#"[Sales] - [COST] + [Sales] + RESTRICT([Sales], [d/City] = "[X]")"#),
        ],
    )
}

#[test]
fn test_resolve_by_alias_or_id() {
    let model = model();
    assert_eq!(model.resolve_measure("Sales").unwrap().id, "SALES");
    assert_eq!(model.resolve_measure("SALES").unwrap().id, "SALES");
    assert_eq!(
        model.resolve_dimension("Day").unwrap().data_type(),
        DataType::DateDimension
    );
    assert!(model.resolve_dimension("Town").is_none());
}

#[test]
fn test_dependent_measure_ids_follow_formula_text() {
    let model = model();
    assert_eq!(
        model.dependent_measure_ids("MARGIN"),
        vec!["SALES".to_string(), "COST".to_string()]
    );
    assert!(model.dependent_measure_ids("SALES").is_empty());
}

#[test]
fn test_all_measures_view_tracks_changes() {
    let mut model = model();
    assert_eq!(model.all_measures().len(), 3);
    model.insert_measure(Measure::new("QTY"));
    assert_eq!(model.all_measures().len(), 4);
    model.remove_measure("COST");
    let ids: Vec<_> = model.all_measures().iter().map(|m| m.id.clone()).collect();
    assert!(!ids.contains(&"COST".to_string()));
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_field_references_in_text() {
    let text = r#"[Sales] + [d/City].[p/Name] = "[not a field]""#;
    let refs: Vec<_> = field::references(text)
        .into_iter()
        .map(|(span, reference)| (&text[span], reference.map(|r| r.kind)))
        .collect();
    assert_eq!(
        refs,
        vec![
            ("[Sales]", Some(FieldKind::Measure)),
            ("[d/City].[p/Name]", Some(FieldKind::Dimension)),
        ]
    );
    assert_eq!(
        FieldReference::parse("[d/City].[p/Name]"),
        Some(FieldReference::dimension("City").with_property("Name"))
    );
}

#[tokio::test]
async fn test_members_ready_once() {
    let members = StructureMembers::loaded(model());
    let snapshot = members.ready().await.unwrap();
    assert_eq!(snapshot.backend(), Backend::Hana);
    assert!(!members.complete(MetadataSnapshot::new(Backend::Bw)));
}
