//! Tests for the parser module

use super::*;
use crate::schema::{MapKeyType, PropertyDef, RecordTypeDef};
use crate::types::Value;

macro_rules! row {
    ($($cell:expr),* $(,)?) => {
        vec![$(SourceValue::from($cell)),*]
    };
}

fn catalog() -> Arc<RecordTypeCatalog> {
    Arc::new(
        RecordTypeCatalog::builder()
            .record_type(RecordTypeDef::new(
                "Person",
                vec![
                    PropertyDef::number("id").id(),
                    PropertyDef::string("firstName"),
                    PropertyDef::string("lastName").required(),
                    PropertyDef::number("scores").array(),
                    PropertyDef::string("phones").map_with_key(MapKeyType::String),
                    PropertyDef::object(
                        "address",
                        vec![PropertyDef::string("street"), PropertyDef::string("city")],
                    ),
                    PropertyDef::ref_to("locationRef", "Location"),
                ],
            ))
            .record_type(RecordTypeDef::new(
                "Location",
                vec![PropertyDef::number("id").id(), PropertyDef::string("name")],
            ))
            .build()
            .unwrap(),
    )
}

fn parser(markup: &[&str]) -> Parser {
    let mut p = Parser::new(catalog(), "Person").unwrap();
    p.init(markup).unwrap();
    p
}

#[test]
fn new_rejects_unknown_top_record_type() {
    let err = Parser::new(catalog(), "Ghost").unwrap_err();
    assert!(err.is_usage());
}

#[test]
fn init_must_run_exactly_once() {
    let mut p = Parser::new(catalog(), "Person").unwrap();
    let err = p.feed_row(&row![1]).unwrap_err();
    assert!(err.is_usage(), "feed_row before init SHOULD be a usage error");

    p.init(&["id"]).unwrap();
    let err = p.init(&["id"]).unwrap_err();
    assert!(err.is_usage(), "double init SHOULD be a usage error");
}

#[test]
fn init_rejects_empty_markup() {
    let mut p = Parser::new(catalog(), "Person").unwrap();
    let err = p.init(&[] as &[&str]).unwrap_err();
    assert!(err.is_usage());
}

#[test]
fn positional_rows_must_match_markup_width() {
    let mut p = parser(&["id", "firstName"]);
    let err = p.feed_row(&row![1]).unwrap_err();
    assert!(err.is_usage());
    assert!(err.to_string().contains("row width"));
}

#[test]
fn scalar_rows_build_one_record_per_id() {
    let mut p = parser(&["id", "firstName", "lastName"]);
    p.feed_row(&row![1, "Amy", "Boone"]).unwrap();
    p.feed_row(&row![2, "Cole", "Dent"]).unwrap();

    assert_eq!(p.records().len(), 2);
    assert_eq!(p.records()[0].get("id"), Some(&Value::Number(1.0)));
    assert_eq!(
        p.records()[0].get("firstName"),
        Some(&Value::String("Amy".into()))
    );
    assert_eq!(
        p.records()[1].get("lastName"),
        Some(&Value::String("Dent".into()))
    );
    assert!(p.referred_records().is_empty());
}

#[test]
fn null_optional_scalar_is_absent_not_null() {
    let mut p = parser(&["id", "firstName", "lastName"]);
    p.feed_row(&row![1, None::<i64>, "Boone"]).unwrap();
    assert!(!p.records()[0].contains("firstName"));
}

#[test]
fn null_required_scalar_fails_with_coordinates() {
    let mut p = parser(&["id", "firstName", "lastName"]);
    p.feed_row(&row![1, "Amy", "Boone"]).unwrap();
    let err = p.feed_row(&row![2, "Cole", None::<i64>]).unwrap_err();
    assert!(err.is_data());
    assert_eq!(err.coordinates(), Some((1, 2)));
}

#[test]
fn null_top_id_is_a_data_error() {
    let mut p = parser(&["id", "firstName", "lastName"]);
    let err = p.feed_row(&row![None::<i64>, "Amy", "Boone"]).unwrap_err();
    assert!(err.to_string().contains("top record id"));
}

#[test]
fn repeated_top_id_without_descendant_anchor_is_stuck() {
    let mut p = parser(&["id", "firstName", "lastName"]);
    p.feed_row(&row![1, "Amy", "Boone"]).unwrap();
    let err = p.feed_row(&row![1, "Amy", "Boone"]).unwrap_err();
    assert!(err
        .to_string()
        .contains("at least one anchor must change in each row"));
}

#[test]
fn nested_object_is_created_on_non_null_indicator() {
    let mut p = parser(&["id", "lastName", "address", "a$street", "a$city"]);
    p.feed_row(&row![1, "Boone", 1, "5 Main St", "Springfield"])
        .unwrap();
    p.feed_row(&row![2, "Dent", None::<i64>, None::<&str>, None::<&str>])
        .unwrap();

    let address = p.records()[0].get("address").unwrap().as_object().unwrap();
    assert_eq!(
        address.get("street"),
        Some(&Value::String("5 Main St".into()))
    );
    assert!(
        !p.records()[1].contains("address"),
        "NULL indicator SHOULD leave the nested object absent"
    );
}

#[test]
fn scalar_array_coalesces_rows_into_one_record() {
    let mut p = parser(&["id", "lastName", "scores", "a$"]);
    p.feed_row(&row![1, "Boone", 1, 9.5]).unwrap();
    p.feed_row(&row![1, "Boone", 1, 8.0]).unwrap();
    p.feed_row(&row![2, "Dent", None::<i64>, None::<f64>]).unwrap();

    assert_eq!(p.records().len(), 2);
    assert_eq!(
        p.records()[0].get("scores"),
        Some(&Value::Array(vec![Value::Number(9.5), Value::Number(8.0)]))
    );
    assert!(!p.records()[1].contains("scores"));
}

#[test]
fn null_array_cell_appends_a_null_slot() {
    let mut p = parser(&["id", "lastName", "scores", "a$"]);
    p.feed_row(&row![1, "Boone", 1, 9.5]).unwrap();
    p.feed_row(&row![1, "Boone", 1, None::<f64>]).unwrap();
    assert_eq!(
        p.records()[0].get("scores"),
        Some(&Value::Array(vec![Value::Number(9.5), Value::Null]))
    );
}

#[test]
fn scalar_map_keys_and_values_pair_up() {
    let mut p = parser(&["id", "lastName", "phones", "a$"]);
    p.feed_row(&row![1, "Boone", "home", "555-0001"]).unwrap();
    p.feed_row(&row![1, "Boone", "work", "555-0002"]).unwrap();

    let phones = p.records()[0].get("phones").unwrap().as_map().unwrap();
    assert_eq!(phones.len(), 2);
    assert_eq!(phones["home"], Value::String("555-0001".into()));
    assert_eq!(phones["work"], Value::String("555-0002".into()));
}

#[test]
fn null_map_value_leaves_the_key_absent() {
    let mut p = parser(&["id", "lastName", "phones", "a$"]);
    p.feed_row(&row![1, "Boone", "home", None::<&str>]).unwrap();
    let phones = p.records()[0].get("phones").unwrap().as_map().unwrap();
    assert!(phones.is_empty());
}

#[test]
fn repeated_map_key_is_a_data_error() {
    let mut p = parser(&["id", "lastName", "phones", "a$"]);
    p.feed_row(&row![1, "Boone", "home", "555-0001"]).unwrap();
    let err = p.feed_row(&row![1, "Boone", "home", "555-0002"]).unwrap_err();
    assert!(err.is_data());
    assert!(err.to_string().contains("repeated key 'home'"));
}

#[test]
fn anchor_null_alternation_is_rejected() {
    let mut p = parser(&["id", "lastName", "scores", "a$"]);
    p.feed_row(&row![1, "Boone", None::<i64>, None::<f64>]).unwrap();
    let err = p.feed_row(&row![1, "Boone", 1, 9.5]).unwrap_err();
    assert!(err.to_string().contains("NULL expected in anchor column"));
}

#[test]
fn repeated_null_anchor_is_rejected() {
    let mut p = parser(&["id", "lastName", "scores", "a$"]);
    p.feed_row(&row![1, "Boone", None::<i64>, None::<f64>]).unwrap();
    let err = p
        .feed_row(&row![1, "Boone", None::<i64>, None::<f64>])
        .unwrap_err();
    assert!(err.to_string().contains("repeated NULL in anchor column"));
}

#[test]
fn labeled_rows_resolve_cells_by_markup_label() {
    let mut p = parser(&["id", "address", "a$street", "a$city"]);
    let mut row = std::collections::HashMap::new();
    row.insert("id".to_string(), SourceValue::from(1));
    row.insert("address".to_string(), SourceValue::from(1));
    row.insert("a$street".to_string(), SourceValue::from("5 Main St"));
    // a$city omitted: reads as NULL
    p.feed_row(&row).unwrap();

    let address = p.records()[0].get("address").unwrap().as_object().unwrap();
    assert!(address.contains("street"));
    assert!(!address.contains("city"));
}

#[test]
fn fetched_reference_dedupes_referred_records() {
    let mut p = parser(&["id", "lastName", "locationRef:", "a$id", "a$name"]);
    p.feed_row(&row![1, "Boone", 25, 25, "Springfield"]).unwrap();
    p.feed_row(&row![2, "Dent", 25, 25, "Springfield"]).unwrap();

    assert_eq!(
        p.records()[0].get("locationRef"),
        Some(&Value::Ref("Location#25".into()))
    );
    assert_eq!(p.referred_records().len(), 1);
    let loc = &p.referred_records()["Location#25"];
    assert_eq!(loc.get("name"), Some(&Value::String("Springfield".into())));
}

#[test]
fn reset_restores_a_fresh_parser_with_the_same_plan() {
    let mut p = parser(&["id", "lastName", "scores", "a$"]);
    p.feed_row(&row![1, "Boone", 1, 9.5]).unwrap();
    p.reset();

    assert!(p.records().is_empty());
    assert!(p.referred_records().is_empty());
    assert_eq!(p.rows_processed(), 0);

    p.feed_row(&row![1, "Boone", 1, 9.5]).unwrap();
    p.feed_row(&row![1, "Boone", 1, 8.0]).unwrap();
    assert_eq!(
        p.records()[0].get("scores"),
        Some(&Value::Array(vec![Value::Number(9.5), Value::Number(8.0)]))
    );
}

#[test]
fn merge_moves_disjoint_properties_and_overwrites_scalars() {
    let mut left = parser(&["id", "lastName", "scores", "a$"]);
    left.feed_row(&row![1, "Boone", 1, 9.5]).unwrap();
    left.feed_row(&row![1, "Boone", 1, 8.0]).unwrap();

    let mut right = parser(&["id", "firstName", "lastName", "phones", "a$"]);
    right.feed_row(&row![1, "Amy", "Boone", "home", "555-0001"]).unwrap();

    left.merge(right).unwrap();
    let rec = &left.records()[0];
    assert_eq!(rec.get("firstName"), Some(&Value::String("Amy".into())));
    assert!(rec.contains("scores"));
    assert!(rec.contains("phones"));
}

#[test]
fn merge_rejects_mismatched_parsers() {
    let mut left = parser(&["id", "lastName"]);
    left.feed_row(&row![1, "Boone"]).unwrap();

    let mut location = Parser::new(catalog(), "Location").unwrap();
    location.init(&["id", "name"]).unwrap();
    let err = left.merge(location).unwrap_err();
    assert!(err.is_usage());
    assert!(err.to_string().contains("different top record types"));

    let mut right = parser(&["id", "lastName"]);
    right.feed_row(&row![1, "Boone"]).unwrap();
    right.feed_row(&row![2, "Dent"]).unwrap();
    let err = left.merge(right).unwrap_err();
    assert!(err.to_string().contains("records"));
}

#[test]
fn merge_rejects_differing_ids() {
    let mut left = parser(&["id", "lastName"]);
    left.feed_row(&row![1, "Boone"]).unwrap();
    let mut right = parser(&["id", "lastName"]);
    right.feed_row(&row![2, "Dent"]).unwrap();

    let err = left.merge(right).unwrap_err();
    assert!(err.is_usage());
    assert!(err.to_string().contains("id property 'id' differs"));
}
