//! Tests for the registry-driven query schemas

mod common;

use common::{records, Listing};
use core_kernel::schema::{OrderBySchema, QuerySchema, SelectSchema, WhereSchema};
use core_kernel::{OrderBy, PaginationConfig, Schema, SortDirection};
use serde_json::json;

fn matching(input: serde_json::Value) -> Vec<String> {
    let expression = WhereSchema::<Listing>::new().parse(&input).unwrap();
    let predicate = expression.compose().unwrap();
    records()
        .iter()
        .filter(|row| predicate.matches(row))
        .map(|row| row.get("id").to_string())
        .collect()
}

mod where_schema_tests {
    use super::*;

    #[test]
    fn test_field_filters_by_declared_kind() {
        let ids = matching(json!({
            "venue": { "in": ["lse", "nasdaq"] },
            "price": { "gte": "10" },
            "active": { "equals": "true" }
        }));
        assert_eq!(ids, vec!["L1"]);
    }

    #[test]
    fn test_not_contains_on_the_wire() {
        let ids = matching(json!({ "symbol": { "startsWith": "A", "not": { "contains": "BC" } } }));
        assert_eq!(ids, vec!["L1"]);
    }

    #[test]
    fn test_in_and_not_in_empty_lists() {
        assert!(matching(json!({ "symbol": { "in": [] } })).is_empty());
        assert_eq!(matching(json!({ "symbol": { "notIn": [] } })).len(), 5);
    }

    #[test]
    fn test_single_object_and_and_not() {
        let ids = matching(json!({
            "AND": { "venue": { "equals": "lse" } },
            "NOT": { "active": { "equals": false } }
        }));
        assert_eq!(ids, vec!["L5"]);
    }

    #[test]
    fn test_or_requires_an_array() {
        let error = WhereSchema::<Listing>::new()
            .parse(&json!({ "OR": { "venue": { "equals": "lse" } } }))
            .unwrap_err();
        assert_eq!(error.description(), "$.OR: expected an array");
    }

    #[test]
    fn test_error_path_inside_or() {
        let error = WhereSchema::<Listing>::new()
            .parse(&json!({ "OR": [{ "price": { "lt": 1 } }, { "price": { "lt": "cheap" } }] }))
            .unwrap_err();
        assert_eq!(error.description(), "$.OR[1].price.lt: expected a number");
        assert_eq!(error.error_code(), "com-1000");
    }

    #[test]
    fn test_unknown_field_names_the_entity() {
        let error = WhereSchema::<Listing>::new()
            .parse(&json!({ "ticker": { "equals": "AAPL" } }))
            .unwrap_err();
        assert_eq!(error.description(), "$.ticker: unknown field on Listing");
    }

    #[test]
    fn test_operator_not_legal_for_kind() {
        let error = WhereSchema::<Listing>::new()
            .parse(&json!({ "active": { "gt": true } }))
            .unwrap_err();
        assert_eq!(error.description(), "$.active.gt: unknown key");
    }

    #[test]
    fn test_enum_value_outside_set() {
        let error = WhereSchema::<Listing>::new()
            .parse(&json!({ "venue": { "not": { "equals": "tse" } } }))
            .unwrap_err();
        assert_eq!(error.description(), "$.venue.not.equals: expected one of nyse, nasdaq, lse");
    }

    #[test]
    fn test_null_field_or_operand_is_rejected() {
        let schema = WhereSchema::<Listing>::new();
        let error = schema.parse(&json!({ "symbol": null })).unwrap_err();
        assert_eq!(error.status_code(), 400);
        assert_eq!(error.description(), "$.symbol: null is not accepted; omit the key instead");

        let error = schema
            .parse(&json!({ "note": { "not": { "equals": null } } }))
            .unwrap_err();
        assert_eq!(error.description(), "$.note.not.equals: null is not accepted; omit the key instead");

        let error = schema.parse(&json!({ "OR": [{ "note": { "equals": null } }] })).unwrap_err();
        assert_eq!(error.description(), "$.OR[0].note.equals: null is not accepted; omit the key instead");
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = json!({ "price": { "gt": "1" } });
        let before = input.clone();
        WhereSchema::<Listing>::new().parse(&input).unwrap();
        assert_eq!(input, before);
    }
}

mod select_and_order_tests {
    use super::*;

    #[test]
    fn test_select_keeps_true_fields() {
        let select = SelectSchema::<Listing>::new()
            .parse(&json!({ "symbol": true, "note": false, "price": "true" }))
            .unwrap();
        assert!(select.contains("symbol"));
        assert!(select.contains("price"));
        assert!(!select.contains("note"));
    }

    #[test]
    fn test_select_requires_one_field() {
        let error = SelectSchema::<Listing>::new().parse(&json!({ "note": false })).unwrap_err();
        assert_eq!(error.description(), "$: select at least one field");
    }

    #[test]
    fn test_order_by_object_and_array() {
        let single = OrderBySchema::<Listing>::new().parse(&json!({ "price": "desc" })).unwrap();
        assert_eq!(single, OrderBy::desc("price"));

        let many = OrderBySchema::<Listing>::new()
            .parse(&json!([{ "venue": "asc" }, { "price": "desc" }]))
            .unwrap();
        assert_eq!(many, OrderBy::asc("venue").then("price", SortDirection::Desc));
    }

    #[test]
    fn test_order_by_direction_is_an_enum() {
        let error = OrderBySchema::<Listing>::new()
            .parse(&json!([{ "price": "up" }]))
            .unwrap_err();
        assert_eq!(error.description(), "$[0].price: expected one of asc, desc");
    }

    #[test]
    fn test_order_by_object_must_have_one_key() {
        let error = OrderBySchema::<Listing>::new()
            .parse(&json!({ "price": "asc", "symbol": "asc" }))
            .unwrap_err();
        assert_eq!(error.description(), "$: expected exactly one field");
    }
}

mod query_schema_tests {
    use super::*;

    #[test]
    fn test_full_listing_request() {
        let query = QuerySchema::<Listing>::default()
            .parse(&json!({
                "where": { "venue": { "equals": "lse" } },
                "select": { "symbol": true },
                "orderBy": { "price": "asc" },
                "page": "2",
                "elementsByPage": 5
            }))
            .unwrap();

        assert_eq!(query.skip, Some(5));
        assert_eq!(query.take, Some(5));
        assert_eq!(query.order_by, OrderBy::asc("price"));
        assert!(query.select.unwrap().contains("symbol"));
        assert!(!query.filter.is_empty());
    }

    #[test]
    fn test_defaults_apply_the_first_page() {
        let query = QuerySchema::<Listing>::default().parse(&json!({})).unwrap();
        assert_eq!((query.skip, query.take), (Some(0), Some(10)));
        assert!(query.filter.is_empty());
    }

    #[test]
    fn test_configured_page_limit() {
        let schema = QuerySchema::<Listing>::new(PaginationConfig::default().with_max_page_size(20));
        let error = schema.parse(&json!({ "elementsByPage": 21 })).unwrap_err();
        assert!(error.description().contains("20"));
    }

    #[test]
    fn test_unknown_top_level_key() {
        let error = QuerySchema::<Listing>::default()
            .parse(&json!({ "limit": 5 }))
            .unwrap_err();
        assert_eq!(error.description(), "$.limit: unknown key");
    }
}
