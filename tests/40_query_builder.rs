use std::collections::HashMap;

use anyhow::Result;
use serde_json::json;

use trailhead_api::config::QueryConfig;
use trailhead_api::models::{Tour, User};
use trailhead_api::query::{QueryError, QuerySpec, SelectBuilder};

fn config() -> QueryConfig {
    QueryConfig {
        default_page_size: 100,
        max_page_size: 100,
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn operator_suffixes_become_native_comparisons() -> Result<()> {
    let spec = QuerySpec::from_params(&params(&[("price[gte]", "500")]), &config())?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(
        query.sql.contains("\"price\" >= $1"),
        "expected bound >= comparison, got: {}",
        query.sql
    );
    // The operator suffix must never survive as a literal column match
    assert!(!query.sql.contains("price[gte]"), "got: {}", query.sql);
    assert_eq!(query.binds, vec![json!(500)]);
    Ok(())
}

#[test]
fn all_four_range_operators_are_supported() -> Result<()> {
    for (suffix, sql_op) in [("gte", ">="), ("gt", ">"), ("lte", "<="), ("lt", "<")] {
        let key = format!("duration[{suffix}]");
        let spec = QuerySpec::from_params(&params(&[(key.as_str(), "5")]), &config())?;
        let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();
        let expected = format!("\"duration\" {sql_op} $1");
        assert!(
            query.sql.contains(&expected),
            "expected {expected} in: {}",
            query.sql
        );
    }
    Ok(())
}

#[test]
fn plain_keys_are_equality_matches() -> Result<()> {
    let spec = QuerySpec::from_params(&params(&[("difficulty", "easy")]), &config())?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(query.sql.contains("\"difficulty\" = $1"), "got: {}", query.sql);
    assert_eq!(query.binds, vec![json!("easy")]);
    Ok(())
}

#[test]
fn control_keys_never_reach_the_where_clause() -> Result<()> {
    let spec = QuerySpec::from_params(
        &params(&[
            ("page", "2"),
            ("sort", "price"),
            ("limit", "10"),
            ("fields", "name,price"),
            ("duration[gte]", "5"),
        ]),
        &config(),
    )?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(query.sql.contains("WHERE \"duration\" >= $1"), "got: {}", query.sql);
    assert_eq!(query.binds.len(), 1, "control keys leaked into binds");
    Ok(())
}

#[test]
fn pagination_offset_is_page_minus_one_times_limit() -> Result<()> {
    let spec = QuerySpec::from_params(
        &params(&[("page", "2"), ("limit", "10"), ("price[lt]", "1000")]),
        &config(),
    )?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(query.sql.ends_with("LIMIT 10 OFFSET 10"), "got: {}", query.sql);
    Ok(())
}

#[test]
fn limit_is_capped_at_the_configured_maximum() -> Result<()> {
    let spec = QuerySpec::from_params(&params(&[("limit", "5000")]), &config())?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(query.sql.ends_with("LIMIT 100 OFFSET 0"), "got: {}", query.sql);
    Ok(())
}

#[test]
fn non_numeric_page_and_limit_fall_back_to_defaults() -> Result<()> {
    let spec = QuerySpec::from_params(
        &params(&[("page", "abc"), ("limit", "-3")]),
        &config(),
    )?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(query.sql.ends_with("LIMIT 100 OFFSET 0"), "got: {}", query.sql);
    Ok(())
}

#[test]
fn sort_defaults_to_newest_first() -> Result<()> {
    let spec = QuerySpec::from_params(&params(&[]), &config())?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(
        query.sql.contains("ORDER BY \"created_at\" DESC"),
        "got: {}",
        query.sql
    );
    Ok(())
}

#[test]
fn sort_list_honors_descending_prefix() -> Result<()> {
    let spec = QuerySpec::from_params(
        &params(&[("sort", "-ratings_average,price")]),
        &config(),
    )?;
    let query = SelectBuilder::new("tours")?.apply(&spec)?.to_sql();

    assert!(
        query
            .sql
            .contains("ORDER BY \"ratings_average\" DESC, \"price\" ASC"),
        "got: {}",
        query.sql
    );
    Ok(())
}

#[test]
fn projection_defaults_to_star_and_quotes_fields() -> Result<()> {
    let bare = QuerySpec::from_params(&params(&[]), &config())?;
    let query = SelectBuilder::new("tours")?.apply(&bare)?.to_sql();
    assert!(query.sql.starts_with("SELECT * FROM \"tours\""), "got: {}", query.sql);

    let narrowed = QuerySpec::from_params(&params(&[("fields", "name,price")]), &config())?;
    let query = SelectBuilder::new("tours")?.apply(&narrowed)?.to_sql();
    assert!(
        query.sql.starts_with("SELECT \"name\", \"price\" FROM \"tours\""),
        "got: {}",
        query.sql
    );
    Ok(())
}

#[test]
fn active_guard_is_present_in_every_user_query() -> Result<()> {
    let spec = QuerySpec::from_params(&params(&[("role", "guide")]), &config())?;
    let query = SelectBuilder::new("users")?.only_active().apply(&spec)?.to_sql();

    assert!(query.sql.contains("\"active\" = TRUE"), "got: {}", query.sql);

    // Also present with no client filters at all
    let bare = QuerySpec::from_params(&params(&[]), &config())?;
    let query = SelectBuilder::new("users")?.only_active().apply(&bare)?.to_sql();
    assert!(query.sql.contains("WHERE \"active\" = TRUE"), "got: {}", query.sql);
    Ok(())
}

#[test]
fn injection_shaped_field_names_are_rejected() {
    let result = QuerySpec::from_params(
        &params(&[("price\"; DROP TABLE tours; --[gte]", "1")]),
        &config(),
    );
    assert!(result.is_err(), "malicious key must not parse");

    let result = QuerySpec::from_params(
        &params(&[("sort", "name\"; DROP TABLE tours; --")]),
        &config(),
    );
    assert!(result.is_err(), "malicious sort must not parse");
}

#[test]
fn unknown_operator_suffix_is_rejected() {
    let result = QuerySpec::from_params(&params(&[("price[like]", "1")]), &config());
    assert!(result.is_err());
}

#[test]
fn well_formed_but_unknown_filter_column_is_rejected() -> Result<()> {
    // Passes the syntax check but names no real column; must fail before
    // any SQL is built, not inside Postgres
    let spec = QuerySpec::from_params(&params(&[("bogus", "1")]), &config())?;
    let result = SelectBuilder::new("tours")?
        .restrict_columns(Tour::COLUMNS)
        .apply(&spec);

    assert!(matches!(result, Err(QueryError::UnknownField(_))));
    Ok(())
}

#[test]
fn unknown_sort_and_projection_columns_are_rejected() -> Result<()> {
    let sorted = QuerySpec::from_params(&params(&[("sort", "bogus")]), &config())?;
    let result = SelectBuilder::new("tours")?
        .restrict_columns(Tour::COLUMNS)
        .apply(&sorted);
    assert!(matches!(result, Err(QueryError::UnknownField(_))));

    let projected = QuerySpec::from_params(&params(&[("fields", "bogus")]), &config())?;
    let result = SelectBuilder::new("tours")?
        .restrict_columns(Tour::COLUMNS)
        .apply(&projected);
    assert!(matches!(result, Err(QueryError::UnknownField(_))));
    Ok(())
}

#[test]
fn known_columns_pass_the_allow_list() -> Result<()> {
    let spec = QuerySpec::from_params(
        &params(&[("price[gte]", "500"), ("sort", "-ratings_average")]),
        &config(),
    )?;
    let query = SelectBuilder::new("tours")?
        .restrict_columns(Tour::COLUMNS)
        .apply(&spec)?
        .to_sql();

    assert!(query.sql.contains("\"price\" >= $1"), "got: {}", query.sql);
    Ok(())
}

#[test]
fn credential_columns_of_users_are_never_filterable() -> Result<()> {
    let spec = QuerySpec::from_params(&params(&[("password_hash", "x")]), &config())?;
    let result = SelectBuilder::new("users")?
        .restrict_columns(User::COLUMNS)
        .only_active()
        .apply(&spec);

    assert!(matches!(result, Err(QueryError::UnknownField(_))));
    Ok(())
}

#[test]
fn fixed_equality_scopes_nested_listings() -> Result<()> {
    let tour_id = "a2f0cbb2-0b0a-4b6e-9a3e-000000000001";
    let spec = QuerySpec::from_params(&params(&[("rating[gte]", "4")]), &config())?
        .with_eq("tour_id", json!(tour_id))?;
    let query = SelectBuilder::new("reviews")?.apply(&spec)?.to_sql();

    assert!(query.sql.contains("\"rating\" >= $1"), "got: {}", query.sql);
    assert!(query.sql.contains("\"tour_id\" = $2"), "got: {}", query.sql);
    assert_eq!(query.binds[1], json!(tour_id));
    Ok(())
}

#[test]
fn count_statement_reuses_filters_without_pagination() -> Result<()> {
    let spec = QuerySpec::from_params(
        &params(&[("page", "3"), ("limit", "10"), ("price[lte]", "500")]),
        &config(),
    )?;
    let query = SelectBuilder::new("tours")?.filter(&spec)?.to_count_sql();

    assert!(query.sql.starts_with("SELECT COUNT(*) FROM \"tours\""), "got: {}", query.sql);
    assert!(query.sql.contains("\"price\" <= $1"), "got: {}", query.sql);
    assert!(!query.sql.contains("LIMIT"), "got: {}", query.sql);
    Ok(())
}
