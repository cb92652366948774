//! SQL rendering of repository operations
//!
//! Every statement is built with a [`sqlx::QueryBuilder`]: identifiers come
//! from the entity registry and are always quoted, values are always bound.
//!
//! Rendering follows the store contract:
//!
//! - string comparisons and string ordering use `COLLATE "C"` (byte order)
//! - `contains` / `startsWith` / `endsWith` render to `LIKE` with `\`, `%`
//!   and `_` escaped in the operand
//! - ordering places nulls last (first when descending) and always ends with
//!   the primary key ascending, so ties are broken deterministically
//! - single-row writes target the first matching row by primary key through
//!   a `FOR UPDATE` subselect

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use core_kernel::{
    CompareOp, DomainError, EntitySchema, FieldKind, FieldSpec, OrderBy, Predicate, Record,
    ScalarValue, SortDirection, TextOp,
};

use crate::error::DatabaseError;

/// Owned statement builder
pub type Sql = QueryBuilder<'static, Postgres>;

/// Maximum bind parameters in one PostgreSQL statement
const MAX_BINDS: usize = u16::MAX as usize;

/// Quotes an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escapes `LIKE` metacharacters so the operand matches literally
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn like_pattern(op: TextOp, value: &str) -> String {
    let escaped = escape_like(value);
    match op {
        TextOp::Contains => format!("%{}%", escaped),
        TextOp::StartsWith => format!("{}%", escaped),
        TextOp::EndsWith => format!("%{}", escaped),
    }
}

/// Binds a cell value; nulls are typed after the column
pub fn push_value(sql: &mut Sql, value: ScalarValue, kind: FieldKind) {
    match value {
        ScalarValue::String(v) => sql.push_bind(v),
        ScalarValue::Int(v) => sql.push_bind(v),
        ScalarValue::Float(v) => sql.push_bind(v),
        ScalarValue::Boolean(v) => sql.push_bind(v),
        ScalarValue::DateTime(v) => sql.push_bind(v),
        ScalarValue::Null => match kind {
            FieldKind::Int => sql.push_bind(None::<i64>),
            FieldKind::Float => sql.push_bind(None::<f64>),
            FieldKind::Boolean => sql.push_bind(None::<bool>),
            FieldKind::DateTime => sql.push_bind(None::<DateTime<Utc>>),
            FieldKind::String | FieldKind::Enum(_) => sql.push_bind(None::<String>),
        },
    };
}

fn is_text(spec: &FieldSpec) -> bool {
    matches!(spec.kind, FieldKind::String)
}

/// Column reference, collated for byte-order comparison on text columns
fn column(spec: &FieldSpec) -> String {
    if is_text(spec) {
        format!("{} COLLATE \"C\"", quote_ident(spec.name))
    } else {
        quote_ident(spec.name)
    }
}

fn column_list(schema: &EntitySchema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a predicate tree
pub fn push_predicate(sql: &mut Sql, schema: &EntitySchema, predicate: &Predicate) -> Result<(), DomainError> {
    match predicate {
        Predicate::Always => {
            sql.push("TRUE");
        }
        Predicate::Never => {
            sql.push("FALSE");
        }
        Predicate::Compare { field, op, value } => {
            let spec = schema.require_field(field)?;
            if *op == CompareOp::Eq {
                sql.push(quote_ident(spec.name));
            } else {
                sql.push(column(spec));
            }
            sql.push(format!(" {} ", op.as_sql()));
            push_value(sql, value.clone(), spec.kind);
        }
        Predicate::InList { field, values, negated } => {
            let spec = schema.require_field(field)?;
            if values.is_empty() {
                sql.push(if *negated { "TRUE" } else { "FALSE" });
                return Ok(());
            }
            sql.push(quote_ident(spec.name));
            sql.push(if *negated { " NOT IN (" } else { " IN (" });
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                push_value(sql, value.clone(), spec.kind);
            }
            sql.push(")");
        }
        Predicate::Text { field, op, value } => {
            let spec = schema.require_field(field)?;
            sql.push(quote_ident(spec.name));
            sql.push(" LIKE ");
            sql.push_bind(like_pattern(*op, value));
            sql.push(" ESCAPE '\\'");
        }
        Predicate::And(parts) => push_junction(sql, schema, parts, " AND ", "TRUE")?,
        Predicate::Or(parts) => push_junction(sql, schema, parts, " OR ", "FALSE")?,
        Predicate::Not(inner) => {
            sql.push("NOT (");
            push_predicate(sql, schema, inner)?;
            sql.push(")");
        }
    }
    Ok(())
}

fn push_junction(
    sql: &mut Sql,
    schema: &EntitySchema,
    parts: &[Predicate],
    separator: &str,
    empty: &str,
) -> Result<(), DomainError> {
    if parts.is_empty() {
        sql.push(empty);
        return Ok(());
    }
    sql.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push(separator);
        }
        push_predicate(sql, schema, part)?;
    }
    sql.push(")");
    Ok(())
}

fn push_where(sql: &mut Sql, schema: &EntitySchema, predicate: &Predicate) -> Result<(), DomainError> {
    if *predicate != Predicate::Always {
        sql.push(" WHERE ");
        push_predicate(sql, schema, predicate)?;
    }
    Ok(())
}

/// `ORDER BY` with the primary key as final tie-break
pub fn push_order_by(sql: &mut Sql, schema: &EntitySchema, order_by: &OrderBy) -> Result<(), DomainError> {
    let primary = schema.primary_key();
    let mut items = Vec::new();
    let mut has_primary = false;
    for (field, direction) in order_by.iter() {
        let spec = schema.require_field(field)?;
        has_primary |= spec.name == primary.name;
        items.push(match direction {
            SortDirection::Asc => format!("{} ASC NULLS LAST", column(spec)),
            SortDirection::Desc => format!("{} DESC NULLS FIRST", column(spec)),
        });
    }
    if !has_primary {
        items.push(format!("{} ASC", column(primary)));
    }
    sql.push(" ORDER BY ");
    sql.push(items.join(", "));
    Ok(())
}

fn push_window(sql: &mut Sql, skip: Option<u64>, take: Option<u64>) {
    if let Some(take) = take {
        sql.push(" LIMIT ");
        sql.push_bind(i64::try_from(take).unwrap_or(i64::MAX));
    }
    if let Some(skip) = skip.filter(|s| *s > 0) {
        sql.push(" OFFSET ");
        sql.push_bind(i64::try_from(skip).unwrap_or(i64::MAX));
    }
}

/// Subselect of the primary key of the first matching row, locked
fn push_first_match(sql: &mut Sql, schema: &EntitySchema, predicate: &Predicate) -> Result<(), DomainError> {
    let primary = schema.primary_key();
    sql.push(format!(
        " WHERE {} = (SELECT {} FROM {}",
        quote_ident(primary.name),
        quote_ident(primary.name),
        quote_ident(schema.table())
    ));
    push_where(sql, schema, predicate)?;
    sql.push(format!(" ORDER BY {} ASC LIMIT 1 FOR UPDATE)", column(primary)));
    Ok(())
}

fn push_returning(sql: &mut Sql, schema: &EntitySchema) {
    sql.push(" RETURNING ");
    sql.push(column_list(schema));
}

/// `SELECT` of whole rows
pub fn select(
    schema: &EntitySchema,
    predicate: &Predicate,
    order_by: &OrderBy,
    skip: Option<u64>,
    take: Option<u64>,
) -> Result<Sql, DomainError> {
    let mut sql = Sql::new(format!("SELECT {} FROM {}", column_list(schema), quote_ident(schema.table())));
    push_where(&mut sql, schema, predicate)?;
    push_order_by(&mut sql, schema, order_by)?;
    push_window(&mut sql, skip, take);
    Ok(sql)
}

/// `SELECT COUNT(*)`
pub fn count(schema: &EntitySchema, predicate: &Predicate) -> Result<Sql, DomainError> {
    let mut sql = Sql::new(format!("SELECT COUNT(*) FROM {}", quote_ident(schema.table())));
    push_where(&mut sql, schema, predicate)?;
    Ok(sql)
}

fn push_row_values(sql: &mut Sql, schema: &EntitySchema, row: &Record) {
    sql.push("(");
    for (i, field) in schema.fields().iter().enumerate() {
        if i > 0 {
            sql.push(", ");
        }
        push_value(sql, row.get(field.name).clone(), field.kind);
    }
    sql.push(")");
}

/// `INSERT` of full rows, split so no statement exceeds the bind limit
pub fn insert(schema: &EntitySchema, rows: &[Record], returning: bool) -> Vec<Sql> {
    let per_statement = (MAX_BINDS / schema.fields().len().max(1)).max(1);
    rows.chunks(per_statement)
        .map(|chunk| {
            let mut sql = Sql::new(format!(
                "INSERT INTO {} ({}) VALUES ",
                quote_ident(schema.table()),
                column_list(schema)
            ));
            for (i, row) in chunk.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                push_row_values(&mut sql, schema, row);
            }
            if returning {
                push_returning(&mut sql, schema);
            }
            sql
        })
        .collect()
}

fn push_assignments(sql: &mut Sql, schema: &EntitySchema, changes: &Record, fallback: &str) -> Result<(), DomainError> {
    if changes.is_empty() {
        sql.push(fallback);
        return Ok(());
    }
    for (i, (field, value)) in changes.iter().enumerate() {
        let spec = schema.require_field(field)?;
        if i > 0 {
            sql.push(", ");
        }
        sql.push(format!("{} = ", quote_ident(spec.name)));
        push_value(sql, value.clone(), spec.kind);
    }
    Ok(())
}

/// `UPDATE` of the first matching row
pub fn update(schema: &EntitySchema, changes: &Record, predicate: &Predicate) -> Result<Sql, DomainError> {
    let primary = quote_ident(schema.primary_key().name);
    let mut sql = Sql::new(format!("UPDATE {} SET ", quote_ident(schema.table())));
    push_assignments(&mut sql, schema, changes, &format!("{} = {}", primary, primary))?;
    push_first_match(&mut sql, schema, predicate)?;
    push_returning(&mut sql, schema);
    Ok(sql)
}

/// `DELETE` of the first matching row
pub fn delete(schema: &EntitySchema, predicate: &Predicate) -> Result<Sql, DomainError> {
    let mut sql = Sql::new(format!("DELETE FROM {}", quote_ident(schema.table())));
    push_first_match(&mut sql, schema, predicate)?;
    push_returning(&mut sql, schema);
    Ok(sql)
}

/// Single-statement upsert on a unique key
pub fn upsert(schema: &EntitySchema, row: &Record, key: &[&str], changes: &Record) -> Result<Sql, DomainError> {
    let mut sql = Sql::new(format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_ident(schema.table()),
        column_list(schema)
    ));
    push_row_values(&mut sql, schema, row);

    let target = key.iter().map(|f| quote_ident(f)).collect::<Vec<_>>().join(", ");
    sql.push(format!(" ON CONFLICT ({}) DO UPDATE SET ", target));
    let first = key.first().map(|f| quote_ident(f)).unwrap_or_default();
    push_assignments(&mut sql, schema, changes, &format!("{} = EXCLUDED.{}", first, first))?;
    push_returning(&mut sql, schema);
    Ok(sql)
}

/// Reads a returned row back into a record
pub fn decode_row(schema: &EntitySchema, row: &PgRow) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for field in schema.fields() {
        let name = field.name;
        let value = match field.kind {
            FieldKind::String | FieldKind::Enum(_) => ScalarValue::from(row.try_get::<Option<String>, _>(name)?),
            FieldKind::Int => ScalarValue::from(row.try_get::<Option<i64>, _>(name)?),
            FieldKind::Float => ScalarValue::from(row.try_get::<Option<f64>, _>(name)?),
            FieldKind::Boolean => ScalarValue::from(row.try_get::<Option<bool>, _>(name)?),
            FieldKind::DateTime => ScalarValue::from(row.try_get::<Option<DateTime<Utc>>, _>(name)?),
        };
        record.set(name, value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{PageRequest, Pagination};
    use once_cell::sync::Lazy;

    static LISTING: Lazy<EntitySchema> = Lazy::new(|| {
        EntitySchema::builder("Listing", "listings")
            .string("id")
            .string("symbol")
            .enumeration("venue", &["nyse", "lse"])
            .float("price")
            .nullable_string("note")
            .unique(&["symbol"])
            .build()
    });

    fn render(predicate: &Predicate) -> String {
        let mut sql = Sql::new("");
        push_predicate(&mut sql, &LISTING, predicate).unwrap();
        sql.sql().to_string()
    }

    #[test]
    fn test_quote_ident_doubles_quotes() {
        assert_eq!(quote_ident("price"), "\"price\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_escape_like_metacharacters() {
        assert_eq!(escape_like("a_b%"), "a\\_b\\%");
        assert_eq!(escape_like("c:\\dir"), "c:\\\\dir");
        assert_eq!(like_pattern(TextOp::StartsWith, "50%"), "50\\%%");
        assert_eq!(like_pattern(TextOp::EndsWith, "_x"), "%\\_x");
    }

    #[test]
    fn test_compare_collates_text_ranges_only() {
        assert_eq!(
            render(&Predicate::compare("symbol", CompareOp::Gte, "AB")),
            "\"symbol\" COLLATE \"C\" >= $1"
        );
        assert_eq!(render(&Predicate::compare("symbol", CompareOp::Eq, "AB")), "\"symbol\" = $1");
        assert_eq!(render(&Predicate::compare("price", CompareOp::Lt, 2.5)), "\"price\" < $1");
    }

    #[test]
    fn test_lists_and_junctions() {
        let predicate = Predicate::and(vec![
            Predicate::in_list("venue", vec!["nyse".into(), "lse".into()]),
            Predicate::not(Predicate::or(vec![
                Predicate::text("symbol", TextOp::Contains, "A"),
                Predicate::not_in("symbol", vec!["ZZ".into()]),
            ])),
        ]);
        assert_eq!(
            render(&predicate),
            "(\"venue\" IN ($1, $2) AND NOT ((\"symbol\" LIKE $3 ESCAPE '\\' OR \"symbol\" NOT IN ($4))))"
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(render(&Predicate::in_list("symbol", vec![])), "FALSE");
        assert_eq!(render(&Predicate::not_in("symbol", vec![])), "TRUE");
        assert_eq!(render(&Predicate::Or(vec![])), "FALSE");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut sql = Sql::new("");
        let error = push_predicate(&mut sql, &LISTING, &Predicate::compare("nope", CompareOp::Eq, 1i64)).unwrap_err();
        assert!(error.description().contains("unknown field 'nope'"));
    }

    #[test]
    fn test_select_orders_with_primary_key_tie_break() {
        let window: Pagination = PageRequest::new(3, 10).unwrap().into();
        let sql = select(
            &LISTING,
            &Predicate::compare("price", CompareOp::Gt, 1.0),
            &OrderBy::desc("note"),
            Some(window.skip),
            Some(window.take),
        )
        .unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT \"id\", \"symbol\", \"venue\", \"price\", \"note\" FROM \"listings\" \
             WHERE \"price\" > $1 \
             ORDER BY \"note\" COLLATE \"C\" DESC NULLS FIRST, \"id\" COLLATE \"C\" ASC \
             LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_select_without_filter_or_window() {
        let sql = select(&LISTING, &Predicate::Always, &OrderBy::new(), None, None).unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT \"id\", \"symbol\", \"venue\", \"price\", \"note\" FROM \"listings\" ORDER BY \"id\" COLLATE \"C\" ASC"
        );
    }

    #[test]
    fn test_ordering_by_primary_key_skips_tie_break() {
        let sql = select(&LISTING, &Predicate::Always, &OrderBy::desc("id"), None, None).unwrap();
        assert!(sql.sql().ends_with("ORDER BY \"id\" COLLATE \"C\" DESC NULLS FIRST"));
    }

    #[test]
    fn test_update_targets_first_match() {
        let changes = Record::new().with("price", 3.0).with("note", ScalarValue::Null);
        let sql = update(&LISTING, &changes, &Predicate::compare("venue", CompareOp::Eq, "lse")).unwrap();
        assert_eq!(
            sql.sql(),
            "UPDATE \"listings\" SET \"note\" = $1, \"price\" = $2 \
             WHERE \"id\" = (SELECT \"id\" FROM \"listings\" WHERE \"venue\" = $3 \
             ORDER BY \"id\" COLLATE \"C\" ASC LIMIT 1 FOR UPDATE) \
             RETURNING \"id\", \"symbol\", \"venue\", \"price\", \"note\""
        );
    }

    #[test]
    fn test_update_without_changes_is_a_no_op_assignment() {
        let sql = update(&LISTING, &Record::new(), &Predicate::Always).unwrap();
        assert!(sql.sql().starts_with("UPDATE \"listings\" SET \"id\" = \"id\" WHERE"));
    }

    #[test]
    fn test_delete_targets_first_match() {
        let sql = delete(&LISTING, &Predicate::Always).unwrap();
        assert_eq!(
            sql.sql(),
            "DELETE FROM \"listings\" WHERE \"id\" = (SELECT \"id\" FROM \"listings\" \
             ORDER BY \"id\" COLLATE \"C\" ASC LIMIT 1 FOR UPDATE) \
             RETURNING \"id\", \"symbol\", \"venue\", \"price\", \"note\""
        );
    }

    #[test]
    fn test_upsert_on_unique_key() {
        let row = Record::new()
            .with("id", "L1")
            .with("symbol", "AAPL")
            .with("venue", "nyse")
            .with("price", 1.0)
            .with("note", ScalarValue::Null);
        let sql = upsert(&LISTING, &row, &["symbol"], &Record::new().with("price", 2.0)).unwrap();
        assert_eq!(
            sql.sql(),
            "INSERT INTO \"listings\" (\"id\", \"symbol\", \"venue\", \"price\", \"note\") \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (\"symbol\") DO UPDATE SET \"price\" = $6 \
             RETURNING \"id\", \"symbol\", \"venue\", \"price\", \"note\""
        );

        let untouched = upsert(&LISTING, &row, &["symbol"], &Record::new()).unwrap();
        assert!(untouched.sql().contains("DO UPDATE SET \"symbol\" = EXCLUDED.\"symbol\""));
    }

    #[test]
    fn test_insert_splits_at_bind_limit() {
        let row = Record::new().with("id", "x");
        let rows = vec![row; MAX_BINDS / 5 + 1];
        let statements = insert(&LISTING, &rows, false);
        assert_eq!(statements.len(), 2);
        assert!(statements[1].sql().ends_with("VALUES ($1, $2, $3, $4, $5)"));
    }

    proptest::proptest! {
        #[test]
        fn test_escaped_like_has_no_bare_wildcards(value in ".*") {
            let escaped = escape_like(&value);
            let mut chars = escaped.chars();
            let mut restored = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => restored.push(chars.next().unwrap()),
                    '%' | '_' => proptest::prop_assert!(false, "bare wildcard in {:?}", escaped),
                    other => restored.push(other),
                }
            }
            proptest::prop_assert_eq!(restored, value);
        }
    }
}
