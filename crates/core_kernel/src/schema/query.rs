//! Registry-driven query schemas
//!
//! These schemas look every field up in the entity registry, so the same
//! code validates queries against any registered entity.

use serde_json::Value;
use std::marker::PhantomData;

use super::pagination::PAGINATION_KEYS;
use super::{
    coerce_bool, coerce_string, expect_object, reject_nulls, BooleanFilterSchema, DateTimeFilterSchema,
    EnumFilterSchema, FloatFilterSchema, IntFilterSchema, ObjectReader, PaginationSchema, Path,
    Schema, StringFilterSchema,
};
use crate::error::DomainError;
use crate::model::{FieldKind, FieldSpec, Model, OrderBy, Select, SortDirection};
use crate::pagination::PaginationConfig;
use crate::query::{FieldFilter, WhereExpression};
use crate::repository::FindMany;

/// Parses the filter of one declared field according to its kind
fn parse_field_filter(spec: &FieldSpec, input: &Value, path: &Path) -> Result<FieldFilter, DomainError> {
    Ok(match spec.kind {
        FieldKind::Boolean => BooleanFilterSchema.parse_at(input, path)?.into(),
        FieldKind::String => StringFilterSchema.parse_at(input, path)?.into(),
        FieldKind::Int => IntFilterSchema.parse_at(input, path)?.into(),
        FieldKind::Float => FloatFilterSchema.parse_at(input, path)?.into(),
        FieldKind::DateTime => DateTimeFilterSchema.parse_at(input, path)?.into(),
        FieldKind::Enum(values) => EnumFilterSchema::new(values).parse_at(input, path)?.into(),
    })
}

/// Schema of where expressions: field keys plus `AND`, `OR` and `NOT`
///
/// `AND` and `NOT` also accept a single object, read as a one-element list.
pub struct WhereSchema<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> WhereSchema<M> {
    pub fn new() -> Self {
        Self { _model: PhantomData }
    }

    fn parse_list(&self, input: &Value, path: &Path, single: bool) -> Result<Vec<WhereExpression<M>>, DomainError> {
        match input {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.parse_at(item, &path.index(i)))
                .collect(),
            Value::Object(_) if single => Ok(vec![self.parse_at(input, path)?]),
            _ if single => Err(path.error("expected an object or an array")),
            _ => Err(path.error("expected an array")),
        }
    }
}

impl<M: Model> Default for WhereSchema<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Schema for WhereSchema<M> {
    type Output = WhereExpression<M>;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<WhereExpression<M>, DomainError> {
        let map = expect_object(input, path)?;
        reject_nulls(map, path)?;
        let schema = M::schema();
        let mut expression = WhereExpression::new();

        for (key, value) in map {
            let key_path = path.key(key);
            expression = match key.as_str() {
                "AND" => expression.and(self.parse_list(value, &key_path, true)?),
                "OR" => expression.or(self.parse_list(value, &key_path, false)?),
                "NOT" => expression.not(self.parse_list(value, &key_path, true)?),
                field => {
                    let spec = schema
                        .field(field)
                        .ok_or_else(|| key_path.error(format!("unknown field on {}", schema.name())))?;
                    expression.field(field, parse_field_filter(spec, value, &key_path)?)
                }
            };
        }
        Ok(expression)
    }
}

/// Schema of `{field: bool}` selections; at least one field must be selected
pub struct SelectSchema<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> SelectSchema<M> {
    pub fn new() -> Self {
        Self { _model: PhantomData }
    }
}

impl<M: Model> Default for SelectSchema<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Schema for SelectSchema<M> {
    type Output = Select;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<Select, DomainError> {
        let map = expect_object(input, path)?;
        let schema = M::schema();
        let mut selected = Vec::new();

        for (key, value) in map {
            let key_path = path.key(key);
            if schema.field(key).is_none() {
                return Err(key_path.error(format!("unknown field on {}", schema.name())));
            }
            if coerce_bool(value, &key_path)? {
                selected.push(key.clone());
            }
        }

        if selected.is_empty() {
            return Err(path.error("select at least one field"));
        }
        Ok(Select::fields(selected))
    }
}

/// Schema of `orderBy`: `{field: "asc"|"desc"}` or an array of such objects
///
/// Each object carries exactly one key so the sort priority is explicit.
pub struct OrderBySchema<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> OrderBySchema<M> {
    pub fn new() -> Self {
        Self { _model: PhantomData }
    }

    fn parse_entry(&self, input: &Value, path: &Path, order_by: OrderBy) -> Result<OrderBy, DomainError> {
        let map = expect_object(input, path)?;
        let mut entries = map.iter();
        let (Some((field, direction)), None) = (entries.next(), entries.next()) else {
            return Err(path.error("expected exactly one field"));
        };

        let key_path = path.key(field);
        let schema = M::schema();
        if schema.field(field).is_none() {
            return Err(key_path.error(format!("unknown field on {}", schema.name())));
        }
        let direction: SortDirection = coerce_string(direction, &key_path)?
            .parse()
            .map_err(|_| key_path.error(format!("expected one of {}", SortDirection::VALUES.join(", "))))?;
        Ok(order_by.then(field.clone(), direction))
    }
}

impl<M: Model> Default for OrderBySchema<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Schema for OrderBySchema<M> {
    type Output = OrderBy;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<OrderBy, DomainError> {
        match input {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .try_fold(OrderBy::new(), |acc, (i, item)| self.parse_entry(item, &path.index(i), acc)),
            _ => self.parse_entry(input, path, OrderBy::new()),
        }
    }
}

/// Schema of a whole listing request
///
/// `{where?, select?, orderBy?, page?, elementsByPage?}`; the page window
/// always applies, with the configured defaults when absent.
pub struct QuerySchema<M> {
    pagination: PaginationSchema,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> QuerySchema<M> {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            pagination: PaginationSchema::new(config),
            _model: PhantomData,
        }
    }
}

impl<M: Model> Default for QuerySchema<M> {
    fn default() -> Self {
        Self::new(PaginationConfig::default())
    }
}

impl<M: Model> Schema for QuerySchema<M> {
    type Output = FindMany<M>;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<FindMany<M>, DomainError> {
        let mut keys = vec!["where", "select", "orderBy"];
        keys.extend_from_slice(PAGINATION_KEYS);
        let reader = ObjectReader::new(input, path, &keys)?;

        let mut query = FindMany::new();
        if let Some(value) = reader.get("where") {
            query = query.filter(WhereSchema::new().parse_at(value, &path.key("where"))?);
        }
        if let Some(value) = reader.get("select") {
            query = query.select(SelectSchema::<M>::new().parse_at(value, &path.key("select"))?);
        }
        if let Some(value) = reader.get("orderBy") {
            query = query.order_by(OrderBySchema::<M>::new().parse_at(value, &path.key("orderBy"))?);
        }
        Ok(query.window(self.pagination.read(&reader)?.to_window()))
    }
}
