//! Entity schema registry
//!
//! Every entity declares, once, the filter kind of each of its fields. The
//! query composer and the schema layer consult this registry instead of
//! inferring anything from the Rust types at runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::value::{Record, ScalarValue};

/// Filter kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Boolean,
    DateTime,
    /// Closed set of string values
    Enum(&'static [&'static str]),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Enum(_) => "enum",
        }
    }
}

/// A declared field of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

/// Registry entry for one entity
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: &'static str,
    table: &'static str,
    primary_key: &'static str,
    primary_index: usize,
    fields: Vec<FieldSpec>,
    unique_keys: Vec<Vec<&'static str>>,
}

impl EntitySchema {
    /// Starts a registry entry for the given entity and table
    pub fn builder(name: &'static str, table: &'static str) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            schema: EntitySchema {
                name,
                table,
                primary_key: "id",
                primary_index: 0,
                fields: Vec::new(),
                unique_keys: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn primary_key(&self) -> &FieldSpec {
        &self.fields[self.primary_index]
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field, failing with a BadRequest error naming the entity
    pub fn require_field(&self, name: &str) -> Result<&FieldSpec, DomainError> {
        self.field(name).ok_or_else(|| {
            DomainError::validation(format!("unknown field '{}' on {}", name, self.name))
        })
    }

    /// Unique keys, primary key first
    pub fn unique_keys(&self) -> &[Vec<&'static str>] {
        &self.unique_keys
    }

    /// Returns the declared unique key made of exactly these fields
    pub fn unique_key_for(&self, fields: &BTreeSet<&str>) -> Option<&[&'static str]> {
        self.unique_keys
            .iter()
            .find(|key| key.len() == fields.len() && key.iter().all(|f| fields.contains(f)))
            .map(Vec::as_slice)
    }
}

/// Builder for [`EntitySchema`]
#[derive(Debug)]
pub struct EntitySchemaBuilder {
    schema: EntitySchema,
}

impl EntitySchemaBuilder {
    fn push(mut self, name: &'static str, kind: FieldKind, nullable: bool) -> Self {
        self.schema.fields.push(FieldSpec { name, kind, nullable });
        self
    }

    pub fn string(self, name: &'static str) -> Self {
        self.push(name, FieldKind::String, false)
    }

    pub fn nullable_string(self, name: &'static str) -> Self {
        self.push(name, FieldKind::String, true)
    }

    pub fn int(self, name: &'static str) -> Self {
        self.push(name, FieldKind::Int, false)
    }

    pub fn nullable_int(self, name: &'static str) -> Self {
        self.push(name, FieldKind::Int, true)
    }

    pub fn float(self, name: &'static str) -> Self {
        self.push(name, FieldKind::Float, false)
    }

    pub fn nullable_float(self, name: &'static str) -> Self {
        self.push(name, FieldKind::Float, true)
    }

    pub fn boolean(self, name: &'static str) -> Self {
        self.push(name, FieldKind::Boolean, false)
    }

    pub fn datetime(self, name: &'static str) -> Self {
        self.push(name, FieldKind::DateTime, false)
    }

    pub fn nullable_datetime(self, name: &'static str) -> Self {
        self.push(name, FieldKind::DateTime, true)
    }

    pub fn enumeration(self, name: &'static str, values: &'static [&'static str]) -> Self {
        self.push(name, FieldKind::Enum(values), false)
    }

    /// Sets the primary key field (defaults to `id`)
    pub fn primary_key(mut self, name: &'static str) -> Self {
        self.schema.primary_key = name;
        self
    }

    /// Declares an additional unique key
    pub fn unique(mut self, fields: &[&'static str]) -> Self {
        self.schema.unique_keys.push(fields.to_vec());
        self
    }

    /// Finishes the registry entry
    ///
    /// # Panics
    ///
    /// Panics if the primary key or a unique-key field is not a declared
    /// field. Registry entries are static definitions, so this is a
    /// programming error caught on first use.
    pub fn build(mut self) -> EntitySchema {
        let declared = |name: &str| self.schema.fields.iter().any(|f| f.name == name);
        let primary_index = self
            .schema
            .fields
            .iter()
            .position(|f| f.name == self.schema.primary_key);
        let Some(primary_index) = primary_index else {
            panic!(
                "primary key '{}' is not a field of {}",
                self.schema.primary_key, self.schema.name
            );
        };
        for key in &self.schema.unique_keys {
            for field in key {
                assert!(declared(field), "unique key field '{}' is not a field of {}", field, self.schema.name);
            }
        }
        self.schema.primary_index = primary_index;
        self.schema.unique_keys.insert(0, vec![self.schema.primary_key]);
        self.schema
    }
}

/// A persisted entity with a registered schema
///
/// `Create` and `Update` are the entity's Data shapes; `Update` only carries
/// the fields it changes.
pub trait Model: Clone + Send + Sync + Sized + 'static {
    type Create: IntoRecord + Send + Sync + 'static;
    type Update: IntoRecord + Send + Sync + 'static;

    fn schema() -> &'static EntitySchema;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, DomainError>;

    /// Narrows the model to a selection
    ///
    /// Nullable fields outside the selection are cleared; non-nullable fields
    /// are always kept since the typed model cannot represent their absence.
    fn project(self, select: &Select) -> Self {
        let mut record = self.to_record();
        for field in Self::schema().fields() {
            if field.nullable && !select.contains(field.name) {
                record.set(field.name, ScalarValue::Null);
            }
        }
        Self::from_record(&record).unwrap_or(self)
    }
}

/// Conversion of a Data shape into column values
pub trait IntoRecord {
    fn into_record(self) -> Record;
}

impl IntoRecord for Record {
    fn into_record(self) -> Record {
        self
    }
}

/// Typed extraction of a cell value
pub trait FromScalar: Sized {
    fn from_scalar(value: &ScalarValue) -> Option<Self>;
}

impl FromScalar for String {
    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromScalar for f64 {
    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromScalar for bool {
    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromScalar for DateTime<Utc> {
    fn from_scalar(value: &ScalarValue) -> Option<Self> {
        value.as_datetime()
    }
}

impl Record {
    /// Reads a non-null field
    pub fn required<T: FromScalar>(&self, field: &str) -> Result<T, DomainError> {
        T::from_scalar(self.get(field)).ok_or_else(|| {
            DomainError::validation(format!("field '{}' is missing or has the wrong type", field))
        })
    }

    /// Reads a nullable field
    pub fn optional<T: FromScalar>(&self, field: &str) -> Result<Option<T>, DomainError> {
        let value = self.get(field);
        if value.is_null() {
            return Ok(None);
        }
        T::from_scalar(value).map(Some).ok_or_else(|| {
            DomainError::validation(format!("field '{}' has the wrong type", field))
        })
    }

    /// Reads a non-null field and parses it with `FromStr`
    pub fn parsed<T: FromStr>(&self, field: &str) -> Result<T, DomainError> {
        let raw: String = self.required(field)?;
        raw.parse()
            .map_err(|_| DomainError::validation(format!("field '{}' holds unparseable value '{}'", field, raw)))
    }
}

/// Fields to return from a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select(BTreeSet<String>);

impl Select {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sort direction of an `orderBy` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const VALUES: &'static [&'static str] = &["asc", "desc"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DomainError::validation(format!(
                "sort direction must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}

/// Ordered list of sort keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy(Vec<(String, SortDirection)>);

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new().then(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new().then(field, SortDirection::Desc)
    }

    /// Appends a lower-priority sort key
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.0.push((field.into(), direction));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(f, d)| (f.as_str(), *d))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks every sort key against the registry
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), DomainError> {
        for (field, _) in &self.0 {
            schema.require_field(field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> EntitySchema {
        EntitySchema::builder("Quote", "quotes")
            .string("id")
            .string("asset_id")
            .datetime("quoted_at")
            .nullable_float("bid")
            .unique(&["asset_id", "quoted_at"])
            .build()
    }

    #[test]
    fn test_primary_key_is_first_unique_key() {
        let schema = schema();
        assert_eq!(schema.unique_keys()[0], vec!["id"]);
        assert_eq!(schema.primary_key().name, "id");
    }

    #[test]
    fn test_unique_key_lookup_ignores_order() {
        let schema = schema();
        let fields: BTreeSet<&str> = ["quoted_at", "asset_id"].into_iter().collect();
        assert_eq!(schema.unique_key_for(&fields), Some(&["asset_id", "quoted_at"][..]));

        let partial: BTreeSet<&str> = ["asset_id"].into_iter().collect();
        assert!(schema.unique_key_for(&partial).is_none());
    }

    #[test]
    #[should_panic(expected = "primary key")]
    fn test_build_rejects_undeclared_primary_key() {
        EntitySchema::builder("Broken", "broken").string("name").build();
    }

    #[test]
    fn test_require_field_reports_entity() {
        let error = schema().require_field("nope").unwrap_err();
        assert!(error.description().contains("Quote"));
        assert_eq!(error.error_code(), "com-1000");
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("DESC".parse::<SortDirection>().is_err());
    }
}
