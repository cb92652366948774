//! Where-clause composition
//!
//! A [`WhereExpression`] holds per-field filters and `AND` / `OR` / `NOT`
//! sub-expressions for one entity. [`WhereExpression::compose`] checks it
//! against the entity registry and produces a store-neutral [`Predicate`]
//! tree that store adapters translate (SQL) or evaluate (in memory).
//!
//! Composition is declarative: predicates keep the order they were written
//! in and nothing is simplified beyond collapsing empty and single-element
//! conjunctions.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use crate::error::DomainError;
use crate::filter::{
    BooleanFilter, DateTimeFilter, EnumFilter, FloatFilter, IntFilter, StringFilter,
};
use crate::model::{FieldKind, FieldSpec, Model};
use crate::value::{Record, ScalarValue};

/// Comparison operator of a leaf predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
        }
    }
}

/// Substring operator of a text predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// Store-neutral predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    Always,
    /// Matches no row
    Never,
    Compare {
        field: String,
        op: CompareOp,
        value: ScalarValue,
    },
    /// `field IN (values)`, or `NOT IN` when negated; never empty
    InList {
        field: String,
        values: Vec<ScalarValue>,
        negated: bool,
    },
    Text {
        field: String,
        op: TextOp,
        value: String,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(field: &str, op: CompareOp, value: impl Into<ScalarValue>) -> Self {
        Predicate::Compare {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    /// Membership test; an empty list matches nothing
    pub fn in_list(field: &str, values: Vec<ScalarValue>) -> Self {
        if values.is_empty() {
            return Predicate::Never;
        }
        Predicate::InList {
            field: field.to_string(),
            values,
            negated: false,
        }
    }

    /// Exclusion test; an empty list imposes no restriction
    pub fn not_in(field: &str, values: Vec<ScalarValue>) -> Self {
        if values.is_empty() {
            return Predicate::Always;
        }
        Predicate::InList {
            field: field.to_string(),
            values,
            negated: true,
        }
    }

    pub fn text(field: &str, op: TextOp, value: impl Into<String>) -> Self {
        Predicate::Text {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    /// Conjunction; empty is `Always`, a single part is returned as is
    pub fn and(mut parts: Vec<Predicate>) -> Self {
        match parts.len() {
            0 => Predicate::Always,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    /// Disjunction; empty is `Never`, a single part is returned as is
    pub fn or(mut parts: Vec<Predicate>) -> Self {
        match parts.len() {
            0 => Predicate::Never,
            1 => parts.remove(0),
            _ => Predicate::Or(parts),
        }
    }

    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    /// Evaluates against a record with SQL three-valued logic
    ///
    /// `None` is SQL `UNKNOWN`: any comparison involving a null column.
    pub fn evaluate(&self, record: &Record) -> Option<bool> {
        match self {
            Predicate::Always => Some(true),
            Predicate::Never => Some(false),
            Predicate::Compare { field, op, value } => {
                let ordering = record.get(field).compare(value)?;
                Some(op.holds(ordering))
            }
            Predicate::InList { field, values, negated } => {
                let cell = record.get(field);
                if cell.is_null() {
                    return None;
                }
                let found = values.iter().any(|v| cell.compare(v) == Some(Ordering::Equal));
                Some(found != *negated)
            }
            Predicate::Text { field, op, value } => {
                let cell = record.get(field).as_str()?;
                Some(match op {
                    TextOp::Contains => cell.contains(value.as_str()),
                    TextOp::StartsWith => cell.starts_with(value.as_str()),
                    TextOp::EndsWith => cell.ends_with(value.as_str()),
                })
            }
            Predicate::And(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(record) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown { None } else { Some(true) }
            }
            Predicate::Or(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(record) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown { None } else { Some(false) }
            }
            Predicate::Not(inner) => inner.evaluate(record).map(|v| !v),
        }
    }

    /// True when the record definitely satisfies the predicate
    pub fn matches(&self, record: &Record) -> bool {
        self.evaluate(record) == Some(true)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str| -> fmt::Result {
            f.write_str("(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", part)?;
            }
            f.write_str(")")
        };
        match self {
            Predicate::Always => f.write_str("TRUE"),
            Predicate::Never => f.write_str("FALSE"),
            Predicate::Compare { field, op, value } => write!(f, "{} {} {:?}", field, op.as_sql(), value.to_string()),
            Predicate::InList { field, values, negated } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                write!(f, "{} {} {:?}", field, keyword, values)
            }
            Predicate::Text { field, op, value } => write!(f, "{} {:?} {:?}", field, op, value),
            Predicate::And(parts) => join(f, parts, " AND "),
            Predicate::Or(parts) => join(f, parts, " OR "),
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// The filter attached to one field, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    Boolean(BooleanFilter),
    String(StringFilter),
    Int(IntFilter),
    Float(FloatFilter),
    DateTime(DateTimeFilter),
    Enum(EnumFilter),
}

impl FieldFilter {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldFilter::Boolean(_) => "boolean",
            FieldFilter::String(_) => "string",
            FieldFilter::Int(_) => "int",
            FieldFilter::Float(_) => "float",
            FieldFilter::DateTime(_) => "datetime",
            FieldFilter::Enum(_) => "enum",
        }
    }

    /// Checks the filter against the declared field
    ///
    /// The filter kind must match the field kind exactly, and enum values
    /// must belong to the field's closed set.
    pub fn check(&self, spec: &FieldSpec) -> Result<(), DomainError> {
        let matches = match (self, &spec.kind) {
            (FieldFilter::Boolean(_), FieldKind::Boolean)
            | (FieldFilter::String(_), FieldKind::String)
            | (FieldFilter::Int(_), FieldKind::Int)
            | (FieldFilter::Float(_), FieldKind::Float)
            | (FieldFilter::DateTime(_), FieldKind::DateTime) => true,
            (FieldFilter::Enum(filter), FieldKind::Enum(allowed)) => {
                filter.condition.check_values(allowed)?;
                if let Some(negated) = &filter.not {
                    negated.check_values(allowed)?;
                }
                true
            }
            _ => false,
        };
        if matches {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "field '{}' is a {} field and cannot take a {} filter",
                spec.name,
                spec.kind.name(),
                self.kind_name()
            )))
        }
    }

    pub fn to_predicate(&self, field: &str) -> Predicate {
        match self {
            FieldFilter::Boolean(f) => f.to_predicate(field),
            FieldFilter::String(f) => f.to_predicate(field),
            FieldFilter::Int(f) => f.to_predicate(field),
            FieldFilter::Float(f) => f.to_predicate(field),
            FieldFilter::DateTime(f) => f.to_predicate(field),
            FieldFilter::Enum(f) => f.to_predicate(field),
        }
    }

    pub fn as_equality(&self) -> Option<ScalarValue> {
        match self {
            FieldFilter::Boolean(f) => f.as_equality(),
            FieldFilter::String(f) => f.as_equality(),
            FieldFilter::Int(f) => f.as_equality(),
            FieldFilter::Float(f) => f.as_equality(),
            FieldFilter::DateTime(f) => f.as_equality(),
            FieldFilter::Enum(f) => f.as_equality(),
        }
    }
}

macro_rules! field_filter_from {
    ($($variant:ident($filter:ty)),* $(,)?) => {
        $(
            impl From<$filter> for FieldFilter {
                fn from(filter: $filter) -> Self {
                    FieldFilter::$variant(filter)
                }
            }
        )*
    };
}

field_filter_from!(
    Boolean(BooleanFilter),
    String(StringFilter),
    Int(IntFilter),
    Float(FloatFilter),
    DateTime(DateTimeFilter),
    Enum(EnumFilter),
);

/// The full predicate of one query against entity `M`
pub struct WhereExpression<M> {
    fields: Vec<(String, FieldFilter)>,
    and: Vec<WhereExpression<M>>,
    or: Option<Vec<WhereExpression<M>>>,
    not: Vec<WhereExpression<M>>,
    _model: PhantomData<fn() -> M>,
}

impl<M> WhereExpression<M> {
    /// An empty expression, matching every row
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            and: Vec::new(),
            or: None,
            not: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Adds a field filter; field filters are ANDed
    pub fn field(mut self, name: impl Into<String>, filter: impl Into<FieldFilter>) -> Self {
        self.fields.push((name.into(), filter.into()));
        self
    }

    /// Adds sub-expressions that must all hold
    pub fn and(mut self, expressions: impl IntoIterator<Item = WhereExpression<M>>) -> Self {
        self.and.extend(expressions);
        self
    }

    /// Sets sub-expressions of which at least one must hold
    ///
    /// An empty `OR` list matches nothing.
    pub fn or(mut self, expressions: impl IntoIterator<Item = WhereExpression<M>>) -> Self {
        self.or.get_or_insert_with(Vec::new).extend(expressions);
        self
    }

    /// Adds sub-expressions whose conjunction must not hold
    pub fn not(mut self, expressions: impl IntoIterator<Item = WhereExpression<M>>) -> Self {
        self.not.extend(expressions);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldFilter)> {
        self.fields.iter().map(|(name, filter)| (name.as_str(), filter))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.and.is_empty() && self.or.is_none() && self.not.is_empty()
    }
}

impl<M: Model> WhereExpression<M> {
    /// Checks the expression against the registry and builds the predicate
    ///
    /// - field filters combine with AND
    /// - `AND` combines its elements with AND
    /// - `OR` combines its elements with OR
    /// - `NOT` negates the conjunction of its elements; an empty `NOT`
    ///   imposes no restriction
    pub fn compose(&self) -> Result<Predicate, DomainError> {
        let schema = M::schema();
        let mut parts = Vec::with_capacity(self.fields.len() + 3);

        for (name, filter) in &self.fields {
            let spec = schema.require_field(name)?;
            filter.check(spec)?;
            parts.push(filter.to_predicate(name));
        }

        if !self.and.is_empty() {
            parts.push(Predicate::and(Self::compose_all(&self.and)?));
        }

        if let Some(or) = &self.or {
            parts.push(Predicate::or(Self::compose_all(or)?));
        }

        if !self.not.is_empty() {
            parts.push(Predicate::not(Predicate::and(Self::compose_all(&self.not)?)));
        }

        Ok(Predicate::and(parts))
    }

    fn compose_all(expressions: &[WhereExpression<M>]) -> Result<Vec<Predicate>, DomainError> {
        expressions.iter().map(WhereExpression::compose).collect()
    }

    /// Extracts the unique key this expression pins down
    ///
    /// Succeeds only when the expression is nothing but pure equality
    /// filters covering exactly one declared unique key. Used by upsert,
    /// whose conflict target must be a unique key.
    pub fn unique_key(&self) -> Result<Vec<(&'static str, ScalarValue)>, DomainError> {
        let schema = M::schema();
        let not_unique = || {
            DomainError::validation(format!(
                "upsert requires equality filters on exactly one unique key of {}",
                schema.name()
            ))
        };

        if !self.and.is_empty() || self.or.is_some() || !self.not.is_empty() {
            return Err(not_unique());
        }

        let mut pinned = Vec::with_capacity(self.fields.len());
        for (name, filter) in &self.fields {
            let spec = schema.require_field(name)?;
            filter.check(spec)?;
            let value = filter.as_equality().ok_or_else(not_unique)?;
            pinned.push((spec.name, value));
        }

        let names: BTreeSet<&str> = pinned.iter().map(|(name, _)| *name).collect();
        if names.len() != pinned.len() || schema.unique_key_for(&names).is_none() {
            return Err(not_unique());
        }
        Ok(pinned)
    }
}

impl<M> Default for WhereExpression<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for WhereExpression<M> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            and: self.and.clone(),
            or: self.or.clone(),
            not: self.not.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for WhereExpression<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhereExpression")
            .field("fields", &self.fields)
            .field("and", &self.and)
            .field("or", &self.or)
            .field("not", &self.not)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{IntCondition, StringCondition};

    fn record(volume: Option<i64>) -> Record {
        Record::new().with("volume", volume)
    }

    #[test]
    fn test_null_comparisons_are_unknown() {
        let gt = Predicate::compare("volume", CompareOp::Gt, 5i64);
        assert_eq!(gt.evaluate(&record(None)), None);
        assert_eq!(Predicate::not(gt.clone()).evaluate(&record(None)), None);
        assert!(!Predicate::not(gt).matches(&record(None)));
    }

    #[test]
    fn test_kleene_and_or() {
        let unknown = Predicate::compare("volume", CompareOp::Eq, 1i64);
        let row = record(None);

        assert_eq!(Predicate::And(vec![unknown.clone(), Predicate::Never]).evaluate(&row), Some(false));
        assert_eq!(Predicate::Or(vec![unknown.clone(), Predicate::Always]).evaluate(&row), Some(true));
        assert_eq!(Predicate::Or(vec![unknown, Predicate::Never]).evaluate(&row), None);
    }

    #[test]
    fn test_empty_membership_constructors() {
        assert_eq!(Predicate::in_list("volume", vec![]), Predicate::Never);
        assert_eq!(Predicate::not_in("volume", vec![]), Predicate::Always);
    }

    #[test]
    fn test_field_filter_kind_mismatch() {
        let spec = FieldSpec {
            name: "volume",
            kind: FieldKind::Int,
            nullable: false,
        };
        let filter = FieldFilter::from(StringFilter::new(StringCondition::default().equals("1")));
        let error = filter.check(&spec).unwrap_err();
        assert!(error.description().contains("int field"));

        let ok = FieldFilter::from(IntFilter::new(IntCondition::default().gt(1)));
        assert!(ok.check(&spec).is_ok());
    }
}
