//! Core Kernel - Generic filter, query and repository layer
//!
//! This crate provides the building blocks every store adapter and entity
//! crate shares:
//! - Scalar filter types and the where-expression composer
//! - Validation of untrusted JSON into typed filters and queries
//! - The page-to-window pagination transform
//! - The repository contract and its in-memory reference adapter
//! - The domain error and success-or-error result model

pub mod error;
pub mod filter;
pub mod identifiers;
pub mod model;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod result;
pub mod schema;
pub mod value;

#[cfg(any(test, feature = "mock"))]
pub mod memory;

pub use error::{codes, DomainError, ErrorKind, ErrorResponse};
pub use filter::{
    BooleanCondition, BooleanFilter, DateTimeCondition, DateTimeFilter, EnumCondition,
    EnumFilter, Filter, FloatCondition, FloatFilter, IntCondition, IntFilter, StringCondition,
    StringFilter,
};
pub use identifiers::{AssetId, QuoteId, UserId};
pub use model::{
    EntitySchema, FieldKind, FieldSpec, FromScalar, IntoRecord, Model, OrderBy, Select,
    SortDirection,
};
pub use pagination::{PageRequest, Pagination, PaginationConfig};
pub use query::{CompareOp, FieldFilter, Predicate, TextOp, WhereExpression};
pub use repository::{FindMany, Repository, RepositoryError, Transactional};
pub use result::ActionResult;
pub use schema::{Path, Schema};
pub use value::{Record, ScalarValue};
