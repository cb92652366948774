//! Repository contract
//!
//! Every store adapter implements [`Repository`] for each entity it holds,
//! and [`Transactional`] to run a callback inside one store-level
//! transaction.
//!
//! # Guarantees
//!
//! - `find_one`, `update_one` and `delete_one` act on the first matching row
//!   in ascending primary-key order when several rows match
//! - `upsert_one` is a single atomic operation; its `where` must pin every
//!   field of one declared unique key with an equality filter
//! - `select` narrows the returned model through [`Model::project`]: only
//!   nullable fields outside the selection are cleared. Required fields are
//!   always returned, because a typed model cannot represent their absence,
//!   so `select` is not a way to hide columns
//!
//! # Example
//!
//! ```rust,ignore
//! let users = store.repository::<User>();
//! let admins = users
//!     .find_many(
//!         FindMany::new()
//!             .filter(WhereExpression::new().field("role", EnumFilter::new(EnumCondition::default().equals("admin"))))
//!             .order_by(OrderBy::desc("created_at")),
//!     )
//!     .await?;
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use thiserror::Error;

use crate::error::{codes, DomainError};
use crate::model::{Model, OrderBy, Select};
use crate::value::{Record, ScalarValue};
use crate::pagination::Pagination;
use crate::query::WhereExpression;

/// Errors returned by repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The request was rejected before reaching the store
    #[error("invalid request: {0}")]
    Invalid(DomainError),

    /// The caller's credentials did not resolve to an active principal
    #[error("unauthorized: {0}")]
    Unauthorized(DomainError),

    /// No row matched
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The write violates a unique or referential constraint
    #[error("conflict on {entity}: {message}")]
    Conflict { entity: &'static str, message: String },

    /// A stored row could not be turned back into a model
    #[error("undecodable row: {0}")]
    Decode(DomainError),

    /// The store itself failed
    #[error("store failure: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A transaction callback asked to roll back
    #[error("transaction rolled back: {reason}")]
    Rollback { reason: String },
}

impl RepositoryError {
    pub fn not_found(entity: &'static str) -> Self {
        RepositoryError::NotFound { entity }
    }

    pub fn conflict(entity: &'static str, message: impl Into<String>) -> Self {
        RepositoryError::Conflict {
            entity,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        RepositoryError::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Store failure keeping the underlying error as source
    pub fn store_with(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        RepositoryError::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn rollback(reason: impl Into<String>) -> Self {
        RepositoryError::Rollback {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RepositoryError::Unauthorized(_))
    }

    /// Translates to the boundary error model
    ///
    /// Store failures and rollbacks have no client-facing category and
    /// return `None`.
    pub fn to_domain_error(&self) -> Option<DomainError> {
        match self {
            RepositoryError::Invalid(error)
            | RepositoryError::Unauthorized(error)
            | RepositoryError::Decode(error) => Some(error.clone()),
            RepositoryError::NotFound { entity } => Some(DomainError::not_found(
                codes::COMMON_NOT_FOUND,
                format!("{} not found", entity),
            )),
            RepositoryError::Conflict { message, .. } => {
                Some(DomainError::conflict(codes::COMMON_CONFLICT, message.clone()))
            }
            RepositoryError::Store { .. } | RepositoryError::Rollback { .. } => None,
        }
    }
}

impl From<DomainError> for RepositoryError {
    fn from(error: DomainError) -> Self {
        RepositoryError::Invalid(error)
    }
}

/// Arguments of [`Repository::find_many`]
pub struct FindMany<M> {
    pub filter: WhereExpression<M>,
    pub select: Option<Select>,
    pub order_by: OrderBy,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl<M> FindMany<M> {
    pub fn new() -> Self {
        Self {
            filter: WhereExpression::new(),
            select: None,
            order_by: OrderBy::new(),
            skip: None,
            take: None,
        }
    }

    pub fn filter(mut self, filter: WhereExpression<M>) -> Self {
        self.filter = filter;
        self
    }

    pub fn select(mut self, select: Select) -> Self {
        self.select = Some(select);
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Applies a pagination window
    pub fn window(self, window: Pagination) -> Self {
        self.skip(window.skip).take(window.take)
    }
}

impl<M> Default for FindMany<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for FindMany<M> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            select: self.select.clone(),
            order_by: self.order_by.clone(),
            skip: self.skip,
            take: self.take,
        }
    }
}

impl<M> fmt::Debug for FindMany<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindMany")
            .field("filter", &self.filter)
            .field("select", &self.select)
            .field("order_by", &self.order_by)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .finish()
    }
}

/// Uniform CRUD contract over one entity
///
/// Every `select` argument narrows the result with [`Model::project`]. It
/// clears unselected nullable fields and leaves required fields in place.
#[async_trait]
pub trait Repository<M: Model>: Send + Sync {
    /// Inserts one row and returns it
    async fn create_one(&self, data: M::Create, select: Option<Select>) -> Result<M, RepositoryError>;

    /// Inserts rows and returns how many were inserted
    async fn create_many(&self, data: Vec<M::Create>) -> Result<u64, RepositoryError>;

    async fn find_one(&self, filter: WhereExpression<M>, select: Option<Select>) -> Result<Option<M>, RepositoryError>;

    async fn find_many(&self, query: FindMany<M>) -> Result<Vec<M>, RepositoryError>;

    /// Updates the first matching row; `NotFound` if nothing matches
    async fn update_one(
        &self,
        filter: WhereExpression<M>,
        data: M::Update,
        select: Option<Select>,
    ) -> Result<M, RepositoryError>;

    /// Deletes the first matching row and returns it; `NotFound` if nothing matches
    async fn delete_one(&self, filter: WhereExpression<M>, select: Option<Select>) -> Result<M, RepositoryError>;

    /// Updates the row holding the unique key, or creates it
    async fn upsert_one(
        &self,
        filter: WhereExpression<M>,
        create: M::Create,
        update: M::Update,
        select: Option<Select>,
    ) -> Result<M, RepositoryError>;

    async fn count_many(&self, filter: WhereExpression<M>) -> Result<u64, RepositoryError>;
}

/// Callback-scoped transactions on one store
///
/// The callback receives a scope handing out repositories bound to the
/// transaction. `Ok` commits, `Err` rolls back and is returned unchanged.
#[async_trait]
pub trait Transactional: Send + Sync {
    type Scope: Send + Sync;

    async fn transaction<R, F>(&self, f: F) -> Result<R, RepositoryError>
    where
        R: Send + 'static,
        F: for<'s> FnOnce(&'s Self::Scope) -> BoxFuture<'s, Result<R, RepositoryError>> + Send + 'static;
}

/// Narrows a model to the selection, if any
pub fn apply_select<M: Model>(model: M, select: Option<&Select>) -> M {
    match select {
        Some(select) => model.project(select),
        None => model,
    }
}

/// Checks a create record against the registry
///
/// Column names must be declared, absent nullable columns become null and
/// the row is round-tripped through the model, so whatever an adapter
/// stores can be decoded again.
pub fn prepare_row<M: Model>(mut row: Record) -> Result<Record, RepositoryError> {
    let schema = M::schema();
    for (field, _) in row.iter() {
        schema.require_field(field)?;
    }
    for field in schema.fields() {
        if field.nullable && !row.contains(field.name) {
            row.set(field.name, ScalarValue::Null);
        }
    }
    let model = M::from_record(&row).map_err(RepositoryError::Invalid)?;
    Ok(model.to_record())
}

/// Checks an update record: declared columns only, and no null written to a
/// non-nullable column
pub fn check_changes<M: Model>(changes: &Record) -> Result<(), RepositoryError> {
    let schema = M::schema();
    for (field, value) in changes.iter() {
        let spec = schema.require_field(field)?;
        if value.is_null() && !spec.nullable {
            return Err(DomainError::validation(format!(
                "field '{}' of {} cannot be null",
                field,
                schema.name()
            ))
            .into());
        }
    }
    Ok(())
}
