//! PostgreSQL implementation of the repository contract
//!
//! A [`PgStore`] wraps the pool of one store. Its repositories run each
//! operation as a single statement on a pooled connection; repositories
//! handed out by a [`PgScope`] run on the scope's transaction instead.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Transaction};
use std::fmt;
use std::marker::PhantomData;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use core_kernel::repository::{apply_select, check_changes, prepare_row};
use core_kernel::{
    FindMany, IntoRecord, Model, Record, Repository, RepositoryError, Select, Transactional,
    WhereExpression,
};

use crate::error::DatabaseError;
use crate::sql::{self, Sql};

/// One PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    name: &'static str,
    pool: PgPool,
}

impl PgStore {
    pub fn new(name: &'static str, pool: PgPool) -> Self {
        Self { name, pool }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A repository running on pooled connections
    pub fn repository<M: Model>(&self) -> PgRepository<'static, M> {
        PgRepository {
            connection: Connection::Pool(self.pool.clone()),
            _model: PhantomData,
        }
    }
}

/// Transaction scope of a [`PgStore`]
///
/// Owns the transaction's connection; repositories from the scope take
/// turns on it.
pub struct PgScope {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl fmt::Debug for PgScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgScope").finish_non_exhaustive()
    }
}

impl PgScope {
    /// A repository bound to this transaction
    pub fn repository<M: Model>(&self) -> PgRepository<'_, M> {
        PgRepository {
            connection: Connection::Scope(self),
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl Transactional for PgStore {
    type Scope = PgScope;

    async fn transaction<R, F>(&self, f: F) -> Result<R, RepositoryError>
    where
        R: Send + 'static,
        F: for<'s> FnOnce(&'s Self::Scope) -> BoxFuture<'s, Result<R, RepositoryError>> + Send + 'static,
    {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        let scope = PgScope { tx: Mutex::new(tx) };

        let outcome = f(&scope).await;
        let tx = scope.tx.into_inner();
        match outcome {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
                debug!(store = self.name, "Transaction committed");
                Ok(value)
            }
            Err(error) => {
                warn!(store = self.name, error = %error, "Rolling back transaction");
                if let Err(rollback) = tx.rollback().await {
                    warn!(store = self.name, error = %rollback, "Rollback failed");
                }
                Err(error)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Connection<'a> {
    Pool(PgPool),
    Scope(&'a PgScope),
}

impl Connection<'_> {
    async fn fetch_all(&self, mut sql: Sql) -> Result<Vec<PgRow>, sqlx::Error> {
        let query = sql.build();
        match self {
            Connection::Pool(pool) => query.fetch_all(pool).await,
            Connection::Scope(scope) => {
                let mut tx = scope.tx.lock().await;
                query.fetch_all(&mut **tx).await
            }
        }
    }

    async fn fetch_optional(&self, mut sql: Sql) -> Result<Option<PgRow>, sqlx::Error> {
        let query = sql.build();
        match self {
            Connection::Pool(pool) => query.fetch_optional(pool).await,
            Connection::Scope(scope) => {
                let mut tx = scope.tx.lock().await;
                query.fetch_optional(&mut **tx).await
            }
        }
    }

    async fn fetch_count(&self, mut sql: Sql) -> Result<i64, sqlx::Error> {
        let query = sql.build_query_scalar::<i64>();
        match self {
            Connection::Pool(pool) => query.fetch_one(pool).await,
            Connection::Scope(scope) => {
                let mut tx = scope.tx.lock().await;
                query.fetch_one(&mut **tx).await
            }
        }
    }

    /// Runs statements atomically and sums the affected rows
    async fn execute_all(&self, statements: Vec<Sql>) -> Result<u64, sqlx::Error> {
        match self {
            Connection::Pool(pool) => {
                let mut tx = pool.begin().await?;
                let mut affected = 0;
                for mut sql in statements {
                    affected += sql.build().execute(&mut *tx).await?.rows_affected();
                }
                tx.commit().await?;
                Ok(affected)
            }
            Connection::Scope(scope) => {
                let mut tx = scope.tx.lock().await;
                let mut affected = 0;
                for mut sql in statements {
                    affected += sql.build().execute(&mut **tx).await?.rows_affected();
                }
                Ok(affected)
            }
        }
    }
}

/// Repository of one entity over a [`PgStore`] or a [`PgScope`]
#[derive(Debug, Clone)]
pub struct PgRepository<'a, M> {
    connection: Connection<'a>,
    _model: PhantomData<fn() -> M>,
}

fn store_error<M: Model>(error: sqlx::Error) -> RepositoryError {
    DatabaseError::from(error).into_repository_error(M::schema().name())
}

fn decode<M: Model>(row: &PgRow) -> Result<M, RepositoryError> {
    let record = sql::decode_row(M::schema(), row).map_err(|e| e.into_repository_error(M::schema().name()))?;
    M::from_record(&record).map_err(RepositoryError::Decode)
}

fn trace<M: Model>(operation: &'static str, sql: &Sql) {
    debug!(entity = M::schema().name(), operation, sql = sql.sql(), "Executing statement");
}

impl<M: Model> PgRepository<'_, M> {
    /// Runs a statement returning at most one row; `NotFound` when empty
    async fn returning_one(&self, operation: &'static str, sql: Sql) -> Result<M, RepositoryError> {
        trace::<M>(operation, &sql);
        let row = self
            .connection
            .fetch_optional(sql)
            .await
            .map_err(store_error::<M>)?
            .ok_or_else(|| RepositoryError::not_found(M::schema().name()))?;
        decode::<M>(&row)
    }
}

#[async_trait]
impl<'a, M: Model> Repository<M> for PgRepository<'a, M> {
    async fn create_one(&self, data: M::Create, select: Option<Select>) -> Result<M, RepositoryError> {
        let row = prepare_row::<M>(data.into_record())?;
        let statement = sql::insert(M::schema(), std::slice::from_ref(&row), true)
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::store("empty insert"))?;
        let model = self.returning_one("create_one", statement).await?;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn create_many(&self, data: Vec<M::Create>) -> Result<u64, RepositoryError> {
        if data.is_empty() {
            return Ok(0);
        }
        let rows = data
            .into_iter()
            .map(|item| prepare_row::<M>(item.into_record()))
            .collect::<Result<Vec<Record>, _>>()?;
        let statements = sql::insert(M::schema(), &rows, false);
        if let Some(first) = statements.first() {
            trace::<M>("create_many", first);
        }
        self.connection.execute_all(statements).await.map_err(store_error::<M>)
    }

    async fn find_one(&self, filter: WhereExpression<M>, select: Option<Select>) -> Result<Option<M>, RepositoryError> {
        let predicate = filter.compose()?;
        let statement = sql::select(M::schema(), &predicate, &Default::default(), None, Some(1))?;
        trace::<M>("find_one", &statement);
        let row = self.connection.fetch_optional(statement).await.map_err(store_error::<M>)?;
        row.map(|row| decode::<M>(&row).map(|model| apply_select(model, select.as_ref())))
            .transpose()
    }

    async fn find_many(&self, query: FindMany<M>) -> Result<Vec<M>, RepositoryError> {
        let predicate = query.filter.compose()?;
        query.order_by.validate(M::schema())?;
        let statement = sql::select(M::schema(), &predicate, &query.order_by, query.skip, query.take)?;
        trace::<M>("find_many", &statement);
        let rows = self.connection.fetch_all(statement).await.map_err(store_error::<M>)?;
        rows.iter()
            .map(|row| decode::<M>(row).map(|model| apply_select(model, query.select.as_ref())))
            .collect()
    }

    async fn update_one(
        &self,
        filter: WhereExpression<M>,
        data: M::Update,
        select: Option<Select>,
    ) -> Result<M, RepositoryError> {
        let predicate = filter.compose()?;
        let changes = data.into_record();
        check_changes::<M>(&changes)?;
        let statement = sql::update(M::schema(), &changes, &predicate)?;
        let model = self.returning_one("update_one", statement).await?;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn delete_one(&self, filter: WhereExpression<M>, select: Option<Select>) -> Result<M, RepositoryError> {
        let predicate = filter.compose()?;
        let statement = sql::delete(M::schema(), &predicate)?;
        let model = self.returning_one("delete_one", statement).await?;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn upsert_one(
        &self,
        filter: WhereExpression<M>,
        create: M::Create,
        update: M::Update,
        select: Option<Select>,
    ) -> Result<M, RepositoryError> {
        let key = filter.unique_key()?;
        let mut data = create.into_record();
        for (field, value) in &key {
            data.set(*field, value.clone());
        }
        let row = prepare_row::<M>(data)?;
        let changes = update.into_record();
        check_changes::<M>(&changes)?;

        let key_fields: Vec<&str> = key.iter().map(|(field, _)| *field).collect();
        let statement = sql::upsert(M::schema(), &row, &key_fields, &changes)?;
        let model = self.returning_one("upsert_one", statement).await?;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn count_many(&self, filter: WhereExpression<M>) -> Result<u64, RepositoryError> {
        let predicate = filter.compose()?;
        let statement = sql::count(M::schema(), &predicate)?;
        trace::<M>("count_many", &statement);
        let count = self.connection.fetch_count(statement).await.map_err(store_error::<M>)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
