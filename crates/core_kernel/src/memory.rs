//! In-memory store adapter
//!
//! Evaluates [`Predicate`]s in process over rows kept sorted by primary key.
//! It honours the same contract as the SQL adapter (tie-break order, unique
//! keys, atomic upsert, transaction rollback) and backs the tests of every
//! crate that depends on the repository layer.
//!
//! Available with the `mock` feature.
//!
//! # Locking
//!
//! Each operation takes the store lock once, so every operation, upsert
//! included, is atomic. A transaction holds the write lock for the whole
//! callback and works on a copy of the tables that replaces the originals on
//! commit. Repositories obtained from the store itself (not from the scope)
//! block until the transaction ends, so callbacks must use the scope.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::model::{IntoRecord, Model, OrderBy, Select, SortDirection};
use crate::query::{Predicate, WhereExpression};
use crate::repository::{apply_select, prepare_row, FindMany, Repository, RepositoryError, Transactional};
use crate::value::{Record, ScalarValue};

type Tables = HashMap<&'static str, Vec<Record>>;

/// A whole store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository over the committed tables
    pub fn repository<M: Model>(&self) -> MemoryRepository<'static, M> {
        MemoryRepository {
            backing: Backing::Store(self.clone()),
            _model: PhantomData,
        }
    }

    /// Committed rows of an entity, in primary-key order
    pub async fn rows<M: Model>(&self) -> Vec<Record> {
        let tables = self.tables.read().await;
        tables.get(M::schema().table()).cloned().unwrap_or_default()
    }
}

/// Transaction scope of a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryScope {
    working: Mutex<Tables>,
}

impl MemoryScope {
    /// A repository bound to this transaction
    pub fn repository<M: Model>(&self) -> MemoryRepository<'_, M> {
        MemoryRepository {
            backing: Backing::Scope(self),
            _model: PhantomData,
        }
    }

    fn into_tables(self) -> Result<Tables, RepositoryError> {
        self.working
            .into_inner()
            .map_err(|_| RepositoryError::store("transaction scope lock poisoned"))
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    type Scope = MemoryScope;

    async fn transaction<R, F>(&self, f: F) -> Result<R, RepositoryError>
    where
        R: Send + 'static,
        F: for<'s> FnOnce(&'s Self::Scope) -> BoxFuture<'s, Result<R, RepositoryError>> + Send + 'static,
    {
        let mut committed = self.tables.write().await;
        let scope = MemoryScope {
            working: Mutex::new(committed.clone()),
        };

        let outcome = f(&scope).await;
        match outcome {
            Ok(value) => {
                *committed = scope.into_tables()?;
                Ok(value)
            }
            // Dropping the scope discards the working copy
            Err(error) => Err(error),
        }
    }
}

#[derive(Debug, Clone)]
enum Backing<'a> {
    Store(MemoryStore),
    Scope(&'a MemoryScope),
}

impl Backing<'_> {
    async fn read<R>(&self, f: impl FnOnce(&Tables) -> R + Send) -> Result<R, RepositoryError> {
        match self {
            Backing::Store(store) => {
                let tables = store.tables.read().await;
                Ok(f(&tables))
            }
            Backing::Scope(scope) => {
                let tables = scope
                    .working
                    .lock()
                    .map_err(|_| RepositoryError::store("transaction scope lock poisoned"))?;
                Ok(f(&tables))
            }
        }
    }

    async fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R + Send) -> Result<R, RepositoryError> {
        match self {
            Backing::Store(store) => {
                let mut tables = store.tables.write().await;
                Ok(f(&mut tables))
            }
            Backing::Scope(scope) => {
                let mut tables = scope
                    .working
                    .lock()
                    .map_err(|_| RepositoryError::store("transaction scope lock poisoned"))?;
                Ok(f(&mut tables))
            }
        }
    }
}

/// Repository of one entity over a [`MemoryStore`] or a [`MemoryScope`]
#[derive(Debug, Clone)]
pub struct MemoryRepository<'a, M> {
    backing: Backing<'a>,
    _model: PhantomData<fn() -> M>,
}

#[async_trait]
impl<'a, M: Model> Repository<M> for MemoryRepository<'a, M> {
    async fn create_one(&self, data: M::Create, select: Option<Select>) -> Result<M, RepositoryError> {
        let model = self
            .backing
            .write(|tables| {
                let row = table::normalise::<M>(data.into_record())?;
                table::insert::<M>(table::rows_mut::<M>(tables), row.clone())?;
                table::decode::<M>(&row)
            })
            .await??;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn create_many(&self, data: Vec<M::Create>) -> Result<u64, RepositoryError> {
        self.backing
            .write(|tables| {
                // Validate everything first so a failure inserts nothing
                let mut staged = table::rows_mut::<M>(tables).clone();
                let mut count = 0u64;
                for item in data {
                    let row = table::normalise::<M>(item.into_record())?;
                    table::insert::<M>(&mut staged, row)?;
                    count += 1;
                }
                *table::rows_mut::<M>(tables) = staged;
                Ok::<_, RepositoryError>(count)
            })
            .await?
    }

    async fn find_one(&self, filter: WhereExpression<M>, select: Option<Select>) -> Result<Option<M>, RepositoryError> {
        let predicate = filter.compose()?;
        let found = self
            .backing
            .read(|tables| {
                table::rows::<M>(tables)
                    .iter()
                    .find(|row| predicate.matches(row))
                    .map(table::decode::<M>)
                    .transpose()
            })
            .await??;
        Ok(found.map(|model| apply_select(model, select.as_ref())))
    }

    async fn find_many(&self, query: FindMany<M>) -> Result<Vec<M>, RepositoryError> {
        let predicate = query.filter.compose()?;
        query.order_by.validate(M::schema())?;

        let rows = self
            .backing
            .read(|tables| table::select_rows::<M>(tables, &predicate, &query.order_by, query.skip, query.take))
            .await?;
        rows.iter()
            .map(|row| table::decode::<M>(row).map(|model| apply_select(model, query.select.as_ref())))
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
        let model = self
            .backing
            .write(|tables| {
                let rows = table::rows_mut::<M>(tables);
                let index = rows
                    .iter()
                    .position(|row| predicate.matches(row))
                    .ok_or_else(|| RepositoryError::not_found(M::schema().name()))?;
                let row = table::update_at::<M>(rows, index, &changes)?;
                table::decode::<M>(&row)
            })
            .await??;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn delete_one(&self, filter: WhereExpression<M>, select: Option<Select>) -> Result<M, RepositoryError> {
        let predicate = filter.compose()?;
        let model = self
            .backing
            .write(|tables| {
                let rows = table::rows_mut::<M>(tables);
                let index = rows
                    .iter()
                    .position(|row| predicate.matches(row))
                    .ok_or_else(|| RepositoryError::not_found(M::schema().name()))?;
                let row = rows.remove(index);
                table::decode::<M>(&row)
            })
            .await??;
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
        let changes = update.into_record();
        let model = self
            .backing
            .write(|tables| {
                let rows = table::rows_mut::<M>(tables);
                let existing = rows.iter().position(|row| {
                    key.iter()
                        .all(|(field, value)| row.get(field).compare(value) == Some(Ordering::Equal))
                });
                let row = match existing {
                    Some(index) => table::update_at::<M>(rows, index, &changes)?,
                    None => {
                        let mut data = create.into_record();
                        for (field, value) in &key {
                            data.set(*field, value.clone());
                        }
                        let row = table::normalise::<M>(data)?;
                        table::insert::<M>(rows, row.clone())?;
                        row
                    }
                };
                table::decode::<M>(&row)
            })
            .await??;
        Ok(apply_select(model, select.as_ref()))
    }

    async fn count_many(&self, filter: WhereExpression<M>) -> Result<u64, RepositoryError> {
        let predicate = filter.compose()?;
        self.backing
            .read(|tables| {
                let count = table::rows::<M>(tables).iter().filter(|row| predicate.matches(row)).count();
                count as u64
            })
            .await
    }
}

/// Row-level operations shared by store and scope repositories
mod table {
    use super::*;

    pub(super) fn rows<M: Model>(tables: &Tables) -> &[Record] {
        tables.get(M::schema().table()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(super) fn rows_mut<M: Model>(tables: &mut Tables) -> &mut Vec<Record> {
        tables.entry(M::schema().table()).or_default()
    }

    pub(super) fn decode<M: Model>(row: &Record) -> Result<M, RepositoryError> {
        M::from_record(row).map_err(RepositoryError::Decode)
    }

    pub(super) fn normalise<M: Model>(row: Record) -> Result<Record, RepositoryError> {
        prepare_row::<M>(row)
    }

    /// Orders cells the way Postgres does: nulls after every value
    pub(super) fn cell_order(a: &ScalarValue, b: &ScalarValue) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
        }
    }

    fn check_unique<M: Model>(rows: &[Record], candidate: &Record, skip: Option<usize>) -> Result<(), RepositoryError> {
        let schema = M::schema();
        for key in schema.unique_keys() {
            // A key with a null part never conflicts
            if key.iter().any(|field| candidate.get(field).is_null()) {
                continue;
            }
            let clash = rows.iter().enumerate().any(|(i, row)| {
                Some(i) != skip
                    && key
                        .iter()
                        .all(|field| row.get(field).compare(candidate.get(field)) == Some(Ordering::Equal))
            });
            if clash {
                return Err(RepositoryError::conflict(
                    schema.name(),
                    format!("duplicate value for unique key ({})", key.join(", ")),
                ));
            }
        }
        Ok(())
    }

    /// Inserts keeping the primary-key order
    pub(super) fn insert<M: Model>(rows: &mut Vec<Record>, row: Record) -> Result<(), RepositoryError> {
        check_unique::<M>(rows, &row, None)?;
        let pk = M::schema().primary_key().name;
        let index = rows.partition_point(|existing| cell_order(existing.get(pk), row.get(pk)) == Ordering::Less);
        rows.insert(index, row);
        Ok(())
    }

    /// Applies changes to the row at `index` and returns the stored result
    pub(super) fn update_at<M: Model>(rows: &mut Vec<Record>, index: usize, changes: &Record) -> Result<Record, RepositoryError> {
        let mut row = rows[index].clone();
        row.merge(changes);
        let row = normalise::<M>(row)?;
        check_unique::<M>(rows, &row, Some(index))?;
        rows.remove(index);
        insert::<M>(rows, row.clone())?;
        Ok(row)
    }

    pub(super) fn select_rows<M: Model>(
        tables: &Tables,
        predicate: &Predicate,
        order_by: &OrderBy,
        skip: Option<u64>,
        take: Option<u64>,
    ) -> Vec<Record> {
        let mut matched: Vec<&Record> = rows::<M>(tables).iter().filter(|row| predicate.matches(row)).collect();
        // Stable sort over primary-key order keeps the key as final tie-break
        matched.sort_by(|a, b| {
            order_by
                .iter()
                .map(|(field, direction)| {
                    let ordering = cell_order(a.get(field), b.get(field));
                    match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let skip = skip.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
        let take = take.map_or(usize::MAX, |t| usize::try_from(t).unwrap_or(usize::MAX));
        matched.into_iter().skip(skip).take(take).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::filter::{IntCondition, IntFilter, StringCondition, StringFilter};
    use crate::model::EntitySchema;
    use once_cell::sync::Lazy;

    static TICK_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
        EntitySchema::builder("Tick", "ticks")
            .string("id")
            .string("venue")
            .int("seq")
            .nullable_string("tag")
            .unique(&["venue", "tag"])
            .build()
    });

    #[derive(Debug, Clone, PartialEq)]
    struct Tick {
        id: String,
        venue: String,
        seq: i64,
        tag: Option<String>,
    }

    fn tick(id: &str, venue: &str, seq: i64, tag: Option<&str>) -> Tick {
        Tick {
            id: id.to_string(),
            venue: venue.to_string(),
            seq,
            tag: tag.map(str::to_string),
        }
    }

    impl IntoRecord for Tick {
        fn into_record(self) -> Record {
            self.to_record()
        }
    }

    impl Model for Tick {
        type Create = Tick;
        type Update = Record;

        fn schema() -> &'static EntitySchema {
            &TICK_SCHEMA
        }

        fn to_record(&self) -> Record {
            Record::new()
                .with("id", self.id.clone())
                .with("venue", self.venue.clone())
                .with("seq", self.seq)
                .with("tag", self.tag.clone())
        }

        fn from_record(record: &Record) -> Result<Self, DomainError> {
            Ok(Self {
                id: record.required("id")?,
                venue: record.required("venue")?,
                seq: record.required("seq")?,
                tag: record.optional("tag")?,
            })
        }
    }

    fn venue(name: &str) -> WhereExpression<Tick> {
        WhereExpression::new().field("venue", StringFilter::new(StringCondition::default().equals(name)))
    }

    fn id(value: &str) -> WhereExpression<Tick> {
        WhereExpression::new().field("id", StringFilter::new(StringCondition::default().equals(value)))
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .repository::<Tick>()
            .create_many(vec![
                tick("t3", "xnys", 3, None),
                tick("t1", "xnys", 1, Some("open")),
                tick("t2", "xlon", 2, None),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_rows_are_kept_in_primary_key_order() {
        let store = seeded().await;
        let ids: Vec<String> = store.rows::<Tick>().await.iter().map(|r| r.get("id").to_string()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_find_one_takes_lowest_primary_key() {
        let store = seeded().await;
        let found = store.repository::<Tick>().find_one(venue("xnys"), None).await.unwrap();
        assert_eq!(found.unwrap().id, "t1");
    }

    #[tokio::test]
    async fn test_update_and_delete_act_on_first_match() {
        let store = seeded().await;
        let repo = store.repository::<Tick>();

        let updated = repo
            .update_one(venue("xnys"), Record::new().with("seq", 10i64), None)
            .await
            .unwrap();
        assert_eq!((updated.id.as_str(), updated.seq), ("t1", 10));

        let deleted = repo.delete_one(venue("xnys"), None).await.unwrap();
        assert_eq!(deleted.id, "t1");
        assert_eq!(repo.count_many(WhereExpression::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_without_match_is_not_found() {
        let store = seeded().await;
        let error = store
            .repository::<Tick>()
            .update_one(venue("xpar"), Record::new().with("seq", 1i64), None)
            .await
            .unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_update_rejects_undeclared_columns() {
        let store = seeded().await;
        let error = store
            .repository::<Tick>()
            .update_one(id("t1"), Record::new().with("price", 1.0), None)
            .await
            .unwrap_err();
        assert!(matches!(error, RepositoryError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_unique_key_conflict_and_null_parts() {
        let store = seeded().await;
        let repo = store.repository::<Tick>();

        let clash = repo.create_one(tick("t9", "xnys", 9, Some("open")), None).await.unwrap_err();
        assert!(clash.is_conflict());

        // Null tags never clash
        repo.create_one(tick("t8", "xlon", 8, None), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_many_is_all_or_nothing() {
        let store = seeded().await;
        let error = store
            .repository::<Tick>()
            .create_many(vec![tick("t4", "xpar", 4, None), tick("t1", "xpar", 5, None)])
            .await
            .unwrap_err();
        assert!(error.is_conflict());
        assert_eq!(store.rows::<Tick>().await.len(), 3);
    }

    #[tokio::test]
    async fn test_order_by_puts_nulls_last_then_breaks_ties_by_key() {
        let store = seeded().await;
        let repo = store.repository::<Tick>();

        let ascending = repo.find_many(FindMany::new().order_by(OrderBy::asc("tag"))).await.unwrap();
        let ids: Vec<&str> = ascending.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);

        let descending = repo.find_many(FindMany::new().order_by(OrderBy::desc("tag"))).await.unwrap();
        let ids: Vec<&str> = descending.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3", "t1"]);
    }

    #[tokio::test]
    async fn test_find_many_window() {
        let store = seeded().await;
        let page = store
            .repository::<Tick>()
            .find_many(FindMany::new().order_by(OrderBy::desc("seq")).skip(1).take(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "t2");
    }

    #[tokio::test]
    async fn test_select_clears_unselected_nullable_fields() {
        let store = seeded().await;
        let found = store
            .repository::<Tick>()
            .find_one(id("t1"), Some(Select::fields(["id"])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tag, None);
        assert_eq!(found.venue, "xnys");
    }

    #[tokio::test]
    async fn test_upsert_updates_then_creates() {
        let store = seeded().await;
        let repo = store.repository::<Tick>();

        let updated = repo
            .upsert_one(id("t2"), tick("t2", "xlon", 0, None), Record::new().with("seq", 20i64), None)
            .await
            .unwrap();
        assert_eq!(updated.seq, 20);

        // Key fields of the created row come from the where clause
        let created = repo
            .upsert_one(id("t7"), tick("ignored", "xhkg", 7, None), Record::new(), None)
            .await
            .unwrap();
        assert_eq!(created.id, "t7");
        assert_eq!(repo.count_many(WhereExpression::new()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_upsert_requires_a_unique_key() {
        let store = seeded().await;
        let error = store
            .repository::<Tick>()
            .upsert_one(venue("xnys"), tick("t5", "xnys", 5, None), Record::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(error, RepositoryError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_transaction_commits_on_ok() {
        let store = seeded().await;
        store
            .transaction(|scope: &MemoryScope| {
                Box::pin(async move {
                    let repo = scope.repository::<Tick>();
                    repo.create_one(tick("t4", "xpar", 4, None), None).await?;
                    repo.delete_one(id("t2"), None).await?;
                    Ok::<_, RepositoryError>(())
                })
            })
            .await
            .unwrap();

        let seqs = IntFilter::new(IntCondition::default().in_list([2, 4]));
        let left = store
            .repository::<Tick>()
            .find_many(FindMany::new().filter(WhereExpression::new().field("seq", seqs)))
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "t4");
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_err() {
        let store = seeded().await;
        let error = store
            .transaction(|scope: &MemoryScope| {
                Box::pin(async move {
                    scope.repository::<Tick>().create_one(tick("t4", "xpar", 4, None), None).await?;
                    Err::<(), _>(RepositoryError::rollback("abort"))
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(error, RepositoryError::Rollback { .. }));
        assert_eq!(store.rows::<Tick>().await.len(), 3);
    }
}
