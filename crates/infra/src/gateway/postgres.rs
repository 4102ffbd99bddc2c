//! Postgres-backed gateway collections.
//!
//! Every collection shares one JSONB document table, keyed by
//! `(collection, id)`, with an optional per-record `unique_key` column under
//! a partial unique index. Group-name uniqueness, the constraint that makes
//! the resolver's find-or-create race benign, is therefore enforced by the
//! database, not by application reads.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate id or unique key (e.g. concurrent group creation) |
//! | Database (foreign key violation) | `23503` | `Conflict` | Referential integrity violation |
//! | Database (other) | Any other | `Unavailable` | Other database errors |
//! | Io / PoolTimedOut / PoolClosed | N/A | `Unavailable` | Connectivity failures |
//! | RowNotFound | N/A | `NotFound` | Point read missed |

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use ovino_core::Record;

use super::collection::{Collection, StoreError};

/// Create the document table and its unique-key index if absent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            collection  TEXT  NOT NULL,
            id          UUID  NOT NULL,
            unique_key  TEXT,
            body        JSONB NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS records_collection_unique_key
            ON records (collection, unique_key)
            WHERE unique_key IS NOT NULL
        "#,
    )
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;

    Ok(())
}

/// One Postgres-backed collection.
///
/// Thread-safe: shares the SQLx connection pool. The [`Collection`] trait is
/// synchronous, so trait calls bridge into the ambient tokio runtime via
/// `Handle::try_current().block_on(..)`; construct and call these from within
/// a tokio runtime.
#[derive(Debug)]
pub struct PgCollection<T> {
    pool: Arc<PgPool>,
    collection: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for PgCollection<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            collection: self.collection,
            _marker: PhantomData,
        }
    }
}

impl<T> PgCollection<T>
where
    T: Record + Serialize + DeserializeOwned,
    T::Id: Copy + Into<Uuid>,
{
    pub fn new(pool: Arc<PgPool>, collection: &'static str) -> Self {
        Self {
            pool,
            collection,
            _marker: PhantomData,
        }
    }

    fn decode(body: serde_json::Value) -> Result<T, StoreError> {
        serde_json::from_value(body).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn encode(record: &T) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    #[instrument(skip(self), fields(collection = self.collection))]
    async fn list_all_async(&self) -> Result<Vec<T>, StoreError> {
        let rows = sqlx::query("SELECT body FROM records WHERE collection = $1 ORDER BY id")
            .bind(self.collection)
            .fetch_all(&*self.pool)
            .await
            .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| Self::decode(row.get::<serde_json::Value, _>("body")))
            .collect()
    }

    #[instrument(skip(self, id), fields(collection = self.collection))]
    async fn find_async(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let row = sqlx::query("SELECT body FROM records WHERE collection = $1 AND id = $2")
            .bind(self.collection)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(map_sqlx_err)?;

        row.map(|row| Self::decode(row.get::<serde_json::Value, _>("body")))
            .transpose()
    }

    #[instrument(skip(self, record), fields(collection = self.collection))]
    async fn insert_async(&self, record: T) -> Result<T, StoreError> {
        let id: Uuid = (*record.id()).into();
        sqlx::query(
            "INSERT INTO records (collection, id, unique_key, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(self.collection)
        .bind(id)
        .bind(record.unique_key())
        .bind(Self::encode(&record)?)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record)
    }

    #[instrument(skip(self, id, patch), fields(collection = self.collection))]
    async fn update_async(&self, id: Uuid, patch: T::Patch) -> Result<T, StoreError> {
        // Read-modify-write under a row lock so concurrent patches do not
        // clobber each other's fields.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let row = sqlx::query(
            "SELECT body FROM records WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(self.collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(StoreError::NotFound)?;

        let mut record = Self::decode(row.get::<serde_json::Value, _>("body"))?;
        record.apply_patch(patch);

        sqlx::query(
            "UPDATE records SET unique_key = $3, body = $4 WHERE collection = $1 AND id = $2",
        )
        .bind(self.collection)
        .bind(id)
        .bind(record.unique_key())
        .bind(Self::encode(&record)?)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(record)
    }

    #[instrument(skip(self, id), fields(collection = self.collection))]
    async fn delete_async(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
            .bind(self.collection)
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
        tokio::runtime::Handle::try_current().map_err(|_| {
            StoreError::Unavailable(
                "PgCollection requires an ambient tokio runtime".to_string(),
            )
        })
    }
}

impl<T> Collection<T> for PgCollection<T>
where
    T: Record + Serialize + DeserializeOwned,
    T::Id: Copy + Into<Uuid>,
{
    fn list_all(&self) -> Result<Vec<T>, StoreError> {
        Self::runtime_handle()?.block_on(self.list_all_async())
    }

    fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        Self::runtime_handle()?.block_on(self.find_async((*id).into()))
    }

    fn insert(&self, record: T) -> Result<T, StoreError> {
        Self::runtime_handle()?.block_on(self.insert_async(record))
    }

    fn update_by_id(&self, id: &T::Id, patch: T::Patch) -> Result<T, StoreError> {
        Self::runtime_handle()?.block_on(self.update_async((*id).into(), patch))
    }

    fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError> {
        Self::runtime_handle()?.block_on(self.delete_async((*id).into()))
    }
}

fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") | Some("23503") => StoreError::Conflict(db.message().to_string()),
            _ => StoreError::Unavailable(e.to_string()),
        },
        _ => StoreError::Unavailable(e.to_string()),
    }
}
