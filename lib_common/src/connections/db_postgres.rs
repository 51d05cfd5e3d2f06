//! # PostgreSQL Poll Store
//!
//! Pooled access to the `polls` table shared by all three services: the
//! option snapshot for the feed watcher, the per-option result increments
//! for the counter, and the CRUD surface for the api server.

use deadpool_postgres::{Config as DeadpoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio_postgres::NoTls;

/// Custom error types for poll store operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to build database pool: {0}")]
    Pool(String),
    #[error("failed to check out a connection: {0}")]
    Checkout(#[from] deadpool_postgres::PoolError),
    #[error("query execution failed: {0}")]
    Query(#[from] tokio_postgres::Error),
    #[error("failed to decode poll row: {0}")]
    Decode(String),
}

/// One stored poll. `results` maps option text to its accumulated count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<HashMap<String, i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
}

/// A wrapper around the PostgreSQL connection pool.
#[derive(Clone)]
pub struct PollStore {
    pool: Pool,
}

impl PollStore {
    /// Builds the connection pool for the given database URL. Connections
    /// are checked out lazily, so an unreachable server surfaces on first
    /// use (or via [`PollStore::ping`]), not here.
    pub fn connect(db_url: &str) -> Result<Self, DbError> {
        let mut cfg = DeadpoolConfig::new();
        cfg.url = Some(db_url.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DbError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Checks the health of the database connection by running a simple query.
    pub async fn ping(&self) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Creates the polls table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS polls (
                     id      TEXT PRIMARY KEY,
                     title   TEXT NOT NULL,
                     options TEXT[] NOT NULL DEFAULT '{}',
                     results JSONB,
                     apikey  TEXT
                 )",
            )
            .await?;
        Ok(())
    }

    /// Returns the option texts of every stored poll, flattened.
    ///
    /// Storage trouble is never fatal to callers of this snapshot; it logs
    /// a warning and hands back an empty set instead.
    pub async fn load_options(&self) -> Vec<String> {
        match self.query_options().await {
            Ok(options) => {
                if options.is_empty() {
                    log::warn!("no poll options found in database");
                } else {
                    log::info!("loaded {} poll options", options.len());
                }
                options
            }
            Err(e) => {
                log::warn!("failed to load poll options: {}", e);
                Vec::new()
            }
        }
    }

    async fn query_options(&self) -> Result<Vec<String>, DbError> {
        let client = self.pool.get().await?;
        let rows = client.query("SELECT options FROM polls", &[]).await?;
        let mut options = Vec::new();
        for row in rows {
            let poll_options: Vec<String> = row.try_get(0)?;
            options.extend(poll_options);
        }
        Ok(options)
    }

    /// Adds `by` to the stored result for `option` on every poll whose
    /// option set contains it. Returns the number of polls touched.
    pub async fn increment_result(&self, option: &str, by: i64) -> Result<u64, DbError> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE polls
                    SET results = jsonb_set(
                        COALESCE(results, '{}'::jsonb),
                        ARRAY[$1],
                        to_jsonb(COALESCE((results ->> $1)::bigint, 0) + $2),
                        true)
                  WHERE $1 = ANY (options)",
                &[&option, &by],
            )
            .await?;
        Ok(updated)
    }

    pub async fn list_polls(&self) -> Result<Vec<Poll>, DbError> {
        let client = self.pool.get().await?;
        let rows = client
            .query("SELECT id, title, options, results, apikey FROM polls", &[])
            .await?;
        rows.iter().map(poll_from_row).collect()
    }

    pub async fn get_poll(&self, id: &str) -> Result<Option<Poll>, DbError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, title, options, results, apikey FROM polls WHERE id = $1",
                &[&id],
            )
            .await?;
        row.as_ref().map(poll_from_row).transpose()
    }

    pub async fn create_poll(
        &self,
        title: &str,
        options: &[String],
        apikey: Option<&str>,
    ) -> Result<Poll, DbError> {
        let client = self.pool.get().await?;
        let id = uuid::Uuid::new_v4().to_string();
        client
            .execute(
                "INSERT INTO polls (id, title, options, apikey) VALUES ($1, $2, $3, $4)",
                &[&id, &title, &options, &apikey],
            )
            .await?;
        Ok(Poll {
            id,
            title: title.to_string(),
            options: options.to_vec(),
            results: None,
            apikey: apikey.map(str::to_string),
        })
    }

    /// Deletes the poll with the given id, reporting whether it existed.
    pub async fn delete_poll(&self, id: &str) -> Result<bool, DbError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM polls WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}

fn poll_from_row(row: &tokio_postgres::Row) -> Result<Poll, DbError> {
    let results: Option<serde_json::Value> = row.try_get("results")?;
    let results = match results {
        Some(value) => {
            Some(serde_json::from_value(value).map_err(|e| DbError::Decode(e.to_string()))?)
        }
        None => None,
    };
    Ok(Poll {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        options: row.try_get("options")?,
        results,
        apikey: row.try_get("apikey")?,
    })
}
