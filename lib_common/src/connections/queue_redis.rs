//! # Redis Stream Vote Queue
//!
//! The durable hand-off between vote detection and vote counting. Votes are
//! appended to a stream (one raw option name per entry) and consumed through
//! a named consumer group, giving at-least-once delivery.

use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Stream key carrying detected votes.
pub const VOTES_STREAM: &str = "votes";

/// Field under which the option name travels in each stream entry.
const BODY_FIELD: &str = "vote";

/// How long a single consumer-group read blocks waiting for entries.
const READ_BLOCK_MS: usize = 5_000;

/// Entries fetched per consumer-group read.
const READ_COUNT: usize = 32;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue connection failed: {0}")]
    Connect(redis::RedisError),
    #[error("queue command failed: {0}")]
    Command(#[from] redis::RedisError),
}

/// A handle to the vote stream, cheap to clone.
#[derive(Clone)]
pub struct VoteQueue {
    conn: ConnectionManager,
    stream: String,
}

impl VoteQueue {
    /// Connects to the broker behind a managed, auto-reconnecting connection.
    pub async fn connect(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Connect)?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(QueueError::Connect)?;
        Ok(Self {
            conn,
            stream: VOTES_STREAM.to_string(),
        })
    }

    /// Appends one vote payload to the stream.
    pub async fn publish(&self, body: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: String = conn.xadd(&self.stream, "*", &[(BODY_FIELD, body)]).await?;
        Ok(())
    }

    /// Creates the consumer group when it does not exist yet.
    pub async fn ensure_group(&self, group: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let created: Result<String, redis::RedisError> =
            conn.xgroup_create_mkstream(&self.stream, group, "$").await;
        match created {
            Ok(_) => Ok(()),
            // The group surviving from an earlier run is not an error.
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the stream through `group` until `token` fires, handing every
    /// delivered body to `handle` and acknowledging it afterwards. Read
    /// failures are logged and retried.
    pub async fn consume<F, Fut>(
        self,
        group: &str,
        consumer: &str,
        token: CancellationToken,
        mut handle: F,
    ) where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .block(READ_BLOCK_MS)
            .count(READ_COUNT);

        loop {
            let mut conn = self.conn.clone();
            let streams = [&self.stream];
            let ids = [">"];
            let read = tokio::select! {
                _ = token.cancelled() => break,
                read = conn.xread_options::<_, _, StreamReadReply>(&streams, &ids, &opts) => read,
            };

            let reply = match read {
                Ok(reply) => reply,
                Err(e) => {
                    log::error!("queue read failed: {}", e);
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                    continue;
                }
            };

            for key in reply.keys {
                for entry in key.ids {
                    match entry.get::<String>(BODY_FIELD) {
                        Some(body) => handle(body).await,
                        None => log::warn!("dropping malformed queue entry {}", entry.id),
                    }
                    let mut conn = self.conn.clone();
                    if let Err(e) = conn
                        .xack::<_, _, _, i64>(&self.stream, group, &[&entry.id])
                        .await
                    {
                        log::error!("failed to ack queue entry {}: {}", entry.id, e);
                    }
                }
            }
        }
        log::info!("queue consumer stopped");
    }
}
