//! In-memory vote accumulation and the periodic flush policy.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Shared per-option vote accumulator.
///
/// Exactly one live table per process: the queue consumer increments it and
/// the flush tick reads and resets it, both under the same lock.
#[derive(Clone, Default)]
pub struct VoteCounts {
    inner: Arc<Mutex<HashMap<String, i64>>>,
}

impl VoteCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `option` under the lock.
    pub async fn record(&self, option: &str) {
        let mut table = self.inner.lock().await;
        let total = table.entry(option.to_string()).or_insert(0);
        *total += 1;
        log::info!("vote received: {}, total: {}", option, total);
    }

    /// Locks the table for the duration of a flush tick.
    pub async fn lock(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.inner.lock().await
    }
}

/// Runs one flush tick over a locked count table.
///
/// Calls `update` once per accumulated `(option, count)` pair. The table is
/// cleared only when every update succeeded; on any failure it is left
/// untouched in its entirety, which means entries that did land are
/// submitted again on the next tick.
pub async fn apply_counts<F, Fut, E>(table: &mut HashMap<String, i64>, mut update: F) -> bool
where
    F: FnMut(String, i64) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    if table.is_empty() {
        log::debug!("no new votes, skipping storage update");
        return true;
    }

    log::info!("updating stored results: {:?}", table);
    let mut ok = true;
    for (option, count) in table.iter() {
        if let Err(e) = update(option.clone(), *count).await {
            log::error!("failed to update result for {}: {}", option, e);
            ok = false;
        }
    }

    if ok {
        table.clear();
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn record_accumulates_per_option() {
        let counts = VoteCounts::new();
        counts.record("packers").await;
        counts.record("packers").await;
        counts.record("bengals").await;

        let table = counts.lock().await;
        assert_eq!(table.get("packers"), Some(&2));
        assert_eq!(table.get("bengals"), Some(&1));
    }

    #[tokio::test]
    async fn empty_table_skips_the_tick() {
        let mut table = HashMap::new();
        let called = Arc::new(StdMutex::new(0));

        let seen = called.clone();
        let ok = apply_counts(&mut table, move |_option, _count| {
            let seen = seen.clone();
            async move {
                *seen.lock().unwrap() += 1;
                Ok::<(), String>(())
            }
        })
        .await;

        assert!(ok);
        assert_eq!(*called.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn full_success_clears_the_table() {
        let mut table = HashMap::from([("a".to_string(), 2), ("b".to_string(), 3)]);
        let applied = Arc::new(StdMutex::new(HashMap::<String, i64>::new()));

        let sink = applied.clone();
        let ok = apply_counts(&mut table, move |option, count| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap().entry(option).or_insert(0) += count;
                Ok::<(), String>(())
            }
        })
        .await;

        assert!(ok);
        assert!(table.is_empty());
        let applied = applied.lock().unwrap();
        assert_eq!(applied.get("a"), Some(&2));
        assert_eq!(applied.get("b"), Some(&3));
    }

    #[tokio::test]
    async fn partial_failure_retains_the_whole_table() {
        let mut table = HashMap::from([("a".to_string(), 2), ("b".to_string(), 3)]);

        let ok = apply_counts(&mut table, |option, _count| async move {
            if option == "b" {
                Err("storage unavailable".to_string())
            } else {
                Ok(())
            }
        })
        .await;

        assert!(!ok);
        assert_eq!(table.get("a"), Some(&2));
        assert_eq!(table.get("b"), Some(&3));
    }

    #[tokio::test]
    async fn retried_tick_double_applies_previously_successful_options() {
        // Current contract: a tick that partially fails keeps the table
        // whole, so the next successful tick re-applies options that had
        // already landed.
        let mut table = HashMap::from([("a".to_string(), 2), ("b".to_string(), 3)]);
        let applied = Arc::new(StdMutex::new(HashMap::<String, i64>::new()));

        let sink = applied.clone();
        let first = apply_counts(&mut table, move |option, count| {
            let sink = sink.clone();
            async move {
                if option == "b" {
                    return Err("storage unavailable".to_string());
                }
                *sink.lock().unwrap().entry(option).or_insert(0) += count;
                Ok(())
            }
        })
        .await;
        assert!(!first);

        let sink = applied.clone();
        let second = apply_counts(&mut table, move |option, count| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap().entry(option).or_insert(0) += count;
                Ok::<(), String>(())
            }
        })
        .await;
        assert!(second);
        assert!(table.is_empty());

        let applied = applied.lock().unwrap();
        // "a" landed in both ticks, "b" only in the second.
        assert_eq!(applied.get("a"), Some(&4));
        assert_eq!(applied.get("b"), Some(&3));
    }
}
