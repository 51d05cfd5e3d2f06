//! Periodic forced reconnect of the feed connection.

use crate::votes_logic::state::FeedConn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Closes the live feed connection every `interval_seconds`, bounding how
/// stale the watcher's option snapshot can get. Runs until the stop flag
/// is observed after a close.
pub async fn run(interval_seconds: u64, feed: FeedConn, stop_flag: Arc<AtomicBool>) {
    loop {
        sleep(Duration::from_secs(interval_seconds)).await;
        log::info!("periodic closer: closing feed connection to force reconnect");
        feed.request_close();
        log::info!("periodic closer: done closing feed connection");
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }
    }
}
