//! # Chat Vote Watcher
//!
//! Watches the live chat feed for mentions of poll options and republishes
//! every detected vote onto the durable queue. The feed connection runs
//! under a supervisor with fixed-delay reconnects, plus a periodic forced
//! reconnect that keeps the option snapshot from going stale.

mod votes_logic;

use anyhow::Result;
use lib_common::{PollStore, VoteQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use votes_logic::state::FeedConn;
use votes_logic::{config, monitor, publisher, upstream};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    lib_common::loggers::setup_logging("server_votes", config.log_dir(), config.log_level())?;

    let store = PollStore::connect(config.db_url())?;
    if let Err(e) = store.ping().await {
        log::warn!("poll store unreachable: {}", e);
        log::warn!("continuing without poll options until it comes back");
    }

    let queue = VoteQueue::connect(config.redis_url()).await?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let (watcher_stopped_tx, mut watcher_stopped_rx) = mpsc::channel(1);
    let (publisher_stopped_tx, mut publisher_stopped_rx) = mpsc::channel(1);
    let (votes_tx, votes_rx) = mpsc::unbounded_channel();
    let feed = FeedConn::new();

    tokio::spawn(publisher::drain(
        votes_rx,
        move |vote| {
            let queue = queue.clone();
            async move { queue.publish(&vote).await }
        },
        publisher_stopped_tx,
    ));

    // The supervisor owns the producing side of the vote hand-off, so its
    // exit is what lets the publisher drain out and finish.
    tokio::spawn(upstream::run(
        config.clone(),
        store,
        feed.clone(),
        votes_tx,
        stop_rx,
        watcher_stopped_tx,
    ));

    tokio::spawn(monitor::run(
        config.force_close_interval_seconds(),
        feed.clone(),
        stop_flag.clone(),
    ));

    shutdown_signal().await;
    log::info!("Stopping...");
    stop_flag.store(true, Ordering::Relaxed);
    let _ = stop_tx.try_send(());
    feed.request_close();

    let _ = watcher_stopped_rx.recv().await;
    let _ = publisher_stopped_rx.recv().await;
    log::info!("Stopped.");
    Ok(())
}

/// Waits for `CTRL+C` (interrupt) or `SIGTERM` (terminate).
async fn shutdown_signal() {
    // Handler for CTRL+C
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    // Handler for SIGTERM (on UNIX systems)
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    // On non-UNIX systems, `terminate` is a future that never completes.
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
