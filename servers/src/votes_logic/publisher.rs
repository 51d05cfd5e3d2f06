//! Vote publisher: drains the detection hand-off onto the durable queue.

use std::future::Future;
use tokio::sync::mpsc;

/// Forwards every queued vote to `publish` until the producing side closes
/// the channel and the backlog is drained, then signals completion.
///
/// A failed publish is logged and the vote dropped; the drain keeps going.
pub async fn drain<F, Fut, E>(
    mut votes: mpsc::UnboundedReceiver<String>,
    mut publish: F,
    stopped: mpsc::Sender<()>,
) where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    while let Some(vote) = votes.recv().await {
        match publish(vote.clone()).await {
            Ok(()) => log::info!("published vote: {}", vote),
            Err(e) => log::error!("failed to publish vote {}: {}", vote, e),
        }
    }

    log::info!("publisher: stopping");
    // The queue handle lives in the closure; letting it go releases the
    // underlying connection before completion is reported.
    drop(publish);
    log::info!("publisher: stopped");
    let _ = stopped.try_send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn drains_everything_enqueued_before_the_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stopped_tx, mut stopped_rx) = mpsc::channel(1);
        let published = Arc::new(Mutex::new(Vec::new()));

        for vote in ["bengals", "packers", "packers"] {
            tx.send(vote.to_string()).unwrap();
        }
        drop(tx);

        let sink = published.clone();
        drain(
            rx,
            move |vote| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(vote);
                    Ok::<(), String>(())
                }
            },
            stopped_tx,
        )
        .await;

        timeout(WAIT, stopped_rx.recv()).await.unwrap().unwrap();
        assert_eq!(
            *published.lock().unwrap(),
            vec!["bengals", "packers", "packers"]
        );
    }

    #[tokio::test]
    async fn a_failed_publish_does_not_stop_the_drain() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stopped_tx, mut stopped_rx) = mpsc::channel(1);
        let published = Arc::new(Mutex::new(Vec::new()));

        for vote in ["bengals", "packers", "bengals"] {
            tx.send(vote.to_string()).unwrap();
        }
        drop(tx);

        let sink = published.clone();
        drain(
            rx,
            move |vote| {
                let sink = sink.clone();
                async move {
                    if vote == "packers" {
                        return Err("broker away".to_string());
                    }
                    sink.lock().unwrap().push(vote);
                    Ok(())
                }
            },
            stopped_tx,
        )
        .await;

        timeout(WAIT, stopped_rx.recv()).await.unwrap().unwrap();
        assert_eq!(*published.lock().unwrap(), vec!["bengals", "bengals"]);
    }

    #[tokio::test]
    async fn zero_votes_still_terminates() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let (stopped_tx, mut stopped_rx) = mpsc::channel(1);
        drop(tx);

        drain(
            rx,
            |_vote| async move { Ok::<(), String>(()) },
            stopped_tx,
        )
        .await;

        timeout(WAIT, stopped_rx.recv()).await.unwrap().unwrap();
    }
}
