//! Live-service harness: publishes votes to a local redis and reads them
//! back through the counter's consumer group.
//!
//! Requires redis on localhost:6379. Run manually:
//! `cargo run -p project_tests --bin test_queue_roundtrip`

use anyhow::Result;
use lib_common::VoteQueue;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let queue = VoteQueue::connect("redis://127.0.0.1/").await?;
    queue.ensure_group("counter").await?;

    let received = Arc::new(Mutex::new(Vec::new()));
    let token = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let token = token.clone();
        let received = received.clone();
        tokio::spawn(async move {
            queue
                .consume("counter", "roundtrip-probe", token, move |vote| {
                    let received = received.clone();
                    async move {
                        received.lock().unwrap().push(vote);
                    }
                })
                .await
        })
    };

    for vote in ["bengals", "packers", "packers"] {
        queue.publish(vote).await?;
        println!("published {}", vote);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    token.cancel();
    let _ = consumer.await;

    let received = received.lock().unwrap();
    println!("received {} votes: {:?}", received.len(), *received);
    assert_eq!(received.len(), 3, "expected all published votes back");
    println!("queue roundtrip OK");
    Ok(())
}
