//! Live-service harness: serves a throwaway chat feed on localhost:8080
//! that repeats canned vote messages, for driving server_votes locally
//! without a real chat deployment.
//!
//! Run manually: `cargo run -p project_tests --bin test_chatfeed`

use anyhow::Result;
use futures_util::SinkExt;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

const CANNED: [&str; 4] = [
    "Go Packers!",
    "bengals all the way",
    "what a game",
    "PACKERS PACKERS PACKERS",
];

#[tokio::main]
async fn main() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:8080").await?;
    println!("chat feed listening on ws://127.0.0.1:8080/room");

    loop {
        let (stream, addr) = listener.accept().await?;
        println!("client connected: {}", addr);
        tokio::spawn(async move {
            let mut ws = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    eprintln!("handshake with {} failed: {}", addr, e);
                    return;
                }
            };
            for text in CANNED.iter().cycle() {
                let frame = serde_json::json!({ "Message": text }).to_string();
                if ws.send(Message::Text(frame.into())).await.is_err() {
                    println!("client gone: {}", addr);
                    return;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });
    }
}
