//! Line-delimited JSON bridge between TCP clients and a [`DevServer`].
//!
//! Each line a client writes is a [`SocketMessage`] delivered to
//! [`DevServer::dispatch`]; every outbound broadcast is written back to every client
//! as one line. Aborting the task returned by [`serve`] closes all connections.

use super::{DevServer, SocketMessage};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};

/// Bind the bridge listener.
pub async fn bind(addr: &str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Socket bridge listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept clients until the returned task is aborted.
pub fn serve(server: DevServer, listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_connection(server.clone(), stream, peer));
                    }
                    Err(e) => tracing::warn!("Failed to accept socket client: {}", e),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    })
}

async fn handle_connection(server: DevServer, stream: TcpStream, peer: SocketAddr) {
    tracing::debug!("Socket client connected: {}", peer);
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut outbound = server.subscribe();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<SocketMessage>(&line) {
                        Ok(message) => {
                            server.dispatch(&message.event, message.payload);
                        }
                        Err(e) => tracing::warn!("Ignoring malformed message from {}: {}", peer, e),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Read error from {}: {}", peer, e);
                    break;
                }
            },
            message = outbound.recv() => match message {
                Ok(message) => {
                    let Ok(mut encoded) = serde_json::to_string(&message) else {
                        continue;
                    };
                    encoded.push('\n');
                    if writer.write_all(encoded.as_bytes()).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Socket client {} lagged, dropped {} messages", peer, skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("Socket client disconnected: {}", peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_round_trip_over_tcp() {
        let server = DevServer::new();
        let reply = server.clone();
        server.on("echo", move |payload| {
            reply.send("echoed", &payload);
        });

        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = serve(server.clone(), listener);

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        // Give the bridge a moment to subscribe the new client
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer
            .write_all(b"{\"event\":\"echo\",\"payload\":{\"x\":1}}\n")
            .await
            .unwrap();

        let line = timeout(Duration::from_secs(2), lines.next_line())
            .await
            .expect("Timeout waiting for reply")
            .unwrap()
            .expect("Connection closed");
        let message: SocketMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(message.event, "echoed");
        assert_eq!(message.payload, json!({"x": 1}));

        task.abort();
    }
}
