// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the tally-remote server binary.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tally_core::protocol::{ClientMessage, ServerMessage};
use tally_core::{Fields, Record};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns a server process and kills it on drop.
struct ServerProcess {
    child: Child,
    port: u16,
    _temp_dir: tempfile::TempDir,
}

impl ServerProcess {
    fn spawn(offset: u16) -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");

        // High ephemeral range, separated per test
        let port = 50152 + (std::process::id() % 500) as u16 * 2 + offset;

        let child = Command::new(env!("CARGO_BIN_EXE_tally-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--data")
            .arg(temp_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server process");

        ServerProcess {
            child,
            port,
            _temp_dir: temp_dir,
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    async fn connect(&self) -> Ws {
        // CI runners can be slow to start the process
        for _ in 0..20 {
            if let Ok(Ok((stream, _))) =
                tokio::time::timeout(Duration::from_millis(500), connect_async(&self.ws_url()))
                    .await
            {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        panic!("should connect to server within retries");
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn roundtrip(
    sink: &mut SplitSink<Ws, Message>,
    stream: &mut SplitStream<Ws>,
    msg: ClientMessage,
) -> ServerMessage {
    sink.send(Message::Text(msg.to_json().unwrap().into()))
        .await
        .expect("send request");
    match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => ServerMessage::from_json(&text).unwrap(),
        other => panic!("expected a text reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_lifecycle() {
    let server = ServerProcess::spawn(0);
    let (mut sink, mut stream) = server.connect().await.split();

    // Raw frame to pin the wire format
    let ping_msg = serde_json::json!({"type": "ping", "id": 12345});
    sink.send(Message::Text(ping_msg.to_string().into()))
        .await
        .expect("send ping");

    match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            assert!(
                text.contains("\"pong\"") && text.contains("12345"),
                "Expected pong with id 12345, got: {}",
                text
            );
        }
        other => panic!("Expected pong, got {:?}", other),
    }
}

#[tokio::test]
async fn test_add_then_get_all() {
    let server = ServerProcess::spawn(1);
    let (mut sink, mut stream) = server.connect().await.split();
    let collection = "users/u1/parties";

    let mut fields = Fields::new();
    fields.insert("name".into(), serde_json::json!("Acme"));
    let add = ClientMessage::add(1, collection, Record::new("local_1_abcde", fields));

    let id = match roundtrip(&mut sink, &mut stream, add).await {
        ServerMessage::Added { request_id: 1, id } => id,
        other => panic!("expected added, got {:?}", other),
    };

    match roundtrip(&mut sink, &mut stream, ClientMessage::get_all(2, collection)).await {
        ServerMessage::Records {
            request_id: 2,
            records,
        } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, id);
            assert_eq!(records[0].fields["name"], "Acme");
        }
        other => panic!("expected records, got {:?}", other),
    }

    match roundtrip(&mut sink, &mut stream, ClientMessage::delete(3, collection, &id)).await {
        ServerMessage::Ack { request_id: 3 } => {}
        other => panic!("expected ack, got {:?}", other),
    }
}
