// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Every text frame is one request; every request gets exactly one reply
//! echoing its `request_id`.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use tally_core::protocol::{ClientMessage, ServerMessage};

use crate::state::ServerState;

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_client_message(&text, &state).await;
                ws_sink.send(Message::Text(response.to_json()?.into())).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(_) => {
                // Ignore other message types (Binary, Pong, Frame)
            }
            Err(e) => {
                warn!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Process a client message and build its reply.
pub(crate) async fn handle_client_message(text: &str, state: &ServerState) -> ServerMessage {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Malformed request: {}", e);
            return ServerMessage::error(None, format!("malformed request: {}", e));
        }
    };
    debug!("Received message: {:?}", msg);

    let request_id = msg.request_id();
    let result = match msg {
        ClientMessage::GetAll {
            request_id,
            collection,
        } => state
            .get_all(&collection)
            .await
            .map(|records| ServerMessage::records(request_id, records)),

        ClientMessage::Add {
            request_id,
            collection,
            record,
        } => state
            .add(&collection, record)
            .await
            .map(|id| ServerMessage::added(request_id, id)),

        ClientMessage::Upsert {
            request_id,
            collection,
            id,
            record,
        } => state
            .upsert(&collection, &id, record)
            .await
            .map(|()| ServerMessage::ack(request_id)),

        ClientMessage::Delete {
            request_id,
            collection,
            id,
        } => state
            .delete(&collection, &id)
            .await
            .map(|()| ServerMessage::ack(request_id)),

        ClientMessage::Ping { id } => Ok(ServerMessage::pong(id)),
    };

    result.unwrap_or_else(|e| {
        warn!("Request {:?} failed: {}", request_id, e);
        ServerMessage::error(request_id, e.to_string())
    })
}
