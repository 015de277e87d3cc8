use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::types::{Chips, SeatIndex};
use crate::table::{ChannelTransport, IngressEvent, SeatPlayerRequest};

use super::registry::TableRegistry;

const LOG_TARGET: &str = "plo_server::server::ws";
const EGRESS_BUFFER: usize = 64;

pub struct ServerContext {
    pub registry: TableRegistry,
}

pub fn router(ctx: Arc<ServerContext>) -> Router {
    // Request/response logging rides on tower-http's tracing layer; the
    // table actors do their own structured logging per event.
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/tables/:name/status", get(table_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    table: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    seat: Option<SeatIndex>,
    #[serde(default)]
    buy_in: Option<Chips>,
    #[serde(default)]
    spectate: bool,
}

async fn ws_upgrade(
    State(ctx): State<Arc<ServerContext>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx, query))
}

async fn handle_socket(mut socket: WebSocket, ctx: Arc<ServerContext>, query: WsQuery) {
    let table = ctx.registry.get_or_create(&query.table);
    let (transport, egress_rx) = ChannelTransport::new(EGRESS_BUFFER);
    let mut egress = ReceiverStream::new(egress_rx);
    let external_id = Uuid::new_v4().to_string();

    if query.spectate {
        let spectator_id = Uuid::new_v4();
        table.add_spectator(spectator_id, transport).await;
        info!(target: LOG_TARGET, table = %query.table, %spectator_id, "spectator attached");
        loop {
            tokio::select! {
                event = egress.next() => {
                    let Some(event) = event else { break };
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                msg = socket.recv() => {
                    if msg.is_none() {
                        break;
                    }
                }
            }
        }
        table.remove_spectator(spectator_id).await;
        return;
    }

    let display_name = query
        .name
        .clone()
        .unwrap_or_else(|| format!("guest-{}", &external_id[..8]));
    let seat = table
        .seat_player(SeatPlayerRequest {
            external_id: external_id.clone(),
            display_name,
            avatar_ref: None,
            transport: Some(transport),
            buy_in: query.buy_in,
            preferred_seat: query.seat,
            suppress_joined: false,
        })
        .await;
    let Some(seat) = seat else {
        warn!(target: LOG_TARGET, table = %query.table, "table full, closing socket");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };
    // Seating and hand start are split so table:joined is already on the
    // wire before the first game:hole_cards.
    table.trigger_maybe_start_hand().await;
    info!(target: LOG_TARGET, table = %query.table, %external_id, seat, "client connected");

    loop {
        tokio::select! {
            event = egress.next() => {
                let Some(event) = event else { break };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_frame(&table, &external_id, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary ignored
                    Some(Err(err)) => {
                        debug!(target: LOG_TARGET, %external_id, %err, "socket error");
                        break;
                    }
                }
            }
        }
    }

    table.unseat_player(&external_id).await;
    info!(target: LOG_TARGET, table = %query.table, %external_id, "client disconnected");
}

/// Returns false when the client asked to leave.
async fn handle_frame(table: &crate::table::TableHandle, external_id: &str, text: &str) -> bool {
    let event: IngressEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(target: LOG_TARGET, %external_id, %err, "unparseable frame dropped");
            return true;
        }
    };
    match event {
        IngressEvent::PlayerAction { action, amount, .. } => {
            table.player_action(external_id, action, amount).await;
            true
        }
        IngressEvent::EarlyFold { .. } => {
            table.early_fold(external_id).await;
            true
        }
        IngressEvent::LeaveTable { .. } => false,
        IngressEvent::SetChips {
            player_id, chips, ..
        } => {
            // Dev harness only; production fronts this with auth.
            table.set_chips(&player_id, chips).await;
            true
        }
    }
}

async fn send_event(
    socket: &mut WebSocket,
    event: &crate::table::EgressEvent,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).unwrap_or_else(|err| {
        warn!(target: LOG_TARGET, %err, "egress serialization failed");
        String::from("{}")
    });
    socket.send(Message::Text(payload)).await
}

async fn table_status(
    State(ctx): State<Arc<ServerContext>>,
    Path(name): Path<String>,
) -> Response {
    match ctx.registry.get(&name) {
        Some(table) => match table.status().await {
            Some(status) => Json(status).into_response(),
            None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
