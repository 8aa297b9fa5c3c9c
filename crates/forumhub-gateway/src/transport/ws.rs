//! WebSocket handler for the presence hub.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS and resolve the client IP once
//! - Register the connection for egress and bind a `PresenceHub` to it
//! - Lifecycle: ping/pong + idle timeout
//! - Cheap frame-size check, then decode-once into a `ClientEvent`
//! - Run `disconnect` on every exit path so presence never outlives the socket

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, ConnectInfo, State},
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use forumhub_core::error::{ForumHubError, Result};
use forumhub_core::protocol::ServerEvent;

use crate::app_state::AppState;
use crate::context::resolve_client_ip;
use crate::presence::PresenceHub;
use crate::realtime::Connection;
use crate::transport::codec::{decode, frame_len, Inbound};

#[derive(Debug)]
struct SessionState {
    last_activity: Instant,
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let ip = resolve_client_ip(&headers, peer, app.cfg().gateway.trust_forwarded_headers);
    app.metrics().ws_upgrades.inc(&[]);

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_session(app, ip, socket).await {
            tracing::warn!(%ip, error = %e, "session ended with error");
        }
    })
}

// --------------------
// Session setup / teardown
// --------------------
async fn run_session(app: AppState, ip: IpAddr, socket: WebSocket) -> Result<()> {
    let (out_tx, out_rx) = mpsc::channel::<Message>(app.cfg().gateway.outbound_queue);

    let realtime = app.realtime();
    let conn = realtime.sessions.register(Connection { tx: out_tx.clone(), ip });

    let hub = match app.presence_hub(conn.clone(), ip).await {
        Ok(hub) => hub,
        Err(e) => {
            realtime.sessions.remove(&conn);
            return Err(e);
        }
    };

    let span = tracing::info_span!("session", %conn, %ip);
    async {
        tracing::info!("connected");
        app.metrics().ws_active_sessions.inc();

        let res = session_loop(&app, &hub, socket, out_tx, out_rx).await;

        hub.disconnect();
        realtime.sessions.remove(hub.connection_id());
        app.metrics().ws_active_sessions.dec();
        tracing::info!("disconnected");
        res
    }
    .instrument(span)
    .await
}

/// Queue a frame for this session's own writer. Never awaits: the writer is
/// the loop below, so blocking here on a full queue would stall it.
fn push(out_tx: &mpsc::Sender<Message>, ev: &ServerEvent) {
    match ev.to_json() {
        Ok(s) => {
            if out_tx.try_send(Message::Text(s)).is_err() {
                tracing::debug!("outbound queue unavailable, frame dropped");
            }
        }
        Err(e) => tracing::warn!(error = %e, "frame encode failed"),
    }
}

fn dispatch(app: &AppState, hub: &PresenceHub, out_tx: &mpsc::Sender<Message>, inbound: Result<Inbound>) -> bool {
    let ev = match inbound {
        Ok(Inbound::Event(ev)) => ev,
        Ok(Inbound::Ping(payload)) => {
            let _ = out_tx.try_send(Message::Pong(payload));
            return true;
        }
        Ok(Inbound::Pong(_)) => return true,
        Ok(Inbound::Close) => return false,
        Err(e) => {
            app.metrics().decode_errors.inc(&[("code", e.client_code().as_str())]);
            tracing::warn!(error = %e, "rejected frame");
            push(out_tx, &ServerEvent::error(&e));
            return true;
        }
    };

    let started = std::time::Instant::now();
    let res = hub.handle(ev);
    let name = ev.name();
    app.metrics().event_duration.observe(&[("event", name)], started.elapsed());
    app.metrics().presence_events.inc(&[("event", name)]);

    if let Err(e) = res {
        app.metrics()
            .presence_errors
            .inc(&[("event", name), ("code", e.client_code().as_str())]);
        tracing::warn!(event = name, error = %e, "presence event rejected");
        push(out_tx, &ServerEvent::error(&e));
    }
    true
}

// --------------------
// Core session loop
// --------------------
async fn session_loop(
    app: &AppState,
    hub: &PresenceHub,
    socket: WebSocket,
    out_tx: mpsc::Sender<Message>,
    mut out_rx: mpsc::Receiver<Message>,
) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    push(
        &out_tx,
        &ServerEvent::Connected { connection_id: hub.connection_id().to_string() },
    );

    let gw = &app.cfg().gateway;
    let max_frame_bytes = gw.max_frame_bytes;
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(Duration::from_millis(gw.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut sess = SessionState { last_activity: Instant::now() };

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                if ws_tx.send(m).await.is_err() {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let Ok(msg) = incoming else { break; };

                sess.last_activity = Instant::now();

                // cheap-first: size before decode
                if frame_len(&msg) > max_frame_bytes {
                    let e = ForumHubError::PayloadTooLarge;
                    app.metrics().decode_errors.inc(&[("code", e.client_code().as_str())]);
                    if let Ok(s) = ServerEvent::error(&e).to_json() {
                        let _ = ws_tx.send(Message::Text(s)).await;
                    }
                    break;
                }

                if !dispatch(app, hub, &out_tx, decode(msg)) {
                    break;
                }
            }

            // ping
            _ = ping_tick.tick() => {
                let _ = out_tx.try_send(Message::Ping(Vec::new()));
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if sess.last_activity.elapsed() >= idle_timeout {
                    tracing::info!("idle timeout");
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    Ok(())
}
