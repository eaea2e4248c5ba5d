//! Connection Handler
//!
//! Per-connection state machine: `Open -> Listening -> Closed`.
//!
//! On open the handler subscribes to container change events and pushes the
//! full tree as the initial snapshot. While listening it multiplexes two
//! sources on one task: inbound frames (parse, dispatch, push the returned
//! node) and change events from other connections (re-encode, push). All
//! outbound bytes funnel through an mpsc queue drained by a single writer
//! task, so a socket never has two writes in flight.
//!
//! There is no backpressure beyond the bounded queues: a reader that cannot
//! keep up with the cluster-wide mutation rate loses the oldest change
//! events (broadcast lag) rather than stalling the writers.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::protocol::{dispatch, Request, RequestKind};
use crate::serializer;
use crate::server::auth;
use crate::server::AppState;
use crate::tree::ChangeEvent;

/// Outbound frames queued per connection before the writer task.
const OUTBOUND_QUEUE: usize = 64;

/// Drive one accepted WebSocket until it closes.
pub(crate) async fn handle_socket(socket: WebSocket, state: AppState) {
    let events = state.container.read().await.subscribe();
    let (sink, stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE);

    let writer = tokio::spawn(write_loop(sink, out_rx));

    info!("connection open");
    listen(&state, stream, BroadcastStream::new(events), out_tx).await;
    info!("connection closed");

    // out_tx dropped above ends the writer, which runs the close handshake.
    let _ = writer.await;
}

/// The single writer: serializes sends and closes the socket on the way out.
async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut out_rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(bytes) = out_rx.recv().await {
        let Ok(text) = String::from_utf8(bytes) else {
            continue;
        };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn listen(
    state: &AppState,
    mut inbound: SplitStream<WebSocket>,
    mut events: BroadcastStream<ChangeEvent>,
    out_tx: mpsc::Sender<Vec<u8>>,
) {
    let mut current_token: Option<String> = None;

    // Initial snapshot: the full tree with relations.
    let root_id = state.container.read().await.root().id.clone();
    push_node(state, &out_tx, &root_id, current_token.as_deref()).await;

    loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(state, &out_tx, &text, &mut current_token).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary and ping/pong frames carry no commands
                Some(Err(err)) => {
                    debug!(%err, "socket receive failed");
                    break;
                }
            },
            event = events.next() => match event {
                Some(Ok(ChangeEvent::ValueChanged { node_id })) => {
                    push_node(state, &out_tx, &node_id, current_token.as_deref()).await;
                }
                Some(Ok(event @ ChangeEvent::ChildrenChanged { .. })) => {
                    // Inert hook: children changes are pushed by the mutating
                    // connection itself.
                    debug!(kind = event.kind(), "ignoring children change");
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "slow reader lost change events");
                }
                None => break,
            },
        }
    }
}

/// One inbound frame: parse, dispatch, push the returned node.
///
/// A malformed frame is fatal to this receive only; the connection keeps
/// listening.
async fn handle_frame(
    state: &AppState,
    out_tx: &mpsc::Sender<Vec<u8>>,
    text: &str,
    current_token: &mut Option<String>,
) {
    let request = match Request::parse(text) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "dropping malformed frame");
            return;
        }
    };

    if request.kind == RequestKind::Auth {
        debug!("session token updated");
        *current_token = Some(request.data);
        return;
    }

    let affected = {
        let mut container = state.container.write().await;
        dispatch(&mut container, &state.registry, &request)
    };

    if let Some(node_id) = affected {
        push_node(state, out_tx, &node_id, current_token.as_deref()).await;
    }
}

/// Encode a node under the read lock and queue it for sending.
///
/// The push is suppressed when the node has vanished or the session lacks a
/// required role.
async fn push_node(
    state: &AppState,
    out_tx: &mpsc::Sender<Vec<u8>>,
    node_id: &str,
    token: Option<&str>,
) {
    let bytes = {
        let container = state.container.read().await;
        let Some(node) = container.get_by_id(node_id) else {
            return;
        };
        if !auth::push_allowed(node, &state.registry, token, state.decoder.as_ref()) {
            debug!(node_id, "push suppressed: missing required role");
            return;
        }
        serializer::to_bytes(&container, &state.registry, Some(node), true)
    };
    // A full queue here means the peer stopped reading; the writer task will
    // notice on send and tear down.
    let _ = out_tx.send(bytes).await;
}
