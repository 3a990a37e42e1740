use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the events of one match, failing when the match is unknown.
pub async fn subscribe_match(
    state: &SharedState,
    code: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, ServerEvent), ServiceError> {
    // Subscribe before loading so nothing written in between is missed.
    let receiver = state.sse().subscribe();
    let entity = state.load_match(code).await?;
    let greeting = ServerEvent::json(
        Some(entity.code.clone()),
        Some(EVENT_HANDSHAKE.to_string()),
        &Handshake {
            code: entity.code,
            degraded: state.is_degraded().await,
        },
    )
    .map_err(|err| ServiceError::InvalidState(format!("cannot encode handshake: {err}")))?;
    Ok((receiver, greeting))
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response following one match,
/// starting with `greeting` and cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    code: String,
    greeting: ServerEvent,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if tx.send(Ok(to_event(greeting))).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if !payload.concerns(&code) {
                                continue;
                            }
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Clients refetch on the next match.changed anyway.
                            debug!(code = %code, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(code = %code, "match SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
