// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Server-Sent Events adapter over a run's event stream.
//
// Each bus event becomes one `data:` message carrying the wire JSON. Once the
// bus is closed and drained a final `{"event_type":"done"}` message is sent
// and the response ends.

use crate::infrastructure::event_bus::EventReceiver;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::get,
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub const STREAM_PATH: &str = "/api/stream";

#[derive(Clone)]
struct StreamState {
    receiver: Arc<Mutex<Option<EventReceiver>>>,
}

/// Router exposing the run's events at [`STREAM_PATH`]. The bus has a single
/// consumer, so only the first client gets the stream; later ones get 409.
pub fn router(receiver: EventReceiver) -> Router {
    let state = StreamState {
        receiver: Arc::new(Mutex::new(Some(receiver))),
    };
    Router::new()
        .route(STREAM_PATH, get(stream_events))
        .with_state(state)
}

pub fn event_stream(receiver: EventReceiver) -> impl Stream<Item = Result<Event, axum::Error>> + Send {
    receiver
        .into_stream()
        .map(|event| Event::default().json_data(event.to_wire()))
        .chain(stream::once(async {
            Event::default().json_data(json!({ "event_type": "done" }))
        }))
}

async fn stream_events(State(state): State<StreamState>) -> Response {
    let Some(receiver) = state.receiver.lock().take() else {
        warn!("Event stream requested after it was already taken");
        return (StatusCode::CONFLICT, "event stream already has a consumer").into_response();
    };
    Sse::new(event_stream(receiver))
        .keep_alive(KeepAlive::default())
        .into_response()
}
