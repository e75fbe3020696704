use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use futures_util::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use estate_core::{Caller, Role};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}

/// GET /v1/events
/// Live domain events for agents, one SSE message per event
pub async fn event_stream(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    caller.require(&[Role::Agent])?;

    let rx = state.store.subscribe();
    tracing::info!(agent = %caller.id, "Event stream opened");

    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => Event::default().event(event.name()).json_data(&event).ok().map(Ok),
        Err(lagged) => {
            tracing::warn!("Event stream subscriber fell behind: {}", lagged);
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
