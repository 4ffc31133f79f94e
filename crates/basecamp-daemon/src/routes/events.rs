//! Server-sent event stream over the in-process event bus.

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use basecamp_events::{EventReceiver, SubjectType};
use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct EventsQuery {
    subject_type: Option<SubjectType>,
}

/// `GET /events` — a live SSE feed of everything published on the bus
/// since the connection opened. Pass `?subject_type=workspace` (etc.) to
/// subscribe to one entity kind only; the bus does the filtering so
/// uninteresting events never cross the channel.
async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = match query.subject_type {
        Some(subject_type) => state.events.subscribe_topic(subject_type),
        None => state.events.subscribe(),
    };

    let stream = stream::unfold(receiver, |mut receiver: EventReceiver| async move {
        let record = receiver.recv().await?;
        let event = Event::default().event(record.kind.as_str()).json_data(&*record).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to serialize event record, dropping");
            Event::default().comment("serialization error")
        });
        Some((Ok(event), receiver))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/events", get(stream_events))
}
