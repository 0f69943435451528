//! Server-Sent Events endpoint for live status updates
//!
//! `GET /status` (alias `GET /sse`) registers a subscriber with the broadcast
//! hub and forwards every hub event as one SSE event. Snapshots use the default
//! event type (`data: <json>`), cycle failures use `event: error`.

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use serde_json::json;
use std::convert::Infallible;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::events::{BroadcastHub, HubEvent, Subscription};
use crate::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// One connected observer.
///
/// Dropping the session (client disconnect, hub closure) drops its
/// subscription, which unregisters it from the hub.
pub struct StreamSession {
    subscription: Subscription,
    opened_at: Instant,
    sent: u64,
}

impl StreamSession {
    /// Register a new session with the hub.
    pub fn open(hub: &BroadcastHub) -> Self {
        Self {
            subscription: hub.subscribe(),
            opened_at: Instant::now(),
            sent: 0,
        }
    }

    /// Subscriber id assigned by the hub.
    pub fn id(&self) -> u64 {
        self.subscription.id()
    }

    /// Wait for the next encodable event.
    ///
    /// Returns `None` once the hub has closed or dropped this subscriber.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            let event = self.subscription.recv().await?;
            match encode(&event) {
                Ok(sse) => {
                    self.sent += 1;
                    return Some(sse);
                }
                Err(e) => {
                    warn!(
                        subscriber_id = self.id(),
                        cycle = event.cycle(),
                        error = %e,
                        "Failed to encode event; skipping"
                    );
                }
            }
        }
    }

    /// Turn the session into an SSE body stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            let event = session.next_event().await?;
            Some((Ok(event), session))
        })
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        info!(
            subscriber_id = self.id(),
            events_sent = self.sent,
            connected_secs = self.opened_at.elapsed().as_secs(),
            "SSE client disconnected"
        );
    }
}

fn encode(event: &HubEvent) -> Result<Event, axum::Error> {
    match event {
        HubEvent::Snapshot { payload, .. } => Ok(Event::default().data(&**payload)),
        HubEvent::CycleFailed { cycle, message } => Event::default()
            .event("error")
            .json_data(json!({ "cycle": cycle, "message": message })),
    }
}

/// SSE handler
pub async fn status_stream(State(state): State<AppState>) -> impl IntoResponse {
    let session = StreamSession::open(&state.hub);
    info!(
        subscriber_id = session.id(),
        subscribers = state.hub.subscriber_count(),
        "SSE client connected"
    );
    debug!(subscriber_id = session.id(), "Streaming status snapshots");

    let sse = Sse::new(session.into_stream()).keep_alive(KeepAlive::default());

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        sse,
    )
}
