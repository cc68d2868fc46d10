use crate::state::JiEduState;
use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::Stream;
use std::convert::Infallible;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

/// Something changed on the backend because of us; views of it should re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseEvent {
    Students,
    Applicants,
    Permissions,
}

impl SseEvent {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Applicants => "applicants",
            Self::Permissions => "permissions",
        }
    }
}

pub async fn sse_feed(
    State(state): State<JiEduState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream =
        BroadcastStream::new(state.subscribe_to_sse_feed()).filter_map(|event| match event {
            Ok(event) => Some(Ok(Event::default().event(event.name()).data(event.name()))),
            Err(e) => {
                // a lagging subscriber only misses refresh nudges
                debug!(?e, "SSE subscriber lagged");
                None
            }
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
