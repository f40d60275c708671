//! Stream driver: pumps transport chunks through the parser and decoder into
//! the session store.
//!
//! Reading the next chunk is the only suspension point. Every frame a chunk
//! completes is applied synchronously before the next read, and cancellation
//! is observed between reads.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::decoder::decode;
use super::frame::FrameParser;
use super::types::CouncilEvent;
use crate::session::Session;
use crate::store::SessionStore;

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The terminal event arrived or the transport closed cleanly.
    Completed,
    /// The cancellation token fired.
    Cancelled,
    /// The transport reported an error.
    Failed(String),
}

/// Drive `stream` into `session_id` until it completes, fails or is
/// cancelled. `observer` sees the session after each applied event.
///
/// The store is told how the stream ended before this returns.
pub async fn drive<S, B, E, F>(
    store: &mut SessionStore,
    session_id: &str,
    stream: S,
    cancel: &CancellationToken,
    mut observer: F,
) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&Session, &CouncilEvent),
{
    tokio::pin!(stream);
    let mut parser = FrameParser::new();
    let mut frames_seen = 0usize;

    let outcome = 'read: loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = stream.next() => Some(next),
        };
        let Some(next) = next else {
            break StreamOutcome::Cancelled;
        };

        let chunk = match next {
            None => break StreamOutcome::Completed,
            Some(Err(e)) => break StreamOutcome::Failed(e.to_string()),
            Some(Ok(chunk)) => chunk,
        };

        for frame in parser.push(chunk.as_ref()) {
            frames_seen += 1;
            let event = match decode(&frame) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!(session_id, event_type = %frame.event, error = %e, "Dropping undecodable frame");
                    continue;
                }
            };

            if let Err(e) = store.apply_event(session_id, &event) {
                debug!(session_id, error = %e, "Stopping: session no longer accepts events");
                break 'read StreamOutcome::Completed;
            }
            if let Some(session) = store.session(session_id) {
                observer(session, &event);
            }
            if event.is_terminal() {
                break 'read StreamOutcome::Completed;
            }
        }
    };

    if let Some(rest) = parser.finish() {
        debug!(session_id, bytes = rest.len(), "Discarding incomplete trailing frame");
    }
    info!(session_id, frames = frames_seen, ?outcome, "Stream ended");
    store.finish_stream(session_id, &outcome);
    outcome
}
