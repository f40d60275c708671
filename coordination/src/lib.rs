//! Council Coordination Library
//!
//! This library provides the client-side core of a council deliberation:
//! several agents answer a query, a critic scores them, an architect plans
//! the synthesis and a finalizer writes it. The orchestration service streams
//! those stages as events; this crate turns them into durable sessions.
//!
//! # Modules
//!
//! - [`stream`]: incremental frame parsing, event decoding and the async
//!   driver that pumps a byte stream into the store
//! - [`session`]: session records, the phase reducer, batch accumulation and
//!   legacy repair
//! - [`store`]: the session store, user settings and snapshot persistence
//!
//! # Usage
//!
//! ```no_run
//! use coordination::session::Agent;
//! use coordination::store::{JsonFileSnapshotStore, SessionStore};
//! use coordination::stream::drive;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = JsonFileSnapshotStore::new(".council/state.json");
//! let mut store = SessionStore::open(Box::new(backend))?;
//! let Some(ticket) = store.start_session("Is Rust worth learning?", &Agent::default_roster())
//! else {
//!     return Ok(());
//! };
//!
//! // In practice: the response body of POSTing `ticket.request` to the service.
//! let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(
//!     b"event: done\ndata: {}\n\n".to_vec(),
//! )]);
//! drive(&mut store, &ticket.session_id, body, &ticket.cancel, |_, _| {}).await;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod session;
pub mod store;
pub mod stream;

pub use session::{reduce, repair_session, Agent, CouncilPhase, Session, SessionId};
pub use store::{SessionStore, SnapshotStore, StreamTicket, UserSettings};
pub use stream::{decode, drive, CouncilEvent, Frame, FrameParser, StreamOutcome};
