//! Session store and snapshot persistence

pub mod error;
pub mod persistence;
pub mod settings;
#[allow(clippy::module_inception)]
pub mod store;

pub use error::{PersistenceError, PersistenceResult, StoreError};
pub use persistence::{JsonFileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};
pub use settings::{Theme, UserSettings};
pub use store::{Draft, SessionStore, StreamTicket, STOPPED_BY_USER};
