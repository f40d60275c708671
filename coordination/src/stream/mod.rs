//! Council event stream: framing, decoding and the driver loop
//!
//! ```text
//! bytes ─► FrameParser ─► decode ─► SessionStore::apply_event
//! ```

pub mod decoder;
pub mod driver;
pub mod frame;
pub mod types;

pub use decoder::{decode, DecodeError};
pub use driver::{drive, StreamOutcome};
pub use frame::{Frame, FrameParser};
pub use types::{
    ArchitectResult, CallMetrics, CouncilEvent, CriticResult, FinalizerChunk, GeneratorChunk,
    GeneratorDone, GeneratorStart, RunDone, SummonRequest, UpstreamError,
};
