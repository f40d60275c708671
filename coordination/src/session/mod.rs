//! Council sessions and the reducer that evolves them
//!
//! A session is created when a deliberation starts and then only changes
//! through [`reduce`], one event at a time.

pub mod merge;
pub mod phase;
pub mod reducer;
pub mod repair;
pub mod types;

pub use merge::{accumulate_metric, merge_critic, REASONING_SEPARATOR, WINNER_JOINER};
pub use phase::{CouncilPhase, PhaseOutOfRange};
pub use reducer::{reduce, replay, summary_from};
pub use repair::{derive_phase, repair_session};
pub use types::{
    Agent, ArchitectData, CriticData, Flaw, LogEntry, LogKind, MetricData, MetricUsage, Session,
    SessionId, SessionMetrics, DEFAULT_AGENTS, SUMMARY_PLACEHOLDER,
};
