//! Deliberation phases and the monotonic advance rule.

use serde::{Deserialize, Serialize};

/// Phase of a council session.
///
/// Serialized as its numeric index (0-4) so persisted records stay compact
/// and older snapshots keep deserializing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum CouncilPhase {
    /// No deliberation running.
    #[default]
    Idle,
    /// Generators are streaming their answers.
    Generating,
    /// Critic batches are scoring the answers.
    Critiquing,
    /// Architect is producing the blueprint.
    Architecting,
    /// Finalizer is streaming the merged answer.
    Finalizing,
}

impl CouncilPhase {
    /// All phases in order.
    pub fn all() -> &'static [CouncilPhase] {
        &[
            Self::Idle,
            Self::Generating,
            Self::Critiquing,
            Self::Architecting,
            Self::Finalizing,
        ]
    }

    /// Numeric index (0 = idle, 4 = finalizing).
    pub fn index(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Generating => 1,
            Self::Critiquing => 2,
            Self::Architecting => 3,
            Self::Finalizing => 4,
        }
    }

    /// Move towards `target` without ever going backwards.
    pub fn advance_to(self, target: CouncilPhase) -> CouncilPhase {
        self.max(target)
    }

    /// Whether this is the last phase of a run.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Finalizing)
    }
}

impl std::fmt::Display for CouncilPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Generating => write!(f, "generating"),
            Self::Critiquing => write!(f, "critiquing"),
            Self::Architecting => write!(f, "architecting"),
            Self::Finalizing => write!(f, "finalizing"),
        }
    }
}

/// A numeric phase outside 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("phase index {0} is out of range (expected 0-4)")]
pub struct PhaseOutOfRange(pub u8);

impl TryFrom<u8> for CouncilPhase {
    type Error = PhaseOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::all()
            .get(usize::from(value))
            .copied()
            .ok_or(PhaseOutOfRange(value))
    }
}

impl From<CouncilPhase> for u8 {
    fn from(phase: CouncilPhase) -> Self {
        phase.index()
    }
}
