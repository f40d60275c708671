//! Rehydration of sessions written before phases were persisted.
//!
//! The phase is derived from the furthest stage whose data is present. This
//! is a one-way heuristic: a record holding an architect blueprint but no
//! critic verdict derives the architect phase.

use tracing::debug;

use super::phase::CouncilPhase;
use super::types::Session;

/// Derive a phase from the data a session actually holds.
pub fn derive_phase(session: &Session) -> CouncilPhase {
    if !session.finalizer_text.is_empty() {
        CouncilPhase::Finalizing
    } else if session.architect_data.is_some() {
        CouncilPhase::Architecting
    } else if session.critic_data.is_some() {
        CouncilPhase::Critiquing
    } else {
        CouncilPhase::Generating
    }
}

/// Fill in a missing phase. Returns `true` when the record was changed.
pub fn repair_session(session: &mut Session) -> bool {
    if session.active_phase.is_some() {
        return false;
    }
    let phase = derive_phase(session);
    debug!(session_id = %session.id, %phase, "Derived phase for legacy session");
    session.active_phase = Some(phase);
    true
}
