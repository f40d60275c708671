//! Event types for the council stream
//!
//! One variant per event name on the wire. Every payload field is optional
//! so an empty `data:` line decodes to an empty record, and an explicit
//! `null` reads the same as a missing key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::session::types::null_as_default;
use crate::session::{CouncilPhase, Flaw, MetricUsage};
use crate::store::UserSettings;

/// `generator_start`: an agent began answering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorStart {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// `generator_chunk`: a slice of an agent's answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorChunk {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunk: String,
}

/// Timing and usage reported when a model call finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMetrics {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub time_taken: Option<f64>,
    #[serde(default)]
    pub usage: Option<MetricUsage>,
}

/// `generator_done`: an agent finished answering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorDone {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(flatten)]
    pub metrics: CallMetrics,
}

/// `critic_result`: one batch of critic verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticResult {
    /// Producer-assigned batch label; repeated labels are applied once.
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Replaces earlier rankings when present, even if empty.
    #[serde(default)]
    pub rankings: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flaws: BTreeMap<String, Flaw>,
    #[serde(flatten)]
    pub metrics: CallMetrics,
}

/// `architect_result`: the blueprint, sent once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub structure: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub missing_facts_to_add: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tone_guidelines: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub critique_integration: String,
    #[serde(flatten)]
    pub metrics: CallMetrics,
}

/// `finalizer_chunk`: a slice of the final answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalizerChunk {
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunk: String,
}

/// `done`: the run is over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDone {
    #[serde(default)]
    pub total_execution_time: Option<f64>,
    #[serde(default)]
    pub total_tokens: Option<MetricUsage>,
}

/// `error`: the orchestration service reported a problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamError {
    #[serde(default)]
    pub message: Option<String>,
}

/// All council stream events
#[derive(Debug, Clone, PartialEq)]
pub enum CouncilEvent {
    GeneratorStart(GeneratorStart),
    GeneratorChunk(GeneratorChunk),
    GeneratorDone(GeneratorDone),
    CriticResult(CriticResult),
    ArchitectResult(ArchitectResult),
    FinalizerChunk(FinalizerChunk),
    FinalizerDone(CallMetrics),
    Done(RunDone),
    Error(UpstreamError),
}

impl CouncilEvent {
    /// Get the event type as it appears on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            CouncilEvent::GeneratorStart(_) => "generator_start",
            CouncilEvent::GeneratorChunk(_) => "generator_chunk",
            CouncilEvent::GeneratorDone(_) => "generator_done",
            CouncilEvent::CriticResult(_) => "critic_result",
            CouncilEvent::ArchitectResult(_) => "architect_result",
            CouncilEvent::FinalizerChunk(_) => "finalizer_chunk",
            CouncilEvent::FinalizerDone(_) => "finalizer_done",
            CouncilEvent::Done(_) => "done",
            CouncilEvent::Error(_) => "error",
        }
    }

    /// Get the agent name if this event is agent-scoped
    pub fn agent(&self) -> Option<&str> {
        match self {
            CouncilEvent::GeneratorStart(e) => e.agent.as_deref(),
            CouncilEvent::GeneratorChunk(e) => e.agent.as_deref(),
            CouncilEvent::GeneratorDone(e) => e.agent.as_deref(),
            _ => None,
        }
    }

    /// Lowest phase a session must be in once this event is applied.
    pub fn target_phase(&self) -> Option<CouncilPhase> {
        match self {
            CouncilEvent::GeneratorStart(_)
            | CouncilEvent::GeneratorChunk(_)
            | CouncilEvent::GeneratorDone(_) => Some(CouncilPhase::Generating),
            CouncilEvent::CriticResult(_) => Some(CouncilPhase::Critiquing),
            CouncilEvent::ArchitectResult(_) => Some(CouncilPhase::Architecting),
            CouncilEvent::FinalizerChunk(_)
            | CouncilEvent::FinalizerDone(_)
            | CouncilEvent::Done(_) => Some(CouncilPhase::Finalizing),
            CouncilEvent::Error(_) => None,
        }
    }

    /// Whether this event ends the stream for its session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CouncilEvent::Done(_))
    }
}

/// Body of the summon request that opens a council stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonRequest {
    pub query: String,
    pub selected_agents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_map: Option<BTreeMap<String, String>>,
}

impl SummonRequest {
    /// Build a request, attaching only the settings the user actually set.
    pub fn new(query: &str, selected_agents: Vec<String>, settings: &UserSettings) -> Self {
        Self {
            query: query.to_string(),
            selected_agents,
            custom_api_key: Some(settings.api_key.clone()).filter(|k| !k.is_empty()),
            custom_model_map: Some(settings.model_overrides.clone()).filter(|m| !m.is_empty()),
        }
    }
}
