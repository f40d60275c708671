//! Session records and the data accumulated into them.
//!
//! Field names serialize in camelCase so snapshots written by earlier
//! clients (which lack some of these fields) still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::phase::CouncilPhase;
use super::repair::derive_phase;

/// Unique identifier for council sessions
pub type SessionId = String;

/// Summary shown until the finalizer (or the terminal event) replaces it.
pub const SUMMARY_PLACEHOLDER: &str = "Council in session...";

/// Agent roster used when nothing else has been selected.
pub const DEFAULT_AGENTS: &[&str] = &[
    "The Academic",
    "The Layman",
    "The Skeptic",
    "The Futurist",
    "The Ethical Guardian",
];

/// A council member that can be selected for a deliberation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

impl Agent {
    /// Create a selected agent whose id and name are the same.
    pub fn new(name: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            selected: true,
        }
    }

    /// The default roster, all selected.
    pub fn default_roster() -> Vec<Agent> {
        DEFAULT_AGENTS.iter().map(|name| Agent::new(name)).collect()
    }
}

/// Who produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    User,
    System,
    Agent,
}

/// One entry in a session's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl LogEntry {
    /// Create a system entry stamped now.
    pub fn system(sender: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            kind: LogKind::System,
            content: content.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Deserialize a field whose explicit `null` means the same as absent.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Token usage reported for one model call (or a sum of them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricUsage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion: u64,
}

/// Saturates at `u64::MAX`; counts come off the wire.
impl std::ops::Add for MetricUsage {
    type Output = MetricUsage;

    fn add(self, rhs: MetricUsage) -> MetricUsage {
        MetricUsage {
            total: self.total.saturating_add(rhs.total),
            prompt: self.prompt.saturating_add(rhs.prompt),
            completion: self.completion.saturating_add(rhs.completion),
        }
    }
}

/// Timing, model and usage for one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    /// Seconds.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: MetricUsage,
}

/// All metrics recorded for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    #[serde(default)]
    pub generators: BTreeMap<String, MetricData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critic: Option<MetricData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architect: Option<MetricData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalizer: Option<MetricData>,
    #[serde(default)]
    pub total_time: f64,
    #[serde(default)]
    pub total_tokens: MetricUsage,
}

/// A critic's complaint about one agent: either a sentence or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flaw {
    Single(String),
    Many(Vec<String>),
}

impl std::fmt::Display for Flaw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(text) => write!(f, "{}", text),
            Self::Many(items) => write!(f, "{}", items.join("; ")),
        }
    }
}

/// Critic verdicts accumulated over every batch of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticData {
    #[serde(default)]
    pub winner_id: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rankings: Vec<String>,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub flaws: BTreeMap<String, Flaw>,
}

/// The architect's blueprint for the final answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectData {
    #[serde(default)]
    pub structure: Vec<String>,
    #[serde(default)]
    pub missing_facts_to_add: Vec<String>,
    #[serde(default)]
    pub tone_guidelines: String,
    #[serde(default)]
    pub critique_integration: String,
}

/// A council session: the unit of persistence and the reducer's target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub query: String,
    pub date: DateTime<Utc>,
    #[serde(default = "default_summary")]
    pub summary: String,
    #[serde(default)]
    pub messages: Vec<LogEntry>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    /// Absent on records written before phases were persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_phase: Option<CouncilPhase>,
    #[serde(default)]
    pub generator_streams: BTreeMap<String, String>,
    #[serde(default)]
    pub agent_models: BTreeMap<String, String>,
    #[serde(default)]
    pub critic_data: Option<CriticData>,
    #[serde(default)]
    pub architect_data: Option<ArchitectData>,
    #[serde(default)]
    pub finalizer_text: String,
    #[serde(default)]
    pub metrics: SessionMetrics,
    /// Critic batch ids already merged into `critic_data`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_critic_batches: Vec<String>,
}

fn default_summary() -> String {
    SUMMARY_PLACEHOLDER.to_string()
}

impl Session {
    /// Create a fresh session in the generating phase.
    pub fn new(query: &str, agents: Vec<Agent>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            date: Utc::now(),
            summary: default_summary(),
            agents,
            active_phase: Some(CouncilPhase::Generating),
            ..Default::default()
        }
    }

    /// Current phase, derived from the data present when the record predates
    /// persisted phases.
    pub fn phase(&self) -> CouncilPhase {
        self.active_phase.unwrap_or_else(|| derive_phase(self))
    }

    /// Raise the phase to at least `target`.
    pub fn advance_phase(&mut self, target: CouncilPhase) {
        self.active_phase = Some(self.phase().advance_to(target));
    }

    /// Whether the summary still holds the placeholder.
    pub fn has_placeholder_summary(&self) -> bool {
        self.summary == SUMMARY_PLACEHOLDER
    }

    /// Append a log entry.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.messages.push(entry);
    }

    /// Ids of the agents that were selected when the session started.
    pub fn selected_agent_ids(&self) -> Vec<String> {
        self.agents
            .iter()
            .filter(|a| a.selected)
            .map(|a| a.id.clone())
            .collect()
    }

    /// Get short session ID (first 8 chars)
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {} | {} | {}",
            self.phase(),
            self.short_id(),
            self.date.format("%Y-%m-%d %H:%M"),
            self.summary
        )
    }
}
