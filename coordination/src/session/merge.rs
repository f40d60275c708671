//! Accumulation of results that arrive in several batches.
//!
//! The critic may score agents in subsets, emitting one `critic_result` per
//! subset. Maps are unioned with per-key overwrite, text fields are
//! concatenated, and metrics are summed. None of this is idempotent: the
//! caller applies each batch at most once.

use crate::stream::types::{CallMetrics, CriticResult};

use super::types::{CriticData, MetricData};

/// Divider placed between the reasoning of consecutive critic batches.
pub const REASONING_SEPARATOR: &str = "\n\n---\n\n";

/// Joiner placed between the winners of consecutive critic batches.
pub const WINNER_JOINER: &str = " & ";

/// Merge a critic batch into what earlier batches produced.
pub fn merge_critic(prev: Option<CriticData>, batch: &CriticResult) -> CriticData {
    let mut merged = prev.unwrap_or_default();

    merged
        .scores
        .extend(batch.scores.iter().map(|(k, v)| (k.clone(), *v)));
    merged
        .flaws
        .extend(batch.flaws.iter().map(|(k, v)| (k.clone(), v.clone())));

    merged.reasoning = concat_non_empty(
        &merged.reasoning,
        REASONING_SEPARATOR,
        batch.reasoning.as_deref().unwrap_or_default(),
    );
    merged.winner_id = concat_non_empty(
        &merged.winner_id,
        WINNER_JOINER,
        batch.winner_id.as_deref().unwrap_or_default(),
    );

    if let Some(rankings) = &batch.rankings {
        merged.rankings = rankings.clone();
    }

    merged
}

/// Add one call's metrics onto a running total: time and usage sum, the
/// model is taken from the latest call.
pub fn accumulate_metric(prev: Option<&MetricData>, call: &CallMetrics) -> MetricData {
    let base = prev.cloned().unwrap_or_default();
    MetricData {
        time: base.time + call.time_taken.unwrap_or_default(),
        model: call.model.clone().unwrap_or_default(),
        usage: base.usage + call.usage.unwrap_or_default(),
    }
}

/// Metrics for a single call, replacing whatever was recorded before.
pub fn single_metric(call: &CallMetrics) -> MetricData {
    accumulate_metric(None, call)
}

fn concat_non_empty(prev: &str, separator: &str, next: &str) -> String {
    if prev.is_empty() {
        next.to_string()
    } else {
        format!("{}{}{}", prev, separator, next)
    }
}
