//! Phase reducer: applies one decoded event to one session.
//!
//! `reduce` consumes the session and returns the updated record. It never
//! looks at any other session and performs no I/O beyond logging.

use tracing::{debug, warn};

use crate::stream::types::CouncilEvent;

use super::merge::{accumulate_metric, merge_critic, single_metric};
use super::types::{ArchitectData, LogEntry, Session};

/// Characters of the final answer used for the session summary.
pub const SUMMARY_SNIPPET_CHARS: usize = 100;

const FINALIZED_FALLBACK: &str = "Council Mandate Fulfilled";
const ADJOURNED_FALLBACK: &str = "Council Adjourned";
const UNKNOWN_UPSTREAM_ERROR: &str = "Unknown error reported by the council service";

/// Apply `event` to `session`.
pub fn reduce(mut session: Session, event: &CouncilEvent) -> Session {
    if let Some(target) = event.target_phase() {
        session.advance_phase(target);
    }

    match event {
        CouncilEvent::GeneratorStart(start) => {
            let Some(agent) = require_agent(&session, event) else {
                return session;
            };
            if let Some(model) = &start.model {
                session.agent_models.insert(agent, model.clone());
            }
        }

        CouncilEvent::GeneratorChunk(chunk) => {
            let Some(agent) = require_agent(&session, event) else {
                return session;
            };
            session
                .generator_streams
                .entry(agent)
                .or_default()
                .push_str(&chunk.chunk);
        }

        CouncilEvent::GeneratorDone(done) => {
            let Some(agent) = require_agent(&session, event) else {
                return session;
            };
            session
                .metrics
                .generators
                .insert(agent, single_metric(&done.metrics));
        }

        CouncilEvent::CriticResult(batch) => {
            if let Some(batch_id) = &batch.batch_id {
                if session.applied_critic_batches.contains(batch_id) {
                    debug!(session_id = %session.id, %batch_id, "Critic batch already applied");
                    return session;
                }
                session.applied_critic_batches.push(batch_id.clone());
            }

            session.critic_data = Some(merge_critic(session.critic_data.take(), batch));

            if batch.metrics.time_taken.is_some() {
                session.metrics.critic = Some(accumulate_metric(
                    session.metrics.critic.as_ref(),
                    &batch.metrics,
                ));
            }
        }

        CouncilEvent::ArchitectResult(result) => {
            session.architect_data = Some(ArchitectData {
                structure: result.structure.clone(),
                missing_facts_to_add: result.missing_facts_to_add.clone(),
                tone_guidelines: result.tone_guidelines.clone(),
                critique_integration: result.critique_integration.clone(),
            });
            if result.metrics.time_taken.is_some() {
                session.metrics.architect = Some(single_metric(&result.metrics));
            }
        }

        CouncilEvent::FinalizerChunk(chunk) => {
            session.finalizer_text.push_str(&chunk.chunk);
        }

        CouncilEvent::FinalizerDone(call) => {
            session.metrics.finalizer = Some(single_metric(call));
            if session.has_placeholder_summary() {
                session.summary = summary_from(&session.finalizer_text, FINALIZED_FALLBACK);
            }
        }

        CouncilEvent::Done(done) => {
            if let Some(total_time) = done.total_execution_time {
                session.metrics.total_time = total_time;
                if let Some(tokens) = done.total_tokens {
                    session.metrics.total_tokens = tokens;
                }
            }
            if session.has_placeholder_summary() {
                session.summary = summary_from(&session.finalizer_text, ADJOURNED_FALLBACK);
            }
        }

        CouncilEvent::Error(error) => {
            let message = error.message.as_deref().unwrap_or(UNKNOWN_UPSTREAM_ERROR);
            warn!(session_id = %session.id, message, "Council service reported an error");
            session.push_log(LogEntry::system("System", message));
        }
    }

    session
}

/// Apply a sequence of events in order.
pub fn replay<'a>(session: Session, events: impl IntoIterator<Item = &'a CouncilEvent>) -> Session {
    events.into_iter().fold(session, reduce)
}

/// First characters of the final answer, or `fallback` when there is none.
pub fn summary_from(finalizer_text: &str, fallback: &str) -> String {
    if finalizer_text.is_empty() {
        return fallback.to_string();
    }
    let snippet: String = finalizer_text.chars().take(SUMMARY_SNIPPET_CHARS).collect();
    format!("{}...", snippet)
}

fn require_agent(session: &Session, event: &CouncilEvent) -> Option<String> {
    let agent = event.agent().map(str::to_string);
    if agent.is_none() {
        warn!(
            session_id = %session.id,
            event_type = event.event_type(),
            "Dropping generator event without an agent"
        );
    }
    agent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::phase::CouncilPhase;
    use crate::session::types::{Agent, MetricUsage, SUMMARY_PLACEHOLDER};
    use crate::stream::types::{
        ArchitectResult, CallMetrics, CriticResult, FinalizerChunk, GeneratorChunk,
        GeneratorDone, GeneratorStart, RunDone, UpstreamError,
    };

    fn session() -> Session {
        Session::new("X", vec![Agent::new("A"), Agent::new("B")])
    }

    fn chunk(agent: &str, text: &str) -> CouncilEvent {
        CouncilEvent::GeneratorChunk(GeneratorChunk {
            agent: Some(agent.to_string()),
            chunk: text.to_string(),
        })
    }

    fn critic(winner: &str, reasoning: &str) -> CriticResult {
        CriticResult {
            winner_id: Some(winner.to_string()),
            reasoning: Some(reasoning.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_generator_start_records_model() {
        let event = CouncilEvent::GeneratorStart(GeneratorStart {
            agent: Some("A".into()),
            model: Some("m1".into()),
        });
        let s = reduce(session(), &event);
        assert_eq!(s.agent_models["A"], "m1");
        assert_eq!(s.phase(), CouncilPhase::Generating);
    }

    #[test]
    fn test_generator_start_without_model_is_noop() {
        let event = CouncilEvent::GeneratorStart(GeneratorStart {
            agent: Some("A".into()),
            model: None,
        });
        let s = reduce(session(), &event);
        assert!(s.agent_models.is_empty());
    }

    #[test]
    fn test_generator_chunks_append_per_agent() {
        let s = replay(
            session(),
            &[
                chunk("A", "hello"),
                chunk("B", "foo"),
                chunk("A", " world"),
            ],
        );
        assert_eq!(s.generator_streams["A"], "hello world");
        assert_eq!(s.generator_streams["B"], "foo");
    }

    #[test]
    fn test_generator_event_without_agent_dropped() {
        let event = CouncilEvent::GeneratorChunk(GeneratorChunk {
            agent: None,
            chunk: "orphan".into(),
        });
        let s = reduce(session(), &event);
        assert!(s.generator_streams.is_empty());
    }

    #[test]
    fn test_generator_done_records_metrics() {
        let event = CouncilEvent::GeneratorDone(GeneratorDone {
            agent: Some("A".into()),
            metrics: CallMetrics {
                model: Some("m1".into()),
                time_taken: Some(2.5),
                usage: Some(MetricUsage {
                    total: 30,
                    prompt: 10,
                    completion: 20,
                }),
            },
        });
        let s = reduce(session(), &event);
        let metric = &s.metrics.generators["A"];
        assert_eq!(metric.time, 2.5);
        assert_eq!(metric.model, "m1");
        assert_eq!(metric.usage.total, 30);
    }

    #[test]
    fn test_critic_sets_phase_and_merges() {
        let s = replay(
            session(),
            &[
                CouncilEvent::CriticResult(critic("A", "r1")),
                CouncilEvent::CriticResult(critic("B", "r2")),
            ],
        );
        assert_eq!(s.phase(), CouncilPhase::Critiquing);
        let data = s.critic_data.unwrap();
        assert_eq!(data.winner_id, "A & B");
        assert_eq!(data.reasoning, "r1\n\n---\n\nr2");
    }

    #[test]
    fn test_critic_metrics_only_with_time_taken() {
        let mut timed = critic("A", "r1");
        timed.metrics = CallMetrics {
            model: Some("c1".into()),
            time_taken: Some(1.0),
            usage: Some(MetricUsage {
                total: 10,
                prompt: 5,
                completion: 5,
            }),
        };
        let mut untimed = critic("B", "r2");
        untimed.metrics.usage = Some(MetricUsage {
            total: 999,
            prompt: 0,
            completion: 0,
        });

        let s = replay(
            session(),
            &[
                CouncilEvent::CriticResult(timed.clone()),
                CouncilEvent::CriticResult(untimed),
                CouncilEvent::CriticResult(timed),
            ],
        );
        let metric = s.metrics.critic.unwrap();
        assert_eq!(metric.time, 2.0);
        assert_eq!(metric.usage.total, 20);
        assert_eq!(metric.model, "c1");
    }

    #[test]
    fn test_critic_usage_near_max_saturates() {
        let mut huge = critic("A", "r1");
        huge.metrics = CallMetrics {
            model: Some("c1".into()),
            time_taken: Some(1.0),
            usage: Some(MetricUsage {
                total: u64::MAX,
                prompt: u64::MAX,
                completion: 0,
            }),
        };
        let event = CouncilEvent::CriticResult(huge);

        let s = replay(session(), &[event.clone(), event]);
        let metric = s.metrics.critic.as_ref().unwrap();
        assert_eq!(metric.usage.total, u64::MAX);
        assert_eq!(metric.usage.prompt, u64::MAX);
        assert_eq!(s.critic_data.as_ref().unwrap().winner_id, "A & A");
    }

    #[test]
    fn test_labelled_critic_batch_applied_once() {
        let mut labelled = critic("A", "r1");
        labelled.batch_id = Some("batch-1".into());
        let event = CouncilEvent::CriticResult(labelled);

        let s = replay(session(), &[event.clone(), event]);
        let data = s.critic_data.unwrap();
        assert_eq!(data.winner_id, "A");
        assert_eq!(data.reasoning, "r1");
        assert_eq!(s.applied_critic_batches, vec!["batch-1"]);
    }

    #[test]
    fn test_architect_replaces_wholesale() {
        let first = CouncilEvent::ArchitectResult(ArchitectResult {
            structure: vec!["s1".into(), "s2".into()],
            tone_guidelines: "formal".into(),
            ..Default::default()
        });
        let second = CouncilEvent::ArchitectResult(ArchitectResult {
            structure: vec!["s3".into()],
            ..Default::default()
        });
        let s = replay(session(), &[first, second]);
        assert_eq!(s.phase(), CouncilPhase::Architecting);
        let data = s.architect_data.as_ref().unwrap();
        assert_eq!(data.structure, vec!["s3"]);
        assert!(data.tone_guidelines.is_empty());
        assert!(s.metrics.architect.is_none());
    }

    #[test]
    fn test_finalizer_chunks_append_and_set_phase() {
        let s = replay(
            session(),
            &[
                CouncilEvent::FinalizerChunk(FinalizerChunk {
                    chunk: "Final".into(),
                }),
                CouncilEvent::FinalizerChunk(FinalizerChunk { chunk: ".".into() }),
            ],
        );
        assert_eq!(s.finalizer_text, "Final.");
        assert_eq!(s.phase(), CouncilPhase::Finalizing);
    }

    #[test]
    fn test_finalizer_done_derives_summary() {
        let long = "x".repeat(150);
        let s = replay(
            session(),
            &[
                CouncilEvent::FinalizerChunk(FinalizerChunk { chunk: long }),
                CouncilEvent::FinalizerDone(CallMetrics::default()),
            ],
        );
        assert_eq!(s.summary, format!("{}...", "x".repeat(100)));
        assert!(s.metrics.finalizer.is_some());
    }

    #[test]
    fn test_finalizer_done_keeps_overridden_summary() {
        let mut base = session();
        base.summary = "My own title".into();
        let s = replay(
            base,
            &[
                CouncilEvent::FinalizerChunk(FinalizerChunk {
                    chunk: "text".into(),
                }),
                CouncilEvent::FinalizerDone(CallMetrics::default()),
            ],
        );
        assert_eq!(s.summary, "My own title");
    }

    #[test]
    fn test_summary_counts_characters_not_bytes() {
        let text = "é".repeat(120);
        let summary = summary_from(&text, "fallback");
        assert_eq!(summary.chars().count(), 103);
    }

    #[test]
    fn test_done_sets_totals_and_summary() {
        let done = CouncilEvent::Done(RunDone {
            total_execution_time: Some(12.5),
            total_tokens: Some(MetricUsage {
                total: 500,
                prompt: 300,
                completion: 200,
            }),
        });
        let s = reduce(session(), &done);
        assert_eq!(s.metrics.total_time, 12.5);
        assert_eq!(s.metrics.total_tokens.total, 500);
        assert_eq!(s.summary, "Council Adjourned");
        assert_eq!(s.phase(), CouncilPhase::Finalizing);
    }

    #[test]
    fn test_done_without_totals_keeps_metrics() {
        let s = reduce(session(), &CouncilEvent::Done(RunDone::default()));
        assert_eq!(s.metrics.total_time, 0.0);
        assert_ne!(s.summary, SUMMARY_PLACEHOLDER);
    }

    #[test]
    fn test_error_logs_without_phase_change() {
        let mut base = session();
        base.advance_phase(CouncilPhase::Critiquing);
        let s = reduce(
            base,
            &CouncilEvent::Error(UpstreamError {
                message: Some("rate limited".into()),
            }),
        );
        assert_eq!(s.phase(), CouncilPhase::Critiquing);
        assert_eq!(s.messages.len(), 1);
        assert_eq!(s.messages[0].content, "rate limited");
        assert_eq!(s.messages[0].sender, "System");
    }

    #[test]
    fn test_phase_is_running_max() {
        let events = [
            CouncilEvent::ArchitectResult(ArchitectResult::default()),
            CouncilEvent::CriticResult(critic("A", "late")),
            chunk("A", "late chunk"),
        ];
        let mut s = session();
        let mut seen_max = s.phase();
        for event in &events {
            let before = s.phase();
            s = reduce(s, event);
            if let Some(target) = event.target_phase() {
                seen_max = seen_max.max(target);
            }
            assert!(s.phase() >= before);
            assert_eq!(s.phase(), seen_max);
        }
        assert_eq!(s.phase(), CouncilPhase::Architecting);
        assert_eq!(s.generator_streams["A"], "late chunk");
    }
}
