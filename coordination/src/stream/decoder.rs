//! Frame → typed event decoding.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::frame::Frame;
use super::types::CouncilEvent;

/// Error type for event decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed `{event_type}` payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode a frame into an event.
///
/// Unknown event names decode to `Ok(None)`. An empty (or `null`) payload is
/// treated as an empty record.
pub fn decode(frame: &Frame) -> Result<Option<CouncilEvent>, DecodeError> {
    let event = match frame.event.as_str() {
        "generator_start" => CouncilEvent::GeneratorStart(payload(frame)?),
        "generator_chunk" => CouncilEvent::GeneratorChunk(payload(frame)?),
        "generator_done" => CouncilEvent::GeneratorDone(payload(frame)?),
        "critic_result" => CouncilEvent::CriticResult(payload(frame)?),
        "architect_result" => CouncilEvent::ArchitectResult(payload(frame)?),
        "finalizer_chunk" => CouncilEvent::FinalizerChunk(payload(frame)?),
        "finalizer_done" => CouncilEvent::FinalizerDone(payload(frame)?),
        "done" => CouncilEvent::Done(payload(frame)?),
        "error" => CouncilEvent::Error(payload(frame)?),
        other => {
            debug!(event_type = other, "Ignoring unknown event type");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn payload<T: DeserializeOwned>(frame: &Frame) -> Result<T, DecodeError> {
    let raw = frame.data.trim();
    let raw = if raw.is_empty() || raw == "null" {
        "{}"
    } else {
        raw
    };
    serde_json::from_str(raw).map_err(|source| DecodeError::Payload {
        event_type: frame.event.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Flaw;
    use crate::stream::types::RunDone;

    fn frame(event: &str, data: &str) -> Frame {
        Frame {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_decode_generator_chunk() {
        let event = decode(&frame(
            "generator_chunk",
            r#"{"agent":"The Skeptic","chunk":"Hmm"}"#,
        ))
        .unwrap()
        .unwrap();
        match event {
            CouncilEvent::GeneratorChunk(chunk) => {
                assert_eq!(chunk.agent.as_deref(), Some("The Skeptic"));
                assert_eq!(chunk.chunk, "Hmm");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_empty_payload_is_empty_record() {
        let event = decode(&frame("done", "")).unwrap().unwrap();
        assert_eq!(event, CouncilEvent::Done(RunDone::default()));
        let event = decode(&frame("done", "null")).unwrap().unwrap();
        assert_eq!(event, CouncilEvent::Done(RunDone::default()));
    }

    #[test]
    fn test_unknown_event_ignored() {
        assert!(decode(&frame("heartbeat", "{}")).unwrap().is_none());
        assert!(decode(&frame("heartbeat", "not json")).unwrap().is_none());
    }

    #[test]
    fn test_malformed_json_errors() {
        let err = decode(&frame("critic_result", "{not json")).unwrap_err();
        assert!(err.to_string().contains("critic_result"));
    }

    #[test]
    fn test_wrong_shape_errors() {
        assert!(decode(&frame("generator_chunk", "[1,2,3]")).is_err());
    }

    #[test]
    fn test_decode_critic_with_metrics() {
        let data = r#"{
            "winner_id": "A",
            "reasoning": "clear",
            "rankings": ["A", "B"],
            "scores": {"A": 9, "B": 6.5},
            "flaws": {"A": "none", "B": ["vague"]},
            "model": "critic-model",
            "time_taken": 3.25,
            "usage": {"total": 40, "prompt": 30, "completion": 10}
        }"#;
        let event = decode(&frame("critic_result", data)).unwrap().unwrap();
        let CouncilEvent::CriticResult(critic) = event else {
            panic!("expected critic_result");
        };
        assert_eq!(critic.winner_id.as_deref(), Some("A"));
        assert_eq!(critic.scores["A"], 9.0);
        assert_eq!(critic.scores["B"], 6.5);
        assert_eq!(critic.flaws["B"], Flaw::Many(vec!["vague".into()]));
        assert_eq!(critic.metrics.model.as_deref(), Some("critic-model"));
        assert_eq!(critic.metrics.time_taken, Some(3.25));
        assert_eq!(critic.metrics.usage.unwrap().total, 40);
    }

    #[test]
    fn test_decode_done_totals() {
        let data = r#"{"total_execution_time":12.5,"total_tokens":{"total":500,"prompt":300,"completion":200}}"#;
        let CouncilEvent::Done(done) = decode(&frame("done", data)).unwrap().unwrap() else {
            panic!("expected done");
        };
        assert_eq!(done.total_execution_time, Some(12.5));
        assert_eq!(done.total_tokens.unwrap().completion, 200);
    }

    #[test]
    fn test_null_architect_fields_keep_blueprint() {
        let data = r#"{"structure":["s1"],"missing_facts_to_add":null,"tone_guidelines":"plain","critique_integration":null}"#;
        let CouncilEvent::ArchitectResult(result) =
            decode(&frame("architect_result", data)).unwrap().unwrap()
        else {
            panic!("expected architect_result");
        };
        assert_eq!(result.structure, vec!["s1"]);
        assert!(result.missing_facts_to_add.is_empty());
        assert_eq!(result.tone_guidelines, "plain");
        assert!(result.critique_integration.is_empty());
    }

    #[test]
    fn test_null_fields_keep_critic_scores() {
        let data = r#"{
            "winner_id": "A",
            "rankings": null,
            "scores": {"A": 8},
            "flaws": null,
            "time_taken": 1.0,
            "usage": {"total": null, "prompt": 3, "completion": null}
        }"#;
        let CouncilEvent::CriticResult(critic) =
            decode(&frame("critic_result", data)).unwrap().unwrap()
        else {
            panic!("expected critic_result");
        };
        assert_eq!(critic.scores["A"], 8.0);
        assert!(critic.flaws.is_empty());
        assert!(critic.rankings.is_none());
        let usage = critic.metrics.usage.unwrap();
        assert_eq!(usage.total, 0);
        assert_eq!(usage.prompt, 3);
    }

    #[test]
    fn test_null_chunk_is_empty() {
        let event = decode(&frame("finalizer_chunk", r#"{"chunk":null}"#))
            .unwrap()
            .unwrap();
        let CouncilEvent::FinalizerChunk(chunk) = event else {
            panic!("expected finalizer_chunk");
        };
        assert!(chunk.chunk.is_empty());
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let event = decode(&frame(
            "architect_result",
            r#"{"structure":["s1"],"extra":{"nested":true}}"#,
        ))
        .unwrap()
        .unwrap();
        let CouncilEvent::ArchitectResult(result) = event else {
            panic!("expected architect_result");
        };
        assert_eq!(result.structure, vec!["s1"]);
    }
}
