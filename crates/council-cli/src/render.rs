//! Terminal output for live streams and stored sessions.

use coordination::session::{CouncilPhase, LogKind, Session};
use coordination::stream::CouncilEvent;
use std::io::{self, Write};

/// Prints stream progress as events are applied.
#[derive(Debug)]
pub struct ProgressPrinter<W: Write> {
    out: W,
    last_phase: Option<CouncilPhase>,
    in_final_text: bool,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_phase: None,
            in_final_text: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Report one applied event. `session` is the state after the event.
    pub fn on_event(&mut self, session: &Session, event: &CouncilEvent) -> io::Result<()> {
        let phase = session.phase();
        if self.last_phase != Some(phase) {
            self.end_final_text()?;
            writeln!(self.out, "== {} ==", phase_title(phase))?;
            self.last_phase = Some(phase);
        }

        match event {
            CouncilEvent::GeneratorStart(start) => {
                let agent = start.agent.as_deref().unwrap_or("?");
                match &start.model {
                    Some(model) => writeln!(self.out, "  {} is thinking ({})", agent, model)?,
                    None => writeln!(self.out, "  {} is thinking", agent)?,
                }
            }
            CouncilEvent::GeneratorDone(done) => {
                let agent = done.agent.as_deref().unwrap_or("?");
                let chars = session
                    .generator_streams
                    .get(agent)
                    .map(|s| s.chars().count())
                    .unwrap_or(0);
                writeln!(
                    self.out,
                    "  {} answered ({} chars, {:.1}s)",
                    agent,
                    chars,
                    done.metrics.time_taken.unwrap_or_default()
                )?;
            }
            CouncilEvent::CriticResult(batch) => {
                if let Some(winner) = batch.winner_id.as_deref().filter(|w| !w.is_empty()) {
                    writeln!(self.out, "  Critic favours {}", winner)?;
                }
            }
            CouncilEvent::ArchitectResult(result) => {
                writeln!(
                    self.out,
                    "  Blueprint with {} sections",
                    result.structure.len()
                )?;
            }
            CouncilEvent::FinalizerChunk(chunk) => {
                write!(self.out, "{}", chunk.chunk)?;
                self.in_final_text = true;
                self.out.flush()?;
            }
            CouncilEvent::Done(_) => {
                self.end_final_text()?;
                writeln!(
                    self.out,
                    "Council adjourned in {:.1}s using {} tokens",
                    session.metrics.total_time, session.metrics.total_tokens.total
                )?;
            }
            CouncilEvent::Error(error) => {
                self.end_final_text()?;
                writeln!(
                    self.out,
                    "  ! {}",
                    error.message.as_deref().unwrap_or("unknown error")
                )?;
            }
            CouncilEvent::GeneratorChunk(_) | CouncilEvent::FinalizerDone(_) => {}
        }
        Ok(())
    }

    fn end_final_text(&mut self) -> io::Result<()> {
        if self.in_final_text {
            writeln!(self.out)?;
            self.in_final_text = false;
        }
        Ok(())
    }
}

fn phase_title(phase: CouncilPhase) -> &'static str {
    match phase {
        CouncilPhase::Idle => "Idle",
        CouncilPhase::Generating => "Phase 1: Generation",
        CouncilPhase::Critiquing => "Phase 2: Critique",
        CouncilPhase::Architecting => "Phase 3: Architecture",
        CouncilPhase::Finalizing => "Phase 4: Final synthesis",
    }
}

/// One line per session, newest first.
pub fn write_session_list(
    out: &mut impl Write,
    sessions: &[Session],
    current: Option<&str>,
) -> io::Result<()> {
    if sessions.is_empty() {
        return writeln!(out, "No sessions yet.");
    }
    for session in sessions {
        let marker = if current == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        writeln!(out, "{} {}", marker, session.status_line())?;
    }
    Ok(())
}

/// Everything recorded for one session.
pub fn write_session(out: &mut impl Write, session: &Session) -> io::Result<()> {
    writeln!(out, "Session {}", session.id)?;
    writeln!(out, "Date:    {}", session.date.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "Query:   {}", session.query)?;
    writeln!(out, "Phase:   {}", phase_title(session.phase()))?;
    writeln!(out, "Summary: {}", session.summary)?;
    writeln!(out, "Agents:  {}", session.selected_agent_ids().join(", "))?;

    for (agent, text) in &session.generator_streams {
        writeln!(out)?;
        match session.agent_models.get(agent) {
            Some(model) => writeln!(out, "--- {} ({}) ---", agent, model)?,
            None => writeln!(out, "--- {} ---", agent)?,
        }
        writeln!(out, "{}", text)?;
    }

    if let Some(critic) = &session.critic_data {
        writeln!(out)?;
        writeln!(out, "--- Critic ---")?;
        writeln!(out, "Winner: {}", critic.winner_id)?;
        for (agent, score) in &critic.scores {
            writeln!(out, "  {:<24} {:>5.1}", agent, score)?;
        }
        for (agent, flaw) in &critic.flaws {
            writeln!(out, "  {} flaws: {}", agent, flaw)?;
        }
        if !critic.reasoning.is_empty() {
            writeln!(out, "{}", critic.reasoning)?;
        }
    }

    if let Some(architect) = &session.architect_data {
        writeln!(out)?;
        writeln!(out, "--- Blueprint ---")?;
        for (i, section) in architect.structure.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, section)?;
        }
        for fact in &architect.missing_facts_to_add {
            writeln!(out, "  + {}", fact)?;
        }
        if !architect.tone_guidelines.is_empty() {
            writeln!(out, "Tone: {}", architect.tone_guidelines)?;
        }
    }

    if !session.finalizer_text.is_empty() {
        writeln!(out)?;
        writeln!(out, "--- Final answer ---")?;
        writeln!(out, "{}", session.finalizer_text)?;
    }

    let notes: Vec<_> = session
        .messages
        .iter()
        .filter(|m| m.kind == LogKind::System)
        .collect();
    if !notes.is_empty() {
        writeln!(out)?;
        for note in notes {
            writeln!(out, "[{}] {}", note.sender, note.content)?;
        }
    }

    if session.metrics.total_time > 0.0 {
        writeln!(out)?;
        writeln!(
            out,
            "Total: {:.1}s, {} tokens ({} prompt / {} completion)",
            session.metrics.total_time,
            session.metrics.total_tokens.total,
            session.metrics.total_tokens.prompt,
            session.metrics.total_tokens.completion
        )?;
    }
    Ok(())
}
