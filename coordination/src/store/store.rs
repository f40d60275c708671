//! Session store: ordered sessions, the live stream, the draft and user
//! preferences.
//!
//! The store is the only writer of session records. Events reach a session
//! through [`SessionStore::apply_event`], which accepts them only while that
//! session is live. Every change is written through the configured
//! [`SnapshotStore`]; write failures are logged and otherwise ignored.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{PersistenceResult, StoreError};
use super::persistence::{MemorySnapshotStore, Snapshot, SnapshotStore};
use super::settings::{Theme, UserSettings};
use crate::session::{reduce, repair_session, Agent, LogEntry, Session, SessionId};
use crate::stream::{CouncilEvent, StreamOutcome, SummonRequest};

/// Log entry appended when the user stops a live session.
pub const STOPPED_BY_USER: &str = "Session stopped by user.";

const STOP_SENDER: &str = "Internal";
const SYSTEM_SENDER: &str = "System";

/// Handle for a freshly started session: what to send and how to cancel it.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    pub session_id: SessionId,
    pub cancel: CancellationToken,
    pub request: SummonRequest,
}

#[derive(Debug)]
struct LiveStream {
    session_id: SessionId,
    cancel: CancellationToken,
}

/// Query and agent selection being edited for the next session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub query: String,
    pub agents: Vec<Agent>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            query: String::new(),
            agents: Agent::default_roster(),
        }
    }
}

/// Owner of every session record.
pub struct SessionStore {
    /// Newest first.
    sessions: Vec<Session>,
    current_session_id: Option<SessionId>,
    live: Option<LiveStream>,
    draft: Draft,
    theme: Theme,
    settings: UserSettings,
    backend: Box<dyn SnapshotStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("current_session_id", &self.current_session_id)
            .field("live", &self.live_session_id())
            .field("theme", &self.theme)
            .finish()
    }
}

impl SessionStore {
    /// Empty store writing through `backend`. Nothing is loaded.
    pub fn new(backend: Box<dyn SnapshotStore>) -> Self {
        Self {
            sessions: Vec::new(),
            current_session_id: None,
            live: None,
            draft: Draft::default(),
            theme: Theme::default(),
            settings: UserSettings::default(),
            backend,
        }
    }

    /// Store restored from whatever `backend` holds.
    pub fn open(backend: Box<dyn SnapshotStore>) -> PersistenceResult<Self> {
        let mut store = Self::new(backend);
        if let Some(json) = store.backend.load()? {
            let snapshot = Snapshot::from_json(&json)?;
            info!(sessions = snapshot.sessions.len(), "Restored session snapshot");
            store.sessions = snapshot.sessions;
            store.current_session_id = snapshot.current_session_id;
            store.theme = snapshot.theme;
            store.settings = snapshot.settings;
        }
        Ok(store)
    }

    /// Store backed by a private in-memory slot.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySnapshotStore::new()))
    }

    // ------------------------------------------------------------------
    // Stream lifecycle
    // ------------------------------------------------------------------

    /// Create a session and make it live.
    ///
    /// Returns `None` (and changes nothing) when the query is blank or no
    /// agent is selected. Any session still live is cancelled first.
    pub fn start_session(&mut self, query: &str, agents: &[Agent]) -> Option<StreamTicket> {
        if query.trim().is_empty() {
            debug!("Not starting a session: empty query");
            return None;
        }
        if !agents.iter().any(|a| a.selected) {
            debug!("Not starting a session: no agent selected");
            return None;
        }

        if let Some(previous) = self.live.take() {
            info!(session_id = %previous.session_id, "Cancelling live session for a new one");
            previous.cancel.cancel();
        }

        let session = Session::new(query, agents.to_vec());
        let session_id = session.id.clone();
        let request = SummonRequest::new(query, session.selected_agent_ids(), &self.settings);
        let cancel = CancellationToken::new();

        self.sessions.insert(0, session);
        self.current_session_id = Some(session_id.clone());
        self.live = Some(LiveStream {
            session_id: session_id.clone(),
            cancel: cancel.clone(),
        });
        self.persist();

        info!(session_id = %session_id, agents = request.selected_agents.len(), "Session started");
        Some(StreamTicket {
            session_id,
            cancel,
            request,
        })
    }

    /// Reduce one event into the live session.
    pub fn apply_event(
        &mut self,
        session_id: &str,
        event: &CouncilEvent,
    ) -> Result<(), StoreError> {
        if self.live_session_id() != Some(session_id) {
            return Err(if self.session(session_id).is_some() {
                StoreError::SessionFrozen(session_id.to_string())
            } else {
                StoreError::SessionNotFound(session_id.to_string())
            });
        }
        let index = self
            .index_of(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

        debug!(session_id, event_type = event.event_type(), "Applying event");
        let session = std::mem::take(&mut self.sessions[index]);
        self.sessions[index] = reduce(session, event);

        if event.is_terminal() {
            self.live = None;
            info!(session_id, "Session finished");
        }
        self.persist();
        Ok(())
    }

    /// Cancel the live stream, if any. Returns whether anything was stopped.
    ///
    /// The session keeps its phase and data and gains one system entry.
    pub fn stop_session(&mut self) -> bool {
        let Some(live) = self.live.take() else {
            return false;
        };
        live.cancel.cancel();
        if let Some(index) = self.index_of(&live.session_id) {
            self.sessions[index].push_log(LogEntry::system(STOP_SENDER, STOPPED_BY_USER));
        }
        self.persist();
        info!(session_id = %live.session_id, "Session stopped by user");
        true
    }

    /// Transport ended for `session_id`. A stale report about a session that
    /// is no longer live is ignored.
    pub fn finish_stream(&mut self, session_id: &str, outcome: &StreamOutcome) {
        if self.live_session_id() != Some(session_id) {
            debug!(session_id, ?outcome, "Ignoring end of a stream that is not live");
            return;
        }

        match outcome {
            StreamOutcome::Cancelled => {
                self.stop_session();
            }
            StreamOutcome::Completed => {
                self.live = None;
                info!(session_id, "Stream closed");
                self.persist();
            }
            StreamOutcome::Failed(reason) => {
                self.live = None;
                warn!(session_id, reason = %reason, "Stream failed");
                if let Some(index) = self.index_of(session_id) {
                    let content = format!("Connection to the council failed: {}", reason);
                    self.sessions[index].push_log(LogEntry::system(SYSTEM_SENDER, &content));
                }
                self.persist();
            }
        }
    }

    // ------------------------------------------------------------------
    // Session management
    // ------------------------------------------------------------------

    /// Make `session_id` current and copy its query and agents into the
    /// draft. Legacy records get their phase repaired. Unknown ids are a
    /// no-op returning `false`.
    pub fn load_session(&mut self, session_id: &str) -> bool {
        let Some(index) = self.index_of(session_id) else {
            debug!(session_id, "Cannot load unknown session");
            return false;
        };

        let session = &mut self.sessions[index];
        if repair_session(session) {
            info!(session_id, phase = %session.phase(), "Repaired legacy session");
        }
        self.draft = Draft {
            query: session.query.clone(),
            agents: session.agents.clone(),
        };
        self.current_session_id = Some(session_id.to_string());
        self.persist();
        true
    }

    /// Remove a session, cancelling its stream when it is live.
    pub fn delete_session(&mut self, session_id: &str) -> bool {
        let Some(index) = self.index_of(session_id) else {
            return false;
        };

        if self.live_session_id() == Some(session_id) {
            if let Some(live) = self.live.take() {
                live.cancel.cancel();
            }
        }
        self.sessions.remove(index);
        if self.current_session_id.as_deref() == Some(session_id) {
            self.current_session_id = None;
        }
        self.persist();
        info!(session_id, "Session deleted");
        true
    }

    /// Clear the current pointer and the draft. Sessions are untouched.
    pub fn reset_all(&mut self) {
        self.current_session_id = None;
        self.draft = Draft::default();
        self.persist();
    }

    // ------------------------------------------------------------------
    // Draft and preferences
    // ------------------------------------------------------------------

    pub fn set_query(&mut self, query: &str) {
        self.draft.query = query.to_string();
    }

    /// Flip the selection of one draft agent. Returns `false` for unknown ids.
    pub fn toggle_agent(&mut self, agent_id: &str) -> bool {
        match self.draft.agents.iter_mut().find(|a| a.id == agent_id) {
            Some(agent) => {
                agent.selected = !agent.selected;
                true
            }
            None => false,
        }
    }

    pub fn toggle_all_agents(&mut self, selected: bool) {
        for agent in &mut self.draft.agents {
            agent.selected = selected;
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.persist();
        self.theme
    }

    pub fn set_settings(&mut self, settings: UserSettings) {
        self.settings = settings;
        self.persist();
    }

    pub fn set_api_key(&mut self, api_key: &str) {
        self.settings.api_key = api_key.trim().to_string();
        self.persist();
    }

    pub fn set_model_override(&mut self, role: &str, model: &str) {
        self.settings.set_model_override(role, model);
        self.persist();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// All sessions, newest first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    pub fn live_session_id(&self) -> Option<&str> {
        self.live.as_ref().map(|l| l.session_id.as_str())
    }

    pub fn is_streaming(&self) -> bool {
        self.live.is_some()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// The durable subset of the store.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: Snapshot::CURRENT_VERSION,
            sessions: self.sessions.clone(),
            current_session_id: self.current_session_id.clone(),
            theme: self.theme,
            settings: self.settings.clone(),
        }
    }

    fn index_of(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }

    fn persist(&self) {
        let result = self
            .snapshot()
            .to_json()
            .and_then(|json| self.backend.save(&json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session snapshot");
        }
    }
}
