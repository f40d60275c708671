//! Command execution.

use anyhow::{bail, Context, Result};
use coordination::session::Agent;
use coordination::store::{JsonFileSnapshotStore, SessionStore};
use coordination::stream::{drive, StreamOutcome};
use std::io::Write;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command};
use crate::client::CouncilClient;
use crate::config::CouncilConfig;
use crate::render::{write_session, write_session_list, ProgressPrinter};

/// Run one parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = CouncilConfig::default().with_overrides(cli.api_url, cli.state_path);
    debug!(api_url = %config.api_url, state_path = %config.state_path.display(), "Configuration");

    let mut store = open_store(&config)?;
    let client = CouncilClient::new(config).context("Failed to build HTTP client")?;
    let mut out = std::io::stdout();

    match cli.command {
        Command::Summon { query, agents } => {
            summon(&mut store, &client, &query, &agents).await?;
        }
        Command::Sessions => {
            write_session_list(&mut out, store.sessions(), store.current_session_id())?;
        }
        Command::Show { id } => {
            let id = resolve_session_id(&store, &id)?;
            store.load_session(&id);
            if let Some(session) = store.session(&id) {
                write_session(&mut out, session)?;
            }
        }
        Command::Delete { id } => {
            let id = resolve_session_id(&store, &id)?;
            store.delete_session(&id);
            writeln!(out, "Deleted {}", id)?;
        }
        Command::Reset => {
            store.reset_all();
            writeln!(out, "Current session and draft cleared")?;
        }
        Command::Settings { api_key, models } => {
            if let Some(key) = api_key {
                store.set_api_key(&key);
            }
            for (role, model) in &models {
                store.set_model_override(role, model);
            }
            let settings = store.settings();
            let key_state = if settings.api_key.is_empty() {
                "server default"
            } else {
                "custom key set"
            };
            writeln!(out, "API key: {}", key_state)?;
            if settings.model_overrides.is_empty() {
                writeln!(out, "Models:  server defaults")?;
            }
            for (role, model) in &settings.model_overrides {
                writeln!(out, "  {} = {}", role, model)?;
            }
        }
        Command::Theme => {
            let theme = store.toggle_theme();
            writeln!(out, "Theme: {}", theme)?;
        }
        Command::Health => {
            if client.health().await {
                writeln!(out, "Council service is up")?;
            } else {
                bail!("Council service is not reachable");
            }
        }
        Command::CheckCredentials { api_key } => {
            let result = client
                .check_credentials(&api_key)
                .await
                .context("Credential check failed")?;
            report_check(&mut out, result.ok, &result.detail)?;
        }
        Command::CheckModel { model_id, api_key } => {
            let key = api_key.or_else(|| Some(store.settings().api_key.clone()));
            let result = client
                .check_model(&model_id, key.as_deref())
                .await
                .context("Model check failed")?;
            report_check(&mut out, result.ok, &result.detail)?;
        }
        Command::Defaults => {
            let defaults = client
                .config_defaults()
                .await
                .context("Failed to fetch service defaults")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&defaults)?)?;
        }
    }
    Ok(())
}

fn open_store(config: &CouncilConfig) -> Result<SessionStore> {
    let backend = JsonFileSnapshotStore::new(&config.state_path);
    SessionStore::open(Box::new(backend))
        .with_context(|| format!("Failed to load {}", config.state_path.display()))
}

async fn summon(
    store: &mut SessionStore,
    client: &CouncilClient,
    query: &str,
    names: &[String],
) -> Result<()> {
    let agents = seat_agents(names);
    store.set_query(query);
    let Some(ticket) = store.start_session(query, &agents) else {
        bail!("Nothing to summon: the query is empty or no agent is seated");
    };
    let session_id = ticket.session_id.clone();

    let cancel = ticket.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping session");
            cancel.cancel();
        }
    });

    let response = tokio::select! {
        biased;
        _ = ticket.cancel.cancelled() => None,
        response = client.summon(&ticket.request) => Some(response),
    };
    let response = match response {
        None => {
            store.finish_stream(&session_id, &StreamOutcome::Cancelled);
            eprintln!("Session stopped.");
            return Ok(());
        }
        Some(Ok(response)) => response,
        Some(Err(e)) => {
            store.finish_stream(&session_id, &StreamOutcome::Failed(e.to_string()));
            return Err(e).context("Failed to summon the council");
        }
    };

    let mut printer = ProgressPrinter::new(std::io::stdout());
    let outcome = drive(
        store,
        &session_id,
        response.bytes_stream(),
        &ticket.cancel,
        |session, event| {
            if let Err(e) = printer.on_event(session, event) {
                warn!(error = %e, "Failed to write progress");
            }
        },
    )
    .await;

    match outcome {
        StreamOutcome::Completed => {
            println!("Session {} saved.", short(&session_id));
            Ok(())
        }
        StreamOutcome::Cancelled => {
            eprintln!("Session stopped.");
            Ok(())
        }
        StreamOutcome::Failed(reason) => bail!("Stream interrupted: {}", reason),
    }
}

/// The default roster with only `names` selected; unknown names join as
/// extra agents. No names seats everyone.
pub fn seat_agents(names: &[String]) -> Vec<Agent> {
    let mut agents = Agent::default_roster();
    if names.is_empty() {
        return agents;
    }
    for agent in &mut agents {
        agent.selected = names.iter().any(|n| n == &agent.id);
    }
    for name in names {
        if !agents.iter().any(|a| &a.id == name) {
            agents.push(Agent::new(name));
        }
    }
    agents
}

/// Resolve a full id or a unique id prefix.
pub fn resolve_session_id(store: &SessionStore, prefix: &str) -> Result<String> {
    if store.session(prefix).is_some() {
        return Ok(prefix.to_string());
    }
    let matches: Vec<_> = store
        .sessions()
        .iter()
        .filter(|s| s.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("No session matches `{}`", prefix),
        many => bail!("`{}` matches {} sessions; use more characters", prefix, many.len()),
    }
}

fn report_check(out: &mut impl Write, ok: bool, detail: &str) -> Result<()> {
    if ok {
        writeln!(out, "OK: {}", detail)?;
        Ok(())
    } else {
        bail!("Rejected: {}", detail)
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_all_by_default() {
        let agents = seat_agents(&[]);
        assert_eq!(agents.len(), 5);
        assert!(agents.iter().all(|a| a.selected));
    }

    #[test]
    fn test_seat_named_and_custom_agents() {
        let agents = seat_agents(&["The Skeptic".to_string(), "The Poet".to_string()]);
        let selected: Vec<_> = agents
            .iter()
            .filter(|a| a.selected)
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(selected, vec!["The Skeptic", "The Poet"]);
        assert_eq!(agents.len(), 6);
    }

    #[test]
    fn test_resolve_session_prefix() {
        let mut store = SessionStore::in_memory();
        let a = store.start_session("a", &seat_agents(&[])).unwrap();
        let b = store.start_session("b", &seat_agents(&[])).unwrap();

        assert_eq!(resolve_session_id(&store, &a.session_id).unwrap(), a.session_id);
        let prefix = &b.session_id[..8];
        assert_eq!(resolve_session_id(&store, prefix).unwrap(), b.session_id);
        assert!(resolve_session_id(&store, "zzzz-no-such").is_err());
        // Every id matches the empty prefix.
        assert!(resolve_session_id(&store, "").is_err());
    }

    #[test]
    fn test_report_check() {
        let mut out = Vec::new();
        report_check(&mut out, true, "Model verified").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "OK: Model verified\n");
        assert!(report_check(&mut Vec::new(), false, "bad key").is_err());
    }
}
