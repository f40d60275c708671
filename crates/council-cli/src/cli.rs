use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Council deliberation client
#[derive(Debug, Parser)]
#[command(name = "council", version, about)]
pub struct Cli {
    /// Orchestration service base URL (overrides COUNCIL_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Snapshot file (overrides COUNCIL_STATE_PATH)
    #[arg(long, global = true)]
    pub state_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Start a deliberation and stream it to the terminal. Ctrl-C stops it.
    Summon {
        query: String,
        /// Agent to seat (repeatable); the default roster when omitted
        #[arg(long = "agent")]
        agents: Vec<String>,
    },
    /// List stored sessions, newest first
    Sessions,
    /// Load a session (id or unique prefix) and print it
    Show { id: String },
    /// Delete a session (id or unique prefix)
    Delete { id: String },
    /// Clear the current session and draft; sessions are kept
    Reset,
    /// Show or change the API key and per-role model overrides
    Settings {
        /// API key sent with each summon; empty string clears it
        #[arg(long)]
        api_key: Option<String>,
        /// ROLE=MODEL override (repeatable); an empty MODEL clears it
        #[arg(long = "model", value_parser = parse_model_override)]
        models: Vec<(String, String)>,
    },
    /// Toggle between dark and light theme
    Theme,
    /// Check that the service is up
    Health,
    /// Validate an API key with the service
    CheckCredentials { api_key: String },
    /// Validate a model id with the service
    CheckModel {
        model_id: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Print the service's default configuration
    Defaults,
}

/// Parse `ROLE=MODEL`.
pub fn parse_model_override(raw: &str) -> Result<(String, String), String> {
    let (role, model) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=MODEL, got `{}`", raw))?;
    let role = role.trim();
    if role.is_empty() {
        return Err(format!("missing role in `{}`", raw));
    }
    Ok((role.to_string(), model.trim().to_string()))
}
