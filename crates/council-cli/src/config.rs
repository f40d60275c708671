use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_STATE_PATH: &str = ".council/state.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouncilConfig {
    /// Base URL of the orchestration service, without a trailing slash.
    pub api_url: String,
    /// Snapshot file holding sessions, theme and settings.
    pub state_path: PathBuf,
    /// Timeout for the short, non-streaming calls. The summon stream itself
    /// is only ended by the service or by cancellation.
    pub request_timeout: Duration,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl CouncilConfig {
    /// Build from a key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs = lookup("COUNCIL_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Self {
            api_url: normalize_url(
                &lookup("COUNCIL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            ),
            state_path: lookup("COUNCIL_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, api_url: Option<String>, state_path: Option<PathBuf>) -> Self {
        if let Some(url) = api_url {
            self.api_url = normalize_url(&url);
        }
        if let Some(path) = state_path {
            self.state_path = path;
        }
        self
    }

    /// Full URL for `path` (which starts with `/`).
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
