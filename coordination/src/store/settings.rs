//! User preferences persisted alongside sessions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

/// Credentials and per-role model overrides sent with each summon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Empty means "use the service's own key".
    #[serde(default)]
    pub api_key: String,
    /// Role or agent name → model id.
    #[serde(default)]
    pub model_overrides: BTreeMap<String, String>,
}

impl UserSettings {
    /// Set or clear (empty `model`) the override for `role`.
    pub fn set_model_override(&mut self, role: &str, model: &str) {
        if model.trim().is_empty() {
            self.model_overrides.remove(role);
        } else {
            self.model_overrides
                .insert(role.to_string(), model.trim().to_string());
        }
    }
}
