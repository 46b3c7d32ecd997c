use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Agendabot";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info"
}

/// Get the application data directory
/// ~/Agendabot/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Agendabot")
}

/// Runtime settings, read from the environment (a `.env` file is loaded at
/// startup). Everything has a local-first default so the binary runs with no
/// configuration at all.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the Ollama backend.
    pub backend_url: String,
    /// Model name handed to the backend on every generate call.
    pub model: String,
    /// Path of the SQLite appointment ledger.
    pub db_path: PathBuf,
    /// Uniform timeout applied to every backend call.
    pub timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        // Older deployments configured the full generate endpoint; accept
        // both forms and keep only the base.
        let backend_url = std::env::var("OLLAMA_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string())
            .trim_end_matches('/')
            .trim_end_matches("/api/generate")
            .trim_end_matches('/')
            .to_string();

        let model = std::env::var("MODEL_NAME").unwrap_or_else(|_| "mistral:7b".to_string());

        let db_path = std::env::var("AGENDABOT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir().join("agendabot.db"));

        let timeout_secs = std::env::var("AGENDABOT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            backend_url,
            model,
            db_path,
            timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Agendabot"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
