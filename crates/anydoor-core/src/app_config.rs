use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Connection settings for the completion backend.
///
/// Every field except the numeric limits is optional at startup: the server
/// boots without a backend and reports a configuration error only when a
/// request actually needs one.
#[derive(Clone, Default)]
pub struct GenerationSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub free_model: Option<String>,
    pub max_tokens: u32,
    pub connect_timeout_secs: u64,
}

/// A fully resolved backend call target: endpoint, credentials, and model.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    /// Target used for streamed page generation (`GENERATION_MODEL`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first unset variable.
    pub fn page_target(&self) -> Result<BackendTarget, ConfigError> {
        self.target(self.model.as_deref(), "GENERATION_MODEL", Some(self.max_tokens))
    }

    /// Target used for the short random-word completion (`GENERATION_FREE_MODEL`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first unset variable.
    pub fn free_target(&self) -> Result<BackendTarget, ConfigError> {
        self.target(self.free_model.as_deref(), "GENERATION_FREE_MODEL", None)
    }

    fn target(
        &self,
        model: Option<&str>,
        model_var: &str,
        max_tokens: Option<u32>,
    ) -> Result<BackendTarget, ConfigError> {
        let endpoint = non_empty(self.endpoint.as_deref(), "GENERATION_API_ENDPOINT")?;
        let api_key = non_empty(self.api_key.as_deref(), "GENERATION_API_KEY")?;
        let model = non_empty(model, model_var)?;
        Ok(BackendTarget {
            endpoint,
            api_key,
            model,
            max_tokens,
        })
    }
}

fn non_empty(value: Option<&str>, var: &str) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_owned()),
        _ => Err(ConfigError::MissingEnvVar(var.to_owned())),
    }
}

impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("free_model", &self.free_model)
            .field("max_tokens", &self.max_tokens)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendTarget")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub host_url: String,
    pub site_name: String,
    pub rules_path: Option<PathBuf>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub generation: GenerationSettings,
    pub retention_cron: String,
    pub event_retention_days: u32,
    pub search_log_retention_days: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("host_url", &self.host_url)
            .field("site_name", &self.site_name)
            .field("rules_path", &self.rules_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("generation", &self.generation)
            .field("retention_cron", &self.retention_cron)
            .field("event_retention_days", &self.event_retention_days)
            .field("search_log_retention_days", &self.search_log_retention_days)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_settings() -> GenerationSettings {
        GenerationSettings {
            endpoint: Some("https://llm.example.com/v1/chat/completions".to_string()),
            api_key: Some("sk-secret".to_string()),
            model: Some("page-model".to_string()),
            free_model: Some("word-model".to_string()),
            max_tokens: 4096,
            connect_timeout_secs: 10,
        }
    }

    #[test]
    fn page_target_uses_page_model_and_token_limit() {
        let target = full_settings().page_target().expect("target");
        assert_eq!(target.model, "page-model");
        assert_eq!(target.max_tokens, Some(4096));
    }

    #[test]
    fn free_target_has_no_token_limit() {
        let target = full_settings().free_target().expect("target");
        assert_eq!(target.model, "word-model");
        assert_eq!(target.max_tokens, None);
    }

    #[test]
    fn missing_endpoint_names_the_variable() {
        let settings = GenerationSettings {
            endpoint: None,
            ..full_settings()
        };
        let err = settings.page_target().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "GENERATION_API_ENDPOINT"));
    }

    #[test]
    fn blank_model_counts_as_missing() {
        let settings = GenerationSettings {
            model: Some("   ".to_string()),
            ..full_settings()
        };
        let err = settings.page_target().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "GENERATION_MODEL"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", full_settings());
        assert!(!rendered.contains("sk-secret"));
        let rendered = format!("{:?}", full_settings().page_target().expect("target"));
        assert!(!rendered.contains("sk-secret"));
    }
}
