use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::catalog::{self, Period};
use crate::enhance::causes::{self, CauseCategory};

/// Main configuration structure loaded from lesson_forge.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Replaces the built-in causes list when non-empty
    #[serde(default)]
    pub causes: Vec<CauseCategory>,
    /// Replaces the built-in period catalog when non-empty
    #[serde(default)]
    pub periods: Vec<Period>,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP listener and browser-facing policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Exact origin allowed by CORS, or "*" for any
    pub allowed_origin: String,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allowed_origin: "*".to_string(),
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Generative model provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    /// Region the model is served from, reported by /health
    pub location: String,
    pub suggest_model: String,
    pub generate_model: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub suggestion_count: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "gemini".to_string(),
            base_url: crate::clients::gemini::DEFAULT_BASE_URL.to_string(),
            location: "europe-west1".to_string(),
            suggest_model: "gemini-1.5-flash".to_string(),
            generate_model: "gemini-1.5-pro".to_string(),
            timeout_ms: 120_000,
            temperature: 0.7,
            suggestion_count: 3,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gemini_api_key: Option<String>,
    pub log_level: String,
    pub runtime_region: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            log_level: "lesson_forge=info,tower_http=info".to_string(),
            runtime_region: None,
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        // On Cloud Run (K_SERVICE set) the platform exposes the region under several names
        let runtime_region = if env("K_SERVICE").is_some() {
            env("X_GOOGLE_RUNTIME_REGION")
                .or_else(|| env("REGION"))
                .or_else(|| env("GOOGLE_CLOUD_REGION"))
        } else {
            env("RUNTIME_REGION")
        };
        Self {
            gemini_api_key: env("GEMINI_API_KEY")
                .or_else(|| env("GOOGLE_API_KEY"))
                .filter(|k| !k.trim().is_empty()),
            log_level: env("RUST_LOG").unwrap_or(defaults.log_level),
            runtime_region,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            causes: causes::default_causes(),
            periods: catalog::builtin_periods(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses LESSON_FORGE_CONFIG environment variable or defaults to "lesson_forge.toml"
    pub fn load() -> anyhow::Result<Self> {
        crate::load_env();

        let config_path = std::env::var("LESSON_FORGE_CONFIG")
            .unwrap_or_else(|_| "lesson_forge.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document; omitted sections and lists fall back to the built-ins
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if config.causes.is_empty() {
            config.causes = causes::default_causes();
        }
        if config.periods.is_empty() {
            config.periods = catalog::builtin_periods();
        }
        Ok(config)
    }

    /// Apply env-first overrides on top of file values
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(port) = env("PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.server.bind.set_port(port);
        }
        if let Some(bind) = env("LF_HTTP_BIND").and_then(|v| v.parse::<SocketAddr>().ok()) {
            self.server.bind = bind;
        }
        if let Some(origin) = env("ALLOWED_ORIGIN") {
            self.server.allowed_origin = origin;
        }
        if let Some(base) = env("GEMINI_BASE_URL") {
            self.provider.base_url = base;
        }
        if let Some(location) = env("GEMINI_VERTEX_LOCATION") {
            self.provider.location = location;
        }
        if let Some(model) = env("GEMINI_MODEL_SUGGEST") {
            self.provider.suggest_model = model;
        }
        if let Some(model) = env("GEMINI_MODEL_GENERATE") {
            self.provider.generate_model = model;
        }
        if let Some(timeout) = env("LF_PROVIDER_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.provider.timeout_ms = timeout;
        }
        if let Some(count) = env("LF_SUGGESTION_COUNT").and_then(|v| v.parse::<usize>().ok()) {
            self.provider.suggestion_count = count;
        }
    }

    /// Validate the configuration, clamping soft limits
    pub fn validate(&mut self) -> anyhow::Result<()> {
        if self.provider.suggestion_count == 0 {
            tracing::warn!("suggestion_count 0 is not useful, raising to 1");
            self.provider.suggestion_count = 1;
        } else if self.provider.suggestion_count > 10 {
            tracing::warn!(
                "suggestion_count {} exceeds max 10, clamping to 10",
                self.provider.suggestion_count
            );
            self.provider.suggestion_count = 10;
        }
        if self.provider.timeout_ms == 0 {
            anyhow::bail!("provider.timeout_ms must be > 0");
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!("provider.temperature must be between 0.0 and 2.0");
        }
        if self.server.body_limit_bytes == 0 {
            anyhow::bail!("server.body_limit_bytes must be > 0");
        }
        if let Some(bad) = self
            .causes
            .iter()
            .position(|c| crate::enhance::inline_text(&c.category).is_empty())
        {
            anyhow::bail!("causes[{}] has an empty category label", bad);
        }
        if self.runtime.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; suggest/generate will fail upstream");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_empty_toml_uses_builtins() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.causes.len(), 6);
        assert_eq!(config.periods.len(), 10);
        assert_eq!(config.provider.suggestion_count, 3);
        assert_eq!(config.server.bind.port(), 8080);
    }

    #[test]
    fn test_toml_sections_and_custom_causes() {
        let config = Config::from_toml_str(
            r#"
            [server]
            allowed_origin = "https://lessen.example"

            [provider]
            generate_model = "gemini-2.0-pro"
            timeout_ms = 5000

            [[causes]]
            category = "Sociaal"
            items = ["standsverschil", "armoede"]
            "#,
        )
        .unwrap();
        assert_eq!(config.server.allowed_origin, "https://lessen.example");
        assert_eq!(config.server.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.provider.generate_model, "gemini-2.0-pro");
        assert_eq!(config.provider.suggest_model, "gemini-1.5-flash");
        assert_eq!(config.causes.len(), 1);
        assert_eq!(config.causes[0].items, vec!["standsverschil", "armoede"]);
    }

    #[test]
    fn test_periods_replace_catalog() {
        let config = Config::from_toml_str(
            r#"
            [[periods]]
            id = "TV6"
            label = "Regenten en vorsten"
            topics = [{ id = "23", name = "Absolutisme" }]
            "#,
        )
        .unwrap();
        assert_eq!(config.periods.len(), 1);
        assert_eq!(config.periods[0].topics[0].name, "Absolutisme");
        assert_eq!(config.causes.len(), 6);
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup(&[
            ("PORT", "9090"),
            ("ALLOWED_ORIGIN", "https://ui.example"),
            ("GEMINI_MODEL_SUGGEST", "gemini-flash-latest"),
            ("LF_PROVIDER_TIMEOUT_MS", "not-a-number"),
        ]));
        assert_eq!(config.server.bind.port(), 9090);
        assert_eq!(config.server.allowed_origin, "https://ui.example");
        assert_eq!(config.provider.suggest_model, "gemini-flash-latest");
        assert_eq!(config.provider.timeout_ms, 120_000);
    }

    #[test]
    fn test_validate_clamps_and_rejects() {
        let mut config = Config::default();
        config.provider.suggestion_count = 40;
        config.validate().unwrap();
        assert_eq!(config.provider.suggestion_count, 10);

        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    /// Collects formatted log output from a scoped subscriber
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_validate_warnings_reach_installed_subscriber() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut config = Config::default();
        config.provider.suggestion_count = 0;
        tracing::subscriber::with_default(subscriber, || config.validate().unwrap());

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("suggestion_count 0 is not useful"), "logs: {logs}");
        assert!(logs.contains("GEMINI_API_KEY is not set"), "logs: {logs}");
        assert_eq!(config.provider.suggestion_count, 1);
    }

    #[test]
    fn test_runtime_region_prefers_cloud_run_vars() {
        let rt = RuntimeConfig::from_lookup(lookup(&[
            ("K_SERVICE", "lesson-forge"),
            ("REGION", "europe-west4"),
            ("RUNTIME_REGION", "ignored"),
            ("GEMINI_API_KEY", "k"),
        ]));
        assert_eq!(rt.runtime_region.as_deref(), Some("europe-west4"));
        assert_eq!(rt.gemini_api_key.as_deref(), Some("k"));

        let local = RuntimeConfig::from_lookup(lookup(&[("RUNTIME_REGION", "local")]));
        assert_eq!(local.runtime_region.as_deref(), Some("local"));
        assert!(local.gemini_api_key.is_none());
    }
}
