//! Configuration for the chat gateway.
//!
//! All settings come from the process environment. Missing secrets are not
//! validated at startup; they surface as runtime failures on first use.

use serde::{Deserialize, Serialize};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used to build the OAuth callback.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// OpenAI API key. Absent key fails on the first completion call.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
    /// How many trailing messages of a session go into the transcript.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

/// Google OAuth settings for the login flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default)]
    pub google_client_secret: Option<String>,
    /// Secret used to sign the OAuth state parameter.
    #[serde(default)]
    pub session_secret: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> i64 {
    1000
}

fn default_history_window() -> usize {
    6
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_window: default_history_window(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chat: ChatConfig::default(),
            oauth: OAuthConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load_with_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply environment variable overrides.
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("CHAT_GATEWAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CHAT_GATEWAY_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("CHAT_GATEWAY_PUBLIC_URL") {
            self.server.public_base_url = Some(url);
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.chat.openai_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("CHAT_GATEWAY_MODEL") {
            self.chat.model = model;
        }
        if let Ok(window) = std::env::var("CHAT_GATEWAY_HISTORY_WINDOW") {
            if let Ok(window) = window.parse() {
                self.chat.history_window = window;
            }
        }

        if let Ok(id) = std::env::var("GOOGLE_CLIENT_ID") {
            self.oauth.google_client_id = Some(id);
        }
        if let Ok(secret) = std::env::var("GOOGLE_CLIENT_SECRET") {
            self.oauth.google_client_secret = Some(secret);
        }
        if let Ok(secret) = std::env::var("SESSION_SECRET_KEY") {
            self.oauth.session_secret = Some(secret);
        }

        if let Ok(level) = std::env::var("CHAT_GATEWAY_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("CHAT_GATEWAY_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Base URL under which this service is reachable from the outside.
    pub fn public_base_url(&self) -> String {
        self.server
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.chat.model, "gpt-3.5-turbo");
        assert_eq!(config.chat.history_window, 6);
        assert!((config.chat.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.chat.max_tokens, 1000);
        assert!(config.oauth.google_client_id.is_none());
    }

    #[test]
    fn test_public_base_url_fallback() {
        let config = Config::default();
        assert_eq!(config.public_base_url(), "http://127.0.0.1:8000");

        let mut config = Config::default();
        config.server.public_base_url = Some("https://chat.example.com".into());
        assert_eq!(config.public_base_url(), "https://chat.example.com");
    }
}
