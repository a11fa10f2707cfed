//! Client configuration.
//!
//! ```ignore
//! use chatwire::config::ClientConfig;
//!
//! let config = ClientConfig::from_env()
//!     .with_api_origin("https://chat.example.com")
//!     .with_auth_enabled(true);
//! ```

use crate::policy::RequestPolicy;

/// Environment variable overriding the API origin.
pub const API_BASE_URL_ENV: &str = "CHATWIRE_API_BASE_URL";

/// Environment variable enabling the unauthorized hook (`"true"`).
pub const ENABLE_AUTH_ENV: &str = "CHATWIRE_ENABLE_AUTH";

pub const DEFAULT_API_ORIGIN: &str = "http://localhost:52538";
pub const DEFAULT_CHAT_PATH: &str = "/api/v1/chat";
pub const DEFAULT_SESSIONS_PATH: &str = "/api/v1/sessions";
pub const DEFAULT_DEVOPS_PREFIX: &str = "/eino/devops";

/// Where the chat backend lives and how requests to it are attempted.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and authority, no trailing slash; empty means relative URLs
    pub api_origin: String,
    /// Install the unauthorized hook on every request policy
    pub auth_enabled: bool,
    pub chat_path: String,
    pub sessions_path: String,
    /// Prefix of the devtools endpoints; stripped from pasted origins
    pub devops_prefix: String,
    /// Devtools JSON endpoints (ping, graphs, debug threads)
    pub default_policy: RequestPolicy,
    /// Chat and debug runs stream for as long as they run, so no deadline
    pub stream_policy: RequestPolicy,
    pub session_policy: RequestPolicy,
    pub user_agent: String,
    /// Report invalid event frames to the stream handler instead of
    /// dropping them
    pub strict_events: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            auth_enabled: false,
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            sessions_path: DEFAULT_SESSIONS_PATH.to_string(),
            devops_prefix: DEFAULT_DEVOPS_PREFIX.to_string(),
            default_policy: RequestPolicy::default(),
            stream_policy: RequestPolicy::default()
                .with_timeout_ms(0)
                .with_retry_count(0),
            session_policy: RequestPolicy::default()
                .with_timeout_ms(10_000)
                .with_retry_count(1),
            user_agent: format!("chatwire/{}", env!("CARGO_PKG_VERSION")),
            strict_events: false,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API origin; the value is normalized.
    pub fn with_api_origin(mut self, origin: impl AsRef<str>) -> Self {
        self.api_origin = normalize_api_origin(origin.as_ref(), &self.devops_prefix);
        self
    }

    pub fn with_auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    pub fn with_sessions_path(mut self, path: impl Into<String>) -> Self {
        self.sessions_path = path.into();
        self
    }

    pub fn with_default_policy(mut self, policy: RequestPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_stream_policy(mut self, policy: RequestPolicy) -> Self {
        self.stream_policy = policy;
        self
    }

    pub fn with_session_policy(mut self, policy: RequestPolicy) -> Self {
        self.session_policy = policy;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_strict_events(mut self, strict: bool) -> Self {
        self.strict_events = strict;
        self
    }

    /// Defaults overridden by `CHATWIRE_API_BASE_URL` and
    /// `CHATWIRE_ENABLE_AUTH`.
    ///
    /// An empty base URL is kept: requests then use relative paths.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(origin) = std::env::var(API_BASE_URL_ENV) {
            config = config.with_api_origin(origin);
        }
        if let Ok(flag) = std::env::var(ENABLE_AUTH_ENV) {
            config.auth_enabled = flag.trim() == "true";
        }
        config
    }

    /// `api_origin` joined with `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_origin, path)
    }

    pub fn chat_url(&self) -> String {
        self.url(&self.chat_path)
    }

    pub fn sessions_url(&self) -> String {
        self.url(&self.sessions_path)
    }

    /// Devtools endpoint under the devops prefix.
    pub fn devops_url(&self, path: &str) -> String {
        format!("{}{}{}", self.api_origin, self.devops_prefix, path)
    }
}

/// Trim whitespace and trailing slashes, then strip a trailing
/// `devops_prefix` so it is never doubled when joined.
pub fn normalize_api_origin(input: &str, devops_prefix: &str) -> String {
    let origin = input.trim().trim_end_matches('/');
    let prefix = devops_prefix.trim_end_matches('/');
    let origin = if prefix.is_empty() {
        origin
    } else {
        origin.strip_suffix(prefix).unwrap_or(origin)
    };
    origin.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(API_BASE_URL_ENV);
        std::env::remove_var(ENABLE_AUTH_ENV);
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_origin, "http://localhost:52538");
        assert!(!config.auth_enabled);
        assert_eq!(config.chat_url(), "http://localhost:52538/api/v1/chat");
        assert_eq!(config.sessions_url(), "http://localhost:52538/api/v1/sessions");
        assert_eq!(config.stream_policy.timeout_ms, 0);
        assert_eq!(config.stream_policy.retry_count, 0);
        assert_eq!(config.session_policy.timeout_ms, 10_000);
        assert_eq!(config.session_policy.retry_count, 1);
        assert_eq!(config.default_policy.timeout_ms, 15_000);
        assert!(config.user_agent.starts_with("chatwire/"));
    }

    #[test]
    fn test_normalize_api_origin() {
        let prefix = DEFAULT_DEVOPS_PREFIX;
        assert_eq!(normalize_api_origin("  http://a.test/  ", prefix), "http://a.test");
        assert_eq!(normalize_api_origin("http://a.test///", prefix), "http://a.test");
        assert_eq!(normalize_api_origin("http://a.test/eino/devops", prefix), "http://a.test");
        assert_eq!(normalize_api_origin("http://a.test/eino/devops/", prefix), "http://a.test");
        assert_eq!(normalize_api_origin("http://a.test/api", prefix), "http://a.test/api");
        assert_eq!(normalize_api_origin("", prefix), "");
    }

    #[test]
    fn test_devops_url_not_doubled() {
        let config = ClientConfig::new().with_api_origin("http://a.test/eino/devops");
        assert_eq!(config.devops_url("/debug"), "http://a.test/eino/devops/debug");
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var(API_BASE_URL_ENV, "https://chat.example.com/");
        std::env::set_var(ENABLE_AUTH_ENV, "true");

        let config = ClientConfig::from_env();
        assert_eq!(config.api_origin, "https://chat.example.com");
        assert!(config.auth_enabled);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_empty_origin_is_relative() {
        clear_env();
        std::env::set_var(API_BASE_URL_ENV, "");
        std::env::set_var(ENABLE_AUTH_ENV, "1");

        let config = ClientConfig::from_env();
        assert_eq!(config.api_origin, "");
        assert_eq!(config.chat_url(), "/api/v1/chat");
        assert!(!config.auth_enabled);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_unset_uses_defaults() {
        clear_env();
        let config = ClientConfig::from_env();
        assert_eq!(config.api_origin, DEFAULT_API_ORIGIN);
        assert!(!config.auth_enabled);
    }
}
