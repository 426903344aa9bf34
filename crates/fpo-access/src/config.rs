//! Access-control client configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AccessClientConfig {
    /// Base URL of the access-control API, without a trailing `/v1`.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// TCP connect deadline in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Whole-request deadline in seconds (default: 30).
    pub request_timeout_secs: u64,
}

impl Default for AccessClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            api_token: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl AccessClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `path` joined onto the base URL.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_ignores_trailing_slash() {
        let config = AccessClientConfig {
            base_url: "https://iam.example.org/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.url("/v1/users"),
            "https://iam.example.org/v1/users"
        );
    }
}
