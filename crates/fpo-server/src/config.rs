//! Server configuration, read from `FPO_*` environment variables.

use std::str::FromStr;

use fpo_access::AccessClientConfig;
use fpo_db::DbConfig;
use fpo_lifecycle::LifecycleConfig;

use crate::error::ServerError;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub access: AccessClientConfig,
    pub lifecycle: LifecycleConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();

        if let Some(url) = lookup("FPO_DB_URL") {
            config.db.url = url;
        }
        if let Some(namespace) = lookup("FPO_DB_NAMESPACE") {
            config.db.namespace = namespace;
        }
        if let Some(database) = lookup("FPO_DB_DATABASE") {
            config.db.database = database;
        }
        if let Some(username) = lookup("FPO_DB_USERNAME") {
            config.db.username = username;
        }
        if let Some(password) = lookup("FPO_DB_PASSWORD") {
            config.db.password = password;
        }

        if let Some(base_url) = lookup("FPO_ACCESS_BASE_URL") {
            config.access.base_url = base_url;
        }
        config.access.api_token = lookup("FPO_ACCESS_TOKEN").filter(|t| !t.is_empty());

        if let Some(max) = parse::<u32>(&lookup, "FPO_MAX_SETUP_ATTEMPTS")? {
            if max == 0 {
                return Err(ServerError::Config(
                    "FPO_MAX_SETUP_ATTEMPTS must be at least 1".into(),
                ));
            }
            config.lifecycle.max_setup_attempts = max;
        }
        if let Some(secs) = parse::<u64>(&lookup, "FPO_STEP_TIMEOUT_SECS")? {
            config.lifecycle.step_timeout_ms = secs.saturating_mul(1_000);
        }
        if let Some(secs) = parse::<u64>(&lookup, "FPO_PERMISSION_TIMEOUT_SECS")? {
            config.lifecycle.permission_timeout_ms = secs.saturating_mul(1_000);
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ServerError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServerError::Config(format!("{key} is not a valid number: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.namespace, "fpo");
        assert_eq!(config.lifecycle.max_setup_attempts, 3);
        assert!(config.access.api_token.is_none());
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("FPO_DB_URL", "db.internal:8000"),
            ("FPO_ACCESS_BASE_URL", "https://iam.example.org"),
            ("FPO_ACCESS_TOKEN", "secret"),
            ("FPO_MAX_SETUP_ATTEMPTS", "5"),
            ("FPO_STEP_TIMEOUT_SECS", "12"),
            ("FPO_PERMISSION_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.access.base_url, "https://iam.example.org");
        assert_eq!(config.access.api_token.as_deref(), Some("secret"));
        assert_eq!(config.lifecycle.max_setup_attempts, 5);
        assert_eq!(config.lifecycle.step_timeout_ms, 12_000);
        assert_eq!(config.lifecycle.permission_timeout_ms, 3_000);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("FPO_STEP_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("FPO_STEP_TIMEOUT_SECS"));

        assert!(ServerConfig::from_lookup(lookup(&[("FPO_MAX_SETUP_ATTEMPTS", "0")])).is_err());
    }
}
