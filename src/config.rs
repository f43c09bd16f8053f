use std::path::PathBuf;

use serde::Deserialize;
use snafu::ResultExt;
use url::Url;

use crate::error::{ApplicationError, ConfigLoadSnafu};

pub const ENV_PREFIX: &str = "COURSEGATE_";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The backend endpoint every action is posted to.
    pub endpoint: Url,
    #[serde(default = "default_profile_path")]
    pub profile_path: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_profile_path() -> PathBuf {
    PathBuf::from("./data/profile.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Read the configuration from `COURSEGATE_*` environment variables.
pub fn load() -> Result<Config, ApplicationError> {
    envy::prefixed(ENV_PREFIX).from_env().context(ConfigLoadSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(vars(&[("COURSEGATE_ENDPOINT", "https://script.example.com/exec")]))
            .unwrap();

        assert_eq!(config.endpoint.as_str(), "https://script.example.com/exec");
        assert_eq!(config.profile_path, PathBuf::from("./data/profile.json"));
        assert_eq!(config.log_dir, PathBuf::from("./logs"));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn settings_override_defaults() {
        let config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(vars(&[
                ("COURSEGATE_ENDPOINT", "http://localhost:8080/"),
                ("COURSEGATE_PROFILE_PATH", "/tmp/student.json"),
                ("COURSEGATE_LOG_FILTER", "coursegate=debug"),
            ]))
            .unwrap();

        assert_eq!(config.profile_path, PathBuf::from("/tmp/student.json"));
        assert_eq!(config.log_filter, "coursegate=debug");
    }

    #[test]
    fn endpoint_is_required() {
        let result = envy::prefixed(ENV_PREFIX).from_iter::<_, Config>(vars(&[]));

        assert!(result.is_err());
    }

    #[test]
    fn endpoint_must_be_a_url() {
        let result = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Config>(vars(&[("COURSEGATE_ENDPOINT", "not a url")]));

        assert!(result.is_err());
    }
}
