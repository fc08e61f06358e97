//! Environment-based configuration.
//!
//! Values are read once into [`SETTINGS`]; `main` forces it at startup so a
//! malformed variable stops the process before the listener binds.

use std::{env, str::FromStr, sync::LazyLock, time::Duration};

use anyhow::{Result, anyhow};

pub static SETTINGS: LazyLock<Result<Settings>> = LazyLock::new(Settings::from_env);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub hr_api_base_url: String,
    pub default_password: String,
    pub default_mac_address: String,
    pub bind_address: String,
    pub static_dir: String,
    pub max_tool_rounds: usize,
    pub conversation_ttl: Duration,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            hr_api_base_url: "https://dev.nashrms.com/api".to_string(),
            default_password: "123456".to_string(),
            default_mac_address: "206.84.153.69".to_string(),
            bind_address: "0.0.0.0:8000".to_string(),
            static_dir: "static".to_string(),
            max_tool_rounds: 8,
            conversation_ttl: Duration::from_secs(60 * 60),
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults
    /// for anything unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(anyhow!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'")),
        };

        Ok(Self {
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            openai_base_url: string("OPENAI_BASE_URL", defaults.openai_base_url)
                .trim_end_matches('/')
                .to_string(),
            openai_model: string("OPENAI_MODEL", defaults.openai_model),
            hr_api_base_url: string("HR_API_BASE_URL", defaults.hr_api_base_url)
                .trim_end_matches('/')
                .to_string(),
            default_password: string("HR_DEFAULT_PASSWORD", defaults.default_password),
            default_mac_address: string("HR_DEFAULT_MAC_ADDRESS", defaults.default_mac_address),
            bind_address: string("BIND_ADDRESS", defaults.bind_address),
            static_dir: string("STATIC_DIR", defaults.static_dir),
            max_tool_rounds: parse(&lookup, "MAX_TOOL_ROUNDS")?.unwrap_or(defaults.max_tool_rounds),
            conversation_ttl: parse::<u64>(&lookup, "CONVERSATION_TTL_MINUTES")?
                .map_or(defaults.conversation_ttl, |minutes| {
                    Duration::from_secs(minutes.saturating_mul(60))
                }),
            request_timeout: parse(&lookup, "REQUEST_TIMEOUT_SECONDS")?
                .map_or(defaults.request_timeout, Duration::from_secs),
            log_format,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("{key} must be a number, got '{raw}': {e}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.hr_api_base_url, "https://dev.nashrms.com/api");
        assert_eq!(settings.max_tool_rounds, 8);
        assert!(settings.openai_api_key.is_none());
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_and_trailing_slashes() {
        let settings = Settings::from_lookup(lookup(&[
            ("HR_API_BASE_URL", "http://localhost:9000/api/"),
            ("OPENAI_API_KEY", "sk-test"),
            ("REQUEST_TIMEOUT_SECONDS", "5"),
            ("LOG_FORMAT", "json"),
            ("CONVERSATION_TTL_MINUTES", "15"),
        ]))
        .unwrap();
        assert_eq!(settings.hr_api_base_url, "http://localhost:9000/api");
        assert_eq!(settings.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.conversation_ttl, Duration::from_secs(15 * 60));
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("MAX_TOOL_ROUNDS", "many")])).unwrap_err();
        assert!(err.to_string().contains("MAX_TOOL_ROUNDS"));
    }
}
