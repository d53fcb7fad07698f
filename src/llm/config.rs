//! LLM configuration parsed from environment variables.

use super::types::LlmError;

pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 16_384;
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from the process environment.
    ///
    /// # Errors
    ///
    /// See [`LlmConfig::from_lookup`].
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed LLM config from a variable lookup.
    ///
    /// Required:
    /// - `LLM_API_KEY_ENV` (names the variable containing the key)
    ///
    /// Optional:
    /// - `LLM_MODEL`: default [`DEFAULT_LLM_MODEL`]
    /// - `LLM_MAX_TOKENS`: default 16384
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] if the key variable or the key
    /// itself is unset or empty, and [`LlmError::ConfigParse`] for a numeric
    /// setting that does not parse.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let key_var = non_empty(get("LLM_API_KEY_ENV"))
            .ok_or_else(|| LlmError::MissingApiKey { var: "LLM_API_KEY_ENV".into() })?;
        let api_key = non_empty(get(&key_var)).ok_or_else(|| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = non_empty(get("LLM_MODEL")).unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
        let max_tokens = parse_or(&get, "LLM_MAX_TOKENS", DEFAULT_LLM_MAX_TOKENS)?;
        let timeouts = LlmTimeouts {
            request_secs: parse_or(&get, "LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_or(&get, "LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { api_key, model, max_tokens, timeouts })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, LlmError> {
    match non_empty(get(key)) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| LlmError::ConfigParse(format!("invalid {key}: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
