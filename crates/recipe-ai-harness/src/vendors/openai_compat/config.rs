use std::time::Duration;

use crate::errors::HarnessError;

/// Default endpoint: Groq's OpenAI-compatible API.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Configuration for an OpenAI-compatible chat-completions client.
#[derive(Clone, Debug)]
pub struct OpenAiCompatConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Base URL up to and including the API version segment
    /// (for example `https://api.openai.com/v1`).
    pub base_url: String,
    /// Timeout for establishing the TCP/TLS connection.
    ///
    /// Response streaming is bounded by the relay's idle timeout instead, so a
    /// long recipe is never cut off by a whole-request deadline.
    pub connect_timeout: Duration,
}

impl OpenAiCompatConfig {
    /// Creates a config with the default endpoint and a provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Builds a config from `RECIPE_PROVIDER_API_KEY` (or `GROQ_API_KEY`) and
    /// the optional `RECIPE_PROVIDER_BASE_URL`.
    pub fn from_env() -> Result<Self, HarnessError> {
        let api_key = ["RECIPE_PROVIDER_API_KEY", "GROQ_API_KEY"]
            .into_iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                HarnessError::Config(
                    "missing RECIPE_PROVIDER_API_KEY (or GROQ_API_KEY) for the completion provider"
                        .into(),
                )
            })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("RECIPE_PROVIDER_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config = config.base_url(base_url);
        }
        Ok(config)
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completions_url_tolerates_trailing_slash() {
        let config = OpenAiCompatConfig::new("key").base_url("https://api.openai.com/v1/");
        assert_eq!(
            config.chat_completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            OpenAiCompatConfig::new("key").chat_completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }
}
