use std::env;
use std::time::Duration;

const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60 * 5;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub system_message: String,
    // Optional attribution headers for OpenRouter's rankings
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub upstream_timeout: Option<Duration>,
    pub web_ui_path: String,
}

impl AppConfig {
    /// Build the config from an arbitrary key lookup. Blank values are
    /// treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_hostname = get("QUIXA_LLM_HOST")
            .unwrap_or_else(|| "https://openrouter.ai/api".to_string());
        let openai_api_key =
            get("OPENROUTER_API_KEY").unwrap_or_else(|| "thiswontworkforopenrouter".to_string());
        let openai_model = get("QUIXA_LLM_MODEL")
            .unwrap_or_else(|| "meta-llama/llama-3.1-8b-instruct:free".to_string());
        let system_message = get("QUIXA_SYSTEM_MESSAGE").unwrap_or_else(|| {
            "You are Quixa, a friendly AI-powered support assistant. Answer concisely.".to_string()
        });
        let site_url = get("QUIXA_SITE_URL");
        let site_name = get("QUIXA_SITE_NAME");
        let timeout_secs = match get("QUIXA_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(
                    "Ignoring invalid QUIXA_UPSTREAM_TIMEOUT_SECS {:?}, using {}s",
                    raw,
                    DEFAULT_UPSTREAM_TIMEOUT_SECS
                );
                DEFAULT_UPSTREAM_TIMEOUT_SECS
            }),
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };
        // Zero disables the timeout entirely
        let upstream_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        let web_ui_path = get("QUIXA_WEB_UI_PATH").unwrap_or_else(|| "./web-ui".to_string());

        Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            system_message,
            site_url,
            site_name,
            upstream_timeout,
            web_ui_path,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }
}
