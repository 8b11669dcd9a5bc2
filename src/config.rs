use std::{env, path::PathBuf, time::Duration};

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_PORT: u16 = 5173;
const DEFAULT_COOKIE_PATH: &str = "data/cookies.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub port: u16,
    pub cookie_path: PathBuf,
    pub google_client_id: Option<String>,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("CHANTING_API_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let cookie_path = lookup("CHANTING_COOKIE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIE_PATH));

        let timeout_secs = lookup("CHANTING_HTTP_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            port,
            cookie_path,
            google_client_id: lookup("GOOGLE_CLIENT_ID").filter(|value| !value.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
