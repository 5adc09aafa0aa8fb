use std::str::FromStr;

use anyhow::Context;

use crate::AppResult;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// `None` keeps everything in memory.
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub session_idle_minutes: i64,
    /// Change notifications buffered per realtime subscriber.
    pub broadcast_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_owned(),
            database_url: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_owned(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_owned(),
            session_idle_minutes: 60,
            broadcast_capacity: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Config> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Config> {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: var("DATABASE_URL"),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            session_idle_minutes: parse(var("SESSION_IDLE_MINUTES"), "SESSION_IDLE_MINUTES")?
                .unwrap_or(defaults.session_idle_minutes),
            broadcast_capacity: parse(var("BROADCAST_CAPACITY"), "BROADCAST_CAPACITY")?
                .unwrap_or(defaults.broadcast_capacity),
        })
    }
}

fn parse<T>(value: Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| v.trim().parse::<T>().with_context(|| format!("{key} must be a number, got {v:?}")))
        .transpose()
}
