//! Process configuration, read from the environment (after `.env`).

use std::time::Duration;

use crate::error::{AppErr, AppResult};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DISPLAY_MS: u64 = 3000;
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host:        String,
    pub port:        u16,
    pub jwt_secret:  String,
    pub display:     Duration,
    pub debug:       bool,
    pub body_limit:  usize,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppErr::Config("JWT_SECRET must be set".into()))?;

        let display_ms = parse_or(&get, "DISPLAY_DURATION_MS", DEFAULT_DISPLAY_MS)?;

        Ok(Self {
            host:       get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port:       parse_or(&get, "PORT", DEFAULT_PORT)?,
            jwt_secret,
            display:    Duration::from_millis(display_ms),
            debug:      get("DEBUG").map(|v| v == "true" || v == "1").unwrap_or(false),
            body_limit: parse_or(&get, "BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppErr::Config(format!("{key} is not a valid number: {raw:?}"))),
    }
}
