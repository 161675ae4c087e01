use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::video::VideoConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub video: VideoConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = VideoConfig::default();

        let video = VideoConfig {
            base_url: lookup("VIDEO_BACKEND_URL").unwrap_or(defaults.base_url),
            timeout: parse_or(&lookup, "VIDEO_TIMEOUT_MS", defaults.timeout.as_millis() as u64)
                .map(Duration::from_millis)?,
            inter_request_delay: parse_or(
                &lookup,
                "VIDEO_PACING_MS",
                defaults.inter_request_delay.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
            fallback_video_url: lookup("FALLBACK_VIDEO_URL").unwrap_or(defaults.fallback_video_url),
        };

        Ok(Self {
            database_url,
            port: parse_or(&lookup, "PORT", 8081)?,
            video,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
