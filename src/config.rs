use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,

    /// Base URL of the outbound email gateway.
    pub mailer_url: String,

    /// Public site root, used to build links in email bodies.
    pub site_url: String,

    pub server_port: u16,

    #[serde(default = "default_queue_capacity")]
    pub activity_queue_capacity: usize,
    #[serde(default = "default_queue_capacity")]
    pub notification_queue_capacity: usize,
    #[serde(default = "default_queue_capacity")]
    pub external_queue_capacity: usize,

    /// Broadcast emails allowed per user within one rate window.
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: i64,

    /// Rate window length. 0 keeps counters forever.
    #[serde(default = "default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: u64,

    #[serde(default = "default_unsubscribe_code_ttl_seconds")]
    pub unsubscribe_code_ttl_seconds: u64,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,

    #[serde(default)]
    pub log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environment variable: {}", e))?;
        Ok(config)
    }

    pub fn rate_limit_window(&self) -> Option<Duration> {
        if self.rate_limit_window_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.rate_limit_window_seconds))
        }
    }

    pub fn unsubscribe_code_ttl(&self) -> Duration {
        Duration::from_secs(self.unsubscribe_code_ttl_seconds)
    }
}

fn default_queue_capacity() -> usize {
    128
}

fn default_rate_limit_max() -> i64 {
    50
}

fn default_rate_limit_window_seconds() -> u64 {
    // one week
    604_800
}

fn default_unsubscribe_code_ttl_seconds() -> u64 {
    86_400
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    100
}

fn default_max_retry_delay_ms() -> u64 {
    5_000
}

fn default_retry_backoff_multiplier() -> u64 {
    2
}
