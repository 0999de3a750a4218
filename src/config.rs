use std::time::Duration;

use anyhow::{anyhow, Result};
use url::Url;

use crate::logging::{log, obj, v_str, Domain, Level};

/// Timeout applied to every entity-store lookup.
pub const GET_TIMEOUT: Duration = Duration::from_secs(1);
/// Timeout applied to every event-store post.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);
/// Lifetime of an entity cache entry.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Interval between expired-entry sweeps.
pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Config {
    pub entity_store_host: String,
    pub entity_store_port: String,
    pub event_store_host: String,
    pub event_store_port: String,
    pub game_path: String,
    pub poll_secs: u64,
    pub get_timeout: Duration,
    pub publish_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or empty values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            match lookup(key).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    log(
                        Level::Debug,
                        Domain::System,
                        "config_default",
                        obj(&[("var", v_str(key)), ("default", v_str(default))]),
                    );
                    default.to_string()
                }
            }
        };

        Self {
            entity_store_host: var("ENTITYSTORE_IP", "localhost"),
            entity_store_port: var("ENTITYSTORE_PORT", "1338"),
            event_store_host: var("EVENTSTORE_IP", "localhost"),
            event_store_port: var("EVENTSTORE_PORT", "4567"),
            game_path: var("GAME_PATH", "games"),
            poll_secs: lookup("POLL_SECS").and_then(|v| v.parse().ok()).unwrap_or(5),
            get_timeout: GET_TIMEOUT,
            publish_timeout: PUBLISH_TIMEOUT,
            cache_ttl: CACHE_TTL,
            cache_sweep_interval: CACHE_SWEEP_INTERVAL,
        }
    }

    pub fn entity_store_base(&self) -> Result<Url> {
        base_url(&self.entity_store_host, &self.entity_store_port)
    }

    pub fn event_store_base(&self) -> Result<Url> {
        base_url(&self.event_store_host, &self.event_store_port)
    }
}

fn base_url(host: &str, port: &str) -> Result<Url> {
    Url::parse(&format!("http://{}:{}/", host, port))
        .map_err(|e| anyhow!("invalid store address {}:{}: {}", host, port, e))
}
