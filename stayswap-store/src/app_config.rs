use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub engine: EngineRules,
}

/// Tunables for the targeting engine.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineRules {
    /// Bounded wait for the per-swap locks before the caller gets a
    /// ConcurrentModification back.
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
    /// Interval between expiry sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// When set, the mock ledger mint fails every match (rollback drills).
    #[serde(default)]
    pub mint_always_fails: bool,
}

fn default_lock_wait_ms() -> u64 {
    2_000
}

fn default_sweep_interval() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // `STAYSWAP__ENGINE__LOCK_WAIT_MS=500` style overrides.
            .add_source(config::Environment::with_prefix("STAYSWAP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
