// ⚙️ Configuration - TOML file, then environment overrides, then validation
//
// Example bingo.toml:
//
//   [store]
//   path = "bingo.db"
//
//   [economy]
//   starting_coins = 20
//   draw_cost = 1
//   win_bonus = 50
//   daily_reset_limit = 5
//
//   [accrual]
//   interval_ms = 30000
//   tick_ms = 1000
//   amount = 1
//
//   [log]
//   level = "info"
//   file = "bingo.log"

use crate::accrual::AccrualSettings;
use crate::economy::EconomyPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from("bingo.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            file: PathBuf::from("bingo.log"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub economy: EconomyPolicy,
    pub accrual: AccrualSettings,
    pub log: LogConfig,
}

impl Config {
    /// Defaults, overlaid by the file (when given) and the BINGO_* environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).context("Failed to parse config TOML")
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("BINGO_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(level) = lookup("BINGO_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(interval) = lookup("BINGO_COIN_INTERVAL_MS") {
            self.accrual.interval_ms = interval
                .parse()
                .with_context(|| format!("Invalid BINGO_COIN_INTERVAL_MS: {}", interval))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.accrual.interval_ms <= 0 {
            bail!("accrual.interval_ms must be positive");
        }
        if self.accrual.tick_ms == 0 {
            bail!("accrual.tick_ms must be positive");
        }
        if self.economy.draw_cost == 0 {
            bail!("economy.draw_cost must be at least 1");
        }
        if self.store.path.as_os_str().is_empty() {
            bail!("store.path must not be empty");
        }
        Ok(())
    }
}
