use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{LedgerError, Result};

/// How the accepted chain is printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LedgerError::Config(format!(
                "REPORT_FORMAT must be `text` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Simulation settings. Every field can be overridden from the environment
/// (or a `.env` file loaded by `dotenvy`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of miner threads.
    pub miners: usize,
    /// Miners stop once the chain reaches this many blocks.
    pub target_length: usize,
    /// How long the simulation runs before the stop flag is raised.
    pub run_time: Duration,
    /// How long to wait for workers after the stop flag is raised.
    pub grace_period: Duration,
    pub block_reward: u64,
    pub starting_balance: u64,
    pub initial_difficulty: u32,
    /// Blocks sealed in at most this many seconds raise the difficulty.
    pub fast_block_secs: u64,
    /// Blocks sealed in at least this many seconds lower the difficulty.
    pub slow_block_secs: u64,
    pub report_format: ReportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            miners: 10,
            target_length: 6,
            run_time: Duration::from_millis(6000),
            grace_period: Duration::from_millis(5000),
            block_reward: 100,
            starting_balance: 100,
            initial_difficulty: 0,
            fast_block_secs: 10,
            slow_block_secs: 60,
            report_format: ReportFormat::Text,
        }
    }
}

impl Config {
    /// Build a config from environment variables, keeping defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cfg = Self {
            miners: parse_or(&lookup, "MINERS", defaults.miners)?,
            target_length: parse_or(&lookup, "TARGET_LENGTH", defaults.target_length)?,
            run_time: Duration::from_millis(parse_or(
                &lookup,
                "RUN_MILLIS",
                defaults.run_time.as_millis() as u64,
            )?),
            grace_period: Duration::from_millis(parse_or(
                &lookup,
                "GRACE_MILLIS",
                defaults.grace_period.as_millis() as u64,
            )?),
            block_reward: parse_or(&lookup, "BLOCK_REWARD", defaults.block_reward)?,
            starting_balance: parse_or(&lookup, "STARTING_BALANCE", defaults.starting_balance)?,
            initial_difficulty: parse_or(
                &lookup,
                "INITIAL_DIFFICULTY",
                defaults.initial_difficulty,
            )?,
            fast_block_secs: parse_or(&lookup, "FAST_BLOCK_SECS", defaults.fast_block_secs)?,
            slow_block_secs: parse_or(&lookup, "SLOW_BLOCK_SECS", defaults.slow_block_secs)?,
            report_format: parse_or(&lookup, "REPORT_FORMAT", defaults.report_format)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.miners == 0 {
            return Err(LedgerError::Config("MINERS must be at least 1".into()));
        }
        if self.target_length == 0 {
            return Err(LedgerError::Config("TARGET_LENGTH must be at least 1".into()));
        }
        if self.fast_block_secs >= self.slow_block_secs {
            return Err(LedgerError::Config(
                "FAST_BLOCK_SECS must be lower than SLOW_BLOCK_SECS".into(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LedgerError::Config(format!("{key} has an invalid value `{raw}`"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ReportFormat};
    use std::collections::HashMap;
    use std::time::Duration;

    fn from_pairs(pairs: &[(&str, &str)]) -> crate::error::Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.miners, 10);
        assert_eq!(cfg.target_length, 6);
        assert_eq!(cfg.block_reward, 100);
        assert_eq!(cfg.fast_block_secs, 10);
        assert_eq!(cfg.slow_block_secs, 60);
        assert_eq!(cfg.report_format, ReportFormat::Text);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = from_pairs(&[
            ("MINERS", "3"),
            ("RUN_MILLIS", "250"),
            ("REPORT_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(cfg.miners, 3);
        assert_eq!(cfg.run_time, Duration::from_millis(250));
        assert_eq!(cfg.report_format, ReportFormat::Json);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(from_pairs(&[("MINERS", "many")]).is_err());
        assert!(from_pairs(&[("MINERS", "0")]).is_err());
        assert!(from_pairs(&[("FAST_BLOCK_SECS", "90")]).is_err());
        assert!(from_pairs(&[("REPORT_FORMAT", "xml")]).is_err());
    }
}
