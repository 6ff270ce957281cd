/// Match timing configuration: pace presets, JSON overrides, CLI flags
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted gap between opponent solves
pub const MAX_OPPONENT_INTERVAL_SECS: u64 = 3600;

/// Known timing variants. None of them is more correct than the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    /// Two minutes, opponent every 12 seconds
    #[default]
    Classic,
    /// Three minutes, opponent every 15 seconds
    Relaxed,
    /// No clock, opponent every 6 seconds
    Blitz,
}

impl Pace {
    pub fn config(self) -> MatchConfig {
        let (duration_secs, opponent_interval_secs) = match self {
            Pace::Classic => (Some(120), 12),
            Pace::Relaxed => (Some(180), 15),
            Pace::Blitz => (None, 6),
        };
        MatchConfig { duration_secs, opponent_interval_secs, seed: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Match length in seconds; None plays until the grid is full
    pub duration_secs: Option<u32>,
    /// Delay between opponent auto-solves
    pub opponent_interval_secs: u64,
    /// Fixes the opponent's picks, for repeatable matches
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Pace::default().config()
    }
}

/// Partial config read from a JSON file; absent keys keep the preset value
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default, with = "double_option")]
    duration_secs: Option<Option<u32>>,
    opponent_interval_secs: Option<u64>,
    seed: Option<u64>,
}

// Tells an explicit `null` (untimed) apart from a missing key
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl MatchConfig {
    pub fn opponent_interval(&self) -> Duration {
        Duration::from_secs(self.opponent_interval_secs)
    }

    pub fn is_timed(&self) -> bool {
        self.duration_secs.is_some()
    }

    /// Applies the keys present in a JSON document on top of this config
    pub fn merge_json(mut self, text: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(text).context("malformed match config")?;
        if let Some(duration) = file.duration_secs {
            self.duration_secs = duration;
        }
        if let Some(interval) = file.opponent_interval_secs {
            self.opponent_interval_secs = interval;
        }
        if file.seed.is_some() {
            self.seed = file.seed;
        }
        Ok(self)
    }

    pub fn merge_file(self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        self.merge_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.opponent_interval_secs == 0 {
            bail!("opponent interval must be at least one second");
        }
        if self.opponent_interval_secs > MAX_OPPONENT_INTERVAL_SECS {
            bail!("opponent interval must be at most {} seconds", MAX_OPPONENT_INTERVAL_SECS);
        }
        if self.duration_secs == Some(0) {
            bail!("match duration must be at least one second");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(MatchConfig::default(), Pace::Classic.config());
        assert_eq!(Pace::Classic.config().duration_secs, Some(120));
        assert_eq!(Pace::Relaxed.config().opponent_interval(), Duration::from_secs(15));
        assert!(!Pace::Blitz.config().is_timed());
    }

    #[test]
    fn json_overrides_only_present_keys() {
        let config = Pace::Relaxed.config().merge_json(r#"{ "seed": 9 }"#).unwrap();
        assert_eq!(config.duration_secs, Some(180));
        assert_eq!(config.opponent_interval_secs, 15);
        assert_eq!(config.seed, Some(9));

        let config = Pace::Classic
            .config()
            .merge_json(r#"{ "duration_secs": null, "opponent_interval_secs": 3 }"#)
            .unwrap();
        assert_eq!(config.duration_secs, None);
        assert_eq!(config.opponent_interval_secs, 3);
    }

    #[test]
    fn rejects_zero_timings() {
        let mut config = MatchConfig::default();
        assert!(config.validate().is_ok());
        config.opponent_interval_secs = 0;
        assert!(config.validate().is_err());

        let config = MatchConfig { duration_secs: Some(0), ..MatchConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_huge_opponent_interval() {
        let mut config = MatchConfig { opponent_interval_secs: u64::MAX, ..MatchConfig::default() };
        assert!(config.validate().is_err());
        config.opponent_interval_secs = MAX_OPPONENT_INTERVAL_SECS + 1;
        assert!(config.validate().is_err());
        config.opponent_interval_secs = MAX_OPPONENT_INTERVAL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(MatchConfig::default().merge_json("{ nope").is_err());
    }
}
