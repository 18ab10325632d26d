// quorum-node/src/config.rs
use serde::{Deserialize, Serialize};
use vote_handler::HandlerConfig;

/// Demo daemon configuration: handler policy plus the simulation's own
/// knobs (quorum size, tick cadence). Loaded from / saved to TOML, the way
/// `node::NodeConfig` does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: String,
    /// Number of validator keys to generate for the simulated quorums.
    pub validator_count: usize,
    /// Number of worker (tested) service-node keys to generate.
    pub worker_count: usize,
    /// Seconds of simulated chain time advanced per tick.
    pub tick_interval_seconds: u64,
    /// Whether this daemon instance participates as one of the validators
    /// (casts votes) or only observes (relays/logs).
    pub run_as_validator: bool,
    pub handler: HandlerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            validator_count: 10,
            worker_count: 5,
            tick_interval_seconds: 2,
            run_as_validator: true,
            handler: HandlerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn to_handler_config(&self) -> HandlerConfig {
        self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.validator_count, 10);
        assert_eq!(config.handler.checkpoint_quorum_size, 10);
        assert!(config.run_as_validator);
    }

    #[test]
    fn test_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.validator_count, config.validator_count);
        assert_eq!(parsed.handler.checkpoint_min_votes, config.handler.checkpoint_min_votes);
    }
}
