use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine configuration. Stored inside the state blob so a restored engine
/// keeps the rules it was created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed RNG seed; `None` draws a fresh seed on every (re)initialisation
    pub seed: Option<u64>,
    pub initial_cash: f64,
    pub ticks_per_day: u64,
    /// Contract months listed per product; the first one is the main contract
    pub contract_months: Vec<String>,
    pub initial_series_len: usize,
    pub series_cap: usize,
    pub round_log_cap: usize,
    /// Newest round-log entries returned by a state query
    pub round_log_view: usize,
    pub fee_per_lot: f64,
    /// Directory holding `{code}.png` product artwork, if any
    #[serde(skip)]
    pub asset_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            initial_cash: 200_000.0,
            ticks_per_day: 30,
            contract_months: vec!["2603".to_string(), "2604".to_string(), "2606".to_string()],
            initial_series_len: 120,
            series_cap: 180,
            round_log_cap: 80,
            round_log_view: 40,
            fee_per_lot: 2.0,
            asset_dir: None,
        }
    }
}

impl EngineConfig {
    /// Default rules with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn main_month(&self) -> &str {
        self.contract_months
            .first()
            .map(String::as_str)
            .unwrap_or("2603")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_cash, 200_000.0);
        assert_eq!(config.ticks_per_day, 30);
        assert_eq!(config.main_month(), "2603");
        assert_eq!(config.series_cap, 180);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"ticks_per_day": 5}"#).unwrap();
        assert_eq!(config.ticks_per_day, 5);
        assert_eq!(config.round_log_view, 40);
    }
}
