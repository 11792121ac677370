use serde::{Deserialize, Serialize};

/// Quote board for one contract as returned by a state query.
///
/// Replaced wholesale on every fetch. Invariant upheld by the engine:
/// `limit_down <= last <= limit_up`, and `series` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    // ═══════════════════════════════════════════════════
    // IDENTIFICATION
    // ═══════════════════════════════════════════════════
    pub symbol: String,

    // ═══════════════════════════════════════════════════
    // SESSION PRICES
    // ═══════════════════════════════════════════════════
    pub last: f64,
    pub prev_settle: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,

    // ═══════════════════════════════════════════════════
    // ACTIVITY
    // ═══════════════════════════════════════════════════
    #[serde(alias = "vol")]
    pub volume: u64,
    #[serde(alias = "oi")]
    pub open_interest: u64,

    // ═══════════════════════════════════════════════════
    // REGULATORY BAND
    // ═══════════════════════════════════════════════════
    pub limit_up: f64,
    pub limit_down: f64,

    // ═══════════════════════════════════════════════════
    // TICK SERIES (oldest first)
    // ═══════════════════════════════════════════════════
    pub series: Vec<f64>,
}

impl MarketSnapshot {
    /// Create a flat snapshot where every price equals `price`
    pub fn flat(symbol: impl Into<String>, price: f64, limit_down: f64, limit_up: f64) -> Self {
        Self {
            symbol: symbol.into(),
            last: price,
            prev_settle: price,
            open: price,
            high: price,
            low: price,
            volume: 0,
            open_interest: 0,
            limit_up,
            limit_down,
            series: vec![price],
        }
    }

    /// Absolute change against the previous settlement
    pub fn change(&self) -> f64 {
        self.last - self.prev_settle
    }

    /// Change against the previous settlement as a fraction
    pub fn change_pct(&self) -> f64 {
        if self.prev_settle.abs() > 1e-10 {
            self.change() / self.prev_settle
        } else {
            0.0
        }
    }

    /// True when the last price is at or above the previous settlement
    pub fn is_up(&self) -> bool {
        self.change() >= 0.0
    }

    /// Width of the regulatory band
    pub fn band_span(&self) -> f64 {
        self.limit_up - self.limit_down
    }
}

/// One aggregated trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBar {
    pub day: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(alias = "vol")]
    pub volume: u64,
}

impl DayBar {
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_snapshot() {
        let m = MarketSnapshot::flat("AKT2603", 2000.0, 1800.0, 2200.0);
        assert_eq!(m.series, vec![2000.0]);
        assert_eq!(m.change(), 0.0);
        assert!(m.is_up());
        assert_eq!(m.band_span(), 400.0);
    }

    #[test]
    fn test_change_pct() {
        let mut m = MarketSnapshot::flat("AKT2603", 2000.0, 1800.0, 2200.0);
        m.last = 2100.0;
        assert!((m.change_pct() - 0.05).abs() < 1e-12);

        m.prev_settle = 0.0;
        assert_eq!(m.change_pct(), 0.0);
    }

    #[test]
    fn test_accepts_short_field_names() {
        let json = r#"{
            "symbol": "SKB2603", "last": 10.0, "prev_settle": 10.0,
            "open": 10.0, "high": 10.0, "low": 10.0, "vol": 7, "oi": 3000,
            "limit_up": 11.0, "limit_down": 9.0, "series": [10.0]
        }"#;
        let m: MarketSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(m.volume, 7);
        assert_eq!(m.open_interest, 3000);
    }
}
