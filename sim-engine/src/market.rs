use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{ContractSpec, DayBar, MarketSnapshot};

/// Per-product generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub base: f64,
    pub tick: f64,
    pub limit_pct: f64,
    pub margin: f64,
    pub mult: u32,
}

impl ProductSpec {
    /// Draw a spec the way the exchange lists new products
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        const TICKS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];
        const LIMITS: [f64; 3] = [0.08, 0.10, 0.12];
        const MARGINS: [f64; 3] = [0.10, 0.12, 0.14];
        const MULTS: [u32; 3] = [5, 10, 20];

        Self {
            base: 1000.0 + rng.gen::<f64>() * 3000.0,
            tick: TICKS[rng.gen_range(0..TICKS.len())],
            limit_pct: LIMITS[rng.gen_range(0..LIMITS.len())],
            margin: MARGINS[rng.gen_range(0..MARGINS.len())],
            mult: MULTS[rng.gen_range(0..MULTS.len())],
        }
    }

    pub fn to_contract_spec(&self) -> ContractSpec {
        ContractSpec {
            multiplier: self.mult,
            margin_rate: self.margin,
            limit_pct: self.limit_pct,
            tick_size: self.tick,
        }
    }
}

/// Live quote state of one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub symbol: String,
    pub code: String,
    pub prev_settle: f64,
    pub limit_up: f64,
    pub limit_down: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    pub vol: u64,
    pub oi: u64,
    pub series: Vec<f64>,
}

impl MarketState {
    pub fn to_snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            symbol: self.symbol.clone(),
            last: self.last,
            prev_settle: self.prev_settle,
            open: self.open,
            high: self.high,
            low: self.low,
            volume: self.vol,
            open_interest: self.oi,
            limit_up: self.limit_up,
            limit_down: self.limit_down,
            series: self.series.clone(),
        }
    }

    /// Day aggregate for the session that just ended
    pub fn day_bar(&self, day: u32) -> DayBar {
        DayBar {
            day,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.last,
            volume: self.vol,
        }
    }
}

pub fn round_to(x: f64, tick: f64) -> f64 {
    (x / tick).round() * tick
}

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(x))
}

pub fn init_market<R: Rng>(rng: &mut R, symbol: &str, code: &str, spec: &ProductSpec, series_len: usize) -> MarketState {
    let prev_settle = round_to(spec.base, spec.tick);
    let limit_up = round_to(prev_settle * (1.0 + spec.limit_pct), spec.tick);
    let limit_down = round_to(prev_settle * (1.0 - spec.limit_pct), spec.tick);
    let open = clamp(
        round_to(prev_settle * (1.0 + (rng.gen::<f64>() - 0.5) * 0.01), spec.tick),
        limit_down,
        limit_up,
    );

    MarketState {
        symbol: symbol.to_string(),
        code: code.to_string(),
        prev_settle,
        limit_up,
        limit_down,
        open,
        high: open,
        low: open,
        last: open,
        vol: 0,
        oi: 2000 + (rng.gen::<f64>() * 6000.0) as u64,
        series: vec![open; series_len.max(1)],
    }
}

/// Random walk one tick with a small pull toward the previous settlement
pub fn advance_market_tick<R: Rng>(rng: &mut R, m: &mut MarketState, spec: &ProductSpec, series_cap: usize) {
    let direction = if rng.gen::<f64>() < 0.5 { -1.0 } else { 1.0 };
    let steps = 1.0 + rng.gen_range(0..3) as f64;
    let mut next = round_to(m.last + spec.tick * direction * steps, spec.tick);

    let pull = (m.prev_settle - next) * 0.01;
    next = round_to(next + pull, spec.tick);
    next = clamp(next, m.limit_down, m.limit_up);

    m.last = next;
    m.high = m.high.max(next);
    m.low = m.low.min(next);
    m.vol += 1 + rng.gen_range(0..6);

    m.series.push(next);
    if m.series.len() > series_cap {
        let excess = m.series.len() - series_cap;
        m.series.drain(..excess);
    }
}

/// Settle at the last price and open a new session band around it
pub fn roll_market_day(m: &mut MarketState, spec: &ProductSpec) {
    let new_prev = round_to(m.last, spec.tick);

    m.prev_settle = new_prev;
    m.limit_up = round_to(new_prev * (1.0 + spec.limit_pct), spec.tick);
    m.limit_down = round_to(new_prev * (1.0 - spec.limit_pct), spec.tick);

    m.open = new_prev;
    m.high = new_prev;
    m.low = new_prev;
    m.vol = 0;
}
