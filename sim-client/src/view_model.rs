//! Pure projections from a snapshot to widget-ready values.
//!
//! Nothing here touches the Engine or the store. Identical input always
//! produces identical output.

use sim_core::{
    AccountSnapshot, Bootstrap, ContractSpec, FullState, MarketSnapshot, Order, Position,
    RoundLogEntry, Trade,
};

/// Risk reported when equity is not positive
pub const SATURATED_RISK: f64 = 100.0;
pub const MAX_RISK: f64 = 999.0;

/// `margin_used / equity * 100`, clamped to `[0, 999]`; exactly 100 when equity <= 0
pub fn risk_ratio(account: &AccountSnapshot) -> f64 {
    if account.equity <= 0.0 {
        return SATURATED_RISK;
    }
    (account.margin_used / account.equity * 100.0).clamp(0.0, MAX_RISK)
}

/// Width of the risk bar in percent of its track
pub fn risk_bar_width(risk: f64) -> f64 {
    risk.clamp(0.0, 100.0)
}

/// Where `last` sits in the limit band: 0 at limit down, 1 at limit up.
/// A collapsed band reports the middle.
pub fn band_position(market: &MarketSnapshot) -> f64 {
    let span = market.band_span();
    if span <= 0.0 {
        return 0.5;
    }
    (market.last - market.limit_down) / span
}

pub fn position_pnl(position: &Position, last: f64) -> f64 {
    (last - position.avg_open) * position.side.sign() * position.multiplier as f64 * position.qty as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub code: String,
    pub name: String,
    pub main_contract: String,
    pub last: f64,
    pub change: f64,
    pub change_pct: f64,
    pub up: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentHeader {
    pub symbol: String,
    pub name: String,
    /// e.g. "mult 10 · margin 12% · limit ±10%"
    pub spec_text: String,
    pub limit_text: String,
    pub tick_size: f64,
    pub market: MarketSnapshot,
    pub change: f64,
    pub change_pct: f64,
    pub up: bool,
    pub band_position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountPanel {
    pub account: AccountSnapshot,
    pub risk: f64,
    pub risk_bar_width: f64,
    /// Available funds went negative
    pub margin_warning: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub position: Position,
    pub last: f64,
    pub pnl: f64,
}

/// Everything the widgets show for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub products: Vec<ProductRow>,
    pub header: Option<InstrumentHeader>,
    pub account: AccountPanel,
    pub positions: Vec<PositionRow>,
    /// Newest first
    pub orders: Vec<Order>,
    /// Newest first
    pub trades: Vec<Trade>,
    /// Newest first
    pub round_log: Vec<RoundLogEntry>,
}

impl ViewModel {
    /// Number of positions on the positions tab
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

fn spec_text(spec: &ContractSpec) -> String {
    format!(
        "mult {} · margin {}% · limit ±{}%",
        spec.multiplier,
        (spec.margin_rate * 100.0).round(),
        (spec.limit_pct * 100.0).round()
    )
}

/// Projects snapshots into view models
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewModelBuilder;

impl ViewModelBuilder {
    pub fn build(&self, bootstrap: &Bootstrap, state: &FullState, selected_symbol: &str, filter: &str) -> ViewModel {
        ViewModel {
            products: self.product_rows(bootstrap, state, selected_symbol, filter),
            header: self.header(bootstrap, state, selected_symbol),
            account: self.account_panel(&state.account),
            positions: self.position_rows(state),
            orders: state.orders.iter().rev().cloned().collect(),
            trades: state.trades.iter().rev().cloned().collect(),
            round_log: state.round_log.iter().rev().cloned().collect(),
        }
    }

    /// Products whose code or name contains `filter` (case-insensitive); rows
    /// without a main-contract quote are left out
    pub fn product_rows(&self, bootstrap: &Bootstrap, state: &FullState, selected_symbol: &str, filter: &str) -> Vec<ProductRow> {
        let query = filter.trim().to_uppercase();
        bootstrap
            .products
            .iter()
            .filter(|p| {
                query.is_empty()
                    || p.code.to_uppercase().contains(&query)
                    || p.name.to_uppercase().contains(&query)
            })
            .filter_map(|p| {
                let m = state.market.get(&p.main_contract)?;
                Some(ProductRow {
                    code: p.code.clone(),
                    name: p.name.clone(),
                    main_contract: p.main_contract.clone(),
                    last: m.last,
                    change: m.change(),
                    change_pct: m.change_pct(),
                    up: m.is_up(),
                    selected: p.main_contract == selected_symbol,
                })
            })
            .collect()
    }

    pub fn header(&self, bootstrap: &Bootstrap, state: &FullState, symbol: &str) -> Option<InstrumentHeader> {
        let market = state.market.get(symbol)?;
        let product = bootstrap.product_for_symbol(symbol);
        let spec = bootstrap.spec_for_symbol(symbol);

        Some(InstrumentHeader {
            symbol: symbol.to_string(),
            name: product.map(|p| p.name.clone()).unwrap_or_default(),
            spec_text: spec.map(spec_text).unwrap_or_default(),
            limit_text: format!("limit up {:.2} / limit down {:.2}", market.limit_up, market.limit_down),
            tick_size: spec.map(|s| s.tick_size).unwrap_or(0.0),
            change: market.change(),
            change_pct: market.change_pct(),
            up: market.is_up(),
            band_position: band_position(market),
            market: market.clone(),
        })
    }

    pub fn account_panel(&self, account: &AccountSnapshot) -> AccountPanel {
        let risk = risk_ratio(account);
        AccountPanel {
            account: account.clone(),
            risk,
            risk_bar_width: risk_bar_width(risk),
            margin_warning: account.available < 0.0,
        }
    }

    /// Positions whose contract has a quote in the snapshot
    pub fn position_rows(&self, state: &FullState) -> Vec<PositionRow> {
        state
            .positions
            .iter()
            .filter_map(|p| {
                let last = state.market.get(&p.symbol)?.last;
                Some(PositionRow {
                    position: p.clone(),
                    last,
                    pnl: position_pnl(p, last),
                })
            })
            .collect()
    }
}
