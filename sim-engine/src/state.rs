use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sim_core::{
    AccountSnapshot, Bootstrap, CloseRequest, CommandAck, DayBar, Effect, FullState, Order,
    OrderRequest, OrderStatus, Position, PositionSide, Product, RoundLogEntry, Trade,
};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::market::{
    advance_market_tick, clamp, init_market, roll_market_day, round_to, MarketState, ProductSpec,
};
use crate::matching::{fee_for, is_marketable};

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Product catalogue (code, display name)
const CATALOGUE: [(&str, &str); 12] = [
    ("AKT", "Anchor Cookware"),
    ("SKB", "Suspended Bone Carving"),
    ("WMD", "Sorcery Ore Drill"),
    ("ANG", "Angel Canned Food"),
    ("HYR", "Valley Hydroponic Meat"),
    ("TUJ", "Unity Oral Tonic"),
    ("SEK", "Seshka Tablet"),
    ("YSM", "Originium Sapling"),
    ("JJD", "Sentinel Ingot"),
    ("XTK", "Astral Crystal Block"),
    ("JMB", "Scrap Building Blocks"),
    ("HNK", "Hardhead Helmet"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDef {
    pub code: String,
    pub name: String,
}

/// Complete internal state of the simulation, serializable as one blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub config: EngineConfig,
    pub seed: u64,
    pub products: Vec<ProductDef>,
    pub specs: BTreeMap<String, ProductSpec>,
    pub market: BTreeMap<String, MarketState>,

    pub cash: f64,
    pub realized_pnl: f64,
    pub fees: f64,

    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
    pub trades: Vec<Trade>,
    pub round_log: Vec<RoundLogEntry>,
    pub day_bars: BTreeMap<String, Vec<DayBar>>,

    pub tick: u64,
    pub next_order_id: u64,
}

impl GameState {
    /// Fresh default state. Same config and seed always produce the same market.
    pub fn new(config: EngineConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let products: Vec<ProductDef> = CATALOGUE
            .iter()
            .map(|(code, name)| ProductDef {
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect();

        let mut specs = BTreeMap::new();
        for p in &products {
            specs.insert(p.code.clone(), ProductSpec::random(&mut rng));
        }

        let mut market = BTreeMap::new();
        let mut day_bars = BTreeMap::new();
        for p in &products {
            let spec = &specs[&p.code];
            for month in &config.contract_months {
                let symbol = format!("{}{}", p.code, month);
                let m = init_market(&mut rng, &symbol, &p.code, spec, config.initial_series_len);
                market.insert(symbol.clone(), m);
                day_bars.insert(symbol, Vec::new());
            }
        }

        Self {
            cash: config.initial_cash,
            realized_pnl: 0.0,
            fees: 0.0,
            positions: Vec::new(),
            orders: Vec::new(),
            trades: Vec::new(),
            round_log: Vec::new(),
            day_bars,
            tick: 0,
            next_order_id: 1000,
            seed,
            products,
            specs,
            market,
            config,
        }
    }

    /// Fresh state, drawing a seed when the config does not fix one
    pub fn from_config(config: EngineConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self::new(config, seed)
    }

    fn main_contract(&self, code: &str) -> String {
        format!("{}{}", code, self.config.main_month())
    }

    fn is_main(&self, symbol: &str) -> bool {
        symbol.ends_with(self.config.main_month())
    }

    // --------- Payloads ----------

    pub fn bootstrap_payload(&self) -> Bootstrap {
        let products = self
            .products
            .iter()
            .map(|p| {
                let asset_file = self.config.asset_dir.as_ref().and_then(|dir| {
                    dir.join(format!("{}.png", p.code))
                        .exists()
                        .then(|| format!("/assets/{}.png", p.code))
                });
                Product {
                    code: p.code.clone(),
                    name: p.name.clone(),
                    main_contract: self.main_contract(&p.code),
                    asset_file,
                }
            })
            .collect();

        let specs = self
            .specs
            .iter()
            .map(|(code, s)| (code.clone(), s.to_contract_spec()))
            .collect();

        Bootstrap { products, specs }
    }

    /// Main contracts only
    pub fn state_payload(&self) -> FullState {
        let market = self
            .market
            .iter()
            .filter(|(symbol, _)| self.is_main(symbol))
            .map(|(symbol, m)| (symbol.clone(), m.to_snapshot()))
            .collect();

        let day_bars = self
            .day_bars
            .iter()
            .filter(|(symbol, _)| self.is_main(symbol))
            .map(|(symbol, bars)| (symbol.clone(), bars.clone()))
            .collect();

        let skip = self.round_log.len().saturating_sub(self.config.round_log_view);

        FullState {
            market,
            day_bars,
            account: self.account(),
            positions: self.positions.clone(),
            orders: self.orders.clone(),
            trades: self.trades.clone(),
            round_log: self.round_log[skip..].to_vec(),
        }
    }

    fn unrealized_pnl(&self) -> f64 {
        self.positions
            .iter()
            .filter_map(|p| {
                let m = self.market.get(&p.symbol)?;
                Some((m.last - p.avg_open) * p.side.sign() * p.multiplier as f64 * p.qty as f64)
            })
            .sum()
    }

    fn margin_used(&self) -> f64 {
        self.positions
            .iter()
            .filter_map(|p| {
                let m = self.market.get(&p.symbol)?;
                let spec = self.specs.get(&m.code)?;
                Some(m.last * spec.mult as f64 * p.qty as f64 * spec.margin)
            })
            .sum()
    }

    pub fn account(&self) -> AccountSnapshot {
        let unrealized = self.unrealized_pnl();
        let equity = self.cash + unrealized;
        let margin_used = self.margin_used();
        AccountSnapshot {
            cash: self.cash,
            equity,
            available: equity - margin_used,
            margin_used,
            unrealized_pnl: unrealized,
            realized_pnl: self.realized_pnl,
            fees: self.fees,
        }
    }

    // --------- Core actions ----------

    pub fn advance_tick(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add((self.tick + 1).wrapping_mul(SEED_STRIDE)));

        let mains: Vec<(String, String)> = self
            .products
            .iter()
            .map(|p| (p.code.clone(), self.main_contract(&p.code)))
            .collect();
        for (code, symbol) in &mains {
            if let (Some(m), Some(spec)) = (self.market.get_mut(symbol), self.specs.get(code)) {
                advance_market_tick(&mut rng, m, spec, self.config.series_cap);
            }
        }

        let pending: Vec<usize> = self
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| o.status == OrderStatus::New)
            .filter(|(_, o)| {
                self.market
                    .get(&o.symbol)
                    .map(|m| is_marketable(o, m))
                    .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect();
        for idx in pending {
            self.fill_order(idx);
        }

        self.append_log("Tick advanced", "Market quotes updated for one round".to_string());
        self.tick += 1;

        if self.config.ticks_per_day > 0 && self.tick % self.config.ticks_per_day == 0 {
            self.roll_day();
        }
    }

    fn roll_day(&mut self) {
        let day = (self.tick / self.config.ticks_per_day) as u32;
        let main_month = self.config.main_month().to_string();

        for (symbol, m) in self.market.iter_mut() {
            if !symbol.ends_with(&main_month) {
                continue;
            }
            self.day_bars
                .entry(symbol.clone())
                .or_default()
                .push(m.day_bar(day));
            if let Some(spec) = self.specs.get(&m.code) {
                roll_market_day(m, spec);
            }
        }

        tracing::info!("Day roll: day={} tick={}", day, self.tick);
        self.append_log(
            "Day roll",
            format!("Entered day {}; limits recomputed from the close", day + 1),
        );
    }

    pub fn place_order(&mut self, req: &OrderRequest) -> CommandAck {
        let symbol = req.symbol.trim();

        let Some(m) = self.market.get(symbol) else {
            return CommandAck::rejected("unknown symbol");
        };
        if req.qty == 0 {
            return CommandAck::rejected("qty must be > 0");
        }
        if !req.price.is_finite() {
            return CommandAck::rejected("invalid price");
        }
        let Some(spec) = self.specs.get(&m.code) else {
            return CommandAck::rejected("unknown symbol");
        };

        let px = clamp(round_to(req.price, spec.tick), m.limit_down, m.limit_up);
        let need_margin = px * spec.mult as f64 * req.qty as f64 * spec.margin;

        match req.effect {
            Effect::Close => {
                let need_side = req.side.closed_position();
                let held = self.position(symbol, need_side).map(|p| p.qty).unwrap_or(0);
                if held < req.qty {
                    return CommandAck::rejected("position not enough");
                }
            }
            Effect::Open => {
                if self.account().available < need_margin {
                    return CommandAck::rejected("margin not enough");
                }
            }
        }

        self.next_order_id += 1;
        let order = Order {
            id: self.next_order_id,
            symbol: symbol.to_string(),
            side: req.side,
            effect: req.effect,
            price: px,
            qty: req.qty,
            status: OrderStatus::New,
            ts: now_str(),
        };
        let marketable = self
            .market
            .get(symbol)
            .map(|m| is_marketable(&order, m))
            .unwrap_or(false);
        let order_id = order.id;
        self.orders.push(order);

        if marketable {
            self.fill_order(self.orders.len() - 1);
        }

        self.append_log(
            "Order submitted",
            format!("{} {}/{} {} lots @ {:.2}", symbol, req.side, req.effect, req.qty, px),
        );
        CommandAck::with_order(order_id)
    }

    pub fn cancel_all(&mut self) {
        for o in self.orders.iter_mut() {
            if o.status == OrderStatus::New {
                o.status = OrderStatus::Cancelled;
            }
        }
        self.append_log("Cancel", "All resting orders cancelled".to_string());
    }

    pub fn close_position(&mut self, req: &CloseRequest) -> CommandAck {
        if req.qty == 0 {
            return CommandAck::rejected("qty must be > 0");
        }
        let Some(m) = self.market.get(&req.symbol) else {
            return CommandAck::rejected("unknown symbol");
        };
        let Some(spec) = self.specs.get(&m.code) else {
            return CommandAck::rejected("unknown symbol");
        };
        let last = m.last;
        let mult = spec.mult as f64;
        let fee_per_lot = self.config.fee_per_lot;

        let Some(pos) = self
            .positions
            .iter_mut()
            .find(|p| p.symbol == req.symbol && p.side == req.side)
        else {
            return CommandAck::rejected("position not found");
        };

        let q = req.qty.min(pos.qty);
        let fee = fee_for(q, fee_per_lot);
        let pnl = (last - pos.avg_open) * req.side.sign() * mult * q as f64;
        pos.qty -= q;

        self.cash += pnl - fee;
        self.realized_pnl += pnl;
        self.fees += fee;
        self.positions.retain(|p| p.qty > 0);

        self.trades.push(Trade {
            id: format!("C{}", self.trades.len() + 1),
            symbol: req.symbol.clone(),
            side: req.side.closing_side(),
            effect: Effect::Close,
            price: last,
            qty: q,
            fee,
            ts: now_str(),
        });
        self.append_log(
            "Manual close",
            format!("{} {} closed {} lots @ {:.2}", req.symbol, req.side, q, last),
        );
        CommandAck::ok()
    }

    // --------- Internal helpers ----------

    fn position(&self, symbol: &str, side: PositionSide) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol && p.side == side)
    }

    fn fill_order(&mut self, idx: usize) {
        let Some(order) = self.orders.get(idx).cloned() else {
            return;
        };
        if order.status != OrderStatus::New {
            return;
        }
        let Some(m) = self.market.get(&order.symbol) else {
            return;
        };
        let Some(spec) = self.specs.get(&m.code).cloned() else {
            return;
        };
        let fill_price = m.last;
        let fee = fee_for(order.qty, self.config.fee_per_lot);

        self.orders[idx].status = OrderStatus::Filled;
        self.trades.push(Trade {
            id: format!("T{}", order.id),
            symbol: order.symbol.clone(),
            side: order.side,
            effect: order.effect,
            price: fill_price,
            qty: order.qty,
            fee,
            ts: now_str(),
        });
        self.fees += fee;

        let mult = spec.mult as f64;
        match order.effect {
            Effect::Open => {
                let side = order.side.opened_position();
                match self
                    .positions
                    .iter_mut()
                    .find(|p| p.symbol == order.symbol && p.side == side)
                {
                    Some(pos) => {
                        let new_qty = pos.qty + order.qty;
                        pos.avg_open = (pos.avg_open * pos.qty as f64
                            + fill_price * order.qty as f64)
                            / new_qty as f64;
                        pos.qty = new_qty;
                        pos.margin = fill_price * mult * pos.qty as f64 * spec.margin;
                    }
                    None => self.positions.push(Position {
                        symbol: order.symbol.clone(),
                        side,
                        qty: order.qty,
                        avg_open: fill_price,
                        multiplier: spec.mult,
                        margin: fill_price * mult * order.qty as f64 * spec.margin,
                    }),
                }
                self.cash -= fee;
            }
            Effect::Close => {
                let side = order.side.closed_position();
                let Some(pos) = self
                    .positions
                    .iter_mut()
                    .find(|p| p.symbol == order.symbol && p.side == side)
                else {
                    return;
                };
                let q = order.qty.min(pos.qty);
                let pnl = (fill_price - pos.avg_open) * side.sign() * mult * q as f64;
                pos.qty -= q;
                pos.margin = fill_price * mult * pos.qty as f64 * spec.margin;

                self.cash += pnl - fee;
                self.realized_pnl += pnl;
                self.positions.retain(|p| p.qty > 0);
            }
        }

        self.append_log(
            "Fill",
            format!(
                "{} {}/{} {} lots @ {:.2}, fee {:.2}",
                order.symbol, order.side, order.effect, order.qty, fill_price, fee
            ),
        );
    }

    fn append_log(&mut self, title: &str, detail: String) {
        self.round_log.push(RoundLogEntry {
            title: title.to_string(),
            detail,
            ts: now_str(),
        });
        if self.round_log.len() > self.config.round_log_cap {
            let excess = self.round_log.len() - self.config.round_log_cap;
            self.round_log.drain(..excess);
        }
    }
}

/// Wall-clock time of day for log and order stamps
pub fn now_str() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::OrderSide;

    fn state() -> GameState {
        GameState::new(EngineConfig::default(), 42)
    }

    fn first_main(s: &GameState) -> (String, f64) {
        let symbol = s.main_contract(&s.products[0].code);
        let last = s.market[&symbol].last;
        (symbol, last)
    }

    fn buy_open(symbol: &str, price: f64, qty: u32) -> OrderRequest {
        OrderRequest {
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            effect: Effect::Open,
            price,
            qty,
        }
    }

    #[test]
    fn test_default_state() {
        let s = state();
        let payload = s.state_payload();
        assert_eq!(payload.market.len(), 12);
        assert_eq!(payload.account.equity, 200_000.0);
        assert_eq!(payload.account.available, 200_000.0);
        assert!(payload.positions.is_empty());
        assert!(payload.orders.is_empty());
        assert!(payload.trades.is_empty());
        assert!(payload.round_log.is_empty());
        assert!(payload.day_bars.values().all(|b| b.is_empty()));
    }

    #[test]
    fn test_same_seed_same_market() {
        assert_eq!(GameState::new(EngineConfig::default(), 9), GameState::new(EngineConfig::default(), 9));
    }

    #[test]
    fn test_bootstrap_lists_main_contracts() {
        let boot = state().bootstrap_payload();
        assert_eq!(boot.products.len(), 12);
        assert_eq!(boot.products[0].main_contract, "AKT2603");
        assert!(boot.products.iter().all(|p| boot.specs.contains_key(&p.code)));
        assert!(boot.products[0].asset_file.is_none());
    }

    #[test]
    fn test_marketable_order_fills_immediately() {
        let mut s = state();
        let (symbol, last) = first_main(&s);

        let ack = s.place_order(&buy_open(&symbol, last, 1));
        assert!(ack.ok);
        assert_eq!(ack.order_id, Some(1001));
        assert_eq!(s.orders[0].status, OrderStatus::Filled);
        assert_eq!(s.trades.len(), 1);
        assert_eq!(s.positions.len(), 1);
        assert_eq!(s.positions[0].side, PositionSide::Long);
        assert_eq!(s.positions[0].avg_open, last);
        assert_eq!(s.cash, 200_000.0 - 2.0);
    }

    #[test]
    fn test_resting_order_then_cancel() {
        let mut s = state();
        let (symbol, _) = first_main(&s);
        let floor = s.market[&symbol].limit_down;

        let ack = s.place_order(&buy_open(&symbol, floor, 1));
        assert!(ack.ok);
        assert_eq!(s.orders[0].status, OrderStatus::New);
        assert!(s.positions.is_empty());

        s.cancel_all();
        assert_eq!(s.orders[0].status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let mut s = state();
        let before = s.clone();
        let (symbol, last) = first_main(&s);

        assert_eq!(s.place_order(&buy_open("NOPE2603", last, 1)).error.as_deref(), Some("unknown symbol"));
        assert_eq!(s.place_order(&buy_open(&symbol, last, 0)).error.as_deref(), Some("qty must be > 0"));
        assert_eq!(s.place_order(&buy_open(&symbol, last, 100_000)).error.as_deref(), Some("margin not enough"));

        let close = OrderRequest {
            effect: Effect::Close,
            side: OrderSide::Sell,
            ..buy_open(&symbol, last, 1)
        };
        assert_eq!(s.place_order(&close).error.as_deref(), Some("position not enough"));

        assert_eq!(s, before);
    }

    #[test]
    fn test_manual_close_realizes_pnl() {
        let mut s = state();
        let (symbol, last) = first_main(&s);
        s.place_order(&buy_open(&symbol, last, 2));

        s.market.get_mut(&symbol).unwrap().last = last + 10.0;
        let mult = s.positions[0].multiplier as f64;

        let ack = s.close_position(&CloseRequest {
            symbol: symbol.clone(),
            side: PositionSide::Long,
            qty: 1,
        });
        assert!(ack.ok);
        assert_eq!(s.positions[0].qty, 1);
        assert_eq!(s.realized_pnl, 10.0 * mult);
        assert_eq!(s.trades.last().unwrap().id, "C2");
        assert_eq!(s.trades.last().unwrap().side, OrderSide::Sell);

        let missing = s.close_position(&CloseRequest {
            symbol,
            side: PositionSide::Short,
            qty: 1,
        });
        assert_eq!(missing.error.as_deref(), Some("position not found"));
    }

    #[test]
    fn test_day_roll_appends_bars() {
        let mut s = state();
        for _ in 0..30 {
            s.advance_tick();
        }
        let payload = s.state_payload();
        assert!(payload.day_bars.values().all(|b| b.len() == 1));
        assert_eq!(payload.day_bars["AKT2603"][0].day, 1);
        assert_eq!(payload.round_log.last().unwrap().title, "Day roll");
        assert_eq!(payload.round_log.len(), 31);
    }

    #[test]
    fn test_round_log_view_is_bounded() {
        let mut s = state();
        for _ in 0..100 {
            s.cancel_all();
        }
        assert_eq!(s.round_log.len(), 80);
        assert_eq!(s.state_payload().round_log.len(), 40);
    }

    #[test]
    fn test_blob_round_trip_replays_ticks() {
        let mut a = state();
        a.advance_tick();
        let blob = serde_json::to_string(&a).unwrap();
        let mut b: GameState = serde_json::from_str(&blob).unwrap();

        a.advance_tick();
        b.advance_tick();
        assert_eq!(a.market, b.market);
    }
}
