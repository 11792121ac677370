use sim_core::{Order, OrderSide};

use crate::market::MarketState;

/// Buy at or above last, or sell at or below last
pub fn is_marketable(order: &Order, market: &MarketState) -> bool {
    match order.side {
        OrderSide::Buy => order.price >= market.last,
        OrderSide::Sell => order.price <= market.last,
    }
}

pub fn fee_for(qty: u32, fee_per_lot: f64) -> f64 {
    fee_per_lot * qty as f64
}
