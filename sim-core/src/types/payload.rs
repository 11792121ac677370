use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::market_snapshot::{DayBar, MarketSnapshot};
use super::trading::{
    AccountSnapshot, Effect, Order, OrderSide, Position, PositionSide, RoundLogEntry, Trade,
};
use crate::error::EngineError;

/// Tradable product as listed in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    pub name: String,
    pub main_contract: String,
    #[serde(default)]
    pub asset_file: Option<String>,
}

/// Static contract terms of one product code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSpec {
    #[serde(alias = "mult")]
    pub multiplier: u32,
    #[serde(alias = "margin")]
    pub margin_rate: f64,
    pub limit_pct: f64,
    #[serde(alias = "tick")]
    pub tick_size: f64,
}

/// Reference data fetched once per session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bootstrap {
    pub products: Vec<Product>,
    pub specs: BTreeMap<String, ContractSpec>,
}

impl Bootstrap {
    pub fn product(&self, code: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.code == code)
    }

    /// Product whose main contract is `symbol`
    pub fn product_for_symbol(&self, symbol: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.main_contract == symbol)
    }

    /// Contract spec for a contract symbol
    pub fn spec_for_symbol(&self, symbol: &str) -> Option<&ContractSpec> {
        self.product_for_symbol(symbol)
            .and_then(|p| self.specs.get(&p.code))
    }
}

/// Full-replacement state payload. Consumers discard prior state on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullState {
    pub market: BTreeMap<String, MarketSnapshot>,
    #[serde(default, alias = "day_klines")]
    pub day_bars: BTreeMap<String, Vec<DayBar>>,
    pub account: AccountSnapshot,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub round_log: Vec<RoundLogEntry>,
}

/// Parameters of `submitOrder`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub effect: Effect,
    pub price: f64,
    pub qty: u32,
}

/// Parameters of `closePosition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseRequest {
    pub symbol: String,
    pub side: PositionSide,
    pub qty: u32,
}

/// Parameters of `restoreState`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreRequest {
    #[serde(default)]
    pub blob: Option<String>,
}

/// Success/failure result of a mutating command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
}

impl CommandAck {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
            order_id: None,
        }
    }

    pub fn with_order(order_id: u64) -> Self {
        Self {
            ok: true,
            error: None,
            order_id: Some(order_id),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            order_id: None,
        }
    }

    /// Map `ok: false` onto `EngineError::Rejected`, keeping the message verbatim
    pub fn into_result(self) -> Result<CommandAck, EngineError> {
        if self.ok {
            Ok(self)
        } else {
            Err(EngineError::Rejected(
                self.error.unwrap_or_else(|| "command rejected".to_string()),
            ))
        }
    }
}
