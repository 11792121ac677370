use sim_core::{
    Bootstrap, CloseRequest, Effect, Engine, FullState, OrderRequest, OrderSide, PositionSide,
};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::bridge::StateBridge;
use crate::chart::{ChartRenderer, Frame};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::scale::ScaleMode;
use crate::store::StateStore;
use crate::tour::{AnchorResolver, NextOutcome, RenderOutcome, TourEngine, TourEvent, Viewport};
use crate::view_model::{ViewModel, ViewModelBuilder};

/// Order button selected in the order panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderAction {
    #[default]
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
}

impl OrderAction {
    pub fn side(self) -> OrderSide {
        match self {
            OrderAction::OpenLong | OrderAction::CloseShort => OrderSide::Buy,
            OrderAction::OpenShort | OrderAction::CloseLong => OrderSide::Sell,
        }
    }

    pub fn effect(self) -> Effect {
        match self {
            OrderAction::OpenLong | OrderAction::OpenShort => Effect::Open,
            OrderAction::CloseLong | OrderAction::CloseShort => Effect::Close,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open_long" => Some(OrderAction::OpenLong),
            "open_short" => Some(OrderAction::OpenShort),
            "close_long" => Some(OrderAction::CloseLong),
            "close_short" => Some(OrderAction::CloseShort),
            _ => None,
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderAction::OpenLong => "open long",
            OrderAction::OpenShort => "open short",
            OrderAction::CloseLong => "close long",
            OrderAction::CloseShort => "close short",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartMode {
    #[default]
    Tick,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
    /// Session cannot continue
    Fatal,
}

/// User-visible message
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub detail: String,
}

/// Strip thousands separators and parse; the result must be finite
pub fn parse_price(text: &str) -> Result<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| ClientError::InvalidInput("invalid price format".to_string()))
}

/// `max(1, floor(qty))`; empty input means one lot
pub fn parse_qty(text: &str) -> Result<u32> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(1);
    }
    let qty = text
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite())
        .ok_or_else(|| ClientError::InvalidInput("invalid quantity".to_string()))?;
    Ok(qty.floor().max(1.0).min(u32::MAX as f64) as u32)
}

/// One player's session: the explicit context every command runs against.
///
/// Commands take `&mut self`, so at most one is in flight per session.
pub struct Session<E: Engine, S: StateStore> {
    config: ClientConfig,
    bridge: StateBridge<E, S>,
    tour: TourEngine<S>,
    bootstrap: Option<Bootstrap>,
    selected_product: Option<String>,
    selected_symbol: Option<String>,
    action: OrderAction,
    chart_mode: ChartMode,
    scale_mode: ScaleMode,
    filter: String,
    notices: VecDeque<Notice>,
    renderer: ChartRenderer,
    builder: ViewModelBuilder,
}

impl<E: Engine, S: StateStore> Session<E, S> {
    /// Restore persisted Engine state and load the tour flag
    pub async fn open(engine: Arc<E>, store: Arc<S>, config: ClientConfig) -> Result<Self> {
        let bridge = StateBridge::open(engine, Arc::clone(&store), config.save_key()).await?;
        let tour = TourEngine::with_default_steps(store, config.tour_done_key())?
            .with_retry_delay(config.chart.tour_retry);

        Ok(Self {
            renderer: ChartRenderer::new(&config.chart),
            config,
            bridge,
            tour,
            bootstrap: None,
            selected_product: None,
            selected_symbol: None,
            action: OrderAction::default(),
            chart_mode: ChartMode::default(),
            scale_mode: ScaleMode::default(),
            filter: String::new(),
            notices: VecDeque::new(),
            builder: ViewModelBuilder,
        })
    }

    /// Fetch reference data, select the first product and load a snapshot
    pub async fn initialize(&mut self) -> Result<()> {
        let result = self.load_session().await;
        if let Err(e) = &result {
            self.push_notice(NoticeLevel::Fatal, "Initialization failed", e.to_string());
        }
        result?;
        self.tour.start();
        Ok(())
    }

    async fn load_session(&mut self) -> Result<()> {
        let bootstrap = self.bridge.bootstrap().await?;
        let first = bootstrap.products.first().cloned();
        self.bootstrap = Some(bootstrap);

        if let Some(p) = first {
            self.selected_product = Some(p.code);
            self.selected_symbol = Some(p.main_contract);
        }
        self.action = OrderAction::OpenLong;
        self.refresh().await
    }

    /// Replace the snapshot and let the tour look at it
    pub async fn refresh(&mut self) -> Result<()> {
        let state = self.bridge.refresh().await?;
        self.tour.on_snapshot(state);
        Ok(())
    }

    pub async fn advance_tick(&mut self) -> Result<()> {
        let result = self.bridge.advance_tick().await;
        self.after_command(result.map(|_| ()), "Advance failed").await?;
        self.tour.on_external_event(TourEvent::TickOk);
        self.push_notice(NoticeLevel::Info, "Tick advanced", "Market quotes updated for one round".to_string());
        Ok(())
    }

    /// Submit the current action for the selected contract
    pub async fn submit_order(&mut self, price_text: &str, qty_text: &str) -> Result<()> {
        let parsed = parse_price(price_text).and_then(|price| Ok((price, parse_qty(qty_text)?)));
        let (price, qty) = match parsed {
            Ok(v) => v,
            Err(e) => {
                self.push_notice(NoticeLevel::Error, "Order failed", e.to_string());
                return Err(e);
            }
        };
        let symbol = self.selected_symbol.clone().ok_or(ClientError::NotInitialized)?;

        let request = OrderRequest {
            symbol: symbol.clone(),
            side: self.action.side(),
            effect: self.action.effect(),
            price,
            qty,
        };
        let result = self.bridge.submit_order(&request).await;
        self.after_command(result.map(|_| ()), "Order failed").await?;

        self.tour.on_external_event(TourEvent::SubmitOk);
        self.push_notice(
            NoticeLevel::Info,
            "Order submitted",
            format!("{} {} {} lots @ {:.2} ({})", symbol, request.side, qty, price, request.effect),
        );
        Ok(())
    }

    pub async fn cancel_all(&mut self) -> Result<()> {
        let result = self.bridge.cancel_all().await;
        self.after_command(result.map(|_| ()), "Cancel failed").await?;
        self.push_notice(NoticeLevel::Info, "Orders cancelled", "All resting orders cancelled".to_string());
        Ok(())
    }

    pub async fn close_position(&mut self, symbol: &str, side: PositionSide, qty: u32) -> Result<()> {
        let request = CloseRequest {
            symbol: symbol.to_string(),
            side,
            qty,
        };
        let result = self.bridge.close_position(&request).await;
        self.after_command(result.map(|_| ()), "Close failed").await?;
        self.push_notice(NoticeLevel::Info, "Position closed", format!("{} {} {} lots", symbol, side, qty));
        Ok(())
    }

    /// Wipe persisted state, reinitialise the Engine and replay the tour
    pub async fn reset_all(&mut self) -> Result<()> {
        let result = self.bridge.reset_all().await;
        if let Err(e) = result {
            self.push_error("Reset failed", &e);
            return Err(e);
        }

        if let Err(e) = self.load_session().await {
            self.push_error("Reset failed", &e);
            return Err(e);
        }
        self.tour.rearm()?;
        self.push_notice(NoticeLevel::Info, "Reset", "Market and player state restored to defaults".to_string());
        Ok(())
    }

    /// On success refresh the snapshot; on failure record the message verbatim
    async fn after_command(&mut self, result: Result<()>, failure_title: &str) -> Result<()> {
        if let Err(e) = result {
            self.push_error(failure_title, &e);
            return Err(e);
        }
        if let Err(e) = self.refresh().await {
            self.push_error("Refresh failed", &e);
            return Err(e);
        }
        Ok(())
    }

    fn push_error(&mut self, title: &str, err: &ClientError) {
        let level = if err.is_fatal() {
            NoticeLevel::Fatal
        } else {
            NoticeLevel::Error
        };
        tracing::warn!("{}: {}", title, err);
        self.push_notice(level, title, err.to_string());
    }

    fn push_notice(&mut self, level: NoticeLevel, title: &str, detail: String) {
        self.notices.push_back(Notice {
            level,
            title: title.to_string(),
            detail,
        });
        while self.notices.len() > self.config.notice_cap {
            self.notices.pop_front();
        }
    }

    // --------- Selections ----------

    pub fn select_product(&mut self, code: &str) -> Result<()> {
        let bootstrap = self.bootstrap.as_ref().ok_or(ClientError::NotInitialized)?;
        let product = bootstrap
            .product(code)
            .ok_or_else(|| ClientError::UnknownSymbol(code.to_string()))?;

        self.selected_symbol = Some(product.main_contract.clone());
        self.selected_product = Some(product.code.clone());
        Ok(())
    }

    pub fn set_action(&mut self, action: OrderAction) {
        self.action = action;
    }

    pub fn set_chart_mode(&mut self, mode: ChartMode) {
        self.chart_mode = mode;
    }

    pub fn toggle_auto_scale(&mut self) -> ScaleMode {
        self.scale_mode = self.scale_mode.toggled();
        self.scale_mode
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    pub fn action(&self) -> OrderAction {
        self.action
    }

    pub fn chart_mode(&self) -> ChartMode {
        self.chart_mode
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn selected_product(&self) -> Option<&str> {
        self.selected_product.as_deref()
    }

    pub fn selected_symbol(&self) -> Option<&str> {
        self.selected_symbol.as_deref()
    }

    // --------- Read access ----------

    pub fn bootstrap(&self) -> Option<&Bootstrap> {
        self.bootstrap.as_ref()
    }

    pub fn snapshot(&self) -> Option<&FullState> {
        self.bridge.current()
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn bridge(&self) -> &StateBridge<E, S> {
        &self.bridge
    }

    pub fn tour(&self) -> &TourEngine<S> {
        &self.tour
    }

    fn loaded(&self) -> Result<(&Bootstrap, &FullState, &str)> {
        match (&self.bootstrap, self.bridge.current(), &self.selected_symbol) {
            (Some(b), Some(s), Some(sym)) => Ok((b, s, sym.as_str())),
            _ => Err(ClientError::NotInitialized),
        }
    }

    pub fn view_model(&self) -> Result<ViewModel> {
        let (bootstrap, state, symbol) = self.loaded()?;
        Ok(self.builder.build(bootstrap, state, symbol, &self.filter))
    }

    /// Chart of the selected contract in the current mode
    pub fn render_chart(&self) -> Result<Frame> {
        let (_, state, symbol) = self.loaded()?;
        let market = state
            .market
            .get(symbol)
            .ok_or_else(|| ClientError::UnknownSymbol(symbol.to_string()))?;

        Ok(match self.chart_mode {
            ChartMode::Tick => self.renderer.render_tick(
                &market.series,
                market.limit_down,
                market.limit_up,
                self.scale_mode,
            ),
            ChartMode::Day => {
                let bars = state.day_bars.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
                self.renderer.render_day(bars)
            }
        })
    }

    // --------- Tour passthroughs ----------

    pub fn tour_next(&mut self) -> Result<NextOutcome> {
        let outcome = self.tour.next()?;
        if outcome == NextOutcome::Finished {
            self.push_notice(NoticeLevel::Info, "Tour complete", "You finished the guided tour".to_string());
        }
        Ok(outcome)
    }

    pub fn tour_skip(&mut self) -> Result<()> {
        Ok(self.tour.skip()?)
    }

    pub fn tour_rearm(&mut self) -> Result<()> {
        Ok(self.tour.rearm()?)
    }

    pub fn tour_event(&mut self, event: TourEvent) {
        self.tour.on_external_event(event);
    }

    pub fn tour_render<R: AnchorResolver + ?Sized>(&self, resolver: &R, viewport: Viewport) -> RenderOutcome {
        self.tour.render(resolver, viewport)
    }

    /// Render, retrying while the current step's anchor is not laid out yet
    pub async fn tour_render_when_ready<R: AnchorResolver + ?Sized>(
        &self,
        resolver: &R,
        viewport: Viewport,
        max_attempts: usize,
    ) -> RenderOutcome {
        self.tour.render_when_ready(resolver, viewport, max_attempts).await
    }
}
