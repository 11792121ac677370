//! Guided first-run tour.
//!
//! The tour is a fixed sequence of steps. Each step points at a named anchor
//! in the UI and may be gated on something the player has done. Progress
//! flags are never stored directly: they are folded from an append-only log
//! of observations (action events and snapshot facts), so a gate is a pure
//! function of what has been seen.
//!
//! Geometry is recomputed from scratch on every render. A render against an
//! anchor that cannot be resolved yet reports [`RenderOutcome::Pending`] and
//! the caller retries after the engine's retry delay ([`RETRY_DELAY`] unless
//! overridden).

use sim_core::FullState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::StateStore;

/// Cut-out padding around the target
pub const SPOT_PAD: f64 = 8.0;
/// Minimum distance of the cut-out from the viewport edge
pub const VIEWPORT_INSET: f64 = 8.0;
pub const BUBBLE_WIDTH: f64 = 380.0;
pub const BUBBLE_HEIGHT: f64 = 160.0;
/// Gap between target and bubble
pub const BUBBLE_GAP: f64 = 14.0;
/// Minimum distance of the bubble from the viewport edge
pub const BUBBLE_EDGE: f64 = 12.0;
pub const RETRY_DELAY: Duration = Duration::from_millis(120);

/// Value stored under the completion key once the tour is done
pub const DONE_FLAG: &str = "1";

// ═══════════════════════════════════════════════════════════════
// GEOMETRY
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Four shades around a spotlight plus the explanation bubble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub shade_top: Rect,
    pub shade_bottom: Rect,
    pub shade_left: Rect,
    pub shade_right: Rect,
    pub spotlight: Rect,
    pub bubble: Rect,
}

impl Overlay {
    pub fn shades(&self) -> [Rect; 4] {
        [self.shade_top, self.shade_bottom, self.shade_left, self.shade_right]
    }
}

/// Overlay geometry for `target` inside `viewport`
pub fn compute_overlay(target: Rect, viewport: Viewport) -> Overlay {
    let (vw, vh) = (viewport.width, viewport.height);

    let x = (target.x - SPOT_PAD).max(VIEWPORT_INSET);
    let y = (target.y - SPOT_PAD).max(VIEWPORT_INSET);
    let w = (target.width + SPOT_PAD * 2.0).min(vw - VIEWPORT_INSET * 2.0);
    let h = (target.height + SPOT_PAD * 2.0).min(vh - VIEWPORT_INSET * 2.0);

    let spotlight = Rect::new(x, y, w, h);
    let shade_top = Rect::new(0.0, 0.0, vw, y);
    let shade_bottom = Rect::new(0.0, y + h, vw, (vh - (y + h)).max(0.0));
    let shade_left = Rect::new(0.0, y, x, h);
    let shade_right = Rect::new(x + w, y, (vw - (x + w)).max(0.0), h);

    Overlay {
        shade_top,
        shade_bottom,
        shade_left,
        shade_right,
        spotlight,
        bubble: place_bubble(target, viewport),
    }
}

/// Right of the target, else left, else below; pulled up if it would overflow the bottom
fn place_bubble(target: Rect, viewport: Viewport) -> Rect {
    let (vw, vh) = (viewport.width, viewport.height);
    let bw = BUBBLE_WIDTH.min(vw - BUBBLE_EDGE * 2.0);
    let bh = BUBBLE_HEIGHT;

    let mut bx = target.right() + BUBBLE_GAP;
    let mut by = target.y;

    if bx + bw > vw - BUBBLE_EDGE {
        bx = target.x - bw - BUBBLE_GAP;
    }
    if bx < BUBBLE_EDGE {
        bx = BUBBLE_EDGE;
        by = target.bottom() + BUBBLE_GAP;
    }
    if by + bh > vh - BUBBLE_EDGE {
        by = BUBBLE_EDGE.max(target.y - bh - BUBBLE_GAP);
    }

    Rect::new(bx, by, bw, bh)
}

// ═══════════════════════════════════════════════════════════════
// ANCHORS
// ═══════════════════════════════════════════════════════════════

/// Looks up UI targets by name. `None` means "not laid out yet".
pub trait AnchorResolver {
    fn resolve(&self, anchor: &str) -> Option<Rect>;
}

/// Anchor map fixed up front
#[derive(Debug, Clone, Default)]
pub struct StaticLayout {
    anchors: HashMap<String, Rect>,
}

impl StaticLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, anchor: &str, rect: Rect) -> Self {
        self.set(anchor, rect);
        self
    }

    pub fn set(&mut self, anchor: &str, rect: Rect) {
        self.anchors.insert(anchor.to_string(), rect);
    }

    pub fn remove(&mut self, anchor: &str) {
        self.anchors.remove(anchor);
    }

    /// Layout of the default trading screen in a 1440x900 window
    pub fn trading_screen() -> Self {
        Self::new()
            .with("brand", Rect::new(16.0, 12.0, 220.0, 36.0))
            .with("clock", Rect::new(1260.0, 12.0, 160.0, 36.0))
            .with("last_price", Rect::new(420.0, 96.0, 180.0, 48.0))
            .with("btn_open_long", Rect::new(1100.0, 180.0, 150.0, 40.0))
            .with("btn_submit", Rect::new(1100.0, 420.0, 310.0, 44.0))
            .with("btn_next_tick", Rect::new(980.0, 12.0, 130.0, 36.0))
            .with("positions", Rect::new(16.0, 640.0, 1408.0, 240.0))
            .with("tab_body", Rect::new(16.0, 600.0, 1408.0, 280.0))
    }
}

impl AnchorResolver for StaticLayout {
    fn resolve(&self, anchor: &str) -> Option<Rect> {
        self.anchors.get(anchor).copied()
    }
}

// ═══════════════════════════════════════════════════════════════
// STEPS, EVENTS AND FLAGS
// ═══════════════════════════════════════════════════════════════

/// Action reported by the session after a successful command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TourEvent {
    SubmitOk,
    TickOk,
}

impl TourEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourEvent::SubmitOk => "submit_ok",
            TourEvent::TickOk => "tick_ok",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "submit_ok" => Some(TourEvent::SubmitOk),
            "tick_ok" => Some(TourEvent::TickOk),
            _ => None,
        }
    }
}

/// One entry of the observation log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Action(TourEvent),
    /// A snapshot contained at least one position
    PositionsSeen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TourFlag {
    Submitted,
    Ticked,
}

/// Flags derived from the observation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedFlags {
    pub submitted: bool,
    pub ticked: bool,
}

impl DerivedFlags {
    pub fn fold(log: &[Observation]) -> Self {
        log.iter().fold(Self::default(), |mut flags, obs| {
            match obs {
                Observation::Action(TourEvent::SubmitOk) | Observation::PositionsSeen => {
                    flags.submitted = true
                }
                Observation::Action(TourEvent::TickOk) => flags.ticked = true,
            }
            flags
        })
    }

    pub fn get(&self, flag: TourFlag) -> bool {
        match flag {
            TourFlag::Submitted => self.submitted,
            TourFlag::Ticked => self.ticked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gate {
    #[default]
    Always,
    Flag(TourFlag),
}

impl Gate {
    pub fn is_open(&self, flags: &DerivedFlags) -> bool {
        match self {
            Gate::Always => true,
            Gate::Flag(flag) => flags.get(*flag),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TourStep {
    pub title: String,
    pub body: String,
    pub hint: Option<String>,
    pub button: String,
    /// Tried in order; the first that resolves is the target
    pub anchors: Vec<String>,
    pub gate: Gate,
}

impl TourStep {
    pub fn new(title: &str, body: &str, button: &str, anchors: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            hint: None,
            button: button.to_string(),
            anchors: anchors.iter().map(|a| a.to_string()).collect(),
            gate: Gate::Always,
        }
    }

    pub fn hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    pub fn resolve_target<R: AnchorResolver + ?Sized>(&self, resolver: &R) -> Option<Rect> {
        self.anchors.iter().find_map(|a| resolver.resolve(a))
    }
}

/// The six steps of the first-run tour
pub fn default_steps() -> Vec<TourStep> {
    vec![
        TourStep::new(
            "Welcome to the futures exchange",
            "Two ticks to your first trade: read the price, open long, submit, then advance a tick and watch your PnL.",
            "Let's go",
            &["brand", "clock"],
        ),
        TourStep::new(
            "Read the last price",
            "The big number in the middle is the last price. Every price is held inside the limit band.",
            "Got it",
            &["last_price"],
        ),
        TourStep::new(
            "Choose: open long",
            "Start with the simplest trade: open one long lot, betting the price goes up. Pick Open Long on the right.",
            "Okay",
            &["btn_open_long"],
        )
        .hint("Picked open short or a close by mistake? Switch back to Open Long to continue."),
        TourStep::new(
            "Submit your first order",
            "Submit the order. Price defaults to the last price and quantity to one lot. Fills appear as positions at the bottom.",
            "Sure",
            &["btn_submit"],
        )
        .hint("If margin or position is not enough the engine says so. Set the quantity back to 1."),
        TourStep::new(
            "Advance one tick",
            "Press Next Tick to move the market one round. Watch floating PnL and risk change.",
            "Go",
            &["btn_next_tick"],
        )
        .hint("This is the core of turn-based trading: you decide when the market moves.")
        .gated(Gate::Flag(TourFlag::Ticked)),
        TourStep::new(
            "First round complete",
            "You can now read prices, place orders, advance ticks and watch PnL and risk. Next, try resting limit orders or going short.",
            "Start trading",
            &["positions", "tab_body"],
        ),
    ]
}

// ═══════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourStatus {
    /// Armed but not started
    Idle,
    Active { step: usize },
    /// Terminal until re-armed
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    Advanced { step: usize },
    /// Current step's gate is closed
    Blocked,
    Finished,
    /// Tour not running
    Inactive,
}

/// Everything needed to draw one tour step
#[derive(Debug, Clone, PartialEq)]
pub struct TourFrame {
    pub step: usize,
    pub total: usize,
    pub title: String,
    pub body: String,
    pub hint: Option<String>,
    pub button: String,
    pub can_advance: bool,
    pub overlay: Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Tour not running; draw nothing
    Hidden,
    /// No anchor of the current step resolved; render again after `retry_after`
    Pending { retry_after: Duration },
    Shown(TourFrame),
}

pub struct TourEngine<S: StateStore> {
    steps: Vec<TourStep>,
    status: TourStatus,
    observations: Vec<Observation>,
    store: Arc<S>,
    done_key: String,
    retry_delay: Duration,
}

impl<S: StateStore> TourEngine<S> {
    /// Load the completion flag; a completed tour starts `Finished`
    pub fn new(steps: Vec<TourStep>, store: Arc<S>, done_key: impl Into<String>) -> Result<Self, StoreError> {
        let done_key = done_key.into();
        let done = store.load(&done_key)?.as_deref() == Some(DONE_FLAG);

        Ok(Self {
            steps,
            status: if done { TourStatus::Finished } else { TourStatus::Idle },
            observations: Vec::new(),
            store,
            done_key,
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_default_steps(store: Arc<S>, done_key: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(default_steps(), store, done_key)
    }

    pub fn status(&self) -> TourStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, TourStatus::Active { .. })
    }

    pub fn steps(&self) -> &[TourStep] {
        &self.steps
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.status {
            TourStatus::Active { step } => Some(step),
            _ => None,
        }
    }

    pub fn current_step(&self) -> Option<&TourStep> {
        self.current_index().and_then(|i| self.steps.get(i))
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn flags(&self) -> DerivedFlags {
        DerivedFlags::fold(&self.observations)
    }

    /// Begin at step 0 with a cleared log. No effect once finished.
    pub fn start(&mut self) -> bool {
        if self.status == TourStatus::Finished || self.steps.is_empty() {
            return false;
        }
        self.status = TourStatus::Active { step: 0 };
        self.observations.clear();
        tracing::debug!("Tour started");
        true
    }

    /// Record an action. Never advances the step by itself.
    pub fn on_external_event(&mut self, event: TourEvent) {
        if self.is_active() {
            self.observations.push(Observation::Action(event));
        }
    }

    /// Record facts visible in a snapshot
    pub fn on_snapshot(&mut self, state: &FullState) {
        if !self.is_active() || state.positions.is_empty() {
            return;
        }
        if !self.observations.contains(&Observation::PositionsSeen) {
            self.observations.push(Observation::PositionsSeen);
        }
    }

    pub fn can_advance(&self) -> bool {
        let flags = self.flags();
        self.current_step()
            .map(|s| s.gate.is_open(&flags))
            .unwrap_or(false)
    }

    pub fn next(&mut self) -> Result<NextOutcome, StoreError> {
        let Some(step) = self.current_index() else {
            return Ok(NextOutcome::Inactive);
        };
        if !self.can_advance() {
            return Ok(NextOutcome::Blocked);
        }
        if step + 1 >= self.steps.len() {
            self.finish()?;
            return Ok(NextOutcome::Finished);
        }
        self.status = TourStatus::Active { step: step + 1 };
        Ok(NextOutcome::Advanced { step: step + 1 })
    }

    pub fn skip(&mut self) -> Result<(), StoreError> {
        self.finish()
    }

    /// Clear the completion flag and restart from step 0
    pub fn rearm(&mut self) -> Result<(), StoreError> {
        self.store.remove(&self.done_key)?;
        self.status = TourStatus::Idle;
        self.start();
        tracing::info!("Tour re-armed");
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        self.store.save(&self.done_key, DONE_FLAG)?;
        self.status = TourStatus::Finished;
        self.observations.clear();
        tracing::info!("Tour finished");
        Ok(())
    }

    /// Geometry and content for the current step. Pure; safe to call on
    /// every resize, scroll or step change.
    pub fn render<R: AnchorResolver + ?Sized>(&self, resolver: &R, viewport: Viewport) -> RenderOutcome {
        let (Some(index), Some(step)) = (self.current_index(), self.current_step()) else {
            return RenderOutcome::Hidden;
        };
        let Some(target) = step.resolve_target(resolver) else {
            return RenderOutcome::Pending {
                retry_after: self.retry_delay,
            };
        };

        RenderOutcome::Shown(TourFrame {
            step: index,
            total: self.steps.len(),
            title: step.title.clone(),
            body: step.body.clone(),
            hint: step.hint.clone(),
            button: step.button.clone(),
            can_advance: self.can_advance(),
            overlay: compute_overlay(target, viewport),
        })
    }

    /// Render, sleeping between attempts while the target is unresolved.
    /// Gives up after `max_attempts` and returns the last outcome.
    pub async fn render_when_ready<R: AnchorResolver + ?Sized>(
        &self,
        resolver: &R,
        viewport: Viewport,
        max_attempts: usize,
    ) -> RenderOutcome {
        let mut outcome = self.render(resolver, viewport);
        let mut attempts = 1;
        while let RenderOutcome::Pending { retry_after } = outcome {
            if attempts >= max_attempts {
                break;
            }
            tokio::time::sleep(retry_after).await;
            outcome = self.render(resolver, viewport);
            attempts += 1;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use sim_core::{Position, PositionSide};

    const VIEW: Viewport = Viewport::new(1440.0, 900.0);

    fn tour() -> TourEngine<MemoryStore> {
        TourEngine::with_default_steps(Arc::new(MemoryStore::new()), "EF_TUTORIAL_DONE").unwrap()
    }

    fn advance_to(tour: &mut TourEngine<MemoryStore>, step: usize) {
        while tour.current_index() != Some(step) {
            assert!(matches!(tour.next().unwrap(), NextOutcome::Advanced { .. }));
        }
    }

    #[test]
    fn test_start_at_step_zero() {
        let mut t = tour();
        assert_eq!(t.status(), TourStatus::Idle);
        assert!(t.start());
        assert_eq!(t.current_index(), Some(0));
        assert_eq!(t.flags(), DerivedFlags::default());
    }

    #[test]
    fn test_tick_gate_blocks_until_event() {
        let mut t = tour();
        t.start();
        advance_to(&mut t, 4);

        assert_eq!(t.next().unwrap(), NextOutcome::Blocked);
        assert_eq!(t.current_index(), Some(4));

        t.on_external_event(TourEvent::TickOk);
        assert_eq!(t.current_index(), Some(4));
        assert_eq!(t.next().unwrap(), NextOutcome::Advanced { step: 5 });
    }

    #[test]
    fn test_next_on_last_step_finishes_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut t = TourEngine::with_default_steps(store.clone(), "EF_TUTORIAL_DONE").unwrap();
        t.start();
        t.on_external_event(TourEvent::TickOk);
        advance_to(&mut t, 5);

        assert_eq!(t.next().unwrap(), NextOutcome::Finished);
        assert_eq!(t.status(), TourStatus::Finished);
        assert_eq!(store.load("EF_TUTORIAL_DONE").unwrap().as_deref(), Some("1"));

        // Terminal: start does nothing and a new engine on the same store stays finished
        assert!(!t.start());
        let again = TourEngine::with_default_steps(store, "EF_TUTORIAL_DONE").unwrap();
        assert_eq!(again.status(), TourStatus::Finished);
    }

    #[test]
    fn test_start_without_persisted_flag_restarts() {
        let mut t = tour();
        t.start();
        t.next().unwrap();
        t.next().unwrap();
        t.on_external_event(TourEvent::SubmitOk);

        assert!(t.start());
        assert_eq!(t.current_index(), Some(0));
        assert!(t.observations().is_empty());
    }

    #[test]
    fn test_skip_then_rearm() {
        let mut t = tour();
        t.start();
        t.skip().unwrap();
        assert_eq!(t.render(&StaticLayout::trading_screen(), VIEW), RenderOutcome::Hidden);

        t.rearm().unwrap();
        assert_eq!(t.current_index(), Some(0));
        assert_eq!(t.store.load("EF_TUTORIAL_DONE").unwrap(), None);
    }

    #[test]
    fn test_snapshot_with_positions_sets_submitted() {
        let mut t = tour();
        t.start();

        let mut state = FullState::default();
        t.on_snapshot(&state);
        assert!(!t.flags().submitted);

        state.positions.push(Position {
            symbol: "AKT2603".to_string(),
            side: PositionSide::Long,
            qty: 1,
            avg_open: 2000.0,
            multiplier: 10,
            margin: 2400.0,
        });
        t.on_snapshot(&state);
        t.on_snapshot(&state);
        assert!(t.flags().submitted);
        assert_eq!(t.observations().len(), 1);
    }

    #[test]
    fn test_events_ignored_while_inactive() {
        let mut t = tour();
        t.on_external_event(TourEvent::TickOk);
        assert!(t.observations().is_empty());
        assert_eq!(t.next().unwrap(), NextOutcome::Inactive);
    }

    #[test]
    fn test_event_parse() {
        assert_eq!(TourEvent::parse("tick_ok"), Some(TourEvent::TickOk));
        assert_eq!(TourEvent::SubmitOk.as_str(), "submit_ok");
        assert_eq!(TourEvent::parse("other"), None);
    }

    #[test]
    fn test_missing_anchor_is_pending_then_falls_back() {
        let mut t = tour();
        t.start();

        let mut layout = StaticLayout::new();
        assert_eq!(
            t.render(&layout, VIEW),
            RenderOutcome::Pending {
                retry_after: Duration::from_millis(120)
            }
        );

        // Step 0 falls back to its second anchor
        layout.set("clock", Rect::new(1260.0, 12.0, 160.0, 36.0));
        assert!(matches!(t.render(&layout, VIEW), RenderOutcome::Shown(_)));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut t = tour();
        t.start();
        let layout = StaticLayout::trading_screen();
        assert_eq!(t.render(&layout, VIEW), t.render(&layout, VIEW));
    }

    #[test]
    fn test_overlay_shades_surround_spotlight() {
        let o = compute_overlay(Rect::new(100.0, 200.0, 50.0, 20.0), VIEW);
        assert_eq!(o.spotlight, Rect::new(92.0, 192.0, 66.0, 36.0));
        assert_eq!(o.shade_top, Rect::new(0.0, 0.0, 1440.0, 192.0));
        assert_eq!(o.shade_bottom, Rect::new(0.0, 228.0, 1440.0, 672.0));
        assert_eq!(o.shade_left, Rect::new(0.0, 192.0, 92.0, 36.0));
        assert_eq!(o.shade_right, Rect::new(158.0, 192.0, 1282.0, 36.0));
    }

    #[test]
    fn test_spotlight_clamped_to_viewport() {
        let o = compute_overlay(Rect::new(0.0, 0.0, 2000.0, 1000.0), VIEW);
        assert_eq!(o.spotlight, Rect::new(8.0, 8.0, 1424.0, 884.0));
        assert_eq!(o.shade_bottom.height, 8.0);
        assert_eq!(o.shade_right.width, 8.0);
    }

    #[test]
    fn test_bubble_prefers_right() {
        let o = compute_overlay(Rect::new(100.0, 200.0, 50.0, 20.0), VIEW);
        assert_eq!(o.bubble, Rect::new(164.0, 200.0, 380.0, 160.0));
    }

    #[test]
    fn test_bubble_falls_back_left() {
        let o = compute_overlay(Rect::new(1200.0, 200.0, 100.0, 20.0), VIEW);
        assert_eq!(o.bubble.x, 1200.0 - 380.0 - 14.0);
        assert_eq!(o.bubble.y, 200.0);
    }

    #[test]
    fn test_bubble_falls_back_below() {
        let o = compute_overlay(Rect::new(100.0, 200.0, 1200.0, 40.0), VIEW);
        assert_eq!(o.bubble.x, 12.0);
        assert_eq!(o.bubble.y, 254.0);
    }

    #[test]
    fn test_bubble_clamped_near_top_when_bottom_overflows() {
        let o = compute_overlay(Rect::new(100.0, 800.0, 1200.0, 60.0), VIEW);
        assert_eq!(o.bubble.x, 12.0);
        assert_eq!(o.bubble.y, 800.0 - 160.0 - 14.0);

        let tall = compute_overlay(Rect::new(100.0, 50.0, 1200.0, 800.0), VIEW);
        assert_eq!(tall.bubble.y, 12.0);
    }

    #[test]
    fn test_bubble_narrows_in_small_viewport() {
        let o = compute_overlay(Rect::new(10.0, 10.0, 20.0, 20.0), Viewport::new(300.0, 600.0));
        assert_eq!(o.bubble.width, 276.0);
    }

    #[tokio::test]
    async fn test_render_when_ready_gives_up() {
        let mut t = tour();
        t.start();
        let outcome = t.render_when_ready(&StaticLayout::new(), VIEW, 2).await;
        assert!(matches!(outcome, RenderOutcome::Pending { .. }));
    }
}
