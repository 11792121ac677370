/// End-to-end session tests against the in-process engine
///
/// To run: cargo test --package sim-client --test session_flow
use sim_client::config::{SAVE_KEY, TOUR_DONE_KEY};
use sim_client::tour::{NextOutcome, RenderOutcome, StaticLayout, TourStatus, Viewport};
use sim_client::{
    ChartMode, ClientConfig, ClientError, LmdbStore, MemoryStore, NoticeLevel, OrderAction,
    ScaleMode, Session, StateStore,
};
use sim_core::{OrderStatus, PositionSide};
use sim_engine::{EngineConfig, LocalEngine};
use std::sync::Arc;

async fn open_session<S: StateStore>(seed: u64, store: Arc<S>) -> Session<LocalEngine, S> {
    let engine = Arc::new(LocalEngine::new(EngineConfig::seeded(seed)));
    let mut session = Session::open(engine, store, ClientConfig::default()).await.unwrap();
    session.initialize().await.unwrap();
    session
}

fn last_price<S: StateStore>(session: &Session<LocalEngine, S>) -> f64 {
    let symbol = session.selected_symbol().unwrap();
    session.snapshot().unwrap().market[symbol].last
}

#[tokio::test]
async fn test_initialize_selects_first_product() {
    let store = Arc::new(MemoryStore::new());
    let session = open_session(2024, store).await;

    let boot = session.bootstrap().unwrap();
    assert_eq!(session.selected_product(), Some(boot.products[0].code.as_str()));
    assert_eq!(session.selected_symbol(), Some(boot.products[0].main_contract.as_str()));
    assert_eq!(session.action(), OrderAction::OpenLong);
    assert_eq!(session.tour().status(), TourStatus::Active { step: 0 });

    let vm = session.view_model().unwrap();
    assert_eq!(vm.products.len(), 12);
    assert_eq!(vm.position_count(), 0);
}

#[tokio::test]
async fn test_valid_submit_is_visible_and_persisted() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(2024, Arc::clone(&store)).await;
    assert_eq!(store.load(SAVE_KEY).unwrap(), None);

    let price = last_price(&session).to_string();
    session.submit_order(&price, "1").await.unwrap();

    let state = session.snapshot().unwrap();
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.orders[0].status, OrderStatus::Filled);
    assert_eq!(state.positions.len(), 1);
    assert_eq!(state.positions[0].side, PositionSide::Long);
    assert_eq!(state.trades.len(), 1);
    assert!(store.load(SAVE_KEY).unwrap().is_some());

    let notice = session.notices().last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
}

#[tokio::test]
async fn test_rejected_submit_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(31, Arc::clone(&store)).await;

    session.advance_tick().await.unwrap();
    let blob = store.load(SAVE_KEY).unwrap();
    let before = session.snapshot().cloned();

    // Nothing to close yet
    session.set_action(OrderAction::CloseShort);
    let price = last_price(&session).to_string();
    let err = session.submit_order(&price, "1").await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(err.to_string(), "position not enough");

    assert_eq!(session.snapshot().cloned(), before);
    assert_eq!(store.load(SAVE_KEY).unwrap(), blob);

    let notice = session.notices().last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.detail, "position not enough");
}

#[tokio::test]
async fn test_bad_price_never_reaches_engine() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(4, Arc::clone(&store)).await;

    let err = session.submit_order("12a", "1").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert!(session.snapshot().unwrap().orders.is_empty());
    assert_eq!(store.load(SAVE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_reset_restores_defaults_and_rearms_tour() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(2024, Arc::clone(&store)).await;
    let initial = session.snapshot().cloned().unwrap();

    let price = last_price(&session).to_string();
    session.submit_order(&price, "2").await.unwrap();
    session.advance_tick().await.unwrap();
    session.tour_skip().unwrap();
    assert_eq!(store.load(TOUR_DONE_KEY).unwrap().as_deref(), Some("1"));

    session.reset_all().await.unwrap();

    let state = session.snapshot().unwrap();
    assert!(state.positions.is_empty());
    assert!(state.orders.is_empty());
    assert!(state.trades.is_empty());
    assert!(state.round_log.is_empty());
    assert_eq!(state.account, initial.account);
    assert_eq!(state, &initial);

    assert_eq!(store.load(TOUR_DONE_KEY).unwrap(), None);
    assert_eq!(session.tour().status(), TourStatus::Active { step: 0 });
    assert!(store.load(SAVE_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_reopen_from_lmdb_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let saved = {
        let store = Arc::new(LmdbStore::open(dir.path()).unwrap());
        let mut session = open_session(17, store).await;
        let price = last_price(&session).to_string();
        session.submit_order(&price, "1").await.unwrap();
        session.advance_tick().await.unwrap();
        session.snapshot().cloned().unwrap()
    };

    // A different seed proves the state came from the blob
    let store = Arc::new(LmdbStore::open(dir.path()).unwrap());
    let session = open_session(99, store).await;
    assert_eq!(session.snapshot(), Some(&saved));
}

#[tokio::test]
async fn test_tour_waits_for_a_tick() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(6, store).await;

    for step in 1..=4 {
        assert_eq!(session.tour_next().unwrap(), NextOutcome::Advanced { step });
    }
    assert_eq!(session.tour_next().unwrap(), NextOutcome::Blocked);

    session.advance_tick().await.unwrap();
    assert_eq!(session.tour_next().unwrap(), NextOutcome::Advanced { step: 5 });
    assert_eq!(session.tour_next().unwrap(), NextOutcome::Finished);
    assert_eq!(session.tour().status(), TourStatus::Finished);

    let layout = StaticLayout::trading_screen();
    let outcome = session.tour_render(&layout, Viewport::new(1440.0, 900.0));
    assert_eq!(outcome, RenderOutcome::Hidden);
}

#[tokio::test]
async fn test_chart_modes() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(12, store).await;

    let frame = session.render_chart().unwrap();
    assert!(frame.texts().iter().any(|t| t.starts_with("limit up")));

    assert_eq!(session.toggle_auto_scale(), ScaleMode::Fixed);
    assert!(session.render_chart().is_ok());

    session.set_chart_mode(ChartMode::Day);
    assert_eq!(session.chart_mode(), ChartMode::Day);
    assert!(session.render_chart().is_ok());
}

#[tokio::test]
async fn test_select_unknown_product() {
    let store = Arc::new(MemoryStore::new());
    let mut session = open_session(3, store).await;

    let second = session.bootstrap().unwrap().products[1].clone();
    session.select_product(&second.code).unwrap();
    assert_eq!(session.selected_symbol(), Some(second.main_contract.as_str()));

    let err = session.select_product("NOPE").unwrap_err();
    assert!(matches!(err, ClientError::UnknownSymbol(_)));
    assert_eq!(session.selected_symbol(), Some(second.main_contract.as_str()));
}
