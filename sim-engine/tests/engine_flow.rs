/// End-to-end tests for the in-process engine through the `Engine` contract
///
/// To run: cargo test --package sim-engine --test engine_flow
use sim_core::{CloseRequest, Effect, Engine, OrderRequest, OrderSide, OrderStatus, PositionSide};
use sim_engine::{EngineConfig, LocalEngine};

async fn main_symbol(engine: &LocalEngine) -> (String, f64) {
    let boot = engine.bootstrap().await.unwrap();
    let symbol = boot.products[0].main_contract.clone();
    let state = engine.state().await.unwrap();
    let last = state.market[&symbol].last;
    (symbol, last)
}

#[tokio::test]
async fn test_reset_reproduces_first_session() {
    let engine = LocalEngine::new(EngineConfig::seeded(2024));
    let first = engine.state().await.unwrap();

    let (symbol, last) = main_symbol(&engine).await;
    engine
        .submit_order(&OrderRequest {
            symbol,
            side: OrderSide::Buy,
            effect: Effect::Open,
            price: last,
            qty: 1,
        })
        .await
        .unwrap();
    engine.advance_tick().await.unwrap();

    engine.reset_all().await.unwrap();
    let after = engine.state().await.unwrap();

    assert_eq!(after.account.equity, first.account.equity);
    assert!(after.positions.is_empty());
    assert!(after.orders.is_empty());
    assert!(after.trades.is_empty());
    assert!(after.round_log.is_empty());
    assert_eq!(after, first);
}

#[tokio::test]
async fn test_export_restore_round_trip() {
    let engine = LocalEngine::new(EngineConfig::seeded(5));
    let (symbol, last) = main_symbol(&engine).await;
    engine
        .submit_order(&OrderRequest {
            symbol,
            side: OrderSide::Sell,
            effect: Effect::Open,
            price: last,
            qty: 2,
        })
        .await
        .unwrap();
    let blob = engine.export_state().await.unwrap();

    let other = LocalEngine::new(EngineConfig::seeded(99));
    other.restore_state(Some(&blob)).await.unwrap();
    assert_eq!(other.state().await.unwrap(), engine.state().await.unwrap());

    engine.advance_tick().await.unwrap();
    other.advance_tick().await.unwrap();
    assert_eq!(other.state().await.unwrap().market, engine.state().await.unwrap().market);
}

#[tokio::test]
async fn test_restore_none_starts_fresh() {
    let engine = LocalEngine::new(EngineConfig::seeded(8));
    engine.advance_tick().await.unwrap();
    engine.restore_state(None).await.unwrap();

    let state = engine.state().await.unwrap();
    assert!(state.round_log.is_empty());
    assert_eq!(state.account.cash, 200_000.0);
}

#[tokio::test]
async fn test_short_then_manual_close() {
    let engine = LocalEngine::new(EngineConfig::seeded(13));
    let (symbol, last) = main_symbol(&engine).await;

    let ack = engine
        .submit_order(&OrderRequest {
            symbol: symbol.clone(),
            side: OrderSide::Sell,
            effect: Effect::Open,
            price: last,
            qty: 3,
        })
        .await
        .unwrap();
    assert!(ack.ok);

    let state = engine.state().await.unwrap();
    assert_eq!(state.orders[0].status, OrderStatus::Filled);
    assert_eq!(state.positions[0].side, PositionSide::Short);
    assert_eq!(state.positions[0].qty, 3);

    let ack = engine
        .close_position(&CloseRequest {
            symbol,
            side: PositionSide::Short,
            qty: 10,
        })
        .await
        .unwrap();
    assert!(ack.ok);

    let state = engine.state().await.unwrap();
    assert!(state.positions.is_empty());
    assert_eq!(state.trades.len(), 2);
    assert_eq!(state.account.fees, 12.0);
}
