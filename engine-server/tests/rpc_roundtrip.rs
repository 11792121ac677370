/// Integration tests for the engine JSON-RPC server
///
/// Each test binds the server on an ephemeral port and talks to it over a
/// plain TCP socket, one JSON object per line.
use engine_server::{EngineHandler, RpcServer, ServerConfig};
use serde_json::{json, Value};
use sim_engine::{EngineConfig, LocalEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

async fn spawn_server() -> SocketAddr {
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let engine = Arc::new(LocalEngine::new(EngineConfig::seeded(77)));
    let server = RpcServer::bind(&config, EngineHandler::new(engine)).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn call(addr: SocketAddr, request: Value) -> Value {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer.write_all(format!("{}\n", request).as_bytes()).await.unwrap();

    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await.unwrap();
    serde_json::from_str(&line).unwrap()
}

#[tokio::test]
async fn test_bootstrap_and_state() {
    let addr = spawn_server().await;

    let boot = call(addr, json!({"jsonrpc": "2.0", "id": 1, "method": "engine.bootstrap"})).await;
    assert_eq!(boot["id"], 1);
    assert_eq!(boot["result"]["products"].as_array().unwrap().len(), 12);

    let state = call(addr, json!({"jsonrpc": "2.0", "id": 2, "method": "engine.state"})).await;
    assert_eq!(state["result"]["account"]["equity"], 200000.0);
    assert!(state["result"]["round_log"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tick_then_state_shows_log() {
    let addr = spawn_server().await;

    let ack = call(addr, json!({"jsonrpc": "2.0", "id": 1, "method": "engine.tick"})).await;
    assert_eq!(ack["result"]["ok"], true);

    let state = call(addr, json!({"jsonrpc": "2.0", "id": 2, "method": "engine.state"})).await;
    assert_eq!(state["result"]["round_log"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_method_error() {
    let addr = spawn_server().await;
    let reply = call(addr, json!({"jsonrpc": "2.0", "id": 9, "method": "engine.fly"})).await;
    assert_eq!(reply["error"]["code"], -32601);
    assert!(reply["result"].is_null());
}
