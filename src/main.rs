//! CLI for sigrelay
//!
//! Subcommands:
//! - `server`: run the WebSocket relay
//! - `client`: connect, subscribe, ping and publish once (useful for smoke tests)

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sigrelay::broker::Broker;
use sigrelay::client::ConnectionHub;
use sigrelay::config::{RegistryBackend, Settings, load_config};
use sigrelay::persistence::{MemoryStore, SledStore, TopicStore};
use sigrelay::transport::start_websocket_server;
use sigrelay::utils::error::RelayError;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sigrelay")]
enum Command {
    /// Start the WebSocket relay
    Server,
    /// Run the smoke-test client against a running relay
    Client {
        /// WebSocket URL of the relay
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Topic to subscribe and publish to
        #[arg(long, default_value = "lobby")]
        topic: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            sigrelay::utils::logging::init("info");
            return exit_code(Err(format!("Failed to load configuration: {e}")));
        }
    };
    sigrelay::utils::logging::init(&config.log.level);

    let result = match cmd {
        Command::Server => run_server(config)
            .await
            .map_err(|e| format!("Server failed: {e}")),
        Command::Client { url, topic } => run_client(&url, &topic)
            .await
            .map_err(|e| format!("Client failed: {e}")),
    };

    exit_code(result)
}

/// Log a failure and turn it into a non-zero exit status.
fn exit_code(result: Result<(), String>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config: Settings) -> Result<(), RelayError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let sled = match config.registry.backend {
        RegistryBackend::Sled => {
            Some(SledStore::open(&config.registry.path).map_err(RelayError::Registry)?)
        }
        RegistryBackend::Memory => None,
    };
    let store: Arc<dyn TopicStore> = match &sled {
        Some(sled) => {
            info!(path = %config.registry.path, "Using sled topic registry");
            Arc::new(sled.clone())
        }
        None => {
            info!("Using in-memory topic registry");
            Arc::new(MemoryStore::new())
        }
    };

    let hub = Arc::new(ConnectionHub::new());
    let broker = Arc::new(Broker::new(store, hub.clone(), config.registry.page_size));

    tokio::select! {
        result = start_websocket_server(addr, broker, hub) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    if let Some(sled) = sled {
        if let Err(e) = sled.flush().await {
            error!("Failed to flush topic registry: {e}");
        }
    }

    Ok(())
}

async fn run_client(url: &str, topic: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    let frames = [
        json!({ "type": "subscribe", "topics": [topic] }),
        json!({ "type": "ping" }),
        json!({ "type": "publish", "topic": topic, "payload": "Hello from sigrelay client" }),
    ];
    for frame in frames {
        ws_stream
            .send(WsMessage::Text(frame.to_string().into()))
            .await?;
    }

    // expect the pong and our own publish back
    for _ in 0..2 {
        match ws_stream.next().await {
            Some(Ok(WsMessage::Text(msg))) => println!("Incoming: {msg}"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => break,
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
