use std::net::SocketAddr;
use std::sync::Arc;

use relay_server::{AppState, build_router};
use shared::config::{RelayConfig, load_env_files};
use shared::llm::{AnthropicGateway, AnthropicGatewayConfig, LlmGateway};
use shared::relay::Relay;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    load_env_files();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "relay_server=debug,shared=info,axum=info".to_string()),
        )
        .init();

    let config = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let gateway: Option<Arc<dyn LlmGateway>> = match AnthropicGatewayConfig::from_env() {
        Ok(Some(gateway_config)) => match AnthropicGateway::new(gateway_config) {
            Ok(gateway) => {
                info!(model = %gateway.model(), "provider api key configured");
                Some(Arc::new(gateway))
            }
            Err(err) => {
                error!("failed to build provider gateway: {err}");
                std::process::exit(1);
            }
        },
        Ok(None) => {
            warn!("ANTHROPIC_API_KEY is not set; chat requests will report a missing key");
            None
        }
        Err(err) => {
            error!("failed to read provider config: {err}");
            std::process::exit(1);
        }
    };

    let app = build_router(AppState {
        relay: Relay::new(gateway).with_max_output_tokens(config.max_output_tokens),
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid bind address {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "relay server listening on http://{}/api/chat",
        listener.local_addr().unwrap_or(addr)
    );

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {err}");
        }
        info!("shutdown signal received");
    });

    if let Err(err) = server.await {
        error!("relay server stopped with error: {err}");
        std::process::exit(1);
    }
}
