//! Workflow server binary.
//!
//! Standalone HTTP server exposing the workflow execution core and the
//! GPU arbiter.

use std::sync::Arc;

use gpu_arbiter::GpuArbiter;
use workflow_core::{Engine, NodeRegistry};
use workflow_server::config::ServerConfig;
use workflow_server::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    tracing::info!("Loading server configuration...");
    let config = ServerConfig::load()?;
    tracing::info!("Listening on {}:{}", config.host, config.port);
    tracing::info!("Configured GPUs: {}", config.gpus.len());

    let registry = NodeRegistry::new();
    register_builtin_nodes(&registry);
    let engine = Arc::new(Engine::new(Arc::new(registry), config.engine.clone().into()));

    let arbiter = if config.gpus.is_empty() {
        tracing::info!("No GPUs configured; /gpu/* routes will answer 503");
        None
    } else {
        let gpus = config.gpus.iter().cloned().map(Into::into).collect();
        Some(Arc::new(GpuArbiter::new(gpus, config.gpu_strategy)))
    };

    let app_state = AppState::new(engine, arbiter);
    let app = create_router(app_state);

    let addr = config.socket_addr()?;
    tracing::info!("Starting workflow server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("Workflow server shut down gracefully");
    Ok(())
}

fn register_builtin_nodes(registry: &NodeRegistry) {
    use workflow_core::value::PortValue;
    use workflow_nodes::{DataSourceNode, DelayNode, IdentityNode, MergeNode};

    registry.register(DataSourceNode::schema(), Arc::new(DataSourceNode::new(PortValue::Boolean(false))));
    registry.register(IdentityNode::schema(), Arc::new(IdentityNode));
    registry.register(DelayNode::schema(), Arc::new(DelayNode::new(std::time::Duration::from_secs(0))));
    registry.register(MergeNode::schema(&["a", "b"]), Arc::new(MergeNode));
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received CTRL-C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
