mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use zflow_ai::gemini::{GeminiModel, GeminiSettings};
use zflow_api::AppStateInner;
use zflow_api::identity::GoogleIdentity;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zflow=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(zflow_db::Database::open(&config.db_path)?);

    let chat_model = GeminiModel::new(GeminiSettings {
        model: config.model.clone(),
        base_url: config.ai_base_url.clone(),
        timeout: config.ai_timeout,
        ..GeminiSettings::chat(config.gemini_api_key.clone())
    })?;
    let code_model = GeminiModel::new(GeminiSettings {
        model: config.model.clone(),
        base_url: config.ai_base_url.clone(),
        timeout: config.ai_timeout,
        ..GeminiSettings::code(config.gemini_api_key.clone())
    })?;
    let identity = GoogleIdentity::new(config.userinfo_url.clone())?;

    let state = AppStateInner::new(
        db,
        config.jwt_secret.clone(),
        Arc::new(chat_model),
        Arc::new(code_model),
        Arc::new(identity),
        config.public.clone(),
    );

    let app = zflow_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Z Flow server listening on {} (model {})", addr, config.model);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
