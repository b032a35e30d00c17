use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aarogya::api::{create_router, AppState};
use aarogya::config::Config;
use aarogya::db::{Database, DatabaseBackend, LibSqlBackend};
use aarogya::drugs::OpenFdaClient;
use aarogya::llm::LlmProvider;
use aarogya::processing::PdfiumRasterizer;
use aarogya::storage::LocalImageStore;

#[derive(Parser)]
#[command(name = "aarogya")]
#[command(about = "Medicine and medical report analysis backend")]
struct Args {
    /// Bind address, overrides AAROGYA_HOST
    #[arg(long)]
    host: Option<String>,
    /// Listen port, overrides AAROGYA_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aarogya=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    if let Some(llm_config) = &config.llm {
        tracing::info!("Vision model configured: {}", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("Vision model unavailable - uploads will come back as unreadable");
    }

    let drugs = OpenFdaClient::new(&config.drug_lookup)?;
    let images = LocalImageStore::new(&config.storage);
    tokio::fs::create_dir_all(images.dir()).await?;
    let rasterizer = PdfiumRasterizer::new(&config.pdf);

    let state = AppState::new(
        config.clone(),
        db,
        llm.clone(),
        Arc::new(llm),
        Arc::new(drugs),
        Arc::new(images),
        Arc::new(rasterizer),
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Aarogya starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
