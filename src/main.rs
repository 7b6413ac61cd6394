use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, cors_layer, router};
use cxr_core::{CoreConfig, GeminiBackend, GeminiConfig, ReportService};

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Main entry point for the CXR report service
///
/// Starts the REST server. Narrative generation and PDF rendering run on the blocking pool,
/// whose size is bounded by `CXR_WORKER_THREADS`.
///
/// # Environment Variables
/// - `CXR_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `CXR_REPORTS_DIR`: Directory for rendered reports (default: "reports")
/// - `CXR_NARRATIVE_TIMEOUT_SECS`: Narrative request timeout in seconds (default: 20)
/// - `CXR_WORKER_THREADS`: Maximum blocking worker threads (default: 8)
/// - `CXR_TRAILING_FINDINGS`: `flush` or `drop` findings left open at the end of a narrative
/// - `CXR_CORS_ORIGINS`: Comma-separated allowed origins (default: permissive)
/// - `GEMINI_API_KEY`: Credential for the narrative backend
/// - `GEMINI_MODEL`, `GEMINI_BASE_URL`: Optional backend overrides
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or runtime fails
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cxr_run=info".parse()?)
                .add_directive("cxr_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env_values(
        env("CXR_REPORTS_DIR"),
        env("CXR_NARRATIVE_TIMEOUT_SECS"),
        env("CXR_WORKER_THREADS"),
        env("CXR_TRAILING_FINDINGS"),
    )?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(cfg.worker_threads())
        .build()?
        .block_on(serve(cfg))
}

async fn serve(cfg: CoreConfig) -> anyhow::Result<()> {
    let rest_addr: SocketAddr = env("CXR_REST_ADDR")
        .unwrap_or_else(|| "0.0.0.0:8000".into())
        .parse()?;

    let gemini = GeminiConfig::from_env_values(
        env("GEMINI_API_KEY"),
        env("GEMINI_MODEL"),
        env("GEMINI_BASE_URL"),
    )
    .with_http_timeout(cfg.narrative_timeout());
    if !gemini.has_api_key() {
        tracing::warn!("GEMINI_API_KEY is not set; report generation will fail until it is");
    }

    let service = ReportService::new(&cfg, Arc::new(GeminiBackend::new(gemini)))?;
    let cors = cors_layer(env("CXR_CORS_ORIGINS").as_deref())?;
    let app = router(AppState::new(service), cors);

    tracing::info!(
        reports_dir = %cfg.reports_dir().display(),
        timeout_secs = cfg.narrative_timeout().as_secs_f64(),
        worker_threads = cfg.worker_threads(),
        "++ Starting CXR REST on {}",
        rest_addr
    );

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
