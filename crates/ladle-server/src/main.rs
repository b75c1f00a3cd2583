use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ladle_ai::OpenAiClient;
use ladle_api::auth::{AppState, AppStateInner};
use ladle_api::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ladle=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("LADLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("LADLE_DB_PATH").unwrap_or_else(|_| "ladle.db".into());
    let host = std::env::var("LADLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("LADLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY must be set"))?;
    let assistant_id = std::env::var("OPENAI_ASSISTANT_ID")
        .map_err(|_| anyhow::anyhow!("OPENAI_ASSISTANT_ID must be set"))?;

    let mut ai = OpenAiClient::new(api_key, assistant_id);
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        ai = ai.with_base_url(base_url);
    }
    if let Ok(model) = std::env::var("OPENAI_MODEL") {
        ai = ai.with_model(model);
    }

    // Init database
    let db = ladle_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, ai, jwt_secret });

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ladle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
