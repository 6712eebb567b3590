use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursecraft::api::router;
use coursecraft::config::Config;
use coursecraft::db;
use coursecraft::state::AppState;
use coursecraft::video::{MuxHttpClient, NoopVideoHost, VideoHost};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "coursecraft=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new_from_env()?;

    let pool = db::connect(&config.database_url).await?;

    let video: Arc<dyn VideoHost> = match config.mux.clone() {
        Some(mux) => Arc::new(MuxHttpClient::new(mux)?),
        None => Arc::new(NoopVideoHost),
    };

    let addr = config.bind_addr;
    let state = AppState {
        db: pool,
        video,
        config: Arc::new(config),
    };

    let app = router(state);

    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
