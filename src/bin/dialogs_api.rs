use exit_interview::config::ApiSettings;
use exit_interview::db;
use exit_interview::handlers::{api_router, ApiState};
use exit_interview::logging::init_logging;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_logging("Dialogs API")?;

    let settings = ApiSettings::from_env()?;
    let db_pool = db::create_pool(&settings.database_url).await?;

    let app = api_router(Arc::new(ApiState::new(db_pool)));

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Dialogs API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
