use exit_interview::bot::{run_polling, Dispatcher};
use exit_interview::completion_client::OpenRouterClient;
use exit_interview::config::BotSettings;
use exit_interview::db;
use exit_interview::interview::InterviewMachine;
use exit_interview::logging::init_logging;
use exit_interview::store::SqliteTranscriptStore;
use exit_interview::telegram_client::TelegramClient;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging("Exit-interview bot")?;

    let settings = BotSettings::from_env()?;

    let db_pool = db::create_pool(&settings.database_url).await?;
    tracing::info!("Database ready at {}", settings.database_url);

    let completion = OpenRouterClient::new(settings.completion.api_key.clone())
        .with_base_url(settings.completion.base_url.clone())
        .with_model(settings.completion.model.clone())
        .with_temperature(settings.interview.temperature);

    tracing::info!(
        "Configuration - Policy: {}, Model: {}, Cancel: {:?}, Summary: {:?}",
        settings.interview.policy.name(),
        completion.model(),
        settings.interview.cancel_behavior,
        settings.interview.summary_mode
    );

    let telegram = TelegramClient::new(settings.telegram_token.clone());
    let script = settings.interview.script.clone();

    let machine = InterviewMachine::new(
        Arc::new(completion),
        Arc::new(SqliteTranscriptStore::new(db_pool)),
        Arc::new(telegram.clone()),
        settings.interview,
    );
    let dispatcher = Dispatcher::new(Arc::new(machine));

    tokio::select! {
        _ = run_polling(&telegram, &dispatcher, &script) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        }
    }

    dispatcher.shutdown().await;
    tracing::info!("Bot stopped");
    Ok(())
}
