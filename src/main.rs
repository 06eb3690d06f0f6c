use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;

use dripcoin::cli::{Cli, Commands};
use dripcoin::core::{init_logger, log_configuration, AppConfig, AppError, AppResult};
use dripcoin::ledger::ReferralLedger;
use dripcoin::storage::{DocumentStore, MemoryStore, SqliteStore};
use dripcoin::telegram::{
    create_bot, resolve_bot_username, schema, setup_bot_commands, HandlerDeps, TelegramAvatarLookup,
};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    let cli = Cli::parse_args();
    let config = AppConfig::from_env();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config.log_file_path)?;

    match cli.command {
        Some(Commands::Run { webhook, in_memory }) => {
            log::info!("Running bot (webhook: {}, in_memory: {})", webhook, in_memory);
            run_bot(config, webhook, in_memory).await
        }
        Some(Commands::User { user_id }) => Ok(print_user(&config, &user_id).await?),
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(config, false, false).await
        }
    }
}

/// Print one user record from the database
async fn print_user(config: &AppConfig, user_id: &str) -> AppResult<()> {
    let store = Arc::new(SqliteStore::open(&config.database_path)?);
    let ledger = ReferralLedger::new(store, config.ledger.clone());

    match ledger.load_user(user_id).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No user {} in {}", user_id, config.database_path),
    }
    Ok(())
}

async fn run_bot(config: AppConfig, use_webhook: bool, in_memory: bool) -> Result<()> {
    config.validate_for_bot()?;
    log_configuration(&config);

    let bot = create_bot(&config)?;
    let bot_username = resolve_bot_username(&bot, &config).await?;
    log::info!("Bot username: {}", bot_username);

    setup_bot_commands(&bot).await?;

    let store: Arc<dyn DocumentStore> = if in_memory {
        log::warn!("Using in-memory store, user records are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::open(&config.database_path)?)
    };

    let ledger = ReferralLedger::new(store, config.ledger.clone())
        .with_avatar_lookup(Arc::new(TelegramAvatarLookup::new(bot.clone())));
    let config = Arc::new(config);
    let handler = schema(HandlerDeps::new(Arc::new(ledger), Arc::clone(&config), bot_username));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .enable_ctrlc_handler()
        .build();

    if use_webhook {
        log::info!("Starting bot in webhook mode on port {}", config.port);
        let listener = webhooks::axum(bot, webhook_options(&config)?).await?;
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
    } else {
        log::info!("Starting bot in long polling mode");
        // Delete a webhook left over from an earlier webhook run
        if let Err(e) = bot.delete_webhook().await {
            log::warn!("Failed to delete webhook: {}", e);
        }
        dispatcher.dispatch().await;
    }

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Listen address and public URL for webhook mode
fn webhook_options(config: &AppConfig) -> AppResult<webhooks::Options> {
    let endpoint = config
        .webhook_endpoint()
        .ok_or_else(|| AppError::Config("SERVER_URL must be set for webhook mode".to_string()))?;
    let url = url::Url::parse(&endpoint)?;
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    Ok(webhooks::Options::new(address, url))
}
