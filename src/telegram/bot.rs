//! Bot initialization and command definitions

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config::{self, AppConfig};
use crate::core::error::AppResult;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the quest and claim your welcome bonus")]
    Start,
}

/// Splits a `/start` message into its optional payload.
///
/// Returns `None` when `text` is not a /start command (optionally addressed
/// as `/start@BotName`). The payload is what Telegram appends for
/// `t.me/<bot>?start=<payload>` deep links.
pub fn parse_start_payload(text: &str) -> Option<Option<String>> {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let command = parts.next()?;
    let name = command.strip_prefix("/start")?;
    if !(name.is_empty() || name.starts_with('@')) {
        return None;
    }
    let payload = parts.next().map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);
    Some(payload)
}

/// Creates a Bot instance with the configured token and request timeout
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the HTTP client
pub fn create_bot(config: &AppConfig) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(config.bot_token.clone(), client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> AppResult<()> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Username used in referral links: configured value, else the one Telegram
/// reports for this token, else the stock name
pub async fn resolve_bot_username(bot: &Bot, config: &AppConfig) -> AppResult<String> {
    let me = bot.get_me().await?;
    log::info!("Bot ID: {}", me.id);
    Ok(config
        .bot_username
        .clone()
        .or_else(|| me.username.clone())
        .unwrap_or_else(|| config::defaults::BOT_USERNAME.to_string()))
}
