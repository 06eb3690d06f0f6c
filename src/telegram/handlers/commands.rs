//! /start command handler

use teloxide::prelude::*;
use teloxide::types::{InputFile, Message, ParseMode};

use super::types::{HandlerDeps, HandlerError};
use crate::ledger::{ReferralOutcome, UserStart};
use crate::telegram::welcome::{welcome_caption, welcome_keyboard, GENERIC_ERROR_MESSAGE};

/// Builds the ledger input for a `/start` from the sender and the deep-link payload
pub fn start_request(user_id: UserId, first_name: &str, username: Option<&str>, payload: Option<String>) -> UserStart {
    UserStart {
        user_id: user_id.0.to_string(),
        user_name: username.map(str::to_string),
        display_name: first_name.to_string(),
        referral_code: payload,
    }
}

/// Handle /start: run onboarding, then greet with the welcome photo.
///
/// Ledger failures are logged and answered with a generic retry message;
/// only Telegram send failures propagate.
pub(super) async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    payload: Option<String>,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Some(from) = msg.from.as_ref() else {
        log::warn!("/start without sender in chat {}, ignoring", msg.chat.id);
        return Ok(());
    };
    log::info!(
        "Start command initiated by {} (username: {:?}, payload: {:?})",
        from.id,
        from.username,
        payload
    );

    let request = start_request(from.id, &from.first_name, from.username.as_deref(), payload);
    match deps.ledger.on_user_start(request).await {
        Ok(result) => {
            match &result.referral {
                ReferralOutcome::Credited { referrer } => {
                    log::info!("User {} onboarded via referral from {}", from.id, referrer)
                }
                other => log::debug!("Referral outcome for {}: {:?}", from.id, other),
            }
            send_welcome(bot, msg.chat.id, &from.first_name, deps).await?;
        }
        Err(e) => {
            log::error!("Error in start command for {}: {}", from.id, e);
            bot.send_message(msg.chat.id, GENERIC_ERROR_MESSAGE).await?;
        }
    }

    Ok(())
}

/// Sends the welcome photo; falls back to a text message if the photo is rejected
async fn send_welcome(bot: &Bot, chat_id: ChatId, first_name: &str, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let welcome = &deps.config.welcome;
    let caption = welcome_caption(first_name);
    let keyboard = welcome_keyboard(welcome)?;
    let photo_url = url::Url::parse(&welcome.image_url)?;

    let sent = bot
        .send_photo(chat_id, InputFile::url(photo_url))
        .caption(caption.clone())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboard.clone())
        .await;

    if let Err(e) = sent {
        log::warn!("Failed to send welcome photo to {}: {}. Sending text instead", chat_id, e);
        bot.send_message(chat_id, caption)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboard)
            .await?;
    }

    Ok(())
}
