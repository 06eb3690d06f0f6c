//! Inline button callbacks

use teloxide::prelude::*;

use super::types::{HandlerDeps, HandlerError};
use crate::core::config::SHARE_REFERRAL_CALLBACK;
use crate::telegram::welcome::{referral_link, share_message};

/// Handle inline keyboard callbacks. Unknown data is acknowledged and dropped.
pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    bot.answer_callback_query(q.id.clone()).await?;

    match q.data.as_deref() {
        Some(SHARE_REFERRAL_CALLBACK) => {
            let link = referral_link(&deps.bot_username, &q.from.id.0.to_string());
            let chat_id = q.message.as_ref().map(|m| m.chat().id).unwrap_or_else(|| ChatId::from(q.from.id));
            log::info!("Sharing referral link with {}", q.from.id);
            bot.send_message(chat_id, share_message(&q.from.first_name, &link)).await?;
        }
        other => log::debug!("Ignoring callback {:?} from {}", other, q.from.id),
    }

    Ok(())
}
