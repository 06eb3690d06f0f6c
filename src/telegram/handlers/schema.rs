//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_callback;
use super::commands::handle_start_command;
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::parse_start_payload;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// # Arguments
/// * `deps` - Handler dependencies (ledger, configuration, bot username)
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_start = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(start_handler(deps_start))
        .branch(callback_handler(deps_callback))
}

/// Handler for /start, with or without a deep-link payload
fn start_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| msg.text().and_then(parse_start_payload))
        .endpoint(move |bot: Bot, msg: Message, payload: Option<String>| {
            let deps = deps.clone();
            async move { handle_start_command(&bot, &msg, payload, &deps).await }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_callback(&bot, &q, &deps).await }
    })
}
