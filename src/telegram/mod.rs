//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod profile;
pub mod welcome;

// Re-exports for convenience
pub use bot::{create_bot, parse_start_payload, resolve_bot_username, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use profile::TelegramAvatarLookup;
