//! Telegram bot handler tree configuration

mod callbacks;
mod commands;
mod schema;
mod types;

pub use commands::start_request;
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
