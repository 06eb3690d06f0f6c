//! DripCoin - Telegram onboarding bot with a referral reward ledger
//!
//! When a user starts the bot, their profile is created (or read back) in a
//! document store, an optional referral code from the `/start` deep link is
//! resolved, and the referrer is credited with in-app coins.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging
//! - `storage`: document store trait with in-memory and SQLite backends
//! - `ledger`: user records and the referral onboarding protocol
//! - `telegram`: bot construction, welcome rendering and handlers

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod core;
pub mod ledger;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{AppConfig, AppError, AppResult, LedgerConfig};
pub use ledger::{OnboardingResult, ReferralLedger, ReferralOutcome, UserRecord, UserStart};
pub use storage::{DocumentStore, MemoryStore, SqliteStore};
