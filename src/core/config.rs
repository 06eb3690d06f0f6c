//! Application configuration
//!
//! Everything is read once at startup by [`AppConfig::from_env`] and then
//! handed to the ledger and the handlers by reference. Nothing below `main`
//! looks at the environment on its own.

use std::env;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Collection that holds one document per Telegram user
pub const USERS_COLLECTION: &str = "Users";

/// Callback data of the "Share Referral Link" button
pub const SHARE_REFERRAL_CALLBACK: &str = "share_referral_link";

/// Default values, kept in one place so tests and `Default` impls agree
pub mod defaults {
    /// Port the webhook listener binds to
    pub const PORT: u16 = 3000;

    /// SQLite file that backs the document store
    pub const DATABASE_PATH: &str = "dripcoin.sqlite";

    /// Log file path
    pub const LOG_FILE_PATH: &str = "dripcoin.log";

    pub const WELCOME_IMAGE_URL: &str = "https://i.postimg.cc/wTZCz4WB/drip-f.png";
    pub const QUEST_URL: &str = "https://t.me/DripCoinBot/DripCoinQuest";
    pub const CHANNEL_URL: &str = "https://t.me/dripcoinofficialchannel";
    pub const BOT_USERNAME: &str = "DripCoinBot";

    /// Starting balance and lifetime counter of a new account
    pub const SIGNUP_BALANCE: i64 = 5000;
    pub const SIGNUP_TOTAL_COINS: i64 = 5000;

    /// Credited to the referrer for every distinct user they bring in
    pub const REFERRAL_BONUS: i64 = 1000;

    /// Auxiliary reward state, only initialised here
    pub const DAILY_REWARD: i64 = 1000;
    pub const STREAK_REWARD_AMOUNT: i64 = 5000;
    pub const FRIEND_COUNT: i64 = 10;

    /// Conditional-write attempts before a referrer credit gives up
    pub const MAX_CREDIT_ATTEMPTS: u32 = 8;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Reward amounts and referral policy used by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub signup_balance: i64,
    pub signup_total_coins: i64,
    pub referral_bonus: i64,
    pub daily_reward: i64,
    pub streak_reward_amount: i64,
    pub friend_count: i64,
    /// Store a referral code in `referred_by` even when no such user exists.
    /// When disabled an unknown code is treated as if none was given.
    pub persist_unresolved_referrer: bool,
    pub max_credit_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signup_balance: defaults::SIGNUP_BALANCE,
            signup_total_coins: defaults::SIGNUP_TOTAL_COINS,
            referral_bonus: defaults::REFERRAL_BONUS,
            daily_reward: defaults::DAILY_REWARD,
            streak_reward_amount: defaults::STREAK_REWARD_AMOUNT,
            friend_count: defaults::FRIEND_COUNT,
            persist_unresolved_referrer: true,
            max_credit_attempts: defaults::MAX_CREDIT_ATTEMPTS,
        }
    }
}

/// Links and artwork shown in the welcome message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeConfig {
    pub image_url: String,
    pub quest_url: String,
    pub channel_url: String,
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        Self {
            image_url: defaults::WELCOME_IMAGE_URL.to_string(),
            quest_url: defaults::QUEST_URL.to_string(),
            channel_url: defaults::CHANNEL_URL.to_string(),
        }
    }
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bot token, read from BOT_TOKEN or TELOXIDE_TOKEN
    pub bot_token: String,
    /// Bot username used in referral links. `None` means "ask getMe".
    pub bot_username: Option<String>,
    /// Public base URL for webhook mode (SERVER_URL)
    pub webhook_url: Option<String>,
    pub port: u16,
    pub database_path: String,
    pub log_file_path: String,
    pub welcome: WelcomeConfig,
    pub ledger: LedgerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_username: None,
            webhook_url: None,
            port: defaults::PORT,
            database_path: defaults::DATABASE_PATH.to_string(),
            log_file_path: defaults::LOG_FILE_PATH.to_string(),
            welcome: WelcomeConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Unparseable numbers fall back to the
    /// default and are logged.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let base = Self::default();

        let ledger = LedgerConfig {
            signup_balance: parse_or(get("SIGNUP_BALANCE"), "SIGNUP_BALANCE", base.ledger.signup_balance),
            signup_total_coins: parse_or(
                get("SIGNUP_TOTAL_COINS"),
                "SIGNUP_TOTAL_COINS",
                base.ledger.signup_total_coins,
            ),
            referral_bonus: parse_or(get("REFERRAL_BONUS"), "REFERRAL_BONUS", base.ledger.referral_bonus),
            persist_unresolved_referrer: parse_or(
                get("PERSIST_UNRESOLVED_REFERRER"),
                "PERSIST_UNRESOLVED_REFERRER",
                base.ledger.persist_unresolved_referrer,
            ),
            ..base.ledger
        };

        Self {
            bot_token: get("BOT_TOKEN").or_else(|| get("TELOXIDE_TOKEN")).unwrap_or_default(),
            bot_username: get("BOT_USERNAME").map(|u| u.trim_start_matches('@').to_string()),
            webhook_url: get("SERVER_URL").map(|u| u.trim_end_matches('/').to_string()),
            port: parse_or(get("PORT"), "PORT", base.port),
            database_path: get("DATABASE_PATH").unwrap_or(base.database_path),
            log_file_path: get("LOG_FILE_PATH").unwrap_or(base.log_file_path),
            welcome: WelcomeConfig {
                image_url: get("WELCOME_IMAGE_URL").unwrap_or(base.welcome.image_url),
                quest_url: get("QUEST_URL").unwrap_or(base.welcome.quest_url),
                channel_url: get("CHANNEL_URL").unwrap_or(base.welcome.channel_url),
            },
            ledger,
        }
    }

    /// Fails when the settings needed to talk to Telegram are missing
    pub fn validate_for_bot(&self) -> AppResult<()> {
        if self.bot_token.is_empty() {
            return Err(AppError::Config(
                "BOT_TOKEN environment variable not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Full webhook endpoint: `{SERVER_URL}/bot{token}`
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url
            .as_ref()
            .map(|base| format!("{}/bot{}", base, self.bot_token))
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} value {:?}, using default", key, value);
            default
        }),
        None => default,
    }
}
