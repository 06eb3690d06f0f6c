//! Handler types and dependencies

use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::ledger::ReferralLedger;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub ledger: Arc<ReferralLedger>,
    pub config: Arc<AppConfig>,
    /// Username placed in referral deep links
    pub bot_username: String,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(ledger: Arc<ReferralLedger>, config: Arc<AppConfig>, bot_username: String) -> Self {
        Self {
            ledger,
            config,
            bot_username,
        }
    }
}
