//! Referral ledger: user records, referral codes and the onboarding protocol

pub mod record;
pub mod referral;
pub mod service;

// Re-exports for convenience
pub use record::{NewUserProfile, UserRecord};
pub use referral::ReferralCode;
pub use service::{
    AvatarLookup, LedgerError, LedgerResult, NoAvatar, OnboardingResult, ReferralLedger, ReferralOutcome, UserStart,
};
