//! Referral ledger: the `/start` onboarding protocol
//!
//! Given a user id, their profile and an optional referral code, decides how
//! the acting user's record and the referrer's balance/referrals change.
//!
//! Invariants kept here:
//! - a user document is created at most once (create-if-absent)
//! - `referred_by` is written at most once per user
//! - a referrer is credited at most once per referred user, and credits are
//!   applied with conditional writes so concurrent credits are never lost
//!
//! There is no rollback: a user can end up created while the referrer credit
//! failed. Errors abort the call and are surfaced to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use super::record::{NewUserProfile, UserRecord};
use super::referral::ReferralCode;
use crate::core::config::{LedgerConfig, USERS_COLLECTION};
use crate::storage::{Document, DocumentStore, StoreError, VersionedDocument};

/// Errors that abort an onboarding call.
///
/// An unreadable referrer document is not one of them: the code is then
/// handled like an unknown referrer.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Corrupt user document {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Conditional writes kept losing against concurrent writers
    #[error("Gave up updating {key} after {attempts} conflicting attempts")]
    Contention { key: String, attempts: u32 },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// What happened to the referral part of a `/start` call.
///
/// Referral problems are informational; they never fail the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// No (valid) referral code was supplied
    NotRequested,
    /// Referrer found and credited
    Credited { referrer: String },
    /// Referrer already lists this user; nothing was added twice
    AlreadyCredited { referrer: String },
    /// Returning user already attributed; the supplied code was ignored
    AlreadyReferred { referred_by: String },
    /// No user exists under the code
    ReferrerNotFound { code: String },
    /// The code names the acting user
    SelfReferral,
    /// The referrer was itself referred by the acting user
    ReferralCycle { referrer: String },
}

/// Result of [`ReferralLedger::on_user_start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingResult {
    /// The acting user's record as written (new users) or as read (returning)
    pub user: UserRecord,
    pub is_new_user: bool,
    pub referral: ReferralOutcome,
}

/// A `/start` event as seen by the ledger
#[derive(Debug, Clone, Default)]
pub struct UserStart {
    pub user_id: String,
    pub user_name: Option<String>,
    /// Presentation only, not validated
    pub display_name: String,
    /// Raw `/start` payload
    pub referral_code: Option<String>,
}

/// Source of profile-picture URLs for new users
#[async_trait]
pub trait AvatarLookup: Send + Sync {
    /// `None` when the user has no picture or the lookup failed
    async fn avatar_url(&self, user_id: &str) -> Option<String>;
}

/// Lookup that never finds a picture
pub struct NoAvatar;

#[async_trait]
impl AvatarLookup for NoAvatar {
    async fn avatar_url(&self, _user_id: &str) -> Option<String> {
        None
    }
}

/// Referrer as resolved from a referral code
enum Referrer {
    Absent,
    SelfReferral,
    Missing(String),
    Cycle(String),
    Found(String),
}

/// Result of a single referrer credit
enum Credit {
    Applied,
    Duplicate,
    Vanished,
}

/// Result of writing `referred_by` on a returning user
enum Attribution {
    Written(UserRecord),
    Lost(UserRecord),
}

pub struct ReferralLedger {
    store: Arc<dyn DocumentStore>,
    avatars: Arc<dyn AvatarLookup>,
    config: LedgerConfig,
}

impl ReferralLedger {
    pub fn new(store: Arc<dyn DocumentStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            avatars: Arc::new(NoAvatar),
            config,
        }
    }

    /// Uses `avatars` to fill the avatar of newly created users
    pub fn with_avatar_lookup(mut self, avatars: Arc<dyn AvatarLookup>) -> Self {
        self.avatars = avatars;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Reads a user record, `None` when the user never pressed /start
    pub async fn load_user(&self, user_id: &str) -> LedgerResult<Option<UserRecord>> {
        Ok(self.load_versioned(user_id).await?.map(|(_, record)| record))
    }

    /// Handles a `/start` event: creates or reads the user, then applies the
    /// referral code if one is allowed to take effect.
    pub async fn on_user_start(&self, start: UserStart) -> LedgerResult<OnboardingResult> {
        let code = ReferralCode::from_payload(start.referral_code.as_deref());
        if start.referral_code.is_some() && code.is_none() {
            log::info!(
                "Ignoring malformed referral payload {:?} from user {}",
                start.referral_code,
                start.user_id
            );
        }
        log::info!("Start command from user {} (referral: {:?})", start.user_id, code);

        match self.load_versioned(&start.user_id).await? {
            Some((version, existing)) => {
                log::info!("Returning user detected: {}", start.user_id);
                self.returning_user(version, existing, code).await
            }
            None => {
                log::info!("New user detected: {}. Creating profile...", start.user_id);
                self.new_user(start, code).await
            }
        }
    }

    async fn new_user(&self, start: UserStart, code: Option<ReferralCode>) -> LedgerResult<OnboardingResult> {
        let referrer = self.resolve_referrer(&start.user_id, code.as_ref()).await?;

        let referred_by = match &referrer {
            Referrer::Found(id) => Some(id.clone()),
            Referrer::Missing(code) if self.config.persist_unresolved_referrer => Some(code.clone()),
            _ => None,
        };

        let avatar = self.avatars.avatar_url(&start.user_id).await.unwrap_or_default();
        let profile = NewUserProfile {
            user_name: start.user_name.clone(),
            first_name: start.display_name.clone(),
            avatar,
        };
        let record = UserRecord::new_account(&start.user_id, profile, referred_by, &self.config);
        let fields = record.to_document().map_err(|source| LedgerError::Decode {
            key: start.user_id.clone(),
            source,
        })?;

        if !self.store.create(USERS_COLLECTION, &start.user_id, fields).await? {
            log::warn!(
                "User {} was created by a concurrent /start, continuing as returning user",
                start.user_id
            );
            return match self.load_versioned(&start.user_id).await? {
                Some((version, existing)) => self.returning_user(version, existing, code).await,
                None => Err(StoreError::Unavailable(format!("user {} vanished after creation", start.user_id)).into()),
            };
        }

        let referral = self.settle_referral(&start.user_id, referrer).await?;
        Ok(OnboardingResult {
            user: record,
            is_new_user: true,
            referral,
        })
    }

    async fn returning_user(
        &self,
        version: u64,
        existing: UserRecord,
        code: Option<ReferralCode>,
    ) -> LedgerResult<OnboardingResult> {
        let user_id = existing.user_id.clone();

        if let Some(by) = existing.referral_attribution() {
            log::info!("User {} already referred by {}", user_id, by);
            let referral = ReferralOutcome::AlreadyReferred {
                referred_by: by.to_string(),
            };
            return Ok(returning(existing, referral));
        }

        let Some(code) = code else {
            return Ok(returning(existing, ReferralOutcome::NotRequested));
        };

        log::info!("User {} is being referred by {}", user_id, code);
        let referrer = self.resolve_referrer(&user_id, Some(&code)).await?;

        let attribute = match &referrer {
            Referrer::Found(_) => true,
            Referrer::Missing(_) => self.config.persist_unresolved_referrer,
            Referrer::Absent | Referrer::SelfReferral | Referrer::Cycle(_) => false,
        };

        let user = if attribute {
            match self.attribute(&user_id, version, existing, code.as_str()).await? {
                Attribution::Written(user) => user,
                Attribution::Lost(user) => {
                    let referred_by = user.referral_attribution().unwrap_or_default().to_string();
                    log::info!("User {} was attributed to {} concurrently", user_id, referred_by);
                    return Ok(returning(user, ReferralOutcome::AlreadyReferred { referred_by }));
                }
            }
        } else {
            existing
        };

        let referral = self.settle_referral(&user_id, referrer).await?;
        Ok(returning(user, referral))
    }

    /// Looks up the referrer named by `code` and applies the self/cycle rules
    async fn resolve_referrer(&self, user_id: &str, code: Option<&ReferralCode>) -> LedgerResult<Referrer> {
        let Some(code) = code else {
            return Ok(Referrer::Absent);
        };
        if code.as_str() == user_id {
            return Ok(Referrer::SelfReferral);
        }

        let found = match self.load_versioned(code.as_str()).await {
            Ok(found) => found,
            Err(LedgerError::Decode { key, source }) => {
                log::warn!("Unreadable referrer document {}: {}. Treating code as unknown", key, source);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(match found {
            None => Referrer::Missing(code.to_string()),
            Some((_, referrer)) if referrer.referral_attribution() == Some(user_id) => {
                Referrer::Cycle(code.to_string())
            }
            Some(_) => Referrer::Found(code.to_string()),
        })
    }

    /// Turns a resolved referrer into an outcome, crediting when it exists
    async fn settle_referral(&self, user_id: &str, referrer: Referrer) -> LedgerResult<ReferralOutcome> {
        Ok(match referrer {
            Referrer::Absent => ReferralOutcome::NotRequested,
            Referrer::SelfReferral => {
                log::warn!("User {} tried to refer themselves, ignoring", user_id);
                ReferralOutcome::SelfReferral
            }
            Referrer::Cycle(referrer) => {
                log::warn!(
                    "Referral cycle rejected: {} was referred by {}, not crediting",
                    referrer,
                    user_id
                );
                ReferralOutcome::ReferralCycle { referrer }
            }
            Referrer::Missing(code) => {
                log::warn!("Invalid referral ID: {}", code);
                ReferralOutcome::ReferrerNotFound { code }
            }
            Referrer::Found(referrer) => match self.credit_referrer(&referrer, user_id).await? {
                Credit::Applied => ReferralOutcome::Credited { referrer },
                Credit::Duplicate => {
                    log::info!("Referrer {} already credited for {}", referrer, user_id);
                    ReferralOutcome::AlreadyCredited { referrer }
                }
                Credit::Vanished => {
                    log::warn!("Invalid referral ID: {}", referrer);
                    ReferralOutcome::ReferrerNotFound { code: referrer }
                }
            },
        })
    }

    /// Adds the referral bonus and appends `referred_id`, at most once per pair.
    ///
    /// Optimistic: read, compute, write only if the version is unchanged,
    /// re-read on conflict.
    async fn credit_referrer(&self, referrer_id: &str, referred_id: &str) -> LedgerResult<Credit> {
        let bonus = self.config.referral_bonus;

        for attempt in 1..=self.config.max_credit_attempts {
            let Some((version, referrer)) = self.load_versioned(referrer_id).await? else {
                return Ok(Credit::Vanished);
            };
            if referrer.has_referred(referred_id) {
                return Ok(Credit::Duplicate);
            }

            let mut referrals: Vec<Value> = referrer.referrals.iter().map(|r| json!(r)).collect();
            referrals.push(json!(referred_id));
            let update = fields([
                ("balance", json!(referrer.balance.saturating_add(bonus))),
                ("total_coins", json!(referrer.total_coins.saturating_add(bonus))),
                ("referrals", Value::Array(referrals)),
            ]);

            if self
                .store
                .set_if_version(USERS_COLLECTION, referrer_id, update, true, version)
                .await?
            {
                log::info!(
                    "Credited referrer {} with {} for referring {}",
                    referrer_id,
                    bonus,
                    referred_id
                );
                return Ok(Credit::Applied);
            }

            log::debug!(
                "Credit conflict on referrer {} (attempt {}/{}), retrying",
                referrer_id,
                attempt,
                self.config.max_credit_attempts
            );
        }

        Err(LedgerError::Contention {
            key: referrer_id.to_string(),
            attempts: self.config.max_credit_attempts,
        })
    }

    /// Merge-writes `referred_by` unless someone else set it first
    async fn attribute(
        &self,
        user_id: &str,
        mut version: u64,
        mut record: UserRecord,
        code: &str,
    ) -> LedgerResult<Attribution> {
        for _ in 0..self.config.max_credit_attempts {
            let update = fields([("referred_by", json!(code))]);
            if self
                .store
                .set_if_version(USERS_COLLECTION, user_id, update, true, version)
                .await?
            {
                record.referred_by = Some(code.to_string());
                return Ok(Attribution::Written(record));
            }

            let Some((fresh_version, fresh)) = self.load_versioned(user_id).await? else {
                return Err(StoreError::Unavailable(format!("user {} vanished during attribution", user_id)).into());
            };
            if fresh.referral_attribution().is_some() {
                return Ok(Attribution::Lost(fresh));
            }
            version = fresh_version;
            record = fresh;
        }

        Err(LedgerError::Contention {
            key: user_id.to_string(),
            attempts: self.config.max_credit_attempts,
        })
    }

    async fn load_versioned(&self, user_id: &str) -> LedgerResult<Option<(u64, UserRecord)>> {
        let Some(VersionedDocument { version, fields }) = self.store.get(USERS_COLLECTION, user_id).await? else {
            return Ok(None);
        };
        let mut record = UserRecord::from_document(&fields).map_err(|source| LedgerError::Decode {
            key: user_id.to_string(),
            source,
        })?;
        if record.user_id.is_empty() {
            record.user_id = user_id.to_string();
        }
        Ok(Some((version, record)))
    }
}

fn returning(user: UserRecord, referral: ReferralOutcome) -> OnboardingResult {
    OnboardingResult {
        user,
        is_new_user: false,
        referral,
    }
}

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Document {
    pairs.into_iter().map(|(name, value)| (name.to_string(), value)).collect()
}
