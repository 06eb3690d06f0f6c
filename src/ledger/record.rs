//! User record as stored in the `Users` collection

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::config::LedgerConfig;
use crate::storage::Document;

/// One document per chat participant, keyed by the stringified user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: String,
    /// Profile picture URL, empty when the user has none
    #[serde(default)]
    pub avatar: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub balance: i64,
    /// Lifetime earned coins; never decreases
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_coins: i64,
    /// Users this account referred, in credit order, without duplicates
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub referrals: Vec<String>,
    /// Write-once referral attribution
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub referred_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub daily_reward: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub streak_claims: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub streak_reward_amount: i64,
    #[serde(default)]
    pub last_claimed: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub friend_count: i64,
    #[serde(default, alias = "createdAt")]
    pub created_at: String,
}

/// Profile data known when a user first presses /start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUserProfile {
    pub user_name: Option<String>,
    pub first_name: String,
    pub avatar: String,
}

impl UserRecord {
    /// Builds the record of a brand-new account with the configured signup rewards
    pub fn new_account(user_id: &str, profile: NewUserProfile, referred_by: Option<String>, config: &LedgerConfig) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_name: profile.user_name,
            first_name: profile.first_name,
            avatar: profile.avatar,
            balance: config.signup_balance,
            total_coins: config.signup_total_coins,
            referrals: Vec::new(),
            referred_by,
            daily_reward: config.daily_reward,
            streak_claims: 0,
            streak_reward_amount: config.streak_reward_amount,
            last_claimed: String::new(),
            friend_count: config.friend_count,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Decodes a stored document. Missing numeric fields read as 0.
    pub fn from_document(fields: &Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }

    /// Encodes the whole record as document fields
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "user record serialized to non-object {}",
                other
            ))),
        }
    }

    pub fn has_referred(&self, user_id: &str) -> bool {
        self.referrals.iter().any(|r| r == user_id)
    }

    /// `referred_by` counts as set only when it holds a non-empty value
    pub fn referral_attribution(&self) -> Option<&str> {
        self.referred_by.as_deref().filter(|r| !r.is_empty())
    }
}

/// Accepts integers, floats, numeric strings and null; anything else is 0
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    })
}

/// Telegram ids were historically stored as numbers
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_string(Value::deserialize(deserializer)?))
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(id_string(other)),
    })
}

/// Accepts ids as strings or numbers; null entries are dropped
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(id_string)
            .collect()),
        other => Err(serde::de::Error::custom(format!(
            "invalid referrals {}, expected a list of ids",
            other
        ))),
    }
}

fn id_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_new_account_defaults() {
        let profile = NewUserProfile {
            user_name: Some("alice".to_string()),
            first_name: "Alice".to_string(),
            avatar: String::new(),
        };
        let record = UserRecord::new_account("42", profile, None, &LedgerConfig::default());

        assert_eq!(record.balance, 5000);
        assert_eq!(record.total_coins, 5000);
        assert_eq!(record.daily_reward, 1000);
        assert_eq!(record.streak_claims, 0);
        assert_eq!(record.streak_reward_amount, 5000);
        assert_eq!(record.friend_count, 10);
        assert_eq!(record.last_claimed, "");
        assert!(record.referrals.is_empty());
        assert!(record.referred_by.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&record.created_at).is_ok());
    }

    #[test]
    fn test_decodes_legacy_document() {
        // Legacy shape: numeric id, camelCase timestamp, string balance,
        // no total_coins.
        let legacy = doc(json!({
            "user_id": 1234567,
            "balance": "6000",
            "referrals": ["99"],
            "referred_by": null,
            "first_name": "Old",
            "createdAt": "2024-05-01T10:00:00.000Z"
        }));

        let record = UserRecord::from_document(&legacy).unwrap();

        assert_eq!(record.user_id, "1234567");
        assert_eq!(record.balance, 6000);
        assert_eq!(record.total_coins, 0);
        assert_eq!(record.referrals, vec!["99".to_string()]);
        assert_eq!(record.created_at, "2024-05-01T10:00:00.000Z");
        assert!(record.referral_attribution().is_none());
    }

    #[test]
    fn test_numeric_ids_in_referral_fields() {
        let record = UserRecord::from_document(&doc(json!({
            "user_id": "5",
            "referrals": [99, "100", null],
            "referred_by": 42
        })))
        .unwrap();

        assert_eq!(record.referrals, vec!["99".to_string(), "100".to_string()]);
        assert_eq!(record.referral_attribution(), Some("42"));
        assert!(record.has_referred("99"));
    }

    #[test]
    fn test_non_list_referrals_is_rejected() {
        assert!(UserRecord::from_document(&doc(json!({"referrals": "not-a-list"}))).is_err());
    }

    #[test]
    fn test_empty_referred_by_is_not_an_attribution() {
        let record = UserRecord::from_document(&doc(json!({"user_id": "1", "referred_by": ""}))).unwrap();
        assert!(record.referral_attribution().is_none());
    }

    #[test]
    fn test_document_roundtrip_keeps_fields() {
        let mut record = UserRecord::new_account("7", NewUserProfile::default(), Some("3".to_string()), &LedgerConfig::default());
        record.referrals.push("8".to_string());

        let decoded = UserRecord::from_document(&record.to_document().unwrap()).unwrap();

        assert_eq!(decoded, record);
        assert!(decoded.has_referred("8"));
        assert!(!decoded.has_referred("9"));
    }
}
