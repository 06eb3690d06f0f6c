use std::fmt;

/// Longest payload Telegram accepts in a `/start` deep link
const MAX_CODE_LEN: usize = 64;

/// A syntactically valid referral code taken from a `/start` payload.
///
/// Parsing never fails loudly: empty or malformed payloads mean "no referral".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferralCode(String);

impl ReferralCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim();
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return None;
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return None;
        }
        Some(Self(code.to_string()))
    }

    /// Parses an optional payload, treating `None` and garbage alike
    pub fn from_payload(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
