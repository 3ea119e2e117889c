//! AWS account identifiers

use serde::Serialize;

/// Length of an AWS account identifier
pub const ACCOUNT_ID_LEN: usize = 12;

/// Strongly-typed AWS account ID (12-digit string)
///
/// Construction goes through [`AccountId::parse`], so an empty or truncated
/// identity returned by a provider can never compare equal to a configured
/// central account.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, derive_more::Display, derive_more::Deref,
)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Parse an account ID, returning `None` unless it is exactly 12 ASCII digits
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == ACCOUNT_ID_LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = AccountId::parse("123456789012").unwrap();
        assert_eq!(id.as_str(), "123456789012");
        assert_eq!(id.to_string(), "123456789012");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(
            AccountId::parse(" 111111111111\n").unwrap().as_str(),
            "111111111111"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "12345", "1234567890123", "12345678901a", "abcdefghijkl"] {
            assert!(AccountId::parse(bad).is_none(), "accepted {bad:?}");
        }
    }
}
