//! Buyer and session email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was not accepted as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain exactly one @")]
    AtSymbol,
    #[error("email must have text on both sides of the @")]
    MissingPart,
    #[error("email cannot contain whitespace")]
    Whitespace,
}

/// An email address that identifies a buyer.
///
/// Session claims and purchase records carry the address a client sent;
/// purchase history is only shown to the session whose address equals the
/// record's. Parsing trims surrounding whitespace (sign-in forms often leave
/// it) but keeps case, so ownership stays an exact comparison.
///
/// ```
/// use restaurant_core::Email;
///
/// let email = Email::parse("  ana@example.com ").unwrap();
/// assert_eq!(email.as_str(), "ana@example.com");
/// assert!(email.matches("ana@example.com"));
/// assert!(!email.matches("Ana@example.com"));
///
/// assert!(Email::parse("ana@@example.com").is_err());
/// assert!(Email::parse("ana @example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Parse an address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Email::MAX_LENGTH`], contains whitespace, or is not of the form
    /// `local@domain` with exactly one `@`.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() || domain.is_empty() {
            return Err(EmailError::MissingPart);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `address`, as a client wrote it, names this mailbox.
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        self.0 == address.trim()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_addresses() {
        for address in ["a@b.c", "user.name+tag@example.co.uk", "x@localhost"] {
            assert_eq!(Email::parse(address).unwrap().as_str(), address);
        }
    }

    #[test]
    fn test_trims_but_keeps_case() {
        let email = Email::parse("\tAna@Example.com \n").unwrap();
        assert_eq!(email.as_str(), "Ana@Example.com");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("nobody"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::MissingPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::MissingPart));
        assert_eq!(Email::parse("an a@x.com"), Err(EmailError::Whitespace));

        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: Email::MAX_LENGTH })
        );
    }

    #[test]
    fn test_matches_is_exact_after_trimming() {
        let email = Email::parse("a@x.com").unwrap();
        assert!(email.matches("a@x.com"));
        assert!(email.matches(" a@x.com "));
        assert!(!email.matches("A@x.com"));
        assert!(!email.matches("a@x.co"));
    }

    #[test]
    fn test_serde_validates_and_normalizes() {
        let parsed: Email = serde_json::from_str("\" buyer@example.com\"").unwrap();
        assert_eq!(parsed.as_str(), "buyer@example.com");
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            "\"buyer@example.com\""
        );

        let rejected: Result<Email, _> = serde_json::from_str("\"not-an-email\"");
        assert!(rejected.is_err());
    }
}
