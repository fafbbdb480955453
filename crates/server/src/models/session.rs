//! Session token contents.

use serde::{Deserialize, Serialize};

use restaurant_core::Email;

/// Identity supplied by the client at login (`POST /jwt`).
///
/// Login is delegated to an external identity provider; the backend signs
/// whatever identity the client presents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

impl SessionIdentity {
    /// Returns `true` if no identity field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.photo_url.is_none() && self.email.is_none()
    }
}

/// Claims carried by a verified session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub identity: SessionIdentity,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}
