//! Claims carried by user access tokens.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AccessTokenClaims {
    /// Username at issue time, informational only.
    pub(crate) name: String,
    /// The user id, as a decimal string.
    pub(crate) sub: String,
    pub(crate) iss: String,
    pub(crate) aud: String,
    pub(crate) exp: i64,
    pub(crate) iat: i64,
}
