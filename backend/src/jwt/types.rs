use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written to and required on every access token
pub const TOKEN_ISSUER: &str = "tubely-access";

/// Registered claims carried by a Tubely access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID)
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id` valid for `ttl_secs` from now
    #[must_use]
    pub fn for_user(user_id: Uuid, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }
}
