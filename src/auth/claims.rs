use serde::{Deserialize, Serialize};

/// JWT claims carried by access tokens issued at login/registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// User email
    pub email: String,

    /// `bidder` or `admin`
    pub role: String,
}
