//! HS256 access tokens

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::Claims;
use crate::config::Settings;
use crate::domain::auth::User;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("JWT validation failed: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies the service's own access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: String, audience: String, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.jwt_secret,
            settings.jwt_issuer.clone(),
            settings.jwt_audience.clone(),
            settings.jwt_ttl_seconds,
        )
    }

    /// Returns the token and its lifetime in seconds.
    pub fn issue(&self, user: &User) -> Result<(String, i64), TokenError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<(String, i64), TokenError> {
        let claims = Claims {
            sub: user.id.to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Sign)?;
        Ok((token, self.ttl.num_seconds()))
    }

    /// Verify a token and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::UserRole;
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", "tender-desk".into(), "authenticated".into(), 3600)
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "bidder@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::Admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let user = user();
        let (token, expires_in) = issuer().issue(&user).unwrap();
        assert_eq!(expires_in, 3600);

        let claims = issuer().verify(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "bidder@example.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.iss, "tender-desk");
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) = issuer()
            .issue_at(&user(), Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(issuer().verify(&token).is_err());
    }

    #[test]
    fn wrong_secret_or_audience_is_rejected() {
        let (token, _) = issuer().issue(&user()).unwrap();

        let other_secret =
            TokenIssuer::new("other", "tender-desk".into(), "authenticated".into(), 3600);
        assert!(other_secret.verify(&token).is_err());

        let other_audience =
            TokenIssuer::new("test-secret", "tender-desk".into(), "admin-portal".into(), 3600);
        assert!(other_audience.verify(&token).is_err());
    }
}
