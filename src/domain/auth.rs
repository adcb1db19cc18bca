//! Authentication domain types
//!
//! Accounts are local to this service: passwords are hashed with argon2 and
//! sessions are stateless signed tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Bidder,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Bidder
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bidder => "bidder",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bidder" => Some(Self::Bidder),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Stored account
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Lower-cased
    pub email: String,
    /// argon2 PHC string
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

impl RegisterRequest {
    /// Returns the normalized email, or a description of what is wrong.
    pub fn validate(&self) -> Result<String, String> {
        let email = normalize_email(&self.email);
        let mut problems = Vec::new();

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => problems.push("email must be a valid address".to_string()),
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            problems.push(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }

        if problems.is_empty() {
            Ok(email)
        } else {
            Err(problems.join("; "))
        }
    }
}

/// Sign in request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

/// Auth response with token
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserResponse,
}
