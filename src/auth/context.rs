use super::Claims;
use crate::domain::auth::UserRole;
use uuid::Uuid;

/// Authenticated user context extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: Uuid,

    pub email: String,

    pub role: UserRole,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        let role = UserRole::parse(&claims.role).ok_or("Unknown role in token")?;

        Ok(Self {
            user_id,
            email: claims.email.clone(),
            role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            aud: "authenticated".to_string(),
            iss: "tender-desk".to_string(),
            iat: 0,
            exp: 0,
            email: "a@example.com".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn builds_from_valid_claims() {
        let id = Uuid::new_v4();
        let ctx = AuthContext::from_claims(&claims(&id.to_string(), "admin")).unwrap();
        assert_eq!(ctx.user_id, id);
        assert!(ctx.is_admin());
    }

    #[test]
    fn rejects_bad_subject_or_role() {
        assert!(AuthContext::from_claims(&claims("nope", "bidder")).is_err());
        assert!(AuthContext::from_claims(&claims(&Uuid::new_v4().to_string(), "root")).is_err());
    }
}
