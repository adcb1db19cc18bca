pub mod claims;
pub mod context;
pub mod middleware;
pub mod password;
pub mod tokens;

pub use claims::Claims;
pub use context::AuthContext;
pub use middleware::{RequireAdmin, RequireAuth};
pub use password::{hash_password, verify_password};
pub use tokens::TokenIssuer;
