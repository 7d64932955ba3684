//! TokenIssuer trait for signing and verifying access/refresh tokens.

use parley_types::error::TokenError;
use parley_types::user::{TokenClaims, TokenType};
use uuid::Uuid;

/// A freshly signed token together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Signs and verifies JWTs. The `jsonwebtoken` adapter lives in parley-infra.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: &Uuid, kind: TokenType) -> Result<IssuedToken, TokenError>;

    /// Verify signature and expiry, and that the token is of kind `expected`.
    fn decode(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError>;
}
