//! Domain service for registration, credential verification, and the bearer
//! token lifecycle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No account with the presented email.
    #[error("Incorrect email")]
    UnknownEmail,

    /// Account exists, password does not match.
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Missing, unknown, or expired token. The three cases are deliberately
    /// indistinguishable.
    #[error("Invalid authentication credentials")]
    Unauthenticated,

    /// Valid token, but the account never completed a login.
    #[error("Inactive user")]
    Inactive,

    #[error("Email or username already registered")]
    AlreadyRegistered,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A bearer token grant, serialized in OAuth2 password-grant shape.
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    #[serde(rename = "access_token")]
    pub token: String,

    pub expires: DateTime<Utc>,

    pub token_type: String,
}

impl TokenGrant {
    #[must_use]
    pub fn new(token: String, expires: DateTime<Utc>) -> Self {
        Self {
            token,
            expires,
            token_type: "bearer".to_string(),
        }
    }
}

/// The identity a resolved token attaches to a request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

impl From<crate::entities::users::Model> for AuthUser {
    fn from(model: crate::entities::users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            name: model.name,
            email: model.email,
            is_active: model.is_active,
        }
    }
}

/// User details without the id, for listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

impl From<crate::entities::users::Model> for UserSummary {
    fn from(model: crate::entities::users::Model) -> Self {
        Self {
            username: model.username,
            name: model.name,
            email: model.email,
            is_active: model.is_active,
        }
    }
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and issues its first token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AlreadyRegistered`] if the email or username is taken.
    async fn register(&self, user: NewUser) -> Result<(AuthUser, TokenGrant), AuthError>;

    /// Verifies credentials, marks the account active, and issues or reuses
    /// a token. Issuing is idempotent inside the TTL window.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownEmail`] or [`AuthError::IncorrectPassword`].
    async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, AuthError>;

    /// Resolves a presented token to its owner. Expiry and the active flag
    /// are separate concerns: this enforces only expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] for any token that does not
    /// resolve, without distinguishing why.
    async fn resolve_token(&self, token: &str) -> Result<AuthUser, AuthError>;

    /// Lists all users.
    async fn list_users(&self) -> Result<Vec<UserSummary>, AuthError>;
}
