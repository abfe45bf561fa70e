//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;

use crate::db::Store;
use crate::db::repositories::user::{make_password_hash, verify_password};
use crate::services::auth_service::{
    AuthError, AuthService, AuthUser, NewUser, TokenGrant, UserSummary,
};

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sea_orm::DbErr>()
        .and_then(sea_orm::DbErr::sql_err)
        .is_some_and(|sql_err| matches!(sql_err, sea_orm::SqlErr::UniqueConstraintViolation(_)))
}

pub struct SeaOrmAuthService {
    store: Store,
    token_ttl_days: i64,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, token_ttl_days: i64) -> Self {
        Self {
            store,
            token_ttl_days,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, user: NewUser) -> Result<(AuthUser, TokenGrant), AuthError> {
        if self
            .store
            .credentials_taken(&user.email, &user.username)
            .await?
        {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = make_password_hash(&user.password);

        // Two simultaneous sign-ups can both pass the pre-check; the unique
        // columns on users decide the loser, which still gets the duplicate
        // error rather than a storage failure.
        let created = match self
            .store
            .create_user(&user.username, &user.email, &user.name, &password_hash)
            .await
        {
            Ok(created) => created,
            Err(err) if is_unique_violation(&err) => return Err(AuthError::AlreadyRegistered),
            Err(err) => return Err(err.into()),
        };

        // New accounts get a token right away; the account still stays
        // inactive until the first login.
        let token = self
            .store
            .issue_or_reuse_token(&created.id, self.token_ttl_days)
            .await?;

        tracing::info!("Registered user: {}", created.username);

        Ok((
            AuthUser::from(created),
            TokenGrant::new(token.token, token.expires),
        ))
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, AuthError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        if !verify_password(password, &user.password) {
            return Err(AuthError::IncorrectPassword);
        }

        self.store.set_user_active(&user.id).await?;

        let token = self
            .store
            .issue_or_reuse_token(&user.id, self.token_ttl_days)
            .await?;

        Ok(TokenGrant::new(token.token, token.expires))
    }

    async fn resolve_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let user = self
            .store
            .resolve_token(token)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        Ok(AuthUser::from(user))
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, AuthError> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }
}
