use anyhow::{Context, Result};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sha2::Sha256;
use uuid::Uuid;

use crate::entities::{prelude::*, users};

/// Iteration count is fixed: persisted hashes from earlier deployments must
/// keep verifying.
const PBKDF2_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 12;

const SALT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user. Starts inactive; the flag flips on first login.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<users::Model> {
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4().simple().to_string()),
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            password: Set(password_hash.to_string()),
            is_active: Set(false),
        };

        let user = model.insert(&self.conn).await.context("Failed to insert user")?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user)
    }

    /// True if either the email or the username is already registered.
    pub async fn credentials_taken(&self, email: &str, username: &str) -> Result<bool> {
        let existing = Users::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(email))
                    .add(users::Column::Username.eq(username)),
            )
            .one(&self.conn)
            .await
            .context("Failed to check for existing user")?;

        Ok(existing.is_some())
    }

    /// Flip the active flag. Idempotent; an already-true flag stays true.
    pub async fn set_active(&self, user_id: &str) -> Result<()> {
        Users::update_many()
            .col_expr(users::Column::IsActive, Expr::value(true))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to activate user")?;

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<users::Model>> {
        let rows = Users::find()
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows)
    }
}

/// Random salt of ASCII letters.
#[must_use]
pub fn generate_salt() -> String {
    let mut rng = rand::rng();
    (0..SALT_LEN)
        .map(|_| SALT_ALPHABET[rng.random_range(0..SALT_ALPHABET.len())] as char)
        .collect()
}

/// PBKDF2-HMAC-SHA256 digest of the salted password, hex encoded.
#[must_use]
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut digest,
    );
    hex::encode(digest)
}

/// Hash with a fresh salt, in the persisted `salt$hex` form.
#[must_use]
pub fn make_password_hash(password: &str) -> String {
    let salt = generate_salt();
    let digest = hash_password(password, &salt);
    format!("{salt}${digest}")
}

/// Split the stored value on the first `$`, recompute, compare.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let computed = hash_password(password, salt);
    constant_time_eq(computed.as_bytes(), expected.as_bytes())
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
