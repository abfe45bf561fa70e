use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{prelude::*, tokens, users};

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Return the user's unexpired token, or mint a fresh one.
    ///
    /// Repeated logins inside the TTL window hand back the identical token.
    /// The write upserts on the unique `user_id` column, so two concurrent
    /// first logins collapse onto a single row instead of racing the
    /// read-then-insert sequence.
    pub async fn issue_or_reuse(&self, user_id: &str, ttl_days: i64) -> Result<tokens::Model> {
        let now = Utc::now();

        if let Some(existing) = Tokens::find()
            .filter(tokens::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query existing token")?
            && existing.expires > now
        {
            return Ok(existing);
        }

        let fresh = tokens::ActiveModel {
            id: Set(Uuid::new_v4().simple().to_string()),
            token: Set(Uuid::new_v4().simple().to_string()),
            expires: Set(now + Duration::days(ttl_days)),
            user_id: Set(user_id.to_string()),
        };

        Tokens::insert(fresh)
            .on_conflict(
                OnConflict::column(tokens::Column::UserId)
                    .update_columns([
                        tokens::Column::Id,
                        tokens::Column::Token,
                        tokens::Column::Expires,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to upsert token")?;

        // Re-read rather than trusting our own values: a concurrent login may
        // have won the upsert, and both callers must agree on the live token.
        let row = Tokens::find()
            .filter(tokens::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to re-read token after upsert")?
            .ok_or_else(|| anyhow::anyhow!("Token row missing after upsert"))?;

        Ok(row)
    }

    /// Resolve a presented token to its owner.
    ///
    /// Absent, unknown, and expired tokens all come back as `None`; callers
    /// cannot tell them apart, which keeps token probing uninformative.
    pub async fn resolve(&self, token: &str) -> Result<Option<users::Model>> {
        let row = Tokens::find()
            .filter(tokens::Column::Token.eq(token))
            .filter(tokens::Column::Expires.gt(Utc::now()))
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to resolve token")?;

        Ok(row.and_then(|(_, user)| user))
    }
}
