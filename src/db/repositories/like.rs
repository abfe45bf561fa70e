use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::entities::{likes, posts, prelude::*};

pub struct LikeRepository {
    conn: DatabaseConnection,
}

impl LikeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, post_id: &str, user_id: &str, liked: bool) -> Result<likes::Model> {
        let model = likes::ActiveModel {
            id: Set(Uuid::new_v4().simple().to_string()),
            post_id: Set(post_id.to_string()),
            user_id: Set(user_id.to_string()),
            liked: Set(liked),
        };

        let like = model.insert(&self.conn).await.context("Failed to insert like")?;
        Ok(like)
    }

    /// A user gets one like row per post, liked or not.
    pub async fn exists(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let existing = Likes::find()
            .filter(likes::Column::PostId.eq(post_id))
            .filter(likes::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to check for existing like")?;

        Ok(existing.is_some())
    }

    pub async fn count_liked(&self) -> Result<u64> {
        let n = Likes::find()
            .filter(likes::Column::Liked.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count likes")?;

        Ok(n)
    }

    /// Likes received across all of a user's posts.
    pub async fn count_liked_for_author(&self, user_id: &str) -> Result<u64> {
        let n = Likes::find()
            .filter(likes::Column::Liked.eq(true))
            .join(JoinType::InnerJoin, likes::Relation::Posts.def())
            .filter(posts::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count likes for author")?;

        Ok(n)
    }
}
