use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::entities::{likes, posts, prelude::*, users};

/// Post joined with its author's username.
#[derive(Debug, Clone, FromQueryResult)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub dt_created: chrono::DateTime<Utc>,
    pub dt_updated: chrono::DateTime<Utc>,
}

pub struct PostRepository {
    conn: DatabaseConnection,
}

impl PostRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, user_id: &str, body: &str) -> Result<posts::Model> {
        let now = Utc::now();
        let model = posts::ActiveModel {
            id: Set(Uuid::new_v4().simple().to_string()),
            user_id: Set(user_id.to_string()),
            body: Set(body.to_string()),
            dt_created: Set(now),
            dt_updated: Set(now),
        };

        let post = model.insert(&self.conn).await.context("Failed to insert post")?;
        Ok(post)
    }

    pub async fn get(&self, post_id: &str) -> Result<Option<posts::Model>> {
        let post = Posts::find_by_id(post_id)
            .one(&self.conn)
            .await
            .context("Failed to query post")?;

        Ok(post)
    }

    pub async fn get_with_author(&self, post_id: &str) -> Result<Option<PostRow>> {
        let row = self
            .rows_query()
            .filter(posts::Column::Id.eq(post_id))
            .into_model::<PostRow>()
            .one(&self.conn)
            .await
            .context("Failed to query post with author")?;

        Ok(row)
    }

    pub async fn list(&self) -> Result<Vec<PostRow>> {
        let rows = self
            .rows_query()
            .into_model::<PostRow>()
            .all(&self.conn)
            .await
            .context("Failed to list posts")?;

        Ok(rows)
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<PostRow>> {
        let rows = self
            .rows_query()
            .filter(posts::Column::UserId.eq(user_id))
            .into_model::<PostRow>()
            .all(&self.conn)
            .await
            .context("Failed to list user posts")?;

        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64> {
        let n = Posts::find()
            .count(&self.conn)
            .await
            .context("Failed to count posts")?;

        Ok(n)
    }

    pub async fn count_by_user(&self, user_id: &str) -> Result<u64> {
        let n = Posts::find()
            .filter(posts::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count user posts")?;

        Ok(n)
    }

    pub async fn update_body(&self, post_id: &str, body: &str) -> Result<posts::Model> {
        let post = Posts::find_by_id(post_id)
            .one(&self.conn)
            .await
            .context("Failed to query post for update")?
            .ok_or_else(|| anyhow::anyhow!("Post not found: {post_id}"))?;

        let mut active: posts::ActiveModel = post.into();
        active.body = Set(body.to_string());
        active.dt_updated = Set(Utc::now());
        let updated = active.update(&self.conn).await.context("Failed to update post")?;

        Ok(updated)
    }

    /// Likes go first so a crash between the two deletes never leaves likes
    /// pointing at a missing post.
    pub async fn delete(&self, post_id: &str) -> Result<()> {
        Likes::delete_many()
            .filter(likes::Column::PostId.eq(post_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete likes for post")?;

        Posts::delete_many()
            .filter(posts::Column::Id.eq(post_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete post")?;

        Ok(())
    }

    fn rows_query(&self) -> sea_orm::Select<Posts> {
        Posts::find()
            .join(JoinType::InnerJoin, posts::Relation::Users.def())
            .select_only()
            .column(posts::Column::Id)
            .column(posts::Column::UserId)
            .column(users::Column::Username)
            .column(posts::Column::Body)
            .column(posts::Column::DtCreated)
            .column(posts::Column::DtUpdated)
            .order_by_desc(posts::Column::DtCreated)
    }
}
