//! `SeaORM` implementation of the `PostService` trait.

use async_trait::async_trait;

use crate::db::Store;
use crate::services::post_service::{LikeDetails, PostDetails, PostError, PostFeed, PostService};

pub struct SeaOrmPostService {
    store: Store,
}

impl SeaOrmPostService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PostService for SeaOrmPostService {
    async fn feed(&self) -> Result<PostFeed, PostError> {
        let total_count = self.store.count_posts().await?;
        let rows = self.store.list_posts().await?;
        let likes_all = self.store.count_liked().await?;

        Ok(PostFeed {
            total_count,
            results: rows.into_iter().map(PostDetails::from).collect(),
            likes_all,
        })
    }

    async fn feed_for_user(&self, user_id: &str) -> Result<PostFeed, PostError> {
        let total_count = self.store.count_posts_by_user(user_id).await?;
        let rows = self.store.list_posts_by_user(user_id).await?;
        let likes_all = self.store.count_liked_for_author(user_id).await?;

        Ok(PostFeed {
            total_count,
            results: rows.into_iter().map(PostDetails::from).collect(),
            likes_all,
        })
    }

    async fn get_post(&self, post_id: &str) -> Result<PostDetails, PostError> {
        let row = self
            .store
            .get_post_with_author(post_id)
            .await?
            .ok_or(PostError::NotFound)?;

        Ok(PostDetails::from(row))
    }

    async fn create_post(&self, user_id: &str, body: &str) -> Result<PostDetails, PostError> {
        let post = self.store.create_post(user_id, body).await?;

        // Re-read through the join so the response carries the username.
        let row = self
            .store
            .get_post_with_author(&post.id)
            .await?
            .ok_or(PostError::NotFound)?;

        Ok(PostDetails::from(row))
    }

    async fn edit_post(
        &self,
        user_id: &str,
        post_id: &str,
        body: &str,
    ) -> Result<PostDetails, PostError> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(PostError::NotFound)?;

        if post.user_id != user_id {
            return Err(PostError::NotOwner);
        }

        self.store.update_post_body(post_id, body).await?;

        let row = self
            .store
            .get_post_with_author(post_id)
            .await?
            .ok_or(PostError::NotFound)?;

        Ok(PostDetails::from(row))
    }

    async fn delete_post(&self, user_id: &str, post_id: &str) -> Result<(), PostError> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(PostError::NotFound)?;

        if post.user_id != user_id {
            return Err(PostError::DeleteNotOwner);
        }

        self.store.delete_post(post_id).await?;

        Ok(())
    }

    async fn like_post(
        &self,
        user_id: &str,
        post_id: &str,
        like: bool,
    ) -> Result<LikeDetails, PostError> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(PostError::NotFound)?;

        if post.user_id == user_id {
            return Err(PostError::SelfLike);
        }

        if self.store.like_exists(post_id, user_id).await? {
            return Err(PostError::AlreadyLiked);
        }

        let recorded = self.store.create_like(post_id, user_id, like).await?;

        Ok(LikeDetails {
            user_id: post.user_id,
            posts: post.body,
            dt_created: post.dt_created,
            dt_updated: post.dt_updated,
            like: recorded.liked,
        })
    }
}
