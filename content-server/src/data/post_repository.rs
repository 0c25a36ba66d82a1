use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::listing::ListFilter;
use crate::domain::post::Post;

#[derive(Debug, Clone)]
pub(crate) struct NewTag {
    pub(crate) name: String,
    pub(crate) description: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewPost {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) tags: Vec<NewTag>,
}

/// Full replacement of a post's editable fields, tag set included.
#[derive(Debug, Clone)]
pub(crate) struct PostPatch {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) tags: Vec<NewTag>,
}

/// Posts and their tags. Soft-deleted rows are never returned or counted.
#[async_trait]
pub(crate) trait PostRepository: Send + Sync {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError>;
    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Option<Post>, DomainError>;
    /// Soft-deletes the post and all of its tags atomically. Returns `false`
    /// when there was no live post with this id.
    async fn delete_post(&self, id: i64) -> Result<bool, DomainError>;
    /// One page of posts matching the filter, tags attached.
    async fn list_posts(&self, filter: &ListFilter) -> Result<Vec<Post>, DomainError>;
    /// Posts matching the filter's search, ignoring pagination.
    async fn count_filtered(&self, filter: &ListFilter) -> Result<i64, DomainError>;
    async fn count_all(&self) -> Result<i64, DomainError>;
}

#[async_trait]
impl<T: PostRepository + ?Sized> PostRepository for Arc<T> {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        (**self).create_post(input).await
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
        (**self).get_post(id).await
    }

    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Option<Post>, DomainError> {
        (**self).update_post(id, patch).await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DomainError> {
        (**self).delete_post(id).await
    }

    async fn list_posts(&self, filter: &ListFilter) -> Result<Vec<Post>, DomainError> {
        (**self).list_posts(filter).await
    }

    async fn count_filtered(&self, filter: &ListFilter) -> Result<i64, DomainError> {
        (**self).count_filtered(filter).await
    }

    async fn count_all(&self) -> Result<i64, DomainError> {
        (**self).count_all().await
    }
}
