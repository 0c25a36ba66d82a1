use tracing::{debug, info};

use crate::data::post_repository::{NewPost, NewTag, PostPatch, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::listing::ListFilter;
use crate::domain::post::{CreatePostRequest, Post, TagRequest, UpdatePostRequest};

#[derive(Debug, Clone)]
pub(crate) struct ListPostsResult {
    pub(crate) posts: Vec<Post>,
    pub(crate) total: i64,
    pub(crate) filtered: i64,
}

pub(crate) struct PostService<R: PostRepository> {
    repo: R,
}

impl<R: PostRepository> PostService<R> {
    pub(crate) fn new(repo: R) -> Self {
        Self { repo }
    }

    pub(crate) async fn create_post(&self, req: CreatePostRequest) -> Result<Post, DomainError> {
        let req = req.validate()?;

        let post = self
            .repo
            .create_post(NewPost {
                name: req.name,
                description: req.description,
                tags: into_new_tags(req.tags),
            })
            .await?;

        info!(post_id = post.id, name = %post.name, "post created");
        Ok(post)
    }

    pub(crate) async fn get_post(&self, id: i64) -> Result<Post, DomainError> {
        self.repo
            .get_post(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {id}")))
    }

    pub(crate) async fn update_post(
        &self,
        id: i64,
        req: UpdatePostRequest,
    ) -> Result<Post, DomainError> {
        let req = req.validate()?;
        let patch = PostPatch {
            name: req.name,
            description: req.description,
            tags: into_new_tags(req.tags),
        };

        let post = self
            .repo
            .update_post(id, patch)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {id}")))?;

        info!(post_id = id, "post updated");
        Ok(post)
    }

    pub(crate) async fn delete_post(&self, id: i64) -> Result<(), DomainError> {
        if !self.repo.delete_post(id).await? {
            return Err(DomainError::NotFound(format!("post id: {id}")));
        }

        info!(post_id = id, "post deleted");
        Ok(())
    }

    /// Page, filtered count and total count are independent reads; they run
    /// concurrently and any failure fails the listing.
    pub(crate) async fn list_posts(&self, filter: ListFilter) -> Result<ListPostsResult, DomainError> {
        let (posts, filtered, total) = tokio::try_join!(
            self.repo.list_posts(&filter),
            self.repo.count_filtered(&filter),
            self.repo.count_all(),
        )?;

        debug!(
            count = posts.len(),
            filtered,
            total,
            limit = filter.limit,
            offset = filter.offset,
            "listed posts"
        );
        Ok(ListPostsResult {
            posts,
            total,
            filtered,
        })
    }
}

fn into_new_tags(tags: Vec<TagRequest>) -> Vec<NewTag> {
    tags.into_iter()
        .map(|tag| NewTag {
            name: tag.name,
            description: tag.description,
        })
        .collect()
}
