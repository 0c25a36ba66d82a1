use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

use crate::application::post_service::ListPostsResult;
use crate::domain::listing::{ListFilter, ListQuery};
use crate::domain::post::{CreatePostRequest, Post, Tag, TagRequest, UpdatePostRequest};
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppResult;
use crate::presentation::http::middleware::auth::AuthenticatedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct TagRequestDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
}

/// Body of both create and update; update replaces the whole tag set.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct PostRequestDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) tags: Vec<TagRequestDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct TagDto {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostDto {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) tags: Vec<TagDto>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ListPostsResponseDto {
    pub(crate) data: Vec<PostDto>,
    pub(crate) total_data: i64,
    pub(crate) filtered_data: i64,
}

impl From<Tag> for TagDto {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            post_id: tag.post_id,
            name: tag.name,
            description: tag.description,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            name: post.name,
            description: post.description,
            tags: post.tags.into_iter().map(TagDto::from).collect(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<ListPostsResult> for ListPostsResponseDto {
    fn from(result: ListPostsResult) -> Self {
        Self {
            data: result.posts.into_iter().map(PostDto::from).collect(),
            total_data: result.total,
            filtered_data: result.filtered,
        }
    }
}

impl PostRequestDto {
    fn into_parts(self) -> (String, String, Vec<TagRequest>) {
        let tags = self
            .tags
            .into_iter()
            .map(|tag| TagRequest {
                name: tag.name,
                description: tag.description,
            })
            .collect();
        (self.name, self.description, tags)
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    params(
        ("Limit" = Option<String>, Query, description = "Page size, default 25, capped at 100"),
        ("Offset" = Option<String>, Query, description = "Rows to skip, default 0"),
        ("Sort" = Option<String>, Query, description = "One of id, name, created_at, updated_at"),
        ("Order" = Option<String>, Query, description = "ASC or DESC, default DESC"),
        ("Search" = Option<String>, Query, description = "Case-insensitive substring of name or description")
    ),
    responses(
        (status = 200, description = "Posts listed", body = ListPostsResponseDto),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<(StatusCode, Json<ListPostsResponseDto>)> {
    let Query(query) = query?;
    let filter = ListFilter::from_query(query);

    let result = state.post_service.list_posts(filter).await?;

    Ok((StatusCode::OK, Json(ListPostsResponseDto::from(result))))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post found", body = PostDto),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn get_post(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    let Path(id) = id?;
    let post = state.post_service.get_post(id).await?;

    Ok((StatusCode::OK, Json(PostDto::from(post))))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    request_body = PostRequestDto,
    responses(
        (status = 201, description = "Post created", body = PostDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    payload: Result<Json<PostRequestDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    let Json(dto) = payload?;
    dto.validate()?;
    let (name, description, tags) = dto.into_parts();

    let post = state
        .post_service
        .create_post(CreatePostRequest {
            name,
            description,
            tags,
        })
        .await?;

    debug!(user_id = auth.user_id, post_id = post.id, "create_post handled");
    Ok((StatusCode::CREATED, Json(PostDto::from(post))))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    request_body = PostRequestDto,
    responses(
        (status = 200, description = "Post updated", body = PostDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn update_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostRequestDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    let Path(id) = id?;
    let Json(dto) = payload?;
    dto.validate()?;
    let (name, description, tags) = dto.into_parts();

    let post = state
        .post_service
        .update_post(
            id,
            UpdatePostRequest {
                name,
                description,
                tags,
            },
        )
        .await?;

    debug!(user_id = auth.user_id, post_id = id, "update_post handled");
    Ok((StatusCode::OK, Json(PostDto::from(post))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn delete_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    state.post_service.delete_post(id).await?;

    debug!(user_id = auth.user_id, post_id = id, "delete_post handled");
    Ok(StatusCode::NO_CONTENT)
}
