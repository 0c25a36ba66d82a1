use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::post_repository::{NewPost, NewTag, PostPatch, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::listing::{ListFilter, SortField, SortOrder};
use crate::domain::post::{Post, Tag};

/// Process-local post store. Every operation runs under one lock, so
/// multi-row writes are atomic.
#[derive(Debug, Default)]
pub(crate) struct MemoryPostRepository {
    tables: Mutex<PostTables>,
}

#[derive(Debug, Default)]
struct PostTables {
    next_post_id: i64,
    next_tag_id: i64,
    posts: Vec<PostRecord>,
    tags: Vec<TagRecord>,
}

#[derive(Debug, Clone)]
struct PostRecord {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct TagRecord {
    tag: Tag,
    deleted_at: Option<DateTime<Utc>>,
}

impl MemoryPostRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, PostTables>, DomainError> {
        self.tables
            .lock()
            .map_err(|_| DomainError::Unexpected("post table lock poisoned".to_string()))
    }
}

impl PostTables {
    fn live_post(&self, id: i64) -> Option<&PostRecord> {
        self.posts
            .iter()
            .find(|post| post.id == id && post.deleted_at.is_none())
    }

    fn insert_tags(&mut self, post_id: i64, tags: Vec<NewTag>, now: DateTime<Utc>) {
        for tag in tags {
            self.next_tag_id += 1;
            self.tags.push(TagRecord {
                tag: Tag {
                    id: self.next_tag_id,
                    post_id,
                    name: tag.name,
                    description: tag.description,
                    created_at: now,
                    updated_at: now,
                },
                deleted_at: None,
            });
        }
    }

    fn retire_tags(&mut self, post_id: i64, now: DateTime<Utc>) -> usize {
        let mut retired = 0;
        for record in self
            .tags
            .iter_mut()
            .filter(|record| record.tag.post_id == post_id && record.deleted_at.is_none())
        {
            record.deleted_at = Some(now);
            record.tag.updated_at = now;
            retired += 1;
        }
        retired
    }

    fn to_post(&self, record: &PostRecord) -> Result<Post, DomainError> {
        let tags = self
            .tags
            .iter()
            .filter(|tag| tag.tag.post_id == record.id && tag.deleted_at.is_none())
            .map(|tag| tag.tag.clone())
            .collect();

        Post::new(
            record.id,
            record.name.clone(),
            record.description.clone(),
            tags,
            record.created_at,
            record.updated_at,
        )
    }

    fn matching<'a>(&'a self, filter: &'a ListFilter) -> impl Iterator<Item = &'a PostRecord> + 'a {
        self.posts.iter().filter(move |post| {
            post.deleted_at.is_none() && filter.matches(&post.name, &post.description)
        })
    }
}

fn compare(a: &PostRecord, b: &PostRecord, sort: SortField) -> Ordering {
    let primary = match sort {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        tables.next_post_id += 1;
        let record = PostRecord {
            id: tables.next_post_id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.insert_tags(record.id, input.tags, now);
        let post = tables.to_post(&record)?;
        tables.posts.push(record);
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
        let tables = self.lock()?;
        tables
            .live_post(id)
            .map(|record| tables.to_post(record))
            .transpose()
    }

    async fn update_post(&self, id: i64, patch: PostPatch) -> Result<Option<Post>, DomainError> {
        let mut tables = self.lock()?;
        if tables.live_post(id).is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        tables.retire_tags(id, now);
        tables.insert_tags(id, patch.tags, now);

        let Some(record) = tables
            .posts
            .iter_mut()
            .find(|post| post.id == id && post.deleted_at.is_none())
        else {
            return Ok(None);
        };
        record.name = patch.name;
        record.description = patch.description;
        record.updated_at = now;
        let record = record.clone();

        tables.to_post(&record).map(Some)
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DomainError> {
        let mut tables = self.lock()?;
        if tables.live_post(id).is_none() {
            return Ok(false);
        }

        let now = Utc::now();
        tables.retire_tags(id, now);
        if let Some(record) = tables.posts.iter_mut().find(|post| post.id == id) {
            record.deleted_at = Some(now);
        }
        Ok(true)
    }

    async fn list_posts(&self, filter: &ListFilter) -> Result<Vec<Post>, DomainError> {
        let tables = self.lock()?;

        let mut rows: Vec<&PostRecord> = tables.matching(filter).collect();
        rows.sort_by(|a, b| {
            let ordering = compare(a, b, filter.sort);
            match filter.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        rows.into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .map(|record| tables.to_post(record))
            .collect()
    }

    async fn count_filtered(&self, filter: &ListFilter) -> Result<i64, DomainError> {
        let tables = self.lock()?;
        Ok(tables.matching(filter).count() as i64)
    }

    async fn count_all(&self) -> Result<i64, DomainError> {
        let tables = self.lock()?;
        Ok(tables
            .posts
            .iter()
            .filter(|post| post.deleted_at.is_none())
            .count() as i64)
    }
}
