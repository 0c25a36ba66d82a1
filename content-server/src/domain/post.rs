use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

const NAME_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Tag {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Post {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) tags: Vec<Tag>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TagRequest {
    pub(crate) name: String,
    pub(crate) description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CreatePostRequest {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) tags: Vec<TagRequest>,
}

impl CreatePostRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            name: normalize_name("name", &self.name)?,
            description: self.description.trim().to_string(),
            tags: normalize_tags(self.tags)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UpdatePostRequest {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) tags: Vec<TagRequest>,
}

impl UpdatePostRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            name: normalize_name("name", &self.name)?,
            description: self.description.trim().to_string(),
            tags: normalize_tags(self.tags)?,
        })
    }
}

impl Post {
    pub(crate) fn new(
        id: i64,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<Tag>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_positive_i64("id", id)?;
        let name = normalize_name("name", &name.into())?;

        if updated_at < created_at {
            return Err(DomainError::Validation {
                field: "updated_at",
                message: "must be >= created_at",
            });
        }
        if tags.iter().any(|tag| tag.post_id != id) {
            return Err(DomainError::Validation {
                field: "tags",
                message: "must belong to the post",
            });
        }

        Ok(Self {
            id,
            name,
            description: description.into(),
            tags,
            created_at,
            updated_at,
        })
    }
}

fn validate_positive_i64(field: &'static str, value: i64) -> Result<(), DomainError> {
    if value <= 0 {
        return Err(DomainError::Validation {
            field,
            message: "must be > 0",
        });
    }
    Ok(())
}

fn normalize_name(field: &'static str, name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::Validation {
            field,
            message: "must be 1..255 chars",
        });
    }
    Ok(name.to_string())
}

fn normalize_tags(tags: Vec<TagRequest>) -> Result<Vec<TagRequest>, DomainError> {
    tags.into_iter()
        .map(|tag| {
            Ok(TagRequest {
                name: normalize_name("tags.name", &tag.name)?,
                description: tag.description.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{CreatePostRequest, DomainError, Post, Tag, TagRequest, UpdatePostRequest};

    #[test]
    fn create_post_request_validate_rejects_empty_name() {
        let req = CreatePostRequest {
            name: "   ".to_string(),
            description: "valid description".to_string(),
            tags: Vec::new(),
        };

        let err = req.validate().expect_err("name must be rejected");
        assert_validation_field(err, "name");
    }

    #[test]
    fn create_post_request_allows_empty_description() {
        let req = CreatePostRequest {
            name: "Hello".to_string(),
            description: String::new(),
            tags: Vec::new(),
        };

        let validated = req.validate().expect("empty description is fine");
        assert_eq!(validated.description, "");
    }

    #[test]
    fn create_post_request_rejects_overlong_name() {
        let req = CreatePostRequest {
            name: "x".repeat(256),
            description: String::new(),
            tags: Vec::new(),
        };

        let err = req.validate().expect_err("name is too long");
        assert_validation_field(err, "name");
    }

    #[test]
    fn update_post_request_validate_rejects_unnamed_tag() {
        let req = UpdatePostRequest {
            name: "valid name".to_string(),
            description: "body".to_string(),
            tags: vec![TagRequest {
                name: " ".to_string(),
                description: "whatever".to_string(),
            }],
        };

        let err = req.validate().expect_err("tag name must be rejected");
        assert_validation_field(err, "tags.name");
    }

    #[test]
    fn create_post_request_validate_normalizes_fields() {
        let req = CreatePostRequest {
            name: "  name  ".to_string(),
            description: "  description  ".to_string(),
            tags: vec![TagRequest {
                name: "  rust ".to_string(),
                description: " systems ".to_string(),
            }],
        };

        let validated = req.validate().expect("must validate");
        assert_eq!(validated.name, "name");
        assert_eq!(validated.description, "description");
        assert_eq!(validated.tags[0].name, "rust");
        assert_eq!(validated.tags[0].description, "systems");
    }

    #[test]
    fn post_new_rejects_updated_before_created() {
        let updated_at = Utc::now();
        let created_at = updated_at + Duration::seconds(1);

        let err = Post::new(1, "Name", "Description", Vec::new(), created_at, updated_at)
            .expect_err("updated_at < created_at must fail");
        assert_validation_field(err, "updated_at");
    }

    #[test]
    fn post_new_rejects_foreign_tags() {
        let now = Utc::now();
        let tag = Tag {
            id: 1,
            post_id: 2,
            name: "rust".to_string(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        };

        let err = Post::new(1, "Name", "", vec![tag], now, now).expect_err("tag belongs elsewhere");
        assert_validation_field(err, "tags");
    }

    fn assert_validation_field(err: DomainError, expected_field: &'static str) {
        match err {
            DomainError::Validation { field, .. } => assert_eq!(field, expected_field),
            _ => panic!("expected DomainError::Validation"),
        }
    }
}
