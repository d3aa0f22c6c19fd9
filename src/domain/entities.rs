//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Creation and modification instants shared by every stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Timestamps {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now;
    }
}

/// Soft-delete marker. A deleted row keeps its data and its slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftDeleteState {
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl SoftDeleteState {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn deleted(at: OffsetDateTime) -> Self {
        Self {
            is_deleted: true,
            deleted_at: Some(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: Uuid,
    pub is_published: bool,
    pub views_count: i64,
    pub tags: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub deletion: SoftDeleteState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(flatten)]
    pub deletion: SoftDeleteState,
}

impl CommentRecord {
    /// A comment is a reply iff it has a parent.
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Registered account. The token hash never leaves the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub token_prefix: String,
    pub token_hash: Vec<u8>,
    pub date_joined: OffsetDateTime,
}

/// Public author details embedded in article and comment payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
}
