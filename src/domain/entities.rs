//! Domain entities mirrored from persistent storage.

use time::OffsetDateTime;

use crate::domain::posts::PostKey;

/// A full post row, as needed by the single-post view.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: i64,
    pub user_id: i64,
    pub key: PostKey,
    pub title: String,
    pub description: String,
    pub preview: String,
    pub content_markdown: String,
    pub image_alt: String,
    pub published: OffsetDateTime,
    pub modified: OffsetDateTime,
}

/// One post on a listing page, joined with its author's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub key: PostKey,
    pub author: String,
    pub title: String,
    pub description: String,
    pub preview: String,
    pub image_alt: String,
    pub published: OffsetDateTime,
    pub modified: OffsetDateTime,
}
