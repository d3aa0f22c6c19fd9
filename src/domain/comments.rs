//! Comment field rules and one-level threading.

use uuid::Uuid;

use super::entities::CommentRecord;
use super::error::DomainError;
use super::visibility::Visibility;

pub const CONTENT_MAX_CHARS: usize = 1000;
/// Replies expanded under a top-level comment.
pub const MAX_REPLIES: usize = 5;

pub const PARENT_MISMATCH_MESSAGE: &str = "Parent comment must belong to the same article.";

pub fn normalize_content(content: &str) -> Result<String, DomainError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::validation(
            "content",
            "Comment content may not be blank.",
        ));
    }
    if content.chars().count() > CONTENT_MAX_CHARS {
        return Err(DomainError::validation(
            "content",
            format!("Comment content must be at most {CONTENT_MAX_CHARS} characters long."),
        ));
    }
    Ok(content.to_string())
}

/// A parent must live under the same article as the new comment.
pub fn ensure_parent_matches(article_id: Uuid, parent: &CommentRecord) -> Result<(), DomainError> {
    if parent.article_id != article_id {
        return Err(DomainError::validation("parent", PARENT_MISMATCH_MESSAGE));
    }
    Ok(())
}

/// Replies shown beneath `comment`.
///
/// A reply never expands its own children. For a top-level comment this keeps
/// active direct children, newest first, capped at [`MAX_REPLIES`].
pub fn get_replies<I>(comment: &CommentRecord, candidates: I) -> Vec<CommentRecord>
where
    I: IntoIterator<Item = CommentRecord>,
{
    if comment.is_reply() {
        return Vec::new();
    }

    let mut replies: Vec<CommentRecord> = candidates
        .into_iter()
        .filter(|reply| reply.parent_id == Some(comment.id))
        .filter(|reply| Visibility::Active.admits(reply))
        .collect();
    replies.sort_by(|a, b| {
        b.timestamps
            .created_at
            .cmp(&a.timestamps.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    replies.truncate(MAX_REPLIES);
    replies
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::{SoftDeleteState, Timestamps};

    fn comment(article_id: Uuid, parent_id: Option<Uuid>, minute: i64) -> CommentRecord {
        let at = datetime!(2024-05-01 10:00 UTC) + Duration::minutes(minute);
        CommentRecord {
            id: Uuid::new_v4(),
            article_id,
            author_id: Uuid::new_v4(),
            parent_id,
            content: format!("comment at minute {minute}"),
            timestamps: Timestamps::new(at),
            deletion: SoftDeleteState::active(),
        }
    }

    #[test]
    fn content_is_trimmed_and_bounded() {
        assert!(normalize_content("   ").is_err());
        assert_eq!(normalize_content("  hi ").expect("valid"), "hi");
        assert!(normalize_content(&"x".repeat(1001)).is_err());
        assert!(normalize_content(&"x".repeat(1000)).is_ok());
    }

    #[test]
    fn parent_from_other_article_is_rejected() {
        let parent = comment(Uuid::new_v4(), None, 0);
        let err = ensure_parent_matches(Uuid::new_v4(), &parent).expect_err("mismatch");
        assert_eq!(err.to_string(), PARENT_MISMATCH_MESSAGE);
        assert!(ensure_parent_matches(parent.article_id, &parent).is_ok());
    }

    #[test]
    fn replies_are_capped_newest_first_and_skip_deleted() {
        let article = Uuid::new_v4();
        let root = comment(article, None, 0);
        let mut children: Vec<CommentRecord> =
            (1..=7).map(|m| comment(article, Some(root.id), m)).collect();
        children[6].deletion = SoftDeleteState::deleted(datetime!(2024-05-02 00:00 UTC));

        let replies = get_replies(&root, children.clone());

        assert_eq!(replies.len(), MAX_REPLIES);
        assert_eq!(replies[0].id, children[5].id);
        assert!(replies.iter().all(|r| r.id != children[6].id));
    }

    #[test]
    fn reply_never_expands_children() {
        let article = Uuid::new_v4();
        let root = comment(article, None, 0);
        let reply = comment(article, Some(root.id), 1);
        let nested = comment(article, Some(reply.id), 2);

        assert!(get_replies(&reply, vec![nested]).is_empty());
    }
}
