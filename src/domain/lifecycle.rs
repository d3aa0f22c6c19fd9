//! Soft-delete and restore for any entity composed of [`Timestamps`] and
//! [`SoftDeleteState`].

use time::OffsetDateTime;

use super::entities::{ArticleRecord, CommentRecord, SoftDeleteState, Timestamps};

pub trait SoftDeletable {
    fn timestamps(&self) -> &Timestamps;
    fn timestamps_mut(&mut self) -> &mut Timestamps;
    fn deletion(&self) -> &SoftDeleteState;
    fn deletion_mut(&mut self) -> &mut SoftDeleteState;

    fn is_active(&self) -> bool {
        !self.deletion().is_deleted
    }

    /// Flag the entity as deleted and record when it happened.
    fn soft_delete(&mut self, now: OffsetDateTime) {
        *self.deletion_mut() = SoftDeleteState::deleted(now);
        self.timestamps_mut().touch(now);
    }

    /// Clear the deletion flag. Only `updated_at` differs from the pre-delete state.
    fn restore(&mut self, now: OffsetDateTime) {
        *self.deletion_mut() = SoftDeleteState::active();
        self.timestamps_mut().touch(now);
    }
}

impl SoftDeletable for ArticleRecord {
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn deletion(&self) -> &SoftDeleteState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.deletion
    }
}

impl SoftDeletable for CommentRecord {
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn deletion(&self) -> &SoftDeleteState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.deletion
    }
}
