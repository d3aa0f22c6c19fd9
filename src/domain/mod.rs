//! Domain layer types and invariants.

pub mod articles;
pub mod comments;
pub mod entities;
pub mod error;
pub mod lifecycle;
pub mod slug;
pub mod users;
pub mod visibility;
