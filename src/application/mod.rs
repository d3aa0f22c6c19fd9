//! Application services: validation, orchestration and cache coordination.

pub mod articles;
pub mod comments;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod users;
