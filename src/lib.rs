//! Content hub: articles, threaded comments and user profiles behind a
//! JSON API, with soft deletion and a best-effort read cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
