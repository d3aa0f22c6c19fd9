//! Startup and adapter failures that abort the process.

use std::{io, net::SocketAddr};

use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind http listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("database error: {message}")]
    Database { message: String },
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("cache backend unavailable: {0}")]
    Cache(#[from] CacheError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("missing configuration: {key}")]
    MissingSetting { key: &'static str },
}

impl InfraError {
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    pub fn missing(key: &'static str) -> Self {
        Self::MissingSetting { key }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
