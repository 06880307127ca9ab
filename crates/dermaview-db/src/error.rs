// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rusqlite::ErrorCode;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection is not established -- select a root directory first")]
    NotConnected,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Schema(String),

    #[error("{context}: {source}")]
    Sqlite {
        context: String,
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Open(#[from] anyhow::Error),
}

impl StoreError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Schema(_) | Self::Sqlite { .. } | Self::Open(_) => "database",
        }
    }
}

pub(crate) trait SqlResultExt<T> {
    fn sql_context(self, context: &str) -> StoreResult<T>;
}

impl<T> SqlResultExt<T> for rusqlite::Result<T> {
    fn sql_context(self, context: &str) -> StoreResult<T> {
        self.map_err(|source| StoreError::Sqlite {
            context: context.to_owned(),
            source,
        })
    }
}

pub(crate) fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

pub(crate) fn is_missing_table(error: &rusqlite::Error) -> bool {
    // Prepare failures carry the engine message in more than one variant.
    error.to_string().contains("no such table")
}
