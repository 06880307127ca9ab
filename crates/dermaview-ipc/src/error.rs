// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use dermaview_db::StoreError;
use thiserror::Error;

pub type IpcResult<T> = std::result::Result<T, IpcError>;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Protocol(String),

    #[error("unknown channel {0:?}")]
    UnknownChannel(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IpcError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(error) => error.kind(),
            Self::Validation(_) => "validation",
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                "not_found"
            }
            Self::Io { .. } => "io",
            Self::Protocol(_) => "protocol",
            Self::UnknownChannel(_) => "unknown_channel",
            Self::Internal(_) => "internal",
        }
    }
}
