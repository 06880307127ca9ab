// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::error::{IpcError, IpcResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<u64>,
    pub channel: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Success {
        id: Option<u64>,
        ok: bool,
        result: Value,
    },
    Failure {
        id: Option<u64>,
        ok: bool,
        error: ErrorBody,
    },
}

impl Reply {
    pub fn success(id: Option<u64>, result: Value) -> Self {
        Self::Success {
            id,
            ok: true,
            result,
        }
    }

    pub fn failure(id: Option<u64>, error: &IpcError) -> Self {
        Self::Failure {
            id,
            ok: false,
            error: ErrorBody {
                kind: error.kind().to_owned(),
                message: error.to_string(),
            },
        }
    }
}

/// Positional arguments of one request.
pub(crate) struct Args<'a> {
    channel: Channel,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(channel: Channel, values: &'a [Value]) -> Self {
        Self { channel, values }
    }

    pub(crate) fn required<T: DeserializeOwned>(&self, index: usize, name: &str) -> IpcResult<T> {
        self.optional(index, name)?.ok_or_else(|| {
            IpcError::Validation(format!(
                "{} requires argument `{name}`",
                self.channel.as_str()
            ))
        })
    }

    /// Missing and `null` arguments both read as `None`.
    pub(crate) fn optional<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &str,
    ) -> IpcResult<Option<T>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|error| {
                    IpcError::Validation(format!(
                        "{}: invalid `{name}` argument: {error}",
                        self.channel.as_str()
                    ))
                }),
        }
    }

    pub(crate) fn raw(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }
}
