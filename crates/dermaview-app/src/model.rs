// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// A row of the `users` table. The password is kept for parity with the
/// stored row but never leaves the process through serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Content hash in principle; in practice the uploader sends the image path.
    pub digest: String,
    pub patient_id: String,
    pub patient_name: String,
    /// Stored and searched as the text the renderer sent.
    pub uploaded_at: String,
    pub disease: String,
    pub department: String,
}

/// Searchable attributes of [`Image`]. The wire names double as the SQLite
/// column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    Digest,
    PatientId,
    PatientName,
    UploadedAt,
    Disease,
    Department,
}

impl ImageField {
    pub const ALL: [Self; 6] = [
        Self::Digest,
        Self::PatientId,
        Self::PatientName,
        Self::UploadedAt,
        Self::Disease,
        Self::Department,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::PatientId => "patientId",
            Self::PatientName => "patientName",
            Self::UploadedAt => "uploadedAt",
            Self::Disease => "disease",
            Self::Department => "department",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == value)
    }
}

/// Result of inserting one element of an upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub digest: String,
    pub inserted: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn inserted(digest: &str) -> Self {
        Self {
            digest: digest.to_owned(),
            inserted: true,
            error: None,
        }
    }

    pub fn failed(digest: &str, error: impl Into<String>) -> Self {
        Self {
            digest: digest.to_owned(),
            inserted: false,
            error: Some(error.into()),
        }
    }
}
