// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::{IpcError, IpcResult};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Where the companion server stores uploads, relative to the root directory.
pub const UPLOAD_SUBDIR: [&str; 2] = ["dermaview-server", "upload"];

pub const LOCAL_IMAGE_SCHEME: &str = "local-image://";

/// 1x1 white GIF served when a local image cannot be read.
pub const FALLBACK_GIF: &[u8] = &[
    71, 73, 70, 56, 57, 97, 1, 0, 1, 0, 128, 0, 0, 255, 255, 255, 0, 0, 0, 33, 249, 4, 1, 0, 0, 0,
    0, 44, 0, 0, 0, 0, 1, 0, 1, 0, 0, 2, 2, 68, 1, 0, 59,
];

/// True for an existing directory. Symlinks are not followed.
pub fn validate_path(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.is_dir())
}

/// True for an existing regular file. Symlinks are not followed.
pub fn file_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.is_file())
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(extension))
        })
}

pub fn list_images(folder: &Path) -> IpcResult<Vec<PathBuf>> {
    let entries = fs::read_dir(folder)
        .map_err(|error| IpcError::io(format!("read folder {}", folder.display()), error))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|error| IpcError::io(format!("read folder {}", folder.display()), error))?;
        let path = entry.path();
        if is_image_path(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Birth time where the platform records it, modification time otherwise.
pub fn creation_time(path: &Path) -> Result<OffsetDateTime> {
    let metadata =
        fs::metadata(path).with_context(|| format!("read metadata for {}", path.display()))?;
    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .with_context(|| format!("read timestamps for {}", path.display()))?;
    Ok(OffsetDateTime::from(created))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub creation_time: String,
    pub modification_time: String,
    pub size: u64,
}

pub fn image_metadata(path: &Path) -> Result<ImageMetadata> {
    let metadata =
        fs::metadata(path).with_context(|| format!("read metadata for {}", path.display()))?;
    let modified = metadata
        .modified()
        .with_context(|| format!("read modification time for {}", path.display()))?;

    Ok(ImageMetadata {
        creation_time: dermaview_app::timestamp::format_rfc3339(creation_time(path)?)?,
        modification_time: dermaview_app::timestamp::format_rfc3339(OffsetDateTime::from(
            modified,
        ))?,
        size: metadata.len(),
    })
}

/// Placeholder the renderer expects when metadata cannot be read.
pub fn unknown_image_metadata() -> Result<ImageMetadata> {
    let now = dermaview_app::timestamp::now_rfc3339()?;
    Ok(ImageMetadata {
        creation_time: now.clone(),
        modification_time: now,
        size: 0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaField {
    RegistrationNumber,
    Date,
}

impl CriteriaField {
    /// Accepts the Korean labels the renderer sends and their English names.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "등록번호" | "registrationNumber" => Some(Self::RegistrationNumber),
            "날짜" | "date" => Some(Self::Date),
            _ => None,
        }
    }
}

pub fn upload_dir(root: &Path) -> PathBuf {
    UPLOAD_SUBDIR
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Filters the images in the upload directory. An empty query or an unknown
/// field returns every image.
pub fn search_by_criteria(root: &Path, field: &str, query: &str) -> IpcResult<Vec<PathBuf>> {
    let images = list_images(&upload_dir(root))?;
    let query = query.trim();
    if query.is_empty() {
        return Ok(images);
    }

    let Some(field) = CriteriaField::parse(field) else {
        return Ok(images);
    };

    let matches = match field {
        CriteriaField::RegistrationNumber => {
            let needle = query.to_lowercase();
            images
                .into_iter()
                .filter(|path| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().to_lowercase())
                        .is_some_and(|name| name.contains(&needle))
                })
                .collect()
        }
        CriteriaField::Date => images
            .into_iter()
            .filter(|path| creation_date(path).is_some_and(|date| date.contains(query)))
            .collect(),
    };
    Ok(matches)
}

fn creation_date(path: &Path) -> Option<String> {
    let created = creation_time(path).ok()?;
    created
        .to_offset(time::UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day]"))
        .ok()
}

/// Copies `source` into `target_dir` under `file_name`, returning the new path.
pub fn copy_into(source: &Path, target_dir: &Path, file_name: &str) -> IpcResult<PathBuf> {
    let target = target_dir.join(file_name);
    fs::copy(source, &target).map_err(|error| {
        IpcError::io(
            format!("copy {} to {}", source.display(), target.display()),
            error,
        )
    })?;
    Ok(target)
}

pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Maps a `local-image://` URL to a filesystem path.
///
/// Thumbnail URLs sometimes arrive with the file name repeated as a trailing
/// segment (`.../thumb_x.jpg/thumb_x.jpg`); the duplicate is dropped.
pub fn local_image_path(url: &str) -> PathBuf {
    let raw = url.strip_prefix(LOCAL_IMAGE_SCHEME).unwrap_or(url);
    let mut path = percent_decode_str(raw).decode_utf8_lossy().into_owned();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    if path.contains("/thumb_")
        && let Some(deduped) = drop_repeated_file_segment(&path)
    {
        path = deduped;
    }

    PathBuf::from(path)
}

fn drop_repeated_file_segment(path: &str) -> Option<String> {
    let parts = path.split('/').collect::<Vec<_>>();
    let file_name = parts.last().copied().unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    if parts.len() > 2 && parts[parts.len() - 2].contains(stem) {
        return Some(parts[..parts.len() - 1].join("/"));
    }
    None
}

pub fn content_type_for(path: &Path) -> &'static str {
    let lower = path.to_string_lossy().to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// Never fails: unreadable files resolve to [`FALLBACK_GIF`].
pub fn resolve_local_image(url: &str) -> LocalImage {
    let path = local_image_path(url);
    match fs::read(&path) {
        Ok(bytes) => LocalImage {
            content_type: content_type_for(&path),
            path,
            bytes,
        },
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "local image unreadable; serving placeholder");
            LocalImage {
                path,
                content_type: "image/gif",
                bytes: FALLBACK_GIF.to_vec(),
            }
        }
    }
}
