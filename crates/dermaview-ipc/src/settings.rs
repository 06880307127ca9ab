// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ROOT_DIR_KEY: &str = "rootDirPath";

/// The renderer's free-form settings document. Only `rootDirPath` means
/// anything to the bridge.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Value> {
        if !self.path.exists() {
            return Ok(Value::Object(Map::new()));
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read settings file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse settings file {}", self.path.display()))
    }

    pub fn save(&self, settings: &Value) -> Result<()> {
        if !settings.is_object() {
            bail!("settings must be a JSON object");
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create settings directory {}", parent.display()))?;
        }

        let pretty = serde_json::to_string_pretty(settings).context("encode settings")?;
        fs::write(&self.path, pretty)
            .with_context(|| format!("write settings file {}", self.path.display()))
    }

    pub fn root_dir(&self) -> Result<Option<PathBuf>> {
        Ok(root_dir_of(&self.load()?))
    }
}

pub fn root_dir_of(settings: &Value) -> Option<PathBuf> {
    settings
        .get(ROOT_DIR_KEY)
        .and_then(Value::as_str)
        .filter(|root| !root.trim().is_empty())
        .map(PathBuf::from)
}
