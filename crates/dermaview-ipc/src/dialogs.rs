// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Error,
}

impl NotifyLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// Native dialogs the bridge needs from its host. `None` means the user
/// cancelled.
pub trait Dialogs {
    fn pick_folder(&mut self, title: &str) -> Result<Option<PathBuf>>;
    fn pick_save_path(&mut self, default_name: &str) -> Result<Option<PathBuf>>;
    fn notify(&mut self, level: NotifyLevel, title: &str, message: &str);
}
