// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use dermaview_ipc::{Dialogs, NotifyLevel};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

const TTY_PATH: &str = "/dev/tty";

/// Answers dialog requests on the controlling terminal. stdin and stdout carry
/// the IPC stream, so prompts never touch them.
#[derive(Debug, Default)]
pub struct TtyDialogs;

impl TtyDialogs {
    fn open() -> Result<(File, BufReader<File>)> {
        let output = OpenOptions::new()
            .write(true)
            .open(TTY_PATH)
            .with_context(|| format!("open {TTY_PATH} for prompts"))?;
        let input = File::open(TTY_PATH).with_context(|| format!("open {TTY_PATH} for answers"))?;
        Ok((output, BufReader::new(input)))
    }
}

impl Dialogs for TtyDialogs {
    fn pick_folder(&mut self, title: &str) -> Result<Option<PathBuf>> {
        let (mut output, mut input) = Self::open()?;
        ask(&mut output, &mut input, &format!("{title} (blank cancels)"))
    }

    fn pick_save_path(&mut self, default_name: &str) -> Result<Option<PathBuf>> {
        let (mut output, mut input) = Self::open()?;
        let answer = ask(
            &mut output,
            &mut input,
            &format!("Save as {default_name} in which file or folder? (blank cancels)"),
        )?;
        Ok(answer.map(|path| save_target(path, default_name)))
    }

    fn notify(&mut self, level: NotifyLevel, title: &str, message: &str) {
        match level {
            NotifyLevel::Info => info!(title, message, "notification"),
            NotifyLevel::Error => error!(title, message, "notification"),
        }

        let written = OpenOptions::new()
            .write(true)
            .open(TTY_PATH)
            .and_then(|mut tty| writeln!(tty, "[{}] {title}: {message}", level.as_str()));
        if let Err(error) = written {
            warn!(%error, "notification not shown on terminal");
        }
    }
}

/// Prompts once and reads one line. Blank input and end of input both cancel.
pub fn ask<W: Write, R: BufRead>(
    output: &mut W,
    input: &mut R,
    label: &str,
) -> Result<Option<PathBuf>> {
    write!(output, "{label}: ").context("write prompt")?;
    output.flush().context("flush prompt")?;

    let mut line = String::new();
    input.read_line(&mut line).context("read prompt answer")?;
    let answer = line.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(answer)))
}

fn save_target(path: PathBuf, default_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_name)
    } else {
        path
    }
}
