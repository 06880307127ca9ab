// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Line-delimited JSON bridge between the renderer and the local process.
//!
//! Each stdin line is one [`Request`]; each request/response channel writes
//! exactly one [`Reply`] line back.

mod bridge;
mod channel;
mod dialogs;
mod error;
pub mod export;
pub mod files;
mod protocol;
mod settings;

pub use bridge::Bridge;
pub use channel::Channel;
pub use dialogs::{Dialogs, NotifyLevel};
pub use error::{IpcError, IpcResult};
pub use protocol::{ErrorBody, Reply, Request};
pub use settings::{ROOT_DIR_KEY, SETTINGS_FILE_NAME, SettingsFile, root_dir_of};

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::info;

/// Serves requests until `reader` reaches end of input.
pub fn serve<R, W>(reader: R, mut writer: W, bridge: &mut Bridge) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut handled = 0_usize;
    for line in reader.lines() {
        let line = line.context("read request line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        handled += 1;
        if let Some(reply) = bridge.handle_line(line) {
            serde_json::to_writer(&mut writer, &reply).context("encode reply")?;
            writer.write_all(b"\n").context("write reply")?;
            writer.flush().context("flush reply")?;
        }
    }

    info!(handled, "request stream closed");
    Ok(())
}
