// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const LOG_FILE: &str = "gpt-cli.log";

pub(crate) fn log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("gpt-cli"))
}

/// Send `tracing` output to a log file. The terminal belongs to the line
/// editor, so nothing is logged to stdout or stderr. Any failure here leaves
/// logging disabled.
pub(crate) fn init(debug: bool) {
    let Some(dir) = log_dir() else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let Ok(file) = options.open(dir.join(LOG_FILE)) else {
        return;
    };

    let default_filter = if debug { "gpt=debug" } else { "gpt=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(file_layer).try_init();
}
