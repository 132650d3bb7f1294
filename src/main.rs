// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

mod cli;
mod client;
mod commands;
mod config;
mod conversation;
mod display;
mod error;
mod logging;
mod retry;
mod sse;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

use crate::config::Config;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "gpt")]
#[command(about = "Chat with Groq-hosted language models from the terminal")]
#[command(version)]
#[command(styles = STYLES, color = clap::ColorChoice::Always)]
struct Args {
    #[arg(long, value_name = "PATH", help = "Config file (JSON or TOML)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Model to use (default: openai/gpt-oss-20b)")]
    model: Option<String>,

    #[arg(long, help = "Log debug output to the log file")]
    debug: bool,

    #[arg(
        trailing_var_arg = true,
        help = "Prompt to send (non-interactive mode)"
    )]
    prompt: Vec<String>,
}

fn load_config(args: &Args) -> error::Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(model) = &args.model {
        config.default_model = model.clone();
    }

    let problems = config.validate();
    if !problems.is_empty() {
        return Err(error::Error::Config(problems.join("\n")));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.debug);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            display::error_panel(&e.display_message()).print();
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        model = %config.default_model,
        source = ?config.source,
        "starting"
    );

    let mut session = match cli::ChatSession::new(config) {
        Ok(session) => session,
        Err(e) => {
            display::error_panel(&e.display_message()).print();
            return ExitCode::FAILURE;
        }
    };

    if !args.prompt.is_empty() {
        // The error panel has already been shown.
        return match session.run_once(args.prompt.join(" ")).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    match session.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!("session ended with error: {e}");
            display::error_panel(&e.display_message()).print();
            ExitCode::FAILURE
        }
    }
}
