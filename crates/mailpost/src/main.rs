//! `mailpost` - send a single plain-text email over SMTP.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use mailpost_core::{Error, FileLogger, Mailer, MultiLogger, Settings, TracingLogger};
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Command, SendArgs};

const DEFAULT_ENV_FILE: &str = ".env";

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,mailpost=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    match cli::parse(std::env::args().skip(1))? {
        Command::Help => {
            println!("{}", cli::USAGE);
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!("mailpost {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Command::Send(args) => send(args).await,
    }
}

async fn send(args: SendArgs) -> anyhow::Result<ExitCode> {
    let settings = load_settings(args.env_file.as_deref())?;
    debug!(endpoint = %settings.endpoint, log_dir = %settings.log_dir.display(), "configuration loaded");

    let body = match args.body {
        Some(body) => body,
        None => read_stdin().await?,
    };

    let logger = MultiLogger::new()
        .with(Arc::new(FileLogger::new(&settings.log_dir)))
        .with(Arc::new(TracingLogger));
    let mailer = Mailer::new(&settings, Arc::new(logger));

    match mailer.send(&args.from, &args.to, &args.subject, &body).await {
        Ok(_) => {
            println!("Email sent successfully!");
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::MissingFields) => {
            eprintln!("{}", Error::MissingFields);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("Failed to send email: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Uses the given file, else `.env` when present, else the process environment.
fn load_settings(env_file: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match env_file {
        Some(path) => Settings::load(path),
        None if Path::new(DEFAULT_ENV_FILE).exists() => Settings::load(DEFAULT_ENV_FILE),
        None => Settings::from_env(),
    };
    settings.context("Invalid SMTP configuration")
}

async fn read_stdin() -> anyhow::Result<String> {
    if std::io::stdin().is_terminal() {
        return Ok(String::new());
    }
    let mut body = String::new();
    tokio::io::stdin()
        .read_to_string(&mut body)
        .await
        .context("Failed to read message body from stdin")?;
    Ok(body)
}
