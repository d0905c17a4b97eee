//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{Context, bail};

pub const USAGE: &str = "\
Usage: mailpost --from <ADDRESS> --to <ADDRESS> --subject <TEXT> [--body <TEXT>] [--env-file <PATH>]

Sends one plain-text email through the SMTP server configured in .env
(or the process environment).

Options:
  -f, --from <ADDRESS>    Sender address
  -t, --to <ADDRESS>      Recipient address
  -s, --subject <TEXT>    Subject line
  -b, --body <TEXT>       Message body (read from stdin when omitted)
  -e, --env-file <PATH>   Configuration file [default: .env if present]
  -h, --help              Print this help
  -V, --version           Print version";

/// What the user asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Send(SendArgs),
}

/// Fields for one message. Missing fields stay empty so that the mailer
/// reports them uniformly.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SendArgs {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: Option<String>,
    pub env_file: Option<PathBuf>,
}

/// Parses arguments (program name already skipped).
pub fn parse<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut send = SendArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg, None),
        };

        match flag.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-f" | "--from" => send.from = value(&flag, inline, &mut args)?,
            "-t" | "--to" => send.to = value(&flag, inline, &mut args)?,
            "-s" | "--subject" => send.subject = value(&flag, inline, &mut args)?,
            "-b" | "--body" => send.body = Some(value(&flag, inline, &mut args)?),
            "-e" | "--env-file" => send.env_file = Some(value(&flag, inline, &mut args)?.into()),
            other => bail!("unexpected argument '{other}'\n\n{USAGE}"),
        }
    }

    Ok(Command::Send(send))
}

fn value(
    flag: &str,
    inline: Option<String>,
    rest: &mut impl Iterator<Item = String>,
) -> anyhow::Result<String> {
    match inline {
        Some(value) => Ok(value),
        None => rest
            .next()
            .with_context(|| format!("{flag} requires a value")),
    }
}
