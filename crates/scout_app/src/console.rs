//! Line-oriented command surface over a [`TaskDesk`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use scout_core::FormFieldMap;
use scout_engine::{HeaderKey, TaskAccess, TaskDesk};
use scout_logging::{scout_error, scout_warn};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Status,
    Poll,
    Cookie(String),
    Header(HeaderKey, String),
    Access(String),
    Reference(Option<PathBuf>),
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  start              start polling the listing every interval
  stop               stop polling
  status             show whether polling is running
  poll               fetch and print the listing once
  cookie <value>     replace the session cookie
  header <name> <v>  replace one browser header (e.g. `header accept-language de-DE`)
  access <link>      scrape the edit form behind <link>
  reference <file>   load a JSON reference submission (`reference clear` to drop it)
  quit";

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word.to_ascii_lowercase().as_str(), rest) {
        ("start", "") => Ok(Command::Start),
        ("stop", "") => Ok(Command::Stop),
        ("status", "") => Ok(Command::Status),
        ("poll", "") => Ok(Command::Poll),
        ("help" | "?", _) => Ok(Command::Help),
        ("quit" | "exit", _) => Ok(Command::Quit),
        ("cookie", value) if !value.is_empty() => Ok(Command::Cookie(value.to_string())),
        ("access", link) if !link.is_empty() => Ok(Command::Access(link.to_string())),
        ("reference", "clear") => Ok(Command::Reference(None)),
        ("reference", path) if !path.is_empty() => {
            Ok(Command::Reference(Some(PathBuf::from(path))))
        }
        ("header", args) if !args.is_empty() => parse_header(args),
        ("cookie" | "access" | "reference" | "header", _) => {
            Err(format!("`{word}` needs an argument"))
        }
        _ => Err(format!("unknown command `{line}`; try `help`")),
    }
}

fn parse_header(args: &str) -> Result<Command, String> {
    let (name, value) = match args.split_once(char::is_whitespace) {
        Some((name, value)) => (name, value.trim()),
        None => (args, ""),
    };
    let key = HeaderKey::from_name(name).ok_or_else(|| format!("unknown header `{name}`"))?;
    if value.is_empty() {
        return Err(format!("`header {}` needs a value", key.as_str()));
    }
    Ok(Command::Header(key, value.to_string()))
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(desk: &TaskDesk) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => println!("{}", execute(desk, command).await),
            Err(message) => println!("{message}"),
        }
    }
    if desk.is_polling() {
        desk.stop_polling();
    }
    Ok(())
}

/// Runs one command and renders its reply.
pub async fn execute(desk: &TaskDesk, command: Command) -> String {
    match command {
        Command::Start => desk.start_polling().to_string(),
        Command::Stop => desk.stop_polling().to_string(),
        Command::Status => {
            let status = if desk.is_polling() { "running" } else { "idle" };
            status.to_string()
        }
        Command::Poll => match desk.poll_once().await {
            Ok(records) => to_json(&records),
            Err(err) => {
                scout_error!("Poll failed: {}", err);
                "null".to_string()
            }
        },
        Command::Cookie(value) => {
            desk.update_credential(value);
            "Cookie updated successfully".to_string()
        }
        Command::Header(key, value) => {
            desk.credentials().set(key, value);
            format!("Header {} updated", key.as_str())
        }
        Command::Access(link) => match desk.access_task(&link).await {
            Ok(access) => render_access(&access),
            Err(err) => {
                scout_warn!("Access to {} failed: {}", link, err);
                "null".to_string()
            }
        },
        Command::Reference(None) => {
            desk.set_reference(None);
            "Reference cleared".to_string()
        }
        Command::Reference(Some(path)) => match load_reference(&path) {
            Ok(reference) => {
                let count = reference.len();
                desk.set_reference(Some(reference));
                format!("Reference loaded ({count} fields)")
            }
            Err(err) => format!("{err:#}"),
        },
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

/// With a reference loaded the drift report is shown, otherwise the fields.
fn render_access(access: &TaskAccess) -> String {
    match &access.drift {
        Some(report) => to_json(report),
        None => to_json(&access.fields),
    }
}

pub fn load_reference(path: &Path) -> anyhow::Result<FormFieldMap> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading reference {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!("reference {} is not a flat JSON object of strings", path.display())
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}
