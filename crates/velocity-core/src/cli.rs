use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use velocity_shared::{TaskId, TaskPriority};

use crate::query::Filter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "velocity",
    version,
    about = "Velocity Tasks: terminal client for a task service",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the task service, e.g. http://localhost:8080
    #[arg(long = "api-url")]
    pub api_url: Option<String>,

    /// Use the in-process memory backend instead of HTTP.
    #[arg(long = "memory")]
    pub memory: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                if k.is_empty() {
                    bail!("empty key in override: {s}");
                }
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// One user action, parsed from a command line or a session input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add { title: String, priority: TaskPriority },
    Toggle(TaskId),
    Delete(TaskId),
    Filter(Filter),
    Search(String),
    Stats,
    Reload,
    Help,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list", "add", "toggle", "delete", "filter", "search", "stats", "reload", "help",
        "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

pub const HELP_TEXT: &str = "\
commands:
  list                              show the current view
  add [-p low|medium|high] <title>  create a task
  toggle <id>                       flip a task between pending and completed
  delete <id>                       remove a task (asks first)
  filter <all|pending|completed|high>
  search [text]                     narrow by title; empty clears
  stats                             counters over every task
  reload                            fetch the full list again
  help                              this text
  quit                              leave the session";

impl Command {
    pub fn parse_line(line: &str) -> anyhow::Result<Option<Self>> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return Ok(None);
        }
        Self::parse(&tokens).map(Some)
    }

    #[tracing::instrument]
    pub fn parse(tokens: &[String]) -> anyhow::Result<Self> {
        let Some((head, args)) = tokens.split_first() else {
            return Ok(Command::List);
        };

        let lowered = head.to_ascii_lowercase();
        let known = known_command_names();
        let name = match lowered.as_str() {
            "exit" | "q" => "quit",
            "ls" => "list",
            "rm" => "delete",
            "done" => "toggle",
            "?" => "help",
            other => expand_command_abbrev(other, &known)
                .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?,
        };
        debug!(token = %head, command = name, "resolved command token");

        let command = match name {
            "list" => Command::List,
            "add" => parse_add(args)?,
            "toggle" => Command::Toggle(single_id(name, args)?),
            "delete" => Command::Delete(single_id(name, args)?),
            "filter" => {
                let raw = args
                    .first()
                    .ok_or_else(|| anyhow!("filter needs one of: all, pending, completed, high"))?;
                Command::Filter(raw.parse()?)
            }
            "search" => Command::Search(args.join(" ")),
            "stats" => Command::Stats,
            "reload" => Command::Reload,
            "help" => Command::Help,
            _ => Command::Quit,
        };

        Ok(command)
    }
}

fn parse_add(args: &[String]) -> anyhow::Result<Command> {
    let mut priority = TaskPriority::Medium;
    let mut words = Vec::with_capacity(args.len());
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-p" | "--priority" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow!("{arg} needs a value"))?;
                priority = parse_priority(raw)?;
            }
            other => {
                if let Some(raw) = other.strip_prefix("priority:") {
                    priority = parse_priority(raw)?;
                } else {
                    words.push(other);
                }
            }
        }
    }

    // Blank titles are passed through; the controller owns that validation.
    Ok(Command::Add {
        title: words.join(" "),
        priority,
    })
}

fn parse_priority(raw: &str) -> anyhow::Result<TaskPriority> {
    match raw.to_ascii_lowercase().as_str() {
        "l" | "low" => Ok(TaskPriority::Low),
        "m" | "medium" => Ok(TaskPriority::Medium),
        "h" | "high" => Ok(TaskPriority::High),
        other => bail!("invalid priority: {other} (expected low, medium or high)"),
    }
}

fn single_id(command: &str, args: &[String]) -> anyhow::Result<TaskId> {
    match args {
        [id] => Ok(TaskId::new(id.clone())),
        [] => bail!("{command} needs a task id"),
        _ => bail!("{command} takes exactly one task id"),
    }
}
