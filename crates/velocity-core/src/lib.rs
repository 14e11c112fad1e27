pub mod cli;
pub mod config;
pub mod controller;
pub mod datetime;
pub mod error;
pub mod notify;
pub mod presenter;
pub mod query;
pub mod render;
pub mod service;
pub mod session;
pub mod stats;

use std::ffi::OsString;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use velocity_shared::{
  NewTask,
  Task,
  TaskId,
  TaskPriority
};

use crate::cli::Command;
use crate::config::{
  Backend,
  Settings
};
use crate::controller::TaskController;
use crate::render::TerminalPresenter;
use crate::service::{
  HttpTaskService,
  MemoryTaskService,
  TaskService
};
use crate::session::{
  LineInput,
  Session
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting velocity client"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  if let Some(url) = cli.api_url {
    cfg.set("api.url", url);
  }
  if cli.memory {
    cfg.set("api.backend", "memory");
  }
  let settings = cfg.settings()?;

  let command = if cli.rest.is_empty() {
    None
  } else {
    let tokens: Vec<String> = cli
      .rest
      .iter()
      .map(|arg| {
        arg.to_string_lossy().to_string()
      })
      .collect();
    Some(Command::parse(&tokens)?)
  };

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  runtime.block_on(async move {
    match settings.backend {
      | Backend::Http => {
        let service = HttpTaskService::new(
          &settings.api_url,
          settings.api_timeout
        )?;
        info!(url = %service.base_url(), "using HTTP task service");
        start(service, &settings, command)
          .await
      }
      | Backend::Memory => {
        let service = if settings.memory_seed
        {
          MemoryTaskService::with_sample_data(
            Utc::now()
          )
        } else {
          MemoryTaskService::new()
        };
        info!(
          seeded = settings.memory_seed,
          "using in-memory task service"
        );
        start(service, &settings, command)
          .await
      }
    }
  })?;

  info!("done");
  Ok(())
}

async fn start<S: TaskService>(
  service: S,
  settings: &Settings,
  command: Option<Command>
) -> anyhow::Result<()> {
  let input = Arc::new(LineInput::stdin());
  let presenter =
    Arc::new(TerminalPresenter::new(
      settings.color,
      Arc::clone(&input)
    ));
  let controller =
    Arc::new(TaskController::new(
      service,
      presenter,
      settings.notification_ttl
    ));

  let mut session =
    Session::new(controller, input);
  match command {
    | Some(command) => {
      session.run_once(command).await
    }
    | None => {
      session.run_interactive().await
    }
  }
}
