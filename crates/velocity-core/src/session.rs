//! Terminal session: turns input lines
//! into controller calls.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{
  AsyncBufRead,
  AsyncBufReadExt,
  BufReader,
  Lines
};
use tokio::task::{
  JoinError,
  JoinSet
};
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::cli::{
  Command,
  HELP_TEXT
};
use crate::controller::TaskController;
use crate::render::TerminalPresenter;
use crate::service::TaskService;

type Reader =
  Box<dyn AsyncBufRead + Send + Unpin>;

/// How long leaving a session waits for
/// in-flight requests before abandoning
/// them.
pub const SHUTDOWN_GRACE: Duration =
  Duration::from_millis(500);

/// Line source shared by the command
/// loop and confirmation prompts. Only
/// one reader holds it at a time.
pub struct LineInput {
  lines: tokio::sync::Mutex<Lines<Reader>>
}

impl LineInput {
  pub fn stdin() -> Self {
    Self::from_reader(BufReader::new(
      tokio::io::stdin()
    ))
  }

  pub fn from_reader<R>(reader: R) -> Self
  where
    R: AsyncBufRead
      + Send
      + Unpin
      + 'static
  {
    let reader: Reader = Box::new(reader);
    Self {
      lines: tokio::sync::Mutex::new(
        reader.lines()
      )
    }
  }

  pub async fn next_line(
    &self
  ) -> io::Result<Option<String>> {
    self.lines.lock().await.next_line().await
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Flow {
  Continue,
  Quit
}

pub type TerminalController<S> =
  TaskController<S, TerminalPresenter>;

pub struct Session<S: TaskService> {
  controller: Arc<TerminalController<S>>,
  input:      Arc<LineInput>,
  in_flight:  JoinSet<()>
}

impl<S: TaskService> Session<S> {
  pub fn new(
    controller: Arc<TerminalController<S>>,
    input: Arc<LineInput>
  ) -> Self {
    Self {
      controller,
      input,
      in_flight: JoinSet::new()
    }
  }

  pub fn controller(
    &self
  ) -> &Arc<TerminalController<S>> {
    &self.controller
  }

  /// Runs one command to completion,
  /// e.g. from the process arguments.
  #[instrument(skip(self))]
  pub async fn run_once(
    &mut self,
    command: Command
  ) -> anyhow::Result<()> {
    self
      .controller
      .load()
      .await
      .context("initial load failed")?;

    if command != Command::List {
      self.execute(command).await;
    }
    self.drain().await;
    Ok(())
  }

  /// Reads commands until `quit`, end of
  /// input, or Ctrl-C.
  #[instrument(skip(self))]
  pub async fn run_interactive(
    &mut self
  ) -> anyhow::Result<()> {
    self.spawn_load();
    self
      .controller
      .presenter()
      .print("type `help` for commands");

    loop {
      let line = tokio::select! {
        line = self.input.next_line() => line.context("failed reading input")?,
        _ = tokio::signal::ctrl_c() => {
          warn!("received interrupt; leaving session");
          break;
        }
      };

      let Some(line) = line else {
        debug!("input closed");
        break;
      };

      match Command::parse_line(&line) {
        | Ok(Some(command)) => {
          if self.execute(command).await
            == Flow::Quit
          {
            break;
          }
        }
        | Ok(None) => {}
        | Err(err) => self
          .controller
          .presenter()
          .print(&format!("{err:#}"))
      }
      self.reap();
    }

    self.shut_down().await;
    info!("session finished");
    Ok(())
  }

  /// Add, toggle and reload run in the
  /// background so several can be in
  /// flight; delete is awaited because
  /// its confirmation reads the same
  /// input as the command loop.
  #[instrument(skip(self))]
  pub async fn execute(
    &mut self,
    command: Command
  ) -> Flow {
    let controller =
      Arc::clone(&self.controller);
    match command {
      | Command::List => {
        controller.refresh()
      }
      | Command::Add { title, priority } => {
        self.in_flight.spawn(async move {
          if let Err(err) = controller
            .add(&title, priority)
            .await
          {
            debug!(error = %err, "add did not complete");
          }
        });
      }
      | Command::Toggle(id) => {
        self.in_flight.spawn(async move {
          if let Err(err) =
            controller.toggle(&id).await
          {
            debug!(error = %err, "toggle did not complete");
          }
        });
      }
      | Command::Delete(id) => {
        if let Err(err) =
          controller.delete(&id).await
        {
          debug!(error = %err, "delete did not complete");
        }
      }
      | Command::Filter(filter) => {
        controller.set_filter(filter)
      }
      | Command::Search(text) => {
        controller.set_search(&text)
      }
      | Command::Stats => {
        controller
          .presenter()
          .print_stats_breakdown(
            &controller.stats()
          )
      }
      | Command::Reload => {
        self.spawn_load()
      }
      | Command::Help => {
        controller
          .presenter()
          .print(HELP_TEXT)
      }
      | Command::Quit => {
        return Flow::Quit;
      }
    }
    Flow::Continue
  }

  fn spawn_load(&mut self) {
    let controller =
      Arc::clone(&self.controller);
    self.in_flight.spawn(async move {
      if let Err(err) =
        controller.load().await
      {
        debug!(error = %err, "load did not complete");
      }
    });
  }

  fn reap(&mut self) {
    while let Some(joined) =
      self.in_flight.try_join_next()
    {
      report_joined(joined);
    }
  }

  async fn drain(&mut self) {
    while let Some(joined) =
      self.in_flight.join_next().await
    {
      report_joined(joined);
    }
  }

  /// Gives in-flight requests a short
  /// grace period, then aborts whatever
  /// is left. Ctrl-C ends the wait early.
  async fn shut_down(&mut self) {
    if self.in_flight.is_empty() {
      return;
    }

    let finished = tokio::select! {
      drained = tokio::time::timeout(SHUTDOWN_GRACE, self.drain()) => drained.is_ok(),
      _ = tokio::signal::ctrl_c() => false
    };

    if !finished {
      warn!(
        pending = self.in_flight.len(),
        "abandoning unfinished requests"
      );
      self.in_flight.abort_all();
      self.drain().await;
    }
  }
}

fn report_joined(
  joined: Result<(), JoinError>
) {
  match joined {
    | Err(err) if err.is_cancelled() => {
      debug!("background task cancelled");
    }
    | Err(err) => {
      warn!(error = %err, "background task failed");
    }
    | Ok(()) => {}
  }
}
