//! Owns the local task collection and
//! keeps it, the rendered view and the
//! counters in step with what the task
//! service has acknowledged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{
  debug,
  info,
  instrument,
  warn
};
use velocity_shared::{
  NewTask,
  Task,
  TaskId,
  TaskPriority
};

use crate::error::TaskError;
use crate::notify::{
  NoticeKind,
  Notification,
  NotificationCenter
};
use crate::presenter::Presenter;
use crate::query::{
  Filter,
  ViewState
};
use crate::service::{
  ServiceError,
  TaskService
};
use crate::stats::TaskStats;

pub const EMPTY_TITLE_MESSAGE: &str =
  "Please enter a task title";
pub const DELETE_PROMPT: &str =
  "Are you sure you want to delete this \
   task?";

/// How a mutation that did not fail
/// ended.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Outcome {
  Applied,
  /// No local task with that id; nothing
  /// was sent.
  NotFound,
  /// The user said no at the
  /// confirmation step.
  Declined,
  /// The service accepted the request
  /// but a newer request for the same
  /// task was issued meanwhile, so this
  /// response was not applied.
  Stale
}

#[derive(Debug, Clone, Copy)]
enum Operation {
  Load,
  Add,
  Update,
  Delete
}

impl Operation {
  fn failure_message(
    self,
    err: &ServiceError
  ) -> &'static str {
    match (self, err.is_transport()) {
      | (Operation::Load, false) => {
        "Failed to load tasks"
      }
      | (Operation::Load, true) => {
        "Error loading tasks"
      }
      | (Operation::Add, false) => {
        "Failed to add task"
      }
      | (Operation::Add, true) => {
        "Error adding task"
      }
      | (Operation::Update, false) => {
        "Failed to update task"
      }
      | (Operation::Update, true) => {
        "Error updating task"
      }
      | (Operation::Delete, false) => {
        "Failed to delete task"
      }
      | (Operation::Delete, true) => {
        "Error deleting task"
      }
    }
  }
}

#[derive(Debug, Default)]
struct SessionState {
  tasks:    Vec<Task>,
  view:     ViewState,
  /// Latest sequence number issued per
  /// task; absent once that request has
  /// resolved.
  issued:   HashMap<TaskId, u64>,
  next_seq: u64,
  loading:  usize
}

impl SessionState {
  fn issue(
    &mut self,
    id: &TaskId
  ) -> u64 {
    self.next_seq += 1;
    self
      .issued
      .insert(id.clone(), self.next_seq);
    self.next_seq
  }

  /// Retires `seq`; `true` if it was
  /// still the newest request for `id`.
  fn settle(
    &mut self,
    id: &TaskId,
    seq: u64
  ) -> bool {
    if self.issued.get(id) == Some(&seq)
    {
      self.issued.remove(id);
      true
    } else {
      false
    }
  }

  fn position(
    &self,
    id: &TaskId
  ) -> Option<usize> {
    self
      .tasks
      .iter()
      .position(|t| &t.id == id)
  }
}

/// Shows the loading indicator while at
/// least one guard is alive.
struct LoadingGuard<'a, P: Presenter> {
  state:     &'a Mutex<SessionState>,
  presenter: &'a P
}

impl<'a, P: Presenter> LoadingGuard<'a, P> {
  fn begin(
    state: &'a Mutex<SessionState>,
    presenter: &'a P
  ) -> Self {
    let first = {
      let mut state = state.lock();
      state.loading += 1;
      state.loading == 1
    };
    if first {
      presenter.set_loading(true);
    }
    Self { state, presenter }
  }
}

impl<P: Presenter> Drop
  for LoadingGuard<'_, P>
{
  fn drop(&mut self) {
    let last = {
      let mut state = self.state.lock();
      state.loading =
        state.loading.saturating_sub(1);
      state.loading == 0
    };
    if last {
      self.presenter.set_loading(false);
    }
  }
}

pub struct TaskController<S, P> {
  service:   S,
  presenter: Arc<P>,
  notices:   Arc<NotificationCenter>,
  state:     Mutex<SessionState>
}

impl<S, P> TaskController<S, P>
where
  S: TaskService,
  P: Presenter
{
  pub fn new(
    service: S,
    presenter: Arc<P>,
    notification_ttl: Duration
  ) -> Self {
    Self {
      service,
      presenter,
      notices: Arc::new(
        NotificationCenter::new(
          notification_ttl
        )
      ),
      state: Mutex::new(
        SessionState::default()
      )
    }
  }

  pub fn presenter(&self) -> &Arc<P> {
    &self.presenter
  }

  pub fn tasks(&self) -> Vec<Task> {
    self.state.lock().tasks.clone()
  }

  pub fn view(&self) -> ViewState {
    self.state.lock().view.clone()
  }

  /// The filtered and searched view, in
  /// collection order.
  pub fn visible(&self) -> Vec<Task> {
    let state = self.state.lock();
    state.view.apply(&state.tasks)
  }

  pub fn stats(&self) -> TaskStats {
    TaskStats::from_tasks(
      &self.state.lock().tasks
    )
  }

  pub fn notifications(
    &self
  ) -> Vec<Notification> {
    self.notices.active()
  }

  pub fn is_loading(&self) -> bool {
    self.state.lock().loading > 0
  }

  #[instrument(skip(self))]
  pub fn set_filter(
    &self,
    filter: Filter
  ) {
    self.state.lock().view.set_filter(filter);
    self.presenter.set_active_filter(filter);
    self.render();
  }

  #[instrument(skip(self))]
  pub fn set_search(&self, raw: &str) {
    self.state.lock().view.set_search(raw);
    self.render();
  }

  /// Re-renders the view and the
  /// counters from current state.
  pub fn refresh(&self) {
    self.render();
    self.presenter.update_stats(
      &self.stats()
    );
  }

  fn render(&self) {
    let visible = self.visible();
    self.presenter.render_tasks(&visible);
    self
      .presenter
      .set_empty_state(visible.is_empty());
  }

  pub fn notify(
    &self,
    kind: NoticeKind,
    message: &str
  ) {
    let pushed =
      self.notices.push(kind, message);
    if let Some(evicted) = pushed.evicted
    {
      self
        .presenter
        .dismiss_notification(evicted.id);
    }
    self
      .presenter
      .show_notification(&pushed.notice);
    self.notices.schedule_expiry(
      Arc::clone(&self.presenter),
      &pushed.notice
    );
  }

  fn fail(
    &self,
    op: Operation,
    err: ServiceError
  ) -> TaskError {
    warn!(error = %err, ?op, "task service call failed");
    self.notify(
      NoticeKind::Error,
      op.failure_message(&err)
    );
    TaskError::Service(err)
  }

  /// Replaces the whole collection with
  /// what the service holds.
  #[instrument(skip(self))]
  pub async fn load(
    &self
  ) -> Result<usize, TaskError> {
    let _loading = LoadingGuard::begin(
      &self.state,
      self.presenter.as_ref()
    );

    match self.service.list().await {
      | Ok(tasks) => {
        let count = tasks.len();
        self.state.lock().tasks = tasks;
        info!(count, "loaded tasks");
        self.refresh();
        Ok(count)
      }
      | Err(err) => {
        Err(self.fail(Operation::Load, err))
      }
    }
  }

  #[instrument(skip(self), fields(title_len = title.len()))]
  pub async fn add(
    &self,
    title: &str,
    priority: TaskPriority
  ) -> Result<Task, TaskError> {
    let title = title.trim();
    if title.is_empty() {
      debug!("rejecting blank title");
      self.notify(
        NoticeKind::Error,
        EMPTY_TITLE_MESSAGE
      );
      return Err(TaskError::Validation(
        EMPTY_TITLE_MESSAGE.to_string()
      ));
    }

    let draft = NewTask::pending(
      title,
      priority,
      Utc::now()
    );
    let _loading = LoadingGuard::begin(
      &self.state,
      self.presenter.as_ref()
    );

    match self.service.create(&draft).await
    {
      | Ok(task) => {
        info!(id = %task.id, "task added");
        self
          .state
          .lock()
          .tasks
          .insert(0, task.clone());
        self.refresh();
        self.notify(
          NoticeKind::Success,
          "Task added successfully!"
        );
        Ok(task)
      }
      | Err(err) => {
        Err(self.fail(Operation::Add, err))
      }
    }
  }

  /// Flips `completed` on the service and,
  /// once acknowledged, on the local copy.
  #[instrument(skip(self), fields(id = %id))]
  pub async fn toggle(
    &self,
    id: &TaskId
  ) -> Result<Outcome, TaskError> {
    let (request, seq) = {
      let mut state = self.state.lock();
      let Some(idx) = state.position(id)
      else {
        debug!("toggle for unknown task ignored");
        return Ok(Outcome::NotFound);
      };
      let mut request =
        state.tasks[idx].clone();
      request.completed =
        !request.completed;
      let seq = state.issue(id);
      (request, seq)
    };

    let result =
      self.service.update(&request).await;

    let applied = {
      let mut state = self.state.lock();
      let latest = state.settle(id, seq);
      match (&result, latest) {
        | (Ok(()), true) => state
          .position(id)
          .map(|idx| {
            let task = &mut state.tasks[idx];
            task.completed = request.completed;
            task.completed
          }),
        | _ => None
      }
    };

    if let Err(err) = result {
      return Err(
        self.fail(Operation::Update, err)
      );
    }

    match applied {
      | Some(completed) => {
        info!(completed, "task toggled");
        self.refresh();
        self.notify(
          NoticeKind::Success,
          if completed {
            "Task completed!"
          } else {
            "Task reopened!"
          }
        );
        Ok(Outcome::Applied)
      }
      | None => {
        debug!(
          seq,
          "discarding stale toggle \
           response"
        );
        Ok(Outcome::Stale)
      }
    }
  }

  /// Removes a task after the user
  /// confirms and the service agrees.
  #[instrument(skip(self), fields(id = %id))]
  pub async fn delete(
    &self,
    id: &TaskId
  ) -> Result<Outcome, TaskError> {
    if !self
      .presenter
      .confirm(DELETE_PROMPT)
      .await
    {
      debug!("delete declined");
      return Ok(Outcome::Declined);
    }

    let seq = self.state.lock().issue(id);
    let result = self.service.delete(id).await;

    let removed = {
      let mut state = self.state.lock();
      state.settle(id, seq);
      match result {
        | Ok(()) => state
          .position(id)
          .map(|idx| state.tasks.remove(idx))
          .is_some(),
        | Err(_) => false
      }
    };

    if let Err(err) = result {
      return Err(
        self.fail(Operation::Delete, err)
      );
    }

    if removed {
      info!("task deleted");
      self.refresh();
      self.notify(
        NoticeKind::Success,
        "Task deleted successfully!"
      );
      Ok(Outcome::Applied)
    } else {
      debug!(
        "task already gone locally; \
         nothing to remove"
      );
      Ok(Outcome::Stale)
    }
  }
}
