use chrono::{
  DateTime,
  Duration,
  Utc
};
use parking_lot::Mutex;
use tracing::{
  debug,
  instrument
};
use uuid::Uuid;
use velocity_shared::{
  NewTask,
  Task,
  TaskId,
  TaskPriority
};

use super::{
  ServiceError,
  TaskService
};

/// In-process task store with the same
/// observable behavior as the REST
/// service: server-assigned UUIDs,
/// newest-first listing, 400 for blank
/// titles and 404 for unknown ids.
#[derive(Debug, Default)]
pub struct MemoryTaskService {
  tasks: Mutex<Vec<Task>>
}

impl MemoryTaskService {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_tasks(
    tasks: Vec<Task>
  ) -> Self {
    Self {
      tasks: Mutex::new(tasks)
    }
  }

  /// The three welcome tasks a fresh
  /// service starts with.
  pub fn with_sample_data(
    now: DateTime<Utc>
  ) -> Self {
    let samples = [
      (
        "Welcome to VelocityTasks! 🚀",
        TaskPriority::High
      ),
      (
        "Create your first real task",
        TaskPriority::Medium
      ),
      (
        "Explore the features",
        TaskPriority::Low
      )
    ];

    let tasks = samples
      .into_iter()
      .enumerate()
      .map(|(idx, (title, priority))| {
        let created = now
          + Duration::seconds(idx as i64);
        Task {
          id: fresh_id(),
          title: title.to_string(),
          priority,
          completed: false,
          created_at: created,
          updated_at: Some(created)
        }
      })
      .collect();

    Self::with_tasks(tasks)
  }

  pub fn snapshot(&self) -> Vec<Task> {
    newest_first(&self.tasks.lock())
  }

  pub fn len(&self) -> usize {
    self.tasks.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.lock().is_empty()
  }
}

fn fresh_id() -> TaskId {
  TaskId::new(Uuid::new_v4().to_string())
}

fn newest_first(
  tasks: &[Task]
) -> Vec<Task> {
  let mut sorted = tasks.to_vec();
  sorted.sort_by(|a, b| {
    b.created_at.cmp(&a.created_at)
  });
  sorted
}

fn bad_request(
  message: &str
) -> ServiceError {
  ServiceError::Status {
    status:  400,
    message: message.to_string()
  }
}

impl TaskService for MemoryTaskService {
  #[instrument(skip(self))]
  async fn list(
    &self
  ) -> Result<Vec<Task>, ServiceError> {
    Ok(self.snapshot())
  }

  #[instrument(skip(self, task), fields(title_len = task.title.len()))]
  async fn create(
    &self,
    task: &NewTask
  ) -> Result<Task, ServiceError> {
    let title = task.title.trim();
    if title.is_empty() {
      return Err(bad_request(
        "Task title is required"
      ));
    }

    let created = Task {
      id:         fresh_id(),
      title:      title.to_string(),
      priority:   task.priority,
      completed:  task.completed,
      created_at: task.created_at,
      updated_at: Some(Utc::now())
    };
    debug!(id = %created.id, "stored new task");
    self.tasks.lock().push(created.clone());
    Ok(created)
  }

  #[instrument(skip(self, task), fields(id = %task.id))]
  async fn update(
    &self,
    task: &Task
  ) -> Result<(), ServiceError> {
    let mut tasks = self.tasks.lock();
    let existing = tasks
      .iter_mut()
      .find(|t| t.id == task.id)
      .ok_or_else(ServiceError::not_found)?;

    if !task.title.trim().is_empty() {
      existing.title = task.title.clone();
    }
    existing.priority = task.priority;
    existing.completed = task.completed;
    existing.updated_at = Some(Utc::now());
    Ok(())
  }

  #[instrument(skip(self), fields(id = %id))]
  async fn delete(
    &self,
    id: &TaskId
  ) -> Result<(), ServiceError> {
    let mut tasks = self.tasks.lock();
    let before = tasks.len();
    tasks.retain(|t| &t.id != id);
    if tasks.len() == before {
      return Err(ServiceError::not_found());
    }
    Ok(())
  }
}
