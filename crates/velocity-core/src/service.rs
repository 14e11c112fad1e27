//! The remote task collection the client
//! mirrors.

pub mod http;
pub mod memory;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use velocity_shared::{
  NewTask,
  Task,
  TaskId
};

pub use http::HttpTaskService;
pub use memory::MemoryTaskService;

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum ServiceError {
  /// The service answered, but not with
  /// success.
  #[error(
    "task service answered HTTP \
     {status}: {message}"
  )]
  Status { status: u16, message: String },

  #[error(
    "could not decode task service \
     response: {0}"
  )]
  Decode(String),

  /// The request never got an answer.
  #[error("task service unreachable: {0}")]
  Transport(String)
}

impl ServiceError {
  pub fn is_transport(&self) -> bool {
    matches!(self, Self::Transport(_))
  }

  pub fn not_found() -> Self {
    Self::Status {
      status:  404,
      message: "Task not found"
        .to_string()
    }
  }
}

pub trait TaskService:
  Send + Sync + 'static
{
  fn list(
    &self
  ) -> impl Future<
    Output = Result<Vec<Task>, ServiceError>
  > + Send;

  fn create(
    &self,
    task: &NewTask
  ) -> impl Future<
    Output = Result<Task, ServiceError>
  > + Send;

  /// Replaces the record stored under
  /// `task.id`.
  fn update(
    &self,
    task: &Task
  ) -> impl Future<
    Output = Result<(), ServiceError>
  > + Send;

  fn delete(
    &self,
    id: &TaskId
  ) -> impl Future<
    Output = Result<(), ServiceError>
  > + Send;
}

impl<S: TaskService> TaskService
  for Arc<S>
{
  fn list(
    &self
  ) -> impl Future<
    Output = Result<Vec<Task>, ServiceError>
  > + Send {
    S::list(self)
  }

  fn create(
    &self,
    task: &NewTask
  ) -> impl Future<
    Output = Result<Task, ServiceError>
  > + Send {
    S::create(self, task)
  }

  fn update(
    &self,
    task: &Task
  ) -> impl Future<
    Output = Result<(), ServiceError>
  > + Send {
    S::update(self, task)
  }

  fn delete(
    &self,
    id: &TaskId
  ) -> impl Future<
    Output = Result<(), ServiceError>
  > + Send {
    S::delete(self, id)
  }
}
