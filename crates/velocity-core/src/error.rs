use thiserror::Error;

use crate::service::ServiceError;

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum TaskError {
  /// Rejected locally; nothing was sent.
  #[error("{0}")]
  Validation(String),

  #[error(transparent)]
  Service(#[from] ServiceError)
}

impl TaskError {
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation(_))
  }
}
