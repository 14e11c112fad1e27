use serde::Serialize;
use velocity_shared::{
  Task,
  TaskPriority
};

/// Counters over the whole collection,
/// never the filtered view.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct TaskStats {
  pub total:     usize,
  pub completed: usize,
  pub pending:   usize,
  pub high:      usize,
  pub medium:    usize,
  pub low:       usize
}

impl TaskStats {
  pub fn from_tasks(
    tasks: &[Task]
  ) -> Self {
    let mut stats = TaskStats {
      total: tasks.len(),
      ..TaskStats::default()
    };

    for task in tasks {
      if task.completed {
        stats.completed += 1;
      }
      match task.priority {
        | TaskPriority::High => {
          stats.high += 1
        }
        | TaskPriority::Medium => {
          stats.medium += 1
        }
        | TaskPriority::Low => {
          stats.low += 1
        }
      }
    }

    stats.pending =
      stats.total - stats.completed;
    stats
  }

  pub fn by_priority(
    &self,
    priority: TaskPriority
  ) -> usize {
    match priority {
      | TaskPriority::High => self.high,
      | TaskPriority::Medium => {
        self.medium
      }
      | TaskPriority::Low => self.low
    }
  }
}
