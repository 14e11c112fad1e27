use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::trace;
use velocity_shared::{
  Task,
  TaskPriority
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
pub enum Filter {
  #[default]
  All,
  Pending,
  Completed,
  High
}

#[derive(Debug, Error)]
#[error(
  "unknown filter: {0} (expected all, \
   pending, completed or high)"
)]
pub struct UnknownFilter(String);

impl Filter {
  pub const ALL: [Filter; 4] = [
    Filter::All,
    Filter::Pending,
    Filter::Completed,
    Filter::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | Filter::All => "all",
      | Filter::Pending => "pending",
      | Filter::Completed => "completed",
      | Filter::High => "high"
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Filter::All => true,
      | Filter::Pending => !task.completed,
      | Filter::Completed => {
        task.completed
      }
      | Filter::High => {
        task.priority
          == TaskPriority::High
      }
    }
  }
}

impl fmt::Display for Filter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Filter {
  type Err = UnknownFilter;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Filter::All),
      | "pending" | "open" => {
        Ok(Filter::Pending)
      }
      | "completed" | "done" => {
        Ok(Filter::Completed)
      }
      | "high" => Ok(Filter::High),
      | _ => {
        Err(UnknownFilter(s.to_string()))
      }
    }
  }
}

/// Active filter plus the lowercased
/// search text.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ViewState {
  filter: Filter,
  search: String
}

impl ViewState {
  pub fn filter(&self) -> Filter {
    self.filter
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn set_filter(
    &mut self,
    filter: Filter
  ) {
    self.filter = filter;
  }

  pub fn set_search(
    &mut self,
    raw: &str
  ) {
    self.search = raw.to_lowercase();
  }

  pub fn apply(
    &self,
    tasks: &[Task]
  ) -> Vec<Task> {
    visible_tasks(
      tasks,
      self.filter,
      &self.search
    )
  }
}

pub fn matches_search(
  task: &Task,
  search: &str
) -> bool {
  search.is_empty()
    || task
      .title
      .to_lowercase()
      .contains(search)
}

/// Ordered subsequence of `tasks` that
/// passes both the filter and the search.
/// `search` must already be lowercased.
pub fn visible_tasks(
  tasks: &[Task],
  filter: Filter,
  search: &str
) -> Vec<Task> {
  let visible: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      filter.matches(task)
        && matches_search(task, search)
    })
    .cloned()
    .collect();

  trace!(
    total = tasks.len(),
    visible = visible.len(),
    filter = %filter,
    search,
    "recomputed visible tasks"
  );
  visible
}
