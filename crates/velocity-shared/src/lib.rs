//! Wire types shared between the task
//! service and its clients.

use std::fmt;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

pub mod timestamp;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TaskId {
  fn from(raw: &str) -> Self {
    Self(raw.to_string())
  }
}

impl From<String> for TaskId {
  fn from(raw: String) -> Self {
    Self(raw)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 3] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::Low => "LOW",
      | TaskPriority::Medium => "MEDIUM",
      | TaskPriority::High => "HIGH"
    }
  }

  pub fn display_name(
    self
  ) -> &'static str {
    match self {
      | TaskPriority::Low => {
        "Low Priority"
      }
      | TaskPriority::Medium => {
        "Medium Priority"
      }
      | TaskPriority::High => {
        "High Priority"
      }
    }
  }

  /// Case-insensitive lookup; anything
  /// unrecognised falls back to
  /// `Medium`.
  pub fn parse_lenient(
    raw: &str
  ) -> Self {
    match raw
      .trim()
      .to_ascii_uppercase()
      .as_str()
    {
      | "LOW" => TaskPriority::Low,
      | "HIGH" => TaskPriority::High,
      | _ => TaskPriority::Medium
    }
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl<'de> Deserialize<'de>
  for TaskPriority
{
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      Option::<String>::deserialize(
        deserializer
      )?;
    Ok(
      raw
        .as_deref()
        .map(TaskPriority::parse_lenient)
        .unwrap_or_default()
    )
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id:         TaskId,
  pub title:      String,
  #[serde(default)]
  pub priority:   TaskPriority,
  #[serde(default)]
  pub completed:  bool,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(
    default,
    with = "timestamp::option",
    skip_serializing_if = "Option::is_none"
  )]
  pub updated_at:
    Option<DateTime<Utc>>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
  pub title:      String,
  pub priority:   TaskPriority,
  pub completed:  bool,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>
}

impl NewTask {
  pub fn pending(
    title: impl Into<String>,
    priority: TaskPriority,
    created_at: DateTime<Utc>
  ) -> Self {
    Self {
      title: title.into(),
      priority,
      completed: false,
      created_at
    }
  }
}

/// Body the service sends alongside a
/// non-success status.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ErrorBody {
  pub error:     String,
  #[serde(default)]
  pub status:    Option<u16>,
  #[serde(default)]
  pub timestamp: Option<i64>
}
