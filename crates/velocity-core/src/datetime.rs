use chrono::{
  DateTime,
  Local,
  TimeZone,
  Utc
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days between two instants,
/// regardless of which one is later.
#[must_use]
pub fn days_between(
  a: DateTime<Utc>,
  b: DateTime<Utc>
) -> i64 {
  (a - b).num_seconds().abs()
    / SECONDS_PER_DAY
}

/// Age label shown next to a task:
/// `Today`, `Yesterday`, `N days ago`,
/// or the calendar date in the local
/// timezone once a week has passed.
#[must_use]
pub fn relative_age_label(
  created: DateTime<Utc>,
  now: DateTime<Utc>
) -> String {
  relative_age_label_in(
    created, now, &Local
  )
}

#[must_use]
pub fn relative_age_label_in<Tz>(
  created: DateTime<Utc>,
  now: DateTime<Utc>,
  tz: &Tz
) -> String
where
  Tz: TimeZone,
  Tz::Offset: std::fmt::Display
{
  match days_between(now, created) {
    | 0 => "Today".to_string(),
    | 1 => "Yesterday".to_string(),
    | days if days < 7 => {
      format!("{days} days ago")
    }
    | _ => created
      .with_timezone(tz)
      .format("%Y-%m-%d")
      .to_string()
  }
}
