use std::future::Future;

use velocity_shared::Task;

use crate::notify::{
  Notification,
  NotificationId
};
use crate::query::Filter;
use crate::stats::TaskStats;

/// Whatever shows the task list to the
/// user. The controller only ever tells it
/// what to display; it never reads back.
pub trait Presenter:
  Send + Sync + 'static
{
  /// Replaces the visible list.
  fn render_tasks(&self, tasks: &[Task]);

  fn set_empty_state(&self, visible: bool);

  fn set_loading(&self, visible: bool);

  fn show_notification(
    &self,
    notice: &Notification
  );

  fn dismiss_notification(
    &self,
    id: NotificationId
  );

  fn set_active_filter(
    &self,
    filter: Filter
  );

  fn update_stats(
    &self,
    stats: &TaskStats
  );

  /// Yes/no question; `false` aborts
  /// whatever asked.
  fn confirm(
    &self,
    prompt: &str
  ) -> impl Future<Output = bool> + Send;
}
