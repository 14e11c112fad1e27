//! Transient user feedback.
//!
//! Every notification carries its own
//! expiry deadline and gets its own timer
//! task; the timer removes it no matter
//! what else happens in the meantime.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{
  debug,
  trace
};

use crate::presenter::Presenter;

const MAX_ACTIVE: usize = 5;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct NotificationId(u64);

impl fmt::Display for NotificationId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum NoticeKind {
  Success,
  Error,
  Info
}

impl NoticeKind {
  pub fn as_str(self) -> &'static str {
    match self {
      | NoticeKind::Success => "success",
      | NoticeKind::Error => "error",
      | NoticeKind::Info => "info"
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub id:         NotificationId,
  pub kind:       NoticeKind,
  pub message:    String,
  pub expires_at: Instant
}

#[derive(Debug)]
struct Queue {
  next_id: u64,
  active:  VecDeque<Notification>
}

#[derive(Debug)]
pub struct NotificationCenter {
  ttl:   Duration,
  queue: Mutex<Queue>
}

/// Result of a push: the new entry plus
/// whatever fell off the front of a full
/// queue.
#[derive(Debug, Clone)]
pub struct Pushed {
  pub notice:  Notification,
  pub evicted: Option<Notification>
}

impl NotificationCenter {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      queue: Mutex::new(Queue {
        next_id: 1,
        active:  VecDeque::new()
      })
    }
  }

  pub fn push(
    &self,
    kind: NoticeKind,
    message: impl Into<String>
  ) -> Pushed {
    let mut queue = self.queue.lock();
    let id = NotificationId(queue.next_id);
    queue.next_id += 1;

    let notice = Notification {
      id,
      kind,
      message: message.into(),
      expires_at: Instant::now() + self.ttl
    };

    let evicted =
      if queue.active.len() >= MAX_ACTIVE {
        queue.active.pop_front()
      } else {
        None
      };
    queue.active.push_back(notice.clone());
    trace!(id = %id, kind = kind.as_str(), "queued notification");

    Pushed { notice, evicted }
  }

  /// Removes a notification; `false` if
  /// it was already gone.
  pub fn dismiss(
    &self,
    id: NotificationId
  ) -> bool {
    let mut queue = self.queue.lock();
    let before = queue.active.len();
    queue.active.retain(|n| n.id != id);
    queue.active.len() != before
  }

  pub fn active(
    &self
  ) -> Vec<Notification> {
    self
      .queue
      .lock()
      .active
      .iter()
      .cloned()
      .collect()
  }

  /// Spawns the timer that retires
  /// `notice` at its deadline and tells
  /// the presenter to drop it. Without a
  /// running tokio runtime no timer starts
  /// and the entry stays until it is
  /// evicted or dismissed.
  pub fn schedule_expiry<P: Presenter>(
    self: &Arc<Self>,
    presenter: Arc<P>,
    notice: &Notification
  ) {
    let Ok(handle) =
      tokio::runtime::Handle::try_current()
    else {
      debug!(
        id = %notice.id,
        "no runtime; notification \
         expiry timer not started"
      );
      return;
    };

    let center = Arc::clone(self);
    let id = notice.id;
    let deadline = notice.expires_at;
    handle.spawn(async move {
      tokio::time::sleep_until(deadline)
        .await;
      if center.dismiss(id) {
        trace!(id = %id, "notification expired");
        presenter.dismiss_notification(id);
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use tokio::time::Instant;

  use super::{
    MAX_ACTIVE,
    NoticeKind,
    NotificationCenter
  };

  #[test]
  fn push_and_dismiss() {
    let center = NotificationCenter::new(
      Duration::from_secs(3)
    );
    let first = center
      .push(NoticeKind::Info, "hello")
      .notice;
    let second = center
      .push(NoticeKind::Error, "boom")
      .notice;
    assert_ne!(first.id, second.id);
    assert_eq!(center.active().len(), 2);

    assert!(center.dismiss(first.id));
    assert!(!center.dismiss(first.id));
    assert_eq!(
      center.active(),
      vec![second]
    );
  }

  #[test]
  fn full_queue_evicts_oldest() {
    let center = NotificationCenter::new(
      Duration::from_secs(3)
    );
    let oldest = center
      .push(NoticeKind::Info, "0")
      .notice;
    for idx in 1..MAX_ACTIVE {
      let pushed = center.push(
        NoticeKind::Info,
        idx.to_string()
      );
      assert!(pushed.evicted.is_none());
    }

    let pushed =
      center.push(NoticeKind::Info, "x");
    assert_eq!(
      pushed.evicted.map(|n| n.id),
      Some(oldest.id)
    );
    assert_eq!(
      center.active().len(),
      MAX_ACTIVE
    );
  }

  #[tokio::test(start_paused = true)]
  async fn deadline_is_ttl_after_push() {
    let center = NotificationCenter::new(
      Duration::from_secs(3)
    );
    let pushed_at = Instant::now();
    let notice = center
      .push(NoticeKind::Success, "saved")
      .notice;
    assert_eq!(
      notice.expires_at,
      pushed_at + Duration::from_secs(3)
    );
  }
}
