#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use velocity_core::controller::TaskController;
use velocity_core::notify::{NoticeKind, Notification, NotificationId};
use velocity_core::presenter::Presenter;
use velocity_core::query::Filter;
use velocity_core::service::{MemoryTaskService, ServiceError, TaskService};
use velocity_core::stats::TaskStats;
use velocity_shared::{NewTask, Task, TaskId, TaskPriority};

pub const TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Rendered(Vec<String>),
    Empty(bool),
    Loading(bool),
    Shown(NoticeKind, String),
    Dismissed(NotificationId),
    ActiveFilter(Filter),
    Stats(TaskStats),
    Confirm(String),
}

/// Presenter that records every call and answers confirmations from a
/// script; an empty script declines.
#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<Event>>,
    answers: Mutex<VecDeque<bool>>,
}

impl RecordingPresenter {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            events: Mutex::default(),
            answers: Mutex::new(answers.iter().copied().collect()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn messages(&self) -> Vec<(NoticeKind, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Shown(kind, message) => Some((kind, message)),
                _ => None,
            })
            .collect()
    }

    pub fn loading(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Loading(visible) => Some(visible),
                _ => None,
            })
            .collect()
    }

    pub fn last_rendered(&self) -> Option<Vec<String>> {
        self.events().into_iter().rev().find_map(|event| match event {
            Event::Rendered(titles) => Some(titles),
            _ => None,
        })
    }

    pub fn last_stats(&self) -> Option<TaskStats> {
        self.events().into_iter().rev().find_map(|event| match event {
            Event::Stats(stats) => Some(stats),
            _ => None,
        })
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn render_tasks(&self, tasks: &[Task]) {
        self.record(Event::Rendered(
            tasks.iter().map(|t| t.title.clone()).collect(),
        ));
    }

    fn set_empty_state(&self, visible: bool) {
        self.record(Event::Empty(visible));
    }

    fn set_loading(&self, visible: bool) {
        self.record(Event::Loading(visible));
    }

    fn show_notification(&self, notice: &Notification) {
        self.record(Event::Shown(notice.kind, notice.message.clone()));
    }

    fn dismiss_notification(&self, id: NotificationId) {
        self.record(Event::Dismissed(id));
    }

    fn set_active_filter(&self, filter: Filter) {
        self.record(Event::ActiveFilter(filter));
    }

    fn update_stats(&self, stats: &TaskStats) {
        self.record(Event::Stats(*stats));
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.record(Event::Confirm(prompt.to_string()));
        self.answers.lock().pop_front().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    Update(TaskId, bool),
    Delete(TaskId),
}

/// In-memory service whose calls are logged and can be made to fail or
/// wait for the test to release them.
#[derive(Default)]
pub struct ScriptedService {
    inner: MemoryTaskService,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, VecDeque<ServiceError>>>,
    holds: Mutex<HashMap<Op, VecDeque<oneshot::Receiver<()>>>>,
}

impl ScriptedService {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: MemoryTaskService::with_tasks(tasks),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn stored(&self) -> Vec<Task> {
        self.inner.snapshot()
    }

    pub fn fail_next(&self, op: Op, err: ServiceError) {
        self.failures.lock().entry(op).or_default().push_back(err);
    }

    /// The next `op` call waits until the returned sender fires.
    pub fn hold_next(&self, op: Op) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.holds.lock().entry(op).or_default().push_back(held);
        release
    }

    async fn enter(&self, op: Op, call: Call) -> Result<(), ServiceError> {
        self.calls.lock().push(call);
        let held = self.holds.lock().get_mut(&op).and_then(VecDeque::pop_front);
        if let Some(held) = held {
            let _ = held.await;
        }
        match self.failures.lock().get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl TaskService for ScriptedService {
    async fn list(&self) -> Result<Vec<Task>, ServiceError> {
        self.enter(Op::List, Call::List).await?;
        self.inner.list().await
    }

    async fn create(&self, task: &NewTask) -> Result<Task, ServiceError> {
        self.enter(Op::Create, Call::Create(task.title.clone())).await?;
        self.inner.create(task).await
    }

    async fn update(&self, task: &Task) -> Result<(), ServiceError> {
        self.enter(Op::Update, Call::Update(task.id.clone(), task.completed))
            .await?;
        self.inner.update(task).await
    }

    async fn delete(&self, id: &TaskId) -> Result<(), ServiceError> {
        self.enter(Op::Delete, Call::Delete(id.clone())).await?;
        self.inner.delete(id).await
    }
}

pub type Harness = (
    Arc<TaskController<Arc<ScriptedService>, RecordingPresenter>>,
    Arc<ScriptedService>,
    Arc<RecordingPresenter>,
);

pub fn harness(tasks: Vec<Task>, answers: &[bool]) -> Harness {
    let service = Arc::new(ScriptedService::with_tasks(tasks));
    let presenter = Arc::new(RecordingPresenter::answering(answers));
    let controller = Arc::new(TaskController::new(
        Arc::clone(&service),
        Arc::clone(&presenter),
        TTL,
    ));
    (controller, service, presenter)
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn task(id: &str, title: &str, priority: TaskPriority, completed: bool) -> Task {
    Task {
        id: TaskId::from(id),
        title: title.to_string(),
        priority,
        completed,
        created_at: at(10, 9),
        updated_at: None,
    }
}

/// Yields to the runtime until `done` holds.
pub async fn settle_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
