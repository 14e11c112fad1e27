use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use unicode_width::UnicodeWidthStr;
use velocity_shared::{Task, TaskPriority};

use crate::datetime::relative_age_label;
use crate::notify::{NoticeKind, Notification, NotificationId};
use crate::presenter::Presenter;
use crate::query::Filter;
use crate::session::LineInput;
use crate::stats::TaskStats;

type Sink = Box<dyn Write + Send>;

/// Presenter for an interactive terminal: prints tables and status lines,
/// reads confirmations from the session input.
pub struct TerminalPresenter {
    color: bool,
    out: Mutex<Sink>,
    input: Arc<LineInput>,
    clock: fn() -> DateTime<Utc>,
}

impl TerminalPresenter {
    pub fn new(color: bool, input: Arc<LineInput>) -> Self {
        let color = color && io::stdout().is_terminal();
        Self::with_writer(color, input, Box::new(io::stdout()))
    }

    pub fn with_writer(color: bool, input: Arc<LineInput>, out: Sink) -> Self {
        Self {
            color,
            out: Mutex::new(out),
            input,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Writes free-form text, e.g. help or command errors.
    pub fn print(&self, text: &str) {
        self.emit(|out| writeln!(out, "{text}"));
    }

    pub fn print_stats_breakdown(&self, stats: &TaskStats) {
        let rows: Vec<Vec<String>> = TaskPriority::ALL
            .iter()
            .rev()
            .map(|p| vec![p.display_name().to_string(), stats.by_priority(*p).to_string()])
            .collect();
        self.emit(|out| {
            write_counters(out, stats)?;
            write_table(out, vec!["Priority".to_string(), "Tasks".to_string()], rows)
        });
    }

    fn emit<F>(&self, write: F)
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let mut out = self.out.lock();
        if let Err(err) = write(&mut **out).and_then(|()| out.flush()) {
            warn!(error = %err, "failed writing to terminal");
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn task_row(&self, task: &Task, now: DateTime<Utc>) -> Vec<String> {
        let done = if task.completed { "[x]" } else { "[ ]" };
        let priority = match task.priority {
            TaskPriority::High => self.paint(task.priority.as_str(), "31"),
            TaskPriority::Medium => self.paint(task.priority.as_str(), "33"),
            TaskPriority::Low => self.paint(task.priority.as_str(), "32"),
        };
        let title = if task.completed {
            self.paint(&task.title, "9")
        } else {
            task.title.clone()
        };

        vec![
            self.paint(task.id.as_str(), "36"),
            done.to_string(),
            priority,
            title,
            relative_age_label(task.created_at, now),
        ]
    }
}

impl Presenter for TerminalPresenter {
    fn render_tasks(&self, tasks: &[Task]) {
        trace!(count = tasks.len(), "rendering tasks");
        if tasks.is_empty() {
            return;
        }

        let now = (self.clock)();
        let headers: Vec<String> = ["ID", "Done", "Priority", "Title", "Created"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows: Vec<Vec<String>> = tasks.iter().map(|task| self.task_row(task, now)).collect();
        self.emit(|out| write_table(out, headers, rows));
    }

    fn set_empty_state(&self, visible: bool) {
        if visible {
            let text = self.paint("No tasks match the current view.", "2");
            self.emit(|out| writeln!(out, "{text}"));
        }
    }

    fn set_loading(&self, visible: bool) {
        debug!(visible, "loading indicator");
        if visible {
            let text = self.paint("loading...", "2");
            self.emit(|out| writeln!(out, "{text}"));
        }
    }

    fn show_notification(&self, notice: &Notification) {
        let (marker, code) = match notice.kind {
            NoticeKind::Success => ("ok", "32"),
            NoticeKind::Error => ("error", "31"),
            NoticeKind::Info => ("info", "34"),
        };
        let marker = self.paint(marker, code);
        let message = &notice.message;
        self.emit(|out| writeln!(out, "{marker}: {message}"));
    }

    fn dismiss_notification(&self, id: NotificationId) {
        trace!(id = %id, "notification dismissed");
    }

    fn set_active_filter(&self, filter: Filter) {
        let label = self.paint(filter.as_str(), "1");
        self.emit(|out| writeln!(out, "filter: {label}"));
    }

    fn update_stats(&self, stats: &TaskStats) {
        self.emit(|out| write_counters(out, stats));
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.emit(|out| write!(out, "{prompt} [y/N] "));
        match self.input.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(err) => {
                warn!(error = %err, "failed reading confirmation");
                false
            }
        }
    }
}

fn write_counters(out: &mut dyn Write, stats: &TaskStats) -> io::Result<()> {
    writeln!(
        out,
        "total {}  completed {}  pending {}",
        stats.total, stats.completed, stats.pending
    )
}

fn write_table(out: &mut dyn Write, headers: Vec<String>, rows: Vec<Vec<String>>) -> io::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(widths.iter().copied()) {
        write!(out, "{header:width$} ")?;
    }
    writeln!(out)?;

    for width in widths.iter().copied() {
        write!(out, "{:-<width$} ", "")?;
    }
    writeln!(out)?;

    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(out, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
