use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Where notifications end up besides the in-memory slot.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);
}

/// Prints to stderr so command output on stdout stays clean.
pub struct TerminalSink {
    color: bool,
}

impl TerminalSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn line(&self, notification: &Notification) -> String {
        let (mark, code) = match notification.level {
            Level::Success => ("✔", "\x1b[32m"),
            Level::Error => ("✘", "\x1b[31m"),
        };
        if self.color {
            format!("{code}{mark} {}\x1b[0m", notification.message)
        } else {
            format!("{mark} {}", notification.message)
        }
    }
}

impl NotificationSink for TerminalSink {
    fn show(&self, notification: &Notification) {
        eprintln!("{}", self.line(notification));
    }
}

/// Fire-and-forget relay; only the most recent notification is kept.
#[derive(Clone, Default)]
pub struct Notifier {
    latest: Arc<RwLock<Option<Notification>>>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self { latest: Arc::default(), sink: Some(sink) }
    }

    pub async fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "notify success");
        self.push(Notification { level: Level::Success, message }).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "notify error");
        self.push(Notification { level: Level::Error, message }).await;
    }

    async fn push(&self, notification: Notification) {
        if let Some(sink) = &self.sink {
            sink.show(&notification);
        }
        *self.latest.write().await = Some(notification);
    }

    pub async fn latest(&self) -> Option<Notification> {
        self.latest.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<Notification>>);

    impl NotificationSink for Recording {
        fn show(&self, notification: &Notification) {
            self.0.lock().unwrap().push(notification.clone());
        }
    }

    #[tokio::test]
    async fn keeps_most_recent() {
        let notifier = Notifier::new();
        assert_eq!(notifier.latest().await, None);
        notifier.success("saved").await;
        notifier.error("boom").await;
        assert_eq!(
            notifier.latest().await,
            Some(Notification { level: Level::Error, message: "boom".into() })
        );
    }

    #[tokio::test]
    async fn forwards_to_sink() {
        let sink = Arc::new(Recording(Mutex::new(Vec::new())));
        let notifier = Notifier::with_sink(sink.clone());
        notifier.success("one").await;
        notifier.success("two").await;
        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].message, "two");
    }

    #[test]
    fn terminal_sink_respects_color_flag() {
        let note = Notification { level: Level::Error, message: "boom".into() };
        assert_eq!(TerminalSink::new(false).line(&note), "✘ boom");
        assert_eq!(TerminalSink::new(true).line(&note), "\x1b[31m✘ boom\x1b[0m");
    }
}
