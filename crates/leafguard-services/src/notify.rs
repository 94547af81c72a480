use leafguard_core::models::{Notice, NoticeLevel};
use tokio::sync::mpsc;

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => {
                tracing::error!(title = %notice.title, "{}", notice.description)
            }
            NoticeLevel::Warning => {
                tracing::warn!(title = %notice.title, "{}", notice.description)
            }
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(title = %notice.title, "{}", notice.description)
            }
        }
    }
}

/// Forwards notices to a receiver, e.g. a front end rendering toasts.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            tracing::debug!("Notice receiver dropped");
        }
    }
}
