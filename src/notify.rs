use crate::errors::ApiError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{info, warn};

const MAX_PENDING: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Transient user-facing messages ("toasts").
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn success(&self, message: &str) {
        self.notify(Notice {
            level: NoticeLevel::Success,
            message: message.to_string(),
        });
    }

    fn error(&self, message: &str) {
        self.notify(Notice {
            level: NoticeLevel::Error,
            message: message.to_string(),
        });
    }
}

/// Shows a failed call to the user. Auth failures are left to the session
/// layer, which sends the user back to the login page.
pub fn surface_error(notifier: &dyn Notifier, err: &ApiError, fallback: &str) {
    if !err.is_auth_failure() {
        notifier.error(&err.user_message(fallback));
    }
}

/// Queues notices until the next page render picks them up.
#[derive(Default)]
pub struct NoticeBoard {
    pending: Mutex<VecDeque<Notice>>,
}

impl NoticeBoard {
    pub fn drain(&self) -> Vec<Notice> {
        self.pending.lock().drain(..).collect()
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!("notice: {}", notice.message),
            NoticeLevel::Error => warn!("notice: {}", notice.message),
        }
        let mut pending = self.pending.lock();
        if pending.len() == MAX_PENDING {
            pending.pop_front();
        }
        pending.push_back(notice);
    }
}
