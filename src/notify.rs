//! Notification layer seam.
//! Controllers report outcomes and ask for confirmations through [`Notifier`];
//! how a notice is presented (terminal, dialog, test recorder) is up to the implementor.

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn info<S: Into<String>>(title: S, text: S) -> Self { Notice { level: Level::Info, title: title.into(), text: text.into() } }
    pub fn success<S: Into<String>>(title: S, text: S) -> Self { Notice { level: Level::Success, title: title.into(), text: text.into() } }
    pub fn warning<S: Into<String>>(title: S, text: S) -> Self { Notice { level: Level::Warning, title: title.into(), text: text.into() } }
    pub fn error<S: Into<String>>(title: S, text: S) -> Self { Notice { level: Level::Error, title: title.into(), text: text.into() } }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Ask the user to confirm a destructive action. `false` aborts it.
    fn confirm(&self, title: &str, text: &str) -> bool;
}

/// Notifier that keeps every notice and answers confirmations with a fixed value.
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    confirmations: Mutex<Vec<String>>,
    answer: bool,
}

impl RecordingNotifier {
    pub fn new(answer: bool) -> Self {
        Self { notices: Mutex::new(Vec::new()), confirmations: Mutex::new(Vec::new()), answer }
    }

    pub fn notices(&self) -> Vec<Notice> { self.notices.lock().clone() }

    pub fn last(&self) -> Option<Notice> { self.notices.lock().last().cloned() }

    /// Titles of the confirmations that were asked, in order.
    pub fn confirmations(&self) -> Vec<String> { self.confirmations.lock().clone() }
}

impl Default for RecordingNotifier {
    fn default() -> Self { Self::new(true) }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn confirm(&self, title: &str, _text: &str) -> bool {
        self.confirmations.lock().push(title.to_string());
        self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order_and_answers() {
        let n = RecordingNotifier::new(false);
        n.notify(Notice::info("a", "1"));
        n.notify(Notice::error("b", "2"));
        assert!(!n.confirm("sure?", "really"));
        assert_eq!(n.notices().len(), 2);
        assert_eq!(n.last().map(|x| x.level), Some(Level::Error));
        assert_eq!(n.confirmations(), vec!["sure?".to_string()]);
    }
}
