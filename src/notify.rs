//! Toasts and inbound notifications.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

/// Default toast lifetime
pub const DEFAULT_TOAST_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
            ToastKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
}

impl std::fmt::Display for Toast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

/// Queue of toasts waiting to be shown
#[derive(Debug, Default)]
pub struct Toaster {
    queue: RefCell<VecDeque<Toast>>,
}

impl Toaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, message: impl Into<String>, kind: ToastKind) {
        self.show_for(message, kind, Duration::from_millis(DEFAULT_TOAST_MS));
    }

    pub fn show_for(&self, message: impl Into<String>, kind: ToastKind, duration: Duration) {
        self.queue.borrow_mut().push_back(Toast {
            message: message.into(),
            kind,
            duration,
        });
    }

    /// Take every pending toast, oldest first
    pub fn drain(&self) -> Vec<Toast> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

/// Audible cue for an incoming notification
pub trait Chime {
    fn ring(&self);
}

/// Rings the terminal bell
pub struct BellChime;

impl Chime for BellChime {
    fn ring(&self) {
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

pub struct SilentChime;

impl Chime for SilentChime {
    fn ring(&self) {}
}

/// A pushed notification as the server sends it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationEvent {
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Turns pushed notifications into toasts for the signed-in user
pub struct NotificationListener {
    toaster: Rc<Toaster>,
    chime: Box<dyn Chime>,
    duration: Duration,
    user_id: Option<String>,
}

impl NotificationListener {
    pub fn new(toaster: Rc<Toaster>, chime: Box<dyn Chime>, toast_ms: u64) -> Self {
        Self {
            toaster,
            chime,
            duration: Duration::from_millis(toast_ms),
            user_id: None,
        }
    }

    /// Start listening on behalf of `user_id`; a no-op when already connected
    pub fn connect(&mut self, user_id: &str) {
        if self.user_id.is_none() {
            tracing::debug!(user_id, "notification listener connected");
            self.user_id = Some(user_id.to_string());
        }
    }

    pub fn disconnect(&mut self) {
        if let Some(user_id) = self.user_id.take() {
            tracing::debug!(%user_id, "notification listener disconnected");
        }
    }

    pub fn connected_user(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Show an event as an info toast and ring the chime
    ///
    /// Returns false when nobody is connected and the event was dropped.
    pub fn deliver(&self, event: &NotificationEvent) -> bool {
        if self.user_id.is_none() {
            tracing::debug!(message = %event.message, "dropping notification while disconnected");
            return false;
        }
        tracing::debug!(kind = ?event.kind, "notification received");
        self.toaster
            .show_for(event.message.clone(), ToastKind::Info, self.duration);
        self.chime.ring();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingChime(Rc<Cell<usize>>);

    impl Chime for CountingChime {
        fn ring(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn event(message: &str) -> NotificationEvent {
        NotificationEvent {
            message: message.to_string(),
            kind: None,
        }
    }

    #[test]
    fn test_toaster_queue() {
        let toaster = Toaster::new();
        toaster.show("Saved", ToastKind::Success);
        toaster.show_for("Failed", ToastKind::Error, Duration::from_secs(10));

        let toasts = toaster.drain();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].duration, Duration::from_millis(DEFAULT_TOAST_MS));
        assert_eq!(toasts[1].to_string(), "[error] Failed");
        assert!(toaster.drain().is_empty());
    }

    #[test]
    fn test_listener_delivers_only_when_connected() {
        let toaster = Rc::new(Toaster::new());
        let rings = Rc::new(Cell::new(0));
        let mut listener = NotificationListener::new(
            toaster.clone(),
            Box::new(CountingChime(rings.clone())),
            5_000,
        );

        assert!(!listener.deliver(&event("ignored")));
        assert!(toaster.drain().is_empty());

        listener.connect("2");
        assert_eq!(listener.connected_user(), Some("2"));
        assert!(listener.deliver(&event("New material request")));
        let toasts = toaster.drain();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Info);
        assert_eq!(toasts[0].duration, Duration::from_millis(5_000));
        assert_eq!(rings.get(), 1);

        listener.disconnect();
        assert!(!listener.deliver(&event("after logout")));
        assert_eq!(rings.get(), 1);
    }

    #[test]
    fn test_event_parsing() {
        let parsed: NotificationEvent =
            serde_json::from_str(r#"{"message":"Stock low","type":"alert"}"#).unwrap();
        assert_eq!(parsed.kind.as_deref(), Some("alert"));
        let parsed: NotificationEvent = serde_json::from_str(r#"{"message":"Hi"}"#).unwrap();
        assert!(parsed.kind.is_none());
    }
}
