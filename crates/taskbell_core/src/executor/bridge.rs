//! Cross-context message bridge.
//!
//! Two messages only: the background asks foreground pages to run a check,
//! and the foreground asks the background to run one. Reachability is
//! best-effort: a page whose receiver is gone is pruned on the next post.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Background → foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackgroundToForeground {
    /// "Please run a check now."
    RequestCheck,
}

/// Foreground → background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForegroundToBackground {
    /// "Run a check now."
    RunCheck,
}

/// In-process bridge between the foreground pages and the background worker.
#[derive(Default)]
pub struct MessageBridge {
    clients: Mutex<Vec<Sender<BackgroundToForeground>>>,
    background: Mutex<Option<Sender<ForegroundToBackground>>>,
}

impl MessageBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a foreground page; dropping the receiver detaches it.
    pub fn attach_client(&self) -> Receiver<BackgroundToForeground> {
        let (tx, rx) = unbounded();
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    /// Attaches the background worker, replacing any previous one.
    pub fn attach_background(&self) -> Receiver<ForegroundToBackground> {
        let (tx, rx) = unbounded();
        *self
            .background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tx);
        rx
    }

    /// Posts `message` to every reachable page and returns how many got it.
    pub fn post_to_clients(&self, message: BackgroundToForeground) -> usize {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clients.retain(|client| client.send(message).is_ok());
        debug!(
            "event=bridge_post module=bridge direction=to_foreground reachable={}",
            clients.len()
        );
        clients.len()
    }

    /// Posts `message` to the background worker; `false` when none listens.
    pub fn post_to_background(&self, message: ForegroundToBackground) -> bool {
        let mut background = self
            .background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let delivered = background
            .as_ref()
            .is_some_and(|sender| sender.send(message).is_ok());
        if !delivered {
            *background = None;
        }
        debug!("event=bridge_post module=bridge direction=to_background delivered={delivered}");
        delivered
    }

    /// Number of pages still attached, as of the last post.
    pub fn client_count(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::{BackgroundToForeground, ForegroundToBackground, MessageBridge};

    #[test]
    fn messages_use_stable_wire_names() {
        assert_eq!(
            serde_json::to_string(&BackgroundToForeground::RequestCheck).unwrap(),
            r#"{"type":"REQUEST_CHECK"}"#
        );
        assert_eq!(
            serde_json::to_string(&ForegroundToBackground::RunCheck).unwrap(),
            r#"{"type":"RUN_CHECK"}"#
        );
    }

    #[test]
    fn dropped_clients_are_pruned() {
        let bridge = MessageBridge::new();
        let alive = bridge.attach_client();
        let gone = bridge.attach_client();
        drop(gone);

        assert_eq!(bridge.post_to_clients(BackgroundToForeground::RequestCheck), 1);
        assert_eq!(alive.try_recv().unwrap(), BackgroundToForeground::RequestCheck);
        assert_eq!(bridge.client_count(), 1);
    }

    #[test]
    fn post_to_background_without_listener_fails() {
        let bridge = MessageBridge::new();
        assert!(!bridge.post_to_background(ForegroundToBackground::RunCheck));

        let rx = bridge.attach_background();
        assert!(bridge.post_to_background(ForegroundToBackground::RunCheck));
        assert_eq!(rx.try_recv().unwrap(), ForegroundToBackground::RunCheck);

        drop(rx);
        assert!(!bridge.post_to_background(ForegroundToBackground::RunCheck));
    }
}
