//! The diagnostics reporter.
//!
//! The analysis worker is the single producer on an unbounded channel of
//! `Option<Entry>`; the drain side (the main thread) consumes until it
//! sees the `None` terminator. The channel is the only conduit for
//! user-facing findings — `tracing` is developer telemetry only.

use crossbeam_channel::{Receiver, Sender};

use ward_core::Entry;

/// Item type on the diagnostics channel; `None` terminates.
pub type Message = Option<Entry>;

/// Sending side of the diagnostics channel.
pub struct Reporter {
    tx: Sender<Message>,
}

/// Create the diagnostics channel.
pub fn channel() -> (Reporter, Receiver<Message>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Reporter { tx }, rx)
}

impl Reporter {
    /// Emit one entry. A disconnected drain is ignored — there is nobody
    /// left to tell.
    pub fn send(&self, entry: Entry) {
        let _ = self.tx.send(Some(entry));
    }

    pub fn send_all(&self, entries: impl IntoIterator<Item = Entry>) {
        for entry in entries {
            self.send(entry);
        }
    }

    /// Send the terminator, consuming the reporter.
    pub fn finish(self) {
        let _ = self.tx.send(None);
    }
}
