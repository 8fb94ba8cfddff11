//! Structured status events for external logging and telemetry.
//!
//! The sequencer and the text-source tasks report through a cloneable
//! [`StatusSender`]. Sending never blocks and never fails from the caller's point of
//! view: when nobody listens, events are dropped.

use tokio::sync::mpsc;

/// Events emitted while a sequence plays.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    EntryStarted {
        index: usize,
        name: String,
    },
    EntryFinished {
        index: usize,
        name: String,
    },
    TransitionStarted {
        from: usize,
        to: usize,
        kind: String,
    },
    SourceRefreshFailed {
        source: String,
        error: String,
    },
    TeardownTimedOut {
        name: String,
    },
    DisplaySinkFailed {
        consecutive: u32,
        error: String,
    },
    Paused,
    Resumed,
    SequenceFinished,
}

/// Cheap, cloneable handle used to publish [`StatusEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct StatusSender {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusSender {
    /// Create a sender together with the receiving end of the event stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: StatusEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
