//! The single shared slot between a text source task and the render loop.
//!
//! Writers build a complete [`TextSnapshot`] first and then swap the `Arc` inside a
//! short write section, so readers only ever see whole snapshots. Reads clone the
//! `Arc` and never wait for an acquisition in progress.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// One published text value.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSnapshot {
    pub text: String,
    /// Strictly increasing per successful publish; the initial value is version 0.
    /// Sources skip a refresh whose text equals the current value, so an unchanged
    /// version does not mean the source stopped refreshing.
    pub version: u64,
    /// `None` for the value the source was constructed with
    pub published_at: Option<Instant>,
}

/// Latest-value slot plus failure bookkeeping for one text source.
#[derive(Debug, Clone)]
pub struct SourceSlot {
    inner: Arc<SlotInner>,
}

#[derive(Debug)]
struct SlotInner {
    current: RwLock<Arc<TextSnapshot>>,
    failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SourceSlot {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SlotInner {
                current: RwLock::new(Arc::new(TextSnapshot {
                    text: initial.into(),
                    version: 0,
                    published_at: None,
                })),
                failures: AtomicU64::new(0),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Replace the published value and return its version.
    pub fn publish(&self, text: impl Into<String>) -> u64 {
        let text = text.into();
        let mut current = self.inner.current.write();
        let version = current.version + 1;
        *current = Arc::new(TextSnapshot {
            text,
            version,
            published_at: Some(Instant::now()),
        });
        version
    }

    /// The latest complete snapshot.
    pub fn latest(&self) -> Arc<TextSnapshot> {
        Arc::clone(&self.inner.current.read())
    }

    pub fn version(&self) -> u64 {
        self.inner.current.read().version
    }

    /// Record a failed refresh. The published value is left untouched.
    pub fn record_failure(&self, error: impl Into<String>) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
        *self.inner.last_error.lock() = Some(error.into());
    }

    pub fn failure_count(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }
}
