//! Line-oriented stream source. Each complete, non-empty line replaces the text.
//!
//! A stream can only be read once, so one [`LineFeed`] owns it for the whole process
//! and keeps the recent lines. Every stdin-backed entry follows that feed instead of
//! reading the stream itself: lines arriving between entries are kept, and a later
//! entry starts from the latest line rather than from blank.

use crate::error::LedseqError;
use crate::source::{RefreshContext, SourceAdapter};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

/// Lines kept for `tail_lines`
const HISTORY: usize = 64;

type BoxedReader = Pin<Box<dyn AsyncBufRead + Send>>;

static STDIN_FEED: OnceLock<Arc<LineFeed>> = OnceLock::new();

/// Everything read from the stream so far.
#[derive(Debug, Default)]
pub struct FeedState {
    recent: VecDeque<String>,
    error: Option<String>,
    closed: bool,
}

impl FeedState {
    /// Join the last `tail` lines, or `None` before the first line arrives.
    pub fn render(&self, tail: usize, separator: &str) -> Option<String> {
        if self.recent.is_empty() {
            return None;
        }
        let skip = self.recent.len().saturating_sub(tail.max(1));
        let lines: Vec<&str> = self.recent.iter().skip(skip).map(String::as_str).collect();
        Some(lines.join(separator))
    }

    fn push(&mut self, line: &str) {
        if self.recent.len() == HISTORY {
            self.recent.pop_front();
        }
        self.recent.push_back(line.to_string());
    }
}

/// A stream read by a single task for the lifetime of the process.
pub struct LineFeed {
    kind: &'static str,
    state: Arc<watch::Sender<FeedState>>,
    reader: Mutex<Option<BoxedReader>>,
}

impl LineFeed {
    pub fn new<R>(reader: R, kind: &'static str) -> Arc<Self>
    where
        R: AsyncBufRead + Send + 'static,
    {
        let (state, _) = watch::channel(FeedState::default());
        Arc::new(Self {
            kind,
            state: Arc::new(state),
            reader: Mutex::new(Some(Box::pin(reader))),
        })
    }

    /// The process-wide standard input feed.
    pub fn stdin() -> Arc<Self> {
        Arc::clone(STDIN_FEED.get_or_init(|| {
            Self::new(BufReader::new(tokio::io::stdin()), "stdin")
        }))
    }

    /// Current text for a follower, without waiting.
    pub fn render(&self, tail: usize, separator: &str) -> Option<String> {
        self.state.borrow().render(tail, separator)
    }

    /// Spawn the reader task on first use. Must be called from within a tokio runtime.
    fn ensure_reading(&self) {
        let Some(reader) = self.reader.lock().take() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let kind = self.kind;
        debug!("{kind} feed started");
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            state.send_modify(|s| s.push(line));
                        }
                    }
                    Ok(None) => {
                        // End of input; the last line stays on display
                        debug!("{kind} reached end of input");
                        state.send_modify(|s| s.closed = true);
                        break;
                    }
                    Err(e) => {
                        state.send_modify(|s| {
                            s.error = Some(e.to_string());
                            s.closed = true;
                        });
                        break;
                    }
                }
            }
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StdinConfig {
    /// Show the last N lines, joined by `separator`
    pub tail_lines: usize,
    pub separator: String,
}

/// Publishes the latest lines of a [`LineFeed`] into one entry's slot.
pub struct LineFollower {
    feed: Arc<LineFeed>,
    tail: usize,
    separator: String,
}

impl LineFollower {
    pub fn new(feed: Arc<LineFeed>, tail: usize, separator: impl Into<String>) -> Self {
        Self {
            feed,
            tail,
            separator: separator.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for LineFollower {
    fn kind(&self) -> &'static str {
        self.feed.kind
    }

    fn current_text(&self) -> Option<String> {
        self.feed.render(self.tail, &self.separator)
    }

    async fn run(self: Box<Self>, ctx: RefreshContext) {
        let kind = self.feed.kind;
        self.feed.ensure_reading();
        let mut state = self.feed.state.subscribe();
        // A failure that happened before this entry was reported by an earlier one
        let mut reported = state.borrow().error.is_some();
        loop {
            let closed = {
                let current = state.borrow_and_update();
                if let Some(text) = current.render(self.tail, &self.separator) {
                    ctx.publish(text);
                }
                if let (false, Some(error)) = (reported, &current.error) {
                    ctx.fail(LedseqError::acquisition(kind, error.clone()));
                    reported = true;
                }
                current.closed
            };
            if closed {
                break;
            }
            tokio::select! {
                _ = ctx.cancel_token().cancelled() => break,
                changed = state.changed() => if changed.is_err() {
                    break;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceSlot;
    use crate::status::StatusSender;
    use tokio::io::AsyncWriteExt;
    use tokio_util::sync::CancellationToken;

    fn context(slot: &SourceSlot, cancel: &CancellationToken) -> RefreshContext {
        RefreshContext::new(
            "pipe",
            "stdin",
            slot.clone(),
            cancel.clone(),
            StatusSender::disabled(),
        )
    }

    #[tokio::test]
    async fn publishes_complete_lines_and_keeps_last_at_eof() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let feed = LineFeed::new(BufReader::new(reader), "stdin");
        let slot = SourceSlot::new("");
        let follower = Box::new(LineFollower::new(feed, 1, " | "));
        let task = tokio::spawn(follower.run(context(&slot, &CancellationToken::new())));

        writer.write_all(b"first\n\n   \nsecond\npart").await.unwrap();
        drop(writer);
        task.await.unwrap();

        // "part" has no newline but EOF completes it
        assert_eq!(slot.latest().text, "part");
    }

    #[test]
    fn render_joins_the_last_lines() {
        let mut state = FeedState::default();
        assert_eq!(state.render(1, ","), None);
        for line in ["a", "b", "c"] {
            state.push(line);
        }
        assert_eq!(state.render(1, ",").as_deref(), Some("c"));
        assert_eq!(state.render(2, ",").as_deref(), Some("b,c"));
        assert_eq!(state.render(10, ",").as_deref(), Some("a,b,c"));
    }

    #[test]
    fn history_is_bounded() {
        let mut state = FeedState::default();
        for i in 0..HISTORY + 5 {
            state.push(&i.to_string());
        }
        assert_eq!(state.recent.len(), HISTORY);
        assert_eq!(state.recent.front().map(String::as_str), Some("5"));
    }

    #[tokio::test]
    async fn cancellation_ends_a_blocked_follower() {
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let slot = SourceSlot::new("");
        let feed = LineFeed::new(BufReader::new(reader), "stdin");
        let task = tokio::spawn(Box::new(LineFollower::new(feed, 1, " | ")).run(context(&slot, &cancel)));
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("follower did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn read_errors_are_reported_once() {
        let (events, mut rx) = StatusSender::channel();
        let slot = SourceSlot::new("");
        let ctx = RefreshContext::new("pipe", "stdin", slot.clone(), CancellationToken::new(), events);
        let invalid: &[u8] = b"ok\n\xff\xfe\n";
        let feed = LineFeed::new(BufReader::new(invalid), "stdin");
        Box::new(LineFollower::new(feed, 1, " | ")).run(ctx).await;

        assert_eq!(slot.latest().text, "ok");
        assert_eq!(slot.failure_count(), 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(crate::status::StatusEvent::SourceRefreshFailed { .. })
        ));
    }
}
