//! File-backed text source.
//!
//! Change notifications come from `notify` on the file's parent directory, so editors
//! that replace the file by rename are picked up too. A metadata poll runs alongside
//! the watcher and takes over entirely when no watcher can be created.

use crate::error::LedseqError;
use crate::source::{RefreshContext, SourceAdapter};
use async_trait::async_trait;
use log::{debug, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Quiet period after a notification before the file is read
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How long content without a final newline must stay unchanged before it is shown
const UNTERMINATED_QUIET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct FileWatchConfig {
    pub path: PathBuf,
    /// Keep only the last N non-empty lines
    pub tail_lines: Option<usize>,
    pub separator: String,
    pub poll_interval: Duration,
}

/// Identity of one on-disk version of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

pub struct FileWatchAdapter {
    config: FileWatchConfig,
    last_stamp: Option<FileStamp>,
    /// Unterminated content seen but not yet published, and when it was first seen
    held: Option<(FileStamp, Instant)>,
}

impl FileWatchAdapter {
    pub fn new(config: FileWatchConfig) -> Self {
        Self {
            config,
            last_stamp: None,
            held: None,
        }
    }

    async fn stamp(&self) -> std::io::Result<FileStamp> {
        let meta = tokio::fs::metadata(&self.config.path).await?;
        Ok(FileStamp {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }

    /// Read the file and publish it. A read that races a writer is dropped; the
    /// writer's own notification triggers the next attempt.
    ///
    /// Content that is empty or ends mid-line may be a rewrite in progress, so it is
    /// held until the file has stayed unchanged for the quiet period. Polling keeps
    /// calling back here until then since `last_stamp` is not advanced.
    async fn refresh(&mut self, ctx: &RefreshContext) {
        let bytes = match tokio::fs::read(&self.config.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                ctx.fail(LedseqError::acquisition(
                    "file",
                    format!("{}: {e}", self.config.path.display()),
                ));
                return;
            }
        };
        let stamp = match self.stamp().await {
            Ok(stamp) => stamp,
            Err(e) => {
                ctx.fail(LedseqError::acquisition(
                    "file",
                    format!("{}: {e}", self.config.path.display()),
                ));
                return;
            }
        };
        if stamp.len != bytes.len() as u64 {
            debug!(
                "{} changed while being read; waiting for the next change",
                self.config.path.display()
            );
            return;
        }
        if !bytes.ends_with(b"\n") && !self.settled(stamp) {
            return;
        }
        self.held = None;
        self.last_stamp = Some(stamp);
        let content = String::from_utf8_lossy(&bytes);
        ctx.publish(render_lines(&content, self.config.tail_lines, &self.config.separator));
    }

    fn settled(&mut self, stamp: FileStamp) -> bool {
        let quiet = self.config.poll_interval.max(UNTERMINATED_QUIET);
        match self.held {
            Some((held, since)) if held == stamp => since.elapsed() >= quiet,
            _ => {
                debug!(
                    "{} ends mid-line; waiting for it to settle",
                    self.config.path.display()
                );
                self.held = Some((stamp, Instant::now()));
                false
            }
        }
    }

    async fn poll(&mut self, ctx: &RefreshContext) {
        match self.stamp().await {
            Ok(stamp) if Some(stamp) != self.last_stamp => self.refresh(ctx).await,
            Ok(_) => {}
            // Missing files are reported by `refresh`; polling stays quiet until it reappears
            Err(_) if self.last_stamp.is_none() => {}
            Err(_) => {
                self.last_stamp = None;
                self.refresh(ctx).await;
            }
        }
    }
}

/// Join the non-empty lines of `content`, keeping only the last `tail` of them.
pub fn render_lines(content: &str, tail: Option<usize>, separator: &str) -> String {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let skip = tail.map_or(0, |n| lines.len().saturating_sub(n));
    lines[skip..].join(separator)
}

fn create_watcher(
    path: &Path,
    tx: mpsc::UnboundedSender<notify::Result<Event>>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn concerns(event: &Event, path: &Path) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    let name = path.file_name();
    event
        .paths
        .iter()
        .any(|p| p == path || (name.is_some() && p.file_name() == name))
}

#[async_trait]
impl SourceAdapter for FileWatchAdapter {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn run(mut self: Box<Self>, ctx: RefreshContext) {
        self.refresh(&ctx).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        // Dropping the watcher stops notifications, so it lives for the whole loop
        let watcher = match create_watcher(&self.config.path, tx) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(
                    "cannot watch {} ({e}); polling every {:?}",
                    self.config.path.display(),
                    self.config.poll_interval
                );
                rx.close();
                None
            }
        };
        let mut watching = watcher.is_some();

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ctx.cancel_token().cancelled() => break,
                _ = ticker.tick() => self.poll(&ctx).await,
                event = rx.recv(), if watching => match event {
                    Some(Ok(event)) if concerns(&event, &self.config.path) => {
                        tokio::select! {
                            _ = ctx.cancel_token().cancelled() => break,
                            _ = tokio::time::sleep(SETTLE_DELAY) => {}
                        }
                        while rx.try_recv().is_ok() {}
                        self.refresh(&ctx).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!("watch error for {}: {e}", self.config.path.display()),
                    None => watching = false,
                },
            }
        }
        debug!("file source for {} stopped", self.config.path.display());
    }
}
