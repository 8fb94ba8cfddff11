//! Text sources: interchangeable, independently timed providers of display text.
//!
//! A [`TextSource`] owns a [`SourceSlot`] holding the latest published text and, for
//! every strategy except `static`, one background task that acquires fresh content.
//! The render loop only ever reads the slot; all blocking work (file reads, stdin,
//! HTTP requests, child processes) lives in the task.
//!
//! ## Lifecycle
//!
//! 1. Built from validated options when its animation is constructed (nothing runs).
//! 2. [`TextSource::start`] spawns the adapter task when the animation is entered.
//! 3. [`TextSource::stop`] cancels the task and waits for it within a grace period;
//!    a task that does not finish in time is aborted and reported.

pub mod command;
pub mod file_watch;
pub mod network;
pub mod slot;
pub mod stdin;

pub use command::{CommandAdapter, CommandConfig};
pub use file_watch::{FileWatchAdapter, FileWatchConfig};
pub use network::{BodyFormat, NetworkAdapter, NetworkConfig};
pub use slot::{SourceSlot, TextSnapshot};
pub use stdin::{FeedState, LineFeed, LineFollower, StdinConfig};

use crate::animation::BuildContext;
use crate::config::AnimationConfig;
use crate::error::{LedseqError, Result};
use crate::status::{StatusEvent, StatusSender};
use async_trait::async_trait;
use log::{debug, warn};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Options understood by every text-bearing animation.
pub const SOURCE_OPTIONS: &[&str] = &[
    "source",
    "text",
    "path",
    "tail_lines",
    "separator",
    "poll_interval",
    "url",
    "format",
    "json_pointer",
    "command",
    "refresh_interval",
    "timeout",
];

const DEFAULT_TEXT: &str = "Hello World";
const DEFAULT_SEPARATOR: &str = " | ";

/// An acquisition strategy driven by its own background task.
#[async_trait]
pub trait SourceAdapter: Send {
    /// Short strategy name used in logs and errors
    fn kind(&self) -> &'static str;

    /// Text already available before the task starts, if any.
    fn current_text(&self) -> Option<String> {
        None
    }

    /// Acquire and publish content until `ctx` is cancelled or the input ends.
    async fn run(self: Box<Self>, ctx: RefreshContext);
}

/// Everything an adapter task needs to publish content and report failures.
#[derive(Debug, Clone)]
pub struct RefreshContext {
    label: String,
    kind: &'static str,
    slot: SourceSlot,
    cancel: CancellationToken,
    events: StatusSender,
}

impl RefreshContext {
    pub fn new(
        label: impl Into<String>,
        kind: &'static str,
        slot: SourceSlot,
        cancel: CancellationToken,
        events: StatusSender,
    ) -> Self {
        Self {
            label: label.into(),
            kind,
            slot,
            cancel,
            events,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn slot(&self) -> &SourceSlot {
        &self.slot
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Publish `text` unless it equals the current value. Returns the new version.
    pub fn publish(&self, text: impl Into<String>) -> Option<u64> {
        let text = text.into();
        if self.slot.latest().text == text {
            return None;
        }
        let version = self.slot.publish(text);
        debug!("{} source '{}' published version {}", self.kind, self.label, version);
        Some(version)
    }

    /// Record a failed refresh: the published value is kept and a status event is emitted.
    pub fn fail(&self, error: LedseqError) {
        let message = error.to_string();
        warn!("{} source '{}': {}", self.kind, self.label, message);
        self.slot.record_failure(message.clone());
        self.events.emit(StatusEvent::SourceRefreshFailed {
            source: self.label.clone(),
            error: message,
        });
    }
}

/// Run `acquire` once per `every`, bounding each call by `per_call`.
///
/// Ticks missed while a call was in flight are skipped, so attempts stay on the
/// planned schedule. Returns when the context is cancelled.
pub async fn run_periodic<F, Fut>(
    ctx: &RefreshContext,
    every: Duration,
    per_call: Duration,
    mut acquire: F,
)
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<String>> + Send,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            outcome = tokio::time::timeout(per_call, acquire()) => outcome,
        };

        match outcome {
            Ok(Ok(text)) => {
                ctx.publish(text);
            }
            Ok(Err(error)) => ctx.fail(error),
            Err(_) => ctx.fail(LedseqError::acquisition(
                ctx.kind,
                format!("timed out after {} ms", per_call.as_millis()),
            )),
        }
    }
}

/// Acquisition strategy selected by the `source` option.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Static,
    File(FileWatchConfig),
    Stdin(StdinConfig),
    Network(NetworkConfig),
    Command(CommandConfig),
}

impl SourceConfig {
    /// Parse the source options of an animation. Returns the strategy and initial text.
    pub fn from_config(config: &AnimationConfig) -> Result<(SourceConfig, String)> {
        let kind = config.choice(
            "source",
            "static",
            &["static", "file", "stdin", "http", "command"],
        )?;
        let initial_default = if kind == "static" { DEFAULT_TEXT } else { "" };
        let initial = config.str_or("text", initial_default)?;

        let only_for = |keys: &[&str], wanted: &str| -> Result<()> {
            if kind == wanted {
                return Ok(());
            }
            match keys.iter().find(|key| config.contains(key)) {
                Some(key) => Err(LedseqError::invalid_option(
                    *key,
                    format!("only applies to source = \"{wanted}\""),
                )),
                None => Ok(()),
            }
        };
        only_for(&["path", "poll_interval"], "file")?;
        only_for(&["url", "format", "json_pointer"], "http")?;
        only_for(&["command"], "command")?;
        for key in ["tail_lines", "separator"] {
            if kind != "file" && kind != "stdin" && config.contains(key) {
                return Err(LedseqError::invalid_option(
                    key,
                    "only applies to file and stdin sources",
                ));
            }
        }
        if kind != "http" && kind != "command" && config.contains("refresh_interval") {
            return Err(LedseqError::invalid_option(
                "refresh_interval",
                "only applies to http and command sources",
            ));
        }
        if kind != "http" && kind != "command" && config.contains("timeout") {
            return Err(LedseqError::invalid_option(
                "timeout",
                "only applies to http and command sources",
            ));
        }

        let source = match kind.as_str() {
            "static" => SourceConfig::Static,
            "stdin" => SourceConfig::Stdin(StdinConfig {
                tail_lines: config.optional_count("tail_lines")?.unwrap_or(1),
                separator: config.str_or("separator", DEFAULT_SEPARATOR)?,
            }),
            "file" => SourceConfig::File(FileWatchConfig {
                path: PathBuf::from(config.required_str("path")?),
                tail_lines: config.optional_count("tail_lines")?,
                separator: config.str_or("separator", DEFAULT_SEPARATOR)?,
                poll_interval: config.secs_in("poll_interval", Duration::from_secs(1), 0.01..=3600.0)?,
            }),
            "http" => {
                let format = match config
                    .choice("format", "text", &["text", "first-line", "json"])?
                    .as_str()
                {
                    "first-line" => BodyFormat::FirstLine,
                    "json" => BodyFormat::Json {
                        pointer: config.str_or("json_pointer", "")?,
                    },
                    _ => BodyFormat::Text,
                };
                if !matches!(format, BodyFormat::Json { .. }) && config.contains("json_pointer") {
                    return Err(LedseqError::invalid_option(
                        "json_pointer",
                        "only applies to format = \"json\"",
                    ));
                }
                let url = config.required_str("url")?;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(LedseqError::invalid_option(
                        "url",
                        "must start with http:// or https://",
                    ));
                }
                SourceConfig::Network(NetworkConfig {
                    url,
                    format,
                    refresh_interval: config.secs_in(
                        "refresh_interval",
                        Duration::from_secs(30),
                        0.01..=86_400.0,
                    )?,
                    timeout: config.secs_in("timeout", Duration::from_secs(5), 0.01..=600.0)?,
                })
            }
            _ => {
                let argv = config
                    .string_list("command")?
                    .ok_or_else(|| LedseqError::invalid_option("command", "required option is missing"))?;
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| LedseqError::invalid_option("command", "must not be empty"))?;
                SourceConfig::Command(CommandConfig {
                    program: program.clone(),
                    args: args.to_vec(),
                    refresh_interval: config.secs_in(
                        "refresh_interval",
                        Duration::from_secs(5),
                        0.01..=86_400.0,
                    )?,
                    timeout: config.secs_in("timeout", Duration::from_secs(2), 0.01..=600.0)?,
                })
            }
        };
        Ok((source, initial))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Static => "static",
            SourceConfig::File(_) => "file",
            SourceConfig::Stdin(_) => "stdin",
            SourceConfig::Network(_) => "http",
            SourceConfig::Command(_) => "command",
        }
    }

    /// Build the background adapter for this strategy; `None` for static text.
    pub fn into_adapter(self) -> Result<Option<Box<dyn SourceAdapter>>> {
        Ok(match self {
            SourceConfig::Static => None,
            SourceConfig::File(config) => Some(Box::new(FileWatchAdapter::new(config))),
            SourceConfig::Stdin(config) => Some(Box::new(LineFollower::new(
                LineFeed::stdin(),
                config.tail_lines,
                config.separator,
            ))),
            SourceConfig::Network(config) => Some(Box::new(NetworkAdapter::new(config)?)),
            SourceConfig::Command(config) => Some(Box::new(CommandAdapter::new(config))),
        })
    }
}

struct SourceWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// A text source owned by one animation.
pub struct TextSource {
    label: String,
    kind: &'static str,
    slot: SourceSlot,
    adapter: Option<Box<dyn SourceAdapter>>,
    worker: Option<SourceWorker>,
    events: StatusSender,
    grace: Duration,
}

impl TextSource {
    pub fn new(
        label: impl Into<String>,
        initial: impl Into<String>,
        adapter: Option<Box<dyn SourceAdapter>>,
        events: StatusSender,
        grace: Duration,
    ) -> Self {
        let kind = adapter.as_ref().map(|a| a.kind()).unwrap_or("static");
        Self {
            label: label.into(),
            kind,
            slot: SourceSlot::new(initial),
            adapter,
            worker: None,
            events,
            grace,
        }
    }

    /// A source that never changes.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new("static", text, None, StatusSender::disabled(), Duration::ZERO)
    }

    /// Build the source described by an animation's options.
    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        let (source, mut initial) = SourceConfig::from_config(config)?;
        let adapter = source.into_adapter()?;
        if let Some(text) = adapter.as_ref().and_then(|adapter| adapter.current_text()) {
            initial = text;
        }
        Ok(Self::new(
            config.name(),
            initial,
            adapter,
            ctx.events.clone(),
            ctx.teardown_grace,
        ))
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn slot(&self) -> &SourceSlot {
        &self.slot
    }

    /// Latest published snapshot; never waits for an acquisition.
    pub fn latest(&self) -> Arc<TextSnapshot> {
        self.slot.latest()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| !worker.handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the background task. Static sources and repeated calls do nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        let Some(adapter) = self.adapter.take() else {
            return;
        };
        let cancel = CancellationToken::new();
        let ctx = RefreshContext::new(
            self.label.clone(),
            adapter.kind(),
            self.slot.clone(),
            cancel.clone(),
            self.events.clone(),
        );
        debug!("starting {} source for '{}'", self.kind, self.label);
        let handle = tokio::spawn(adapter.run(ctx));
        self.worker = Some(SourceWorker { cancel, handle });
    }

    /// Cancel the background task and wait for it within the grace period.
    ///
    /// On timeout the task is aborted and `TeardownTimeout` is returned; the source
    /// is stopped either way.
    pub async fn stop(&mut self) -> Result<()> {
        self.adapter = None;
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };
        worker.cancel.cancel();
        match tokio::time::timeout(self.grace, &mut worker.handle).await {
            Ok(_) => {
                debug!("{} source for '{}' stopped", self.kind, self.label);
                Ok(())
            }
            Err(_) => {
                worker.handle.abort();
                warn!(
                    "{} source for '{}' ignored its stop signal; task aborted",
                    self.kind, self.label
                );
                Err(LedseqError::teardown_timeout(&self.label))
            }
        }
    }
}

impl Drop for TextSource {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.cancel();
            worker.handle.abort();
        }
    }
}

impl std::fmt::Debug for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSource")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("version", &self.slot.version())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionValue;

    fn config(options: Vec<(&str, OptionValue)>) -> AnimationConfig {
        AnimationConfig::new(
            "entry",
            options
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn offending_option(err: LedseqError) -> String {
        match err {
            LedseqError::InvalidConfiguration { option, .. } => option,
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn defaults_to_static_hello_world() {
        let (source, initial) = SourceConfig::from_config(&config(vec![])).unwrap();
        assert_eq!(source, SourceConfig::Static);
        assert_eq!(initial, "Hello World");
    }

    #[test]
    fn file_source_requires_path() {
        let err = SourceConfig::from_config(&config(vec![("source", "file".into())])).unwrap_err();
        assert_eq!(offending_option(err), "path");
    }

    #[test]
    fn options_for_other_sources_are_rejected() {
        let err = SourceConfig::from_config(&config(vec![
            ("source", "file".into()),
            ("path", "/tmp/x".into()),
            ("url", "http://localhost".into()),
        ]))
        .unwrap_err();
        assert_eq!(offending_option(err), "url");

        let err = SourceConfig::from_config(&config(vec![("timeout", 1_i64.into())])).unwrap_err();
        assert_eq!(offending_option(err), "timeout");
    }

    #[test]
    fn stdin_source_joins_tail_lines() {
        let (source, initial) = SourceConfig::from_config(&config(vec![
            ("source", "stdin".into()),
            ("tail_lines", 3_i64.into()),
            ("separator", " / ".into()),
        ]))
        .unwrap();
        assert_eq!(initial, "");
        assert_eq!(
            source,
            SourceConfig::Stdin(StdinConfig {
                tail_lines: 3,
                separator: " / ".into(),
            })
        );

        let (source, _) =
            SourceConfig::from_config(&config(vec![("source", "stdin".into())])).unwrap();
        assert_eq!(
            source,
            SourceConfig::Stdin(StdinConfig {
                tail_lines: 1,
                separator: " | ".into(),
            })
        );
    }

    #[test]
    fn line_options_need_a_line_source() {
        let err = SourceConfig::from_config(&config(vec![("separator", ", ".into())])).unwrap_err();
        assert_eq!(offending_option(err), "separator");

        let err = SourceConfig::from_config(&config(vec![
            ("source", "command".into()),
            ("command", vec!["date"].into()),
            ("tail_lines", 2_i64.into()),
        ]))
        .unwrap_err();
        assert_eq!(offending_option(err), "tail_lines");
    }

    #[test]
    fn command_source_splits_argv() {
        let (source, initial) = SourceConfig::from_config(&config(vec![
            ("source", "command".into()),
            ("command", vec!["date", "+%H:%M"].into()),
            ("refresh_interval", 10_i64.into()),
        ]))
        .unwrap();
        assert_eq!(initial, "");
        match source {
            SourceConfig::Command(cmd) => {
                assert_eq!(cmd.program, "date");
                assert_eq!(cmd.args, vec!["+%H:%M".to_string()]);
                assert_eq!(cmd.refresh_interval, Duration::from_secs(10));
                assert_eq!(cmd.timeout, Duration::from_secs(2));
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn http_source_validates_url_and_format() {
        let err = SourceConfig::from_config(&config(vec![
            ("source", "http".into()),
            ("url", "ftp://example.com".into()),
        ]))
        .unwrap_err();
        assert_eq!(offending_option(err), "url");

        let (source, _) = SourceConfig::from_config(&config(vec![
            ("source", "http".into()),
            ("url", "http://127.0.0.1:8080/status".into()),
            ("format", "json".into()),
            ("json_pointer", "/message".into()),
        ]))
        .unwrap();
        match source {
            SourceConfig::Network(net) => assert_eq!(
                net.format,
                BodyFormat::Json {
                    pointer: "/message".into()
                }
            ),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn identical_text_keeps_the_version() {
        let slot = SourceSlot::new("");
        let ctx = RefreshContext::new(
            "clock",
            "command",
            slot.clone(),
            CancellationToken::new(),
            StatusSender::disabled(),
        );
        assert_eq!(ctx.publish("12:00"), Some(1));
        assert_eq!(ctx.publish("12:00"), None);
        assert_eq!(slot.latest().version, 1);
        assert_eq!(ctx.publish("12:01"), Some(2));
    }

    #[tokio::test]
    async fn static_source_has_no_task() {
        let mut source = TextSource::fixed("fixed");
        source.start();
        assert!(!source.is_running());
        assert_eq!(source.latest().text, "fixed");
        source.stop().await.unwrap();
    }

    struct StubbornAdapter;

    #[async_trait]
    impl SourceAdapter for StubbornAdapter {
        fn kind(&self) -> &'static str {
            "stubborn"
        }

        async fn run(self: Box<Self>, _ctx: RefreshContext) {
            // Ignores cancellation entirely
            std::future::pending::<()>().await;
        }
    }

    struct PoliteAdapter;

    #[async_trait]
    impl SourceAdapter for PoliteAdapter {
        fn kind(&self) -> &'static str {
            "polite"
        }

        async fn run(self: Box<Self>, ctx: RefreshContext) {
            ctx.publish("hello");
            ctx.cancel_token().cancelled().await;
        }
    }

    #[tokio::test]
    async fn stop_waits_for_cooperative_task() {
        let mut source = TextSource::new(
            "polite",
            "",
            Some(Box::new(PoliteAdapter)),
            StatusSender::disabled(),
            Duration::from_millis(500),
        );
        source.start();
        tokio::time::timeout(Duration::from_secs(1), async {
            while source.slot().version() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(source.latest().text, "hello");
        source.stop().await.unwrap();
        assert!(!source.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_task_that_ignores_cancellation() {
        let mut source = TextSource::new(
            "stubborn",
            "",
            Some(Box::new(StubbornAdapter)),
            StatusSender::disabled(),
            Duration::from_millis(100),
        );
        source.start();
        let err = source.stop().await.unwrap_err();
        assert!(matches!(err, LedseqError::TeardownTimeout { .. }));
        assert!(!source.is_running());
    }
}
