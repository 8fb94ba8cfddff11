//! Declarative sequence configuration.
//!
//! - [`AnimationSpec`] describes one run-list entry: a type name, ordered options and
//!   a duration.
//! - [`SequenceOptions`] carries the global playback options.
//! - [`AnimationConfig`] is the validated option bundle handed to constructors.
//! - [`RunFile`] loads both from TOML.

pub mod options;
pub mod run_file;

pub use options::AnimationConfig;
pub use run_file::{default_run_file_path, RunFile};

use crate::sequencer::TransitionKind;
use std::time::Duration;

/// A single configuration value as written in a run file.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Str(_) => "string",
            OptionValue::Int(_) => "integer",
            OptionValue::Float(_) => "float",
            OptionValue::Bool(_) => "boolean",
            OptionValue::List(_) => "list",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Int(v) => Some(*v as f64),
            OptionValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(values: Vec<T>) -> Self {
        OptionValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// One entry of the run list. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSpec {
    pub type_name: String,
    /// Display name used in logs and status events; defaults to the type name
    pub name: Option<String>,
    pub options: Vec<(String, OptionValue)>,
    /// `None` falls back to [`SequenceOptions::default_duration`]
    pub duration: Option<Duration>,
}

impl AnimationSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            options: Vec::new(),
            duration: None,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_name)
    }
}

/// Global playback options, loaded once before the sequencer starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOptions {
    /// Restart from the first entry after the last one
    pub looping: bool,
    /// Shuffle the run list once at build time
    pub shuffle: bool,
    pub transition: TransitionKind,
    /// Zero means an instantaneous cut
    pub transition_duration: Duration,
    pub default_duration: Duration,
    /// Target interval between frames
    pub frame_interval: Duration,
    /// How long `on_exit` waits for a background task before aborting it
    pub teardown_grace: Duration,
    /// Consecutive display sink failures tolerated before playback aborts
    pub sink_failure_threshold: u32,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            looping: true,
            shuffle: false,
            transition: TransitionKind::Fade,
            transition_duration: Duration::from_secs(1),
            default_duration: Duration::from_secs(5),
            frame_interval: Duration::from_millis(33),
            teardown_grace: Duration::from_millis(500),
            sink_failure_threshold: 10,
        }
    }
}

impl SequenceOptions {
    /// True when entries should be swapped without a blending window.
    pub fn is_cut(&self) -> bool {
        self.transition == TransitionKind::None || self.transition_duration.is_zero()
    }
}
