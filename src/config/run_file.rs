//! TOML run-file loading.
//!
//! ```toml
//! loop = true
//! transition = "fade"
//! transition_duration = 0.5
//! frame_interval = 0.05
//!
//! [[animation]]
//! type = "scrolling"
//! duration = 10
//! text = "Hello"
//! speed = 12
//! ```
//!
//! Keys other than `type`, `name` and `duration` inside an `[[animation]]` table are
//! passed to the animation constructor in declaration order.

use crate::config::{AnimationSpec, OptionValue, SequenceOptions};
use crate::error::{LedseqError, Result};
use crate::sequencer::TransitionKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A parsed run file: global options plus the ordered run list.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFile {
    pub options: SequenceOptions,
    pub entries: Vec<AnimationSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRunFile {
    #[serde(rename = "loop")]
    looping: Option<bool>,
    shuffle: Option<bool>,
    transition: Option<String>,
    transition_duration: Option<f64>,
    default_duration: Option<f64>,
    frame_interval: Option<f64>,
    teardown_grace: Option<f64>,
    sink_failure_threshold: Option<u32>,
    #[serde(default, rename = "animation")]
    animations: Vec<toml::Table>,
}

impl RunFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LedseqError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedseqError::file_error(format!("Failed to read run file: {}", path.display()), e)
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawRunFile = toml::from_str(contents)
            .map_err(|e| LedseqError::config(format!("invalid run file: {e}")))?;

        let defaults = SequenceOptions::default();
        let options = SequenceOptions {
            looping: raw.looping.unwrap_or(defaults.looping),
            shuffle: raw.shuffle.unwrap_or(defaults.shuffle),
            transition: match raw.transition.as_deref() {
                Some(kind) => TransitionKind::parse(kind)?,
                None => defaults.transition,
            },
            transition_duration: seconds("transition_duration", raw.transition_duration)?
                .unwrap_or(defaults.transition_duration),
            default_duration: seconds("default_duration", raw.default_duration)?
                .unwrap_or(defaults.default_duration),
            frame_interval: seconds("frame_interval", raw.frame_interval)?
                .unwrap_or(defaults.frame_interval),
            teardown_grace: seconds("teardown_grace", raw.teardown_grace)?
                .unwrap_or(defaults.teardown_grace),
            sink_failure_threshold: raw
                .sink_failure_threshold
                .unwrap_or(defaults.sink_failure_threshold),
        };
        if options.frame_interval.is_zero() {
            return Err(LedseqError::config("frame_interval must be greater than zero"));
        }

        let entries = raw
            .animations
            .into_iter()
            .enumerate()
            .map(|(index, table)| entry_from_table(index, table))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { options, entries })
    }
}

/// `<config dir>/ledseq/sequence.toml`, when the platform has a config directory.
pub fn default_run_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ledseq").join("sequence.toml"))
}

fn seconds(key: &str, value: Option<f64>) -> Result<Option<Duration>> {
    value
        .map(|v| {
            Duration::try_from_secs_f64(v).map_err(|_| {
                LedseqError::config(format!(
                    "{key} must be a non-negative, representable number of seconds, got {v}"
                ))
            })
        })
        .transpose()
}

fn entry_from_table(index: usize, table: toml::Table) -> Result<AnimationSpec> {
    let mut type_name = None;
    let mut spec_name = None;
    let mut duration = None;
    let mut options = Vec::new();

    for (key, value) in table {
        match key.as_str() {
            "type" => match value {
                toml::Value::String(s) => type_name = Some(s),
                _ => {
                    return Err(LedseqError::config(format!(
                        "animation #{index}: 'type' must be a string"
                    )))
                }
            },
            "name" => match value {
                toml::Value::String(s) => spec_name = Some(s),
                _ => {
                    return Err(LedseqError::config(format!(
                        "animation #{index}: 'name' must be a string"
                    )))
                }
            },
            "duration" => {
                let secs = match value {
                    toml::Value::Integer(v) => v as f64,
                    toml::Value::Float(v) => v,
                    _ => {
                        return Err(LedseqError::config(format!(
                            "animation #{index}: 'duration' must be a number"
                        )))
                    }
                };
                duration = seconds("duration", Some(secs))?;
            }
            _ => {
                let converted = convert_value(&value).ok_or_else(|| {
                    LedseqError::invalid_option(
                        &key,
                        "tables and datetimes are not supported option values",
                    )
                })?;
                options.push((key, converted));
            }
        }
    }

    let type_name = type_name.ok_or_else(|| {
        LedseqError::config(format!("animation #{index} is missing its 'type'"))
    })?;

    Ok(AnimationSpec {
        type_name,
        name: spec_name,
        options,
        duration,
    })
}

fn convert_value(value: &toml::Value) -> Option<OptionValue> {
    match value {
        toml::Value::String(s) => Some(OptionValue::Str(s.clone())),
        toml::Value::Integer(v) => Some(OptionValue::Int(*v)),
        toml::Value::Float(v) => Some(OptionValue::Float(*v)),
        toml::Value::Boolean(v) => Some(OptionValue::Bool(*v)),
        toml::Value::Array(items) => items
            .iter()
            .map(convert_value)
            .collect::<Option<Vec<_>>>()
            .map(OptionValue::List),
        toml::Value::Datetime(_) | toml::Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
loop = false
transition = "wipe-left"
transition_duration = 0.5
frame_interval = 0.1

[[animation]]
type = "static"
duration = 2
text = "HI"
position = "center"

[[animation]]
type = "scrolling"
name = "ticker"
duration = 3.5
source = "command"
command = ["date", "+%H:%M"]
color = [255, 0, 0]
"#;

    #[test]
    fn parses_options_and_entries() {
        let run = RunFile::from_toml_str(SAMPLE).unwrap();
        assert!(!run.options.looping);
        assert_eq!(run.options.frame_interval, Duration::from_millis(100));
        assert_eq!(run.options.transition_duration, Duration::from_millis(500));
        assert_eq!(run.entries.len(), 2);

        let first = &run.entries[0];
        assert_eq!(first.type_name, "static");
        assert_eq!(first.duration, Some(Duration::from_secs(2)));
        let keys: Vec<&str> = first.options.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["text", "position"]);

        let second = &run.entries[1];
        assert_eq!(second.display_name(), "ticker");
        assert_eq!(second.duration, Some(Duration::from_millis(3500)));
        assert_eq!(
            second.options[1].1,
            OptionValue::List(vec!["date".into(), "+%H:%M".into()])
        );
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = RunFile::from_toml_str("[[animation]]\nduration = 1\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        assert!(RunFile::from_toml_str("looping = true\n").is_err());
    }

    #[test]
    fn unknown_transition_is_rejected() {
        assert!(RunFile::from_toml_str("transition = \"spin\"\n").is_err());
    }

    #[test]
    fn unrepresentable_durations_are_rejected() {
        for toml in [
            "[[animation]]\ntype = \"static\"\nduration = 1e30\n",
            "transition_duration = 1e30\n",
            "frame_interval = 1e30\n",
            "default_duration = -2.0\n",
        ] {
            let err = RunFile::from_toml_str(toml).unwrap_err();
            assert!(err.is_configuration(), "{toml}: {err}");
        }
    }

    #[test]
    fn empty_file_uses_defaults() {
        let run = RunFile::from_toml_str("").unwrap();
        assert_eq!(run.options, SequenceOptions::default());
        assert!(run.entries.is_empty());
    }
}
