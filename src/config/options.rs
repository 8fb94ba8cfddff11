//! Validated option access for animation constructors.
//!
//! Constructors call [`AnimationConfig::ensure_only`] with the options they recognize
//! and then read each one through a typed getter. Every failure names the offending
//! option so a bad run file is rejected before playback starts.

use crate::config::{AnimationSpec, OptionValue};
use crate::error::{LedseqError, Result};
use crate::frame::Rgb;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Option bundle for one animation, as declared in its [`AnimationSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    name: String,
    options: Vec<(String, OptionValue)>,
}

impl AnimationConfig {
    pub fn new(name: impl Into<String>, options: Vec<(String, OptionValue)>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    pub fn from_spec(spec: &AnimationSpec) -> Self {
        Self::new(spec.display_name(), spec.options.clone())
    }

    /// Display name of the entry these options belong to
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Reject any option not listed in `allowed`.
    pub fn ensure_only(&self, allowed: &[&str]) -> Result<()> {
        for (key, _) in &self.options {
            if !allowed.contains(&key.as_str()) {
                return Err(LedseqError::invalid_option(key, "unrecognized option"));
            }
        }
        Ok(())
    }

    pub fn required_str(&self, key: &str) -> Result<String> {
        match self.get(key) {
            Some(OptionValue::Str(value)) => Ok(value.clone()),
            Some(other) => Err(wrong_type(key, "string", other)),
            None => Err(LedseqError::invalid_option(key, "required option is missing")),
        }
    }

    pub fn str_or(&self, key: &str, default: &str) -> Result<String> {
        match self.get(key) {
            None => Ok(default.to_string()),
            Some(_) => self.required_str(key),
        }
    }

    /// A string restricted to one of `choices`, compared case-insensitively.
    pub fn choice(&self, key: &str, default: &str, choices: &[&str]) -> Result<String> {
        let value = self.str_or(key, default)?.trim().to_ascii_lowercase();
        if choices.contains(&value.as_str()) {
            Ok(value)
        } else {
            Err(LedseqError::invalid_option(
                key,
                format!("'{value}' is not one of {}", choices.join(", ")),
            ))
        }
    }

    pub fn f64_in(&self, key: &str, default: f64, range: RangeInclusive<f64>) -> Result<f64> {
        let value = match self.get(key) {
            None => return Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| wrong_type(key, "number", value))?,
        };
        if !value.is_finite() || !range.contains(&value) {
            return Err(LedseqError::invalid_option(
                key,
                format!(
                    "{value} is outside the allowed range {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }
        Ok(value)
    }

    /// A duration given in (fractional) seconds.
    pub fn secs_in(
        &self,
        key: &str,
        default: Duration,
        range: RangeInclusive<f64>,
    ) -> Result<Duration> {
        let secs = self.f64_in(key, default.as_secs_f64(), range)?;
        Ok(Duration::from_secs_f64(secs))
    }

    pub fn i64_in(&self, key: &str, default: i64, range: RangeInclusive<i64>) -> Result<i64> {
        let value = match self.get(key) {
            None => return Ok(default),
            Some(OptionValue::Int(v)) => *v,
            Some(other) => return Err(wrong_type(key, "integer", other)),
        };
        if !range.contains(&value) {
            return Err(LedseqError::invalid_option(
                key,
                format!(
                    "{value} is outside the allowed range {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }
        Ok(value)
    }

    pub fn optional_count(&self, key: &str) -> Result<Option<usize>> {
        if self.contains(key) {
            Ok(Some(self.i64_in(key, 1, 1..=i64::from(u32::MAX))? as usize))
        } else {
            Ok(None)
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Bool(v)) => Ok(*v),
            Some(other) => Err(wrong_type(key, "boolean", other)),
        }
    }

    /// A color given as `[r, g, b]` or `"#rrggbb"`.
    pub fn color_or(&self, key: &str, default: Rgb) -> Result<Rgb> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Str(hex)) => Rgb::parse_hex(hex).ok_or_else(|| {
                LedseqError::invalid_option(key, format!("'{hex}' is not a #rrggbb color"))
            }),
            Some(OptionValue::List(items)) if items.len() == 3 => {
                let mut channels = [0u8; 3];
                for (slot, item) in channels.iter_mut().zip(items) {
                    *slot = match item {
                        OptionValue::Int(v) if (0..=255).contains(v) => *v as u8,
                        _ => {
                            return Err(LedseqError::invalid_option(
                                key,
                                "color channels must be integers in 0..=255",
                            ))
                        }
                    };
                }
                Ok(Rgb(channels[0], channels[1], channels[2]))
            }
            Some(other) => Err(wrong_type(key, "[r, g, b] list or #rrggbb string", other)),
        }
    }

    pub fn string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    OptionValue::Str(s) => Ok(s.clone()),
                    other => Err(wrong_type(key, "list of strings", other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(wrong_type(key, "list of strings", other)),
        }
    }
}

fn wrong_type(key: &str, expected: &str, found: &OptionValue) -> LedseqError {
    LedseqError::invalid_option(
        key,
        format!("expected {expected}, found {}", found.type_name()),
    )
}
