//! Pieces shared by every text-bearing animation: the owned text source with its
//! cached snapshot, and per-pixel color effects.

use crate::animation::BuildContext;
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::font;
use crate::frame::Rgb;
use crate::source::{TextSnapshot, TextSource, SOURCE_OPTIONS};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

const STYLE_OPTIONS: &[&str] = &["color", "color_mode"];

/// Every option a text animation accepts: source and style options plus `extra`.
pub fn text_options(extra: &[&'static str]) -> Vec<&'static str> {
    SOURCE_OPTIONS
        .iter()
        .chain(STYLE_OPTIONS)
        .chain(extra)
        .copied()
        .collect()
}

/// Vertical position that centers a glyph row in a grid of `height` pixels.
pub fn centered_row(height: usize) -> i32 {
    (height as i32 - font::GLYPH_HEIGHT) / 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Static,
    Rainbow,
    Pulse,
}

impl ColorMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "static" => Some(ColorMode::Static),
            "rainbow" => Some(ColorMode::Rainbow),
            "pulse" => Some(ColorMode::Pulse),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ColorMode::Static => ColorMode::Rainbow,
            ColorMode::Rainbow => ColorMode::Pulse,
            ColorMode::Pulse => ColorMode::Static,
        }
    }
}

/// Base color plus a time-driven color effect.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    color: Rgb,
    mode: ColorMode,
    clock: Duration,
}

impl TextStyle {
    pub fn new(color: Rgb, mode: ColorMode) -> Self {
        Self {
            color,
            mode,
            clock: Duration::ZERO,
        }
    }

    pub fn from_config(config: &AnimationConfig) -> Result<Self> {
        let color = config.color_or("color", Rgb::WHITE)?;
        let mode = config.choice("color_mode", "static", &["static", "rainbow", "pulse"])?;
        Ok(Self::new(color, ColorMode::parse(&mode).unwrap_or(ColorMode::Static)))
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn advance(&mut self, dt: Duration) {
        self.clock += dt;
    }

    /// Switch to the next color mode and return it.
    pub fn cycle_mode(&mut self) -> ColorMode {
        self.mode = self.mode.next();
        self.mode
    }

    /// Color of a lit pixel `text_x` columns into the text.
    pub fn color_at(&self, text_x: i32) -> Rgb {
        let t = self.clock.as_secs_f32();
        match self.mode {
            ColorMode::Static => self.color,
            ColorMode::Rainbow => Rgb::from_hsv(text_x as f32 / 32.0 + t * 0.2, 1.0, 1.0),
            ColorMode::Pulse => self.color.scale(0.3 + 0.7 * (0.5 + 0.5 * (t * TAU).sin())),
        }
    }
}

/// The animation's own text source plus the snapshot it last rendered.
#[derive(Debug)]
pub struct TextContent {
    source: TextSource,
    snapshot: Arc<TextSnapshot>,
    width: i32,
}

impl TextContent {
    pub fn new(source: TextSource) -> Self {
        let snapshot = source.latest();
        let width = font::text_width(&snapshot.text);
        Self {
            source,
            snapshot,
            width,
        }
    }

    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        Ok(Self::new(TextSource::from_config(config, ctx)?))
    }

    pub fn start(&mut self) {
        self.source.start();
    }

    /// Pick up a newer published value. Returns true when the text changed.
    pub fn refresh(&mut self) -> bool {
        let latest = self.source.latest();
        if latest.version == self.snapshot.version {
            return false;
        }
        self.width = font::text_width(&latest.text);
        self.snapshot = latest;
        true
    }

    pub fn text(&self) -> &str {
        &self.snapshot.text
    }

    /// Rendered width in pixels
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    pub fn source(&self) -> &TextSource {
        &self.source
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.source.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_modes_cycle() {
        let mut style = TextStyle::new(Rgb::WHITE, ColorMode::Static);
        assert_eq!(style.cycle_mode(), ColorMode::Rainbow);
        assert_eq!(style.cycle_mode(), ColorMode::Pulse);
        assert_eq!(style.cycle_mode(), ColorMode::Static);
    }

    #[test]
    fn static_mode_uses_base_color() {
        let mut style = TextStyle::new(Rgb(1, 2, 3), ColorMode::Static);
        style.advance(Duration::from_millis(700));
        assert_eq!(style.color_at(5), Rgb(1, 2, 3));
    }

    #[test]
    fn rainbow_varies_across_columns() {
        let style = TextStyle::new(Rgb::WHITE, ColorMode::Rainbow);
        assert_ne!(style.color_at(0), style.color_at(10));
    }

    #[test]
    fn content_refresh_tracks_versions() {
        let source = TextSource::fixed("AB");
        let slot = source.slot().clone();
        let mut content = TextContent::new(source);
        assert_eq!(content.width(), 7);
        assert!(!content.refresh());

        slot.publish("ABC");
        assert!(content.refresh());
        assert_eq!(content.text(), "ABC");
        assert_eq!(content.width(), 11);
        assert_eq!(content.version(), 1);
    }

    #[test]
    fn option_list_includes_source_and_style() {
        let options = text_options(&["speed"]);
        assert!(options.contains(&"source"));
        assert!(options.contains(&"color_mode"));
        assert!(options.contains(&"speed"));
    }
}
