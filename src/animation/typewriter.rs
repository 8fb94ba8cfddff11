//! Text revealed one character at a time, with an optional blinking cursor.
//!
//! When the revealed prefix is wider than the grid the view follows the newest
//! characters. A new published text restarts the reveal.

use crate::animation::text::{centered_row, text_options, TextContent, TextStyle};
use crate::animation::{Animation, BuildContext};
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::font;
use crate::frame::Frame;
use crate::input::Action;
use async_trait::async_trait;
use std::time::Duration;

/// Cursor on/off half-period
const CURSOR_BLINK: Duration = Duration::from_millis(500);

pub struct TypewriterText {
    name: String,
    content: TextContent,
    style: TextStyle,
    chars_per_second: f64,
    cursor: bool,
    grid: (usize, usize),
    /// Time since the reveal (re)started
    elapsed: Duration,
}

impl TypewriterText {
    pub const OPTIONS: &'static [&'static str] = &["chars_per_second", "cursor"];

    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        config.ensure_only(&text_options(Self::OPTIONS))?;
        Ok(Self {
            name: config.name().to_string(),
            chars_per_second: config.f64_in("chars_per_second", 8.0, 0.5..=100.0)?,
            cursor: config.bool_or("cursor", true)?,
            style: TextStyle::from_config(config)?,
            content: TextContent::from_config(config, ctx)?,
            grid: (ctx.width, ctx.height),
            elapsed: Duration::ZERO,
        })
    }

    /// Number of characters currently revealed.
    pub fn revealed(&self) -> usize {
        let total = self.content.text().chars().count();
        let typed = (self.elapsed.as_secs_f64() * self.chars_per_second).floor() as usize;
        typed.min(total)
    }

    fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn cursor_visible(&self) -> bool {
        self.cursor && (self.elapsed.as_millis() / CURSOR_BLINK.as_millis()) % 2 == 0
    }
}

#[async_trait]
impl Animation for TypewriterText {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        self.content.start();
    }

    fn update(&mut self, dt: Duration) {
        if self.content.refresh() {
            self.restart();
        } else {
            self.elapsed += dt;
        }
        self.style.advance(dt);
    }

    fn render(&self, frame: &mut Frame) {
        let revealed = self.revealed();
        // Reserve one glyph cell for the cursor
        let visible = font::glyphs_fitting(self.grid.0).saturating_sub(usize::from(self.cursor)).max(1);
        let skip = revealed.saturating_sub(visible);
        let shown: String = self
            .content
            .text()
            .chars()
            .skip(skip)
            .take(revealed - skip)
            .collect();

        let y = centered_row(self.grid.1);
        font::draw_text(frame, &shown, 0, y, |text_x, _| self.style.color_at(text_x));

        if self.cursor_visible() {
            let x = if shown.is_empty() {
                0
            } else {
                font::text_width(&shown) + font::GLYPH_SPACING
            };
            for row in 0..font::GLYPH_HEIGHT {
                frame.set(x, y + row, self.style.color());
            }
        }
    }

    fn handle_input(&mut self, action: &Action) -> bool {
        match action {
            Action::ToggleA => {
                self.restart();
                true
            }
            Action::ToggleB => {
                self.style.cycle_mode();
                true
            }
            _ => false,
        }
    }

    async fn on_exit(&mut self) -> Result<()> {
        self.content.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionValue;
    use crate::source::TextSource;

    fn build(options: Vec<(&str, OptionValue)>) -> TypewriterText {
        let config = AnimationConfig::new(
            "typewriter",
            options
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        TypewriterText::from_config(&config, &BuildContext::new(17, 7)).unwrap()
    }

    #[test]
    fn reveals_at_configured_rate() {
        let mut animation = build(vec![
            ("text", "HELLO".into()),
            ("chars_per_second", 4_i64.into()),
        ]);
        assert_eq!(animation.revealed(), 0);
        animation.update(Duration::from_millis(500));
        assert_eq!(animation.revealed(), 2);
        animation.update(Duration::from_secs(10));
        assert_eq!(animation.revealed(), 5);
    }

    #[test]
    fn toggle_a_restarts_reveal() {
        let mut animation = build(vec![("text", "HELLO".into())]);
        animation.update(Duration::from_secs(1));
        assert!(animation.revealed() > 0);
        assert!(animation.handle_input(&Action::ToggleA));
        assert_eq!(animation.revealed(), 0);
    }

    #[test]
    fn new_text_restarts_reveal() {
        let mut animation = build(vec![("text", "AB".into())]);
        animation.update(Duration::from_secs(1));
        assert_eq!(animation.revealed(), 2);

        // Swap in a source we control to publish a new value
        let source = TextSource::fixed("AB");
        let slot = source.slot().clone();
        animation.content = TextContent::new(source);
        slot.publish("CDE");
        animation.update(Duration::from_millis(100));
        assert_eq!(animation.content.text(), "CDE");
        assert_eq!(animation.revealed(), 0);
    }

    #[test]
    fn cursor_can_be_disabled() {
        let animation = build(vec![("text", "".into()), ("cursor", false.into())]);
        let mut frame = Frame::new(17, 7);
        animation.render(&mut frame);
        assert_eq!(frame.lit_pixel_count(), 0);

        let animation = build(vec![("text", "".into())]);
        let mut frame = Frame::new(17, 7);
        animation.render(&mut frame);
        assert_eq!(frame.lit_pixel_count(), 5);
    }
}
