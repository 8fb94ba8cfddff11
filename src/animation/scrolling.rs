//! Marquee text entering from the right edge and repeating with a gap.

use crate::animation::text::{centered_row, text_options, TextContent, TextStyle};
use crate::animation::{Animation, BuildContext};
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::font;
use crate::frame::Frame;
use crate::input::Action;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

/// Presets cycled by `toggle-a` (pixels per second)
const SPEED_PRESETS: [f64; 3] = [5.0, 10.0, 20.0];

pub struct ScrollingText {
    name: String,
    content: TextContent,
    style: TextStyle,
    speed: f64,
    gap: i32,
    baseline: i32,
    width: usize,
    /// Distance scrolled since entering, in pixels
    travelled: f64,
}

impl ScrollingText {
    pub const OPTIONS: &'static [&'static str] = &["speed", "gap", "baseline"];

    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        config.ensure_only(&text_options(Self::OPTIONS))?;
        let baseline = config.i64_in(
            "baseline",
            i64::from(centered_row(ctx.height)),
            -(font::GLYPH_HEIGHT as i64)..=ctx.height as i64,
        )?;
        Ok(Self {
            name: config.name().to_string(),
            speed: config.f64_in("speed", 10.0, 1.0..=200.0)?,
            gap: config.i64_in("gap", 6, 0..=256)? as i32,
            baseline: baseline as i32,
            style: TextStyle::from_config(config)?,
            content: TextContent::from_config(config, ctx)?,
            width: ctx.width,
            travelled: 0.0,
        })
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Distance between the starts of two consecutive copies.
    fn cycle(&self) -> i32 {
        (self.content.width() + self.gap).max(1)
    }

    /// X of the leftmost copy that may still be visible.
    fn lead_x(&self) -> i32 {
        let width = self.width as f64;
        let scrolled = if self.travelled < width {
            self.travelled
        } else {
            width + (self.travelled - width) % f64::from(self.cycle())
        };
        (width - scrolled).floor() as i32
    }

    fn next_speed(&self) -> f64 {
        SPEED_PRESETS
            .iter()
            .copied()
            .find(|preset| *preset > self.speed + f64::EPSILON)
            .unwrap_or(SPEED_PRESETS[0])
    }
}

#[async_trait]
impl Animation for ScrollingText {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        self.content.start();
    }

    fn update(&mut self, dt: Duration) {
        self.content.refresh();
        self.style.advance(dt);
        self.travelled += self.speed * dt.as_secs_f64();
    }

    fn render(&self, frame: &mut Frame) {
        if self.content.text().is_empty() {
            return;
        }
        let cycle = self.cycle();
        let mut x = self.lead_x();
        while x < self.width as i32 {
            font::draw_text(frame, self.content.text(), x, self.baseline, |text_x, _| {
                self.style.color_at(text_x)
            });
            x += cycle;
        }
    }

    fn handle_input(&mut self, action: &Action) -> bool {
        match action {
            Action::ToggleA => {
                self.speed = self.next_speed();
                debug!("'{}' scrolling at {} px/s", self.name, self.speed);
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

    fn build(options: Vec<(&str, OptionValue)>) -> ScrollingText {
        let config = AnimationConfig::new(
            "scrolling",
            options
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        ScrollingText::from_config(&config, &BuildContext::new(17, 7)).unwrap()
    }

    #[test]
    fn enters_from_the_right_edge() {
        let mut animation = build(vec![("text", "I".into())]);
        let mut frame = Frame::new(17, 7);
        animation.render(&mut frame);
        assert_eq!(frame.lit_pixel_count(), 0);

        // 10 px/s for 0.1 s moves one column into view
        animation.update(Duration::from_millis(100));
        let mut frame = Frame::new(17, 7);
        animation.render(&mut frame);
        assert!(frame.lit_pixel_count() > 0);
        assert!((0..16).all(|x| (0..7).all(|y| frame.get(x, y) == Some(crate::frame::Rgb::BLACK))));
    }

    #[test]
    fn wraps_with_gap() {
        // "I" is 3 wide, gap 6: the pattern repeats every 9 pixels once in steady state
        let mut animation = build(vec![("text", "I".into()), ("speed", 1_i64.into())]);
        animation.update(Duration::from_secs(17));
        let first = animation.lead_x();
        animation.update(Duration::from_secs(9));
        assert_eq!(animation.lead_x(), first);
    }

    #[test]
    fn toggle_a_cycles_speed_presets() {
        let mut animation = build(vec![]);
        assert_eq!(animation.speed(), 10.0);
        assert!(animation.handle_input(&Action::ToggleA));
        assert_eq!(animation.speed(), 20.0);
        animation.handle_input(&Action::ToggleA);
        assert_eq!(animation.speed(), 5.0);
        animation.handle_input(&Action::ToggleA);
        assert_eq!(animation.speed(), 10.0);
    }

    #[test]
    fn speed_out_of_range_is_rejected() {
        let config = AnimationConfig::new("s", vec![("speed".into(), OptionValue::Int(0))]);
        assert!(ScrollingText::from_config(&config, &BuildContext::new(17, 7)).is_err());
    }
}
