//! Centered text that repeatedly fades in, holds, and fades out.

use crate::animation::static_text::Anchor;
use crate::animation::text::{text_options, TextContent, TextStyle};
use crate::animation::{Animation, BuildContext};
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::font;
use crate::frame::Frame;
use crate::input::Action;
use async_trait::async_trait;
use std::time::Duration;

pub struct FadeText {
    name: String,
    content: TextContent,
    style: TextStyle,
    fade_in: Duration,
    hold: Duration,
    fade_out: Duration,
    grid: (usize, usize),
    /// Position inside the current fade cycle
    phase: Duration,
}

impl FadeText {
    pub const OPTIONS: &'static [&'static str] = &["fade_in", "hold", "fade_out"];

    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        config.ensure_only(&text_options(Self::OPTIONS))?;
        Ok(Self {
            name: config.name().to_string(),
            fade_in: config.secs_in("fade_in", Duration::from_secs(1), 0.0..=60.0)?,
            hold: config.secs_in("hold", Duration::from_secs(2), 0.0..=60.0)?,
            fade_out: config.secs_in("fade_out", Duration::from_secs(1), 0.0..=60.0)?,
            style: TextStyle::from_config(config)?,
            content: TextContent::from_config(config, ctx)?,
            grid: (ctx.width, ctx.height),
            phase: Duration::ZERO,
        })
    }

    fn cycle(&self) -> Duration {
        self.fade_in + self.hold + self.fade_out
    }

    /// Brightness in `[0, 1]` at the current phase.
    pub fn brightness(&self) -> f32 {
        let t = self.phase;
        if t < self.fade_in {
            t.as_secs_f32() / self.fade_in.as_secs_f32()
        } else if t < self.fade_in + self.hold {
            1.0
        } else if !self.fade_out.is_zero() {
            let into = (t - self.fade_in - self.hold).as_secs_f32();
            (1.0 - into / self.fade_out.as_secs_f32()).max(0.0)
        } else {
            1.0
        }
    }
}

#[async_trait]
impl Animation for FadeText {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        self.content.start();
    }

    fn update(&mut self, dt: Duration) {
        self.content.refresh();
        self.style.advance(dt);
        let cycle = self.cycle();
        if cycle.is_zero() {
            return;
        }
        let phase = (self.phase + dt).as_nanos() % cycle.as_nanos();
        self.phase = Duration::from_nanos(phase as u64);
    }

    fn render(&self, frame: &mut Frame) {
        let brightness = self.brightness();
        let (x, y) = Anchor::Center.origin(self.content.width(), self.grid.0, self.grid.1);
        font::draw_text(frame, self.content.text(), x, y, |text_x, _| {
            self.style.color_at(text_x).scale(brightness)
        });
    }

    fn handle_input(&mut self, action: &Action) -> bool {
        match action {
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

    fn build(options: Vec<(&str, OptionValue)>) -> FadeText {
        let config = AnimationConfig::new(
            "fade",
            options
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        FadeText::from_config(&config, &BuildContext::new(17, 7)).unwrap()
    }

    #[test]
    fn brightness_follows_envelope() {
        let mut animation = build(vec![]);
        assert_eq!(animation.brightness(), 0.0);

        animation.update(Duration::from_millis(500));
        assert!((animation.brightness() - 0.5).abs() < 1e-6);

        animation.update(Duration::from_millis(1500));
        assert_eq!(animation.brightness(), 1.0);

        animation.update(Duration::from_millis(1500));
        assert!((animation.brightness() - 0.5).abs() < 1e-6);

        // Cycle is 4 s; 4.5 s in is halfway through the next fade-in
        animation.update(Duration::from_millis(1000));
        assert!((animation.brightness() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_length_cycle_is_fully_lit() {
        let mut animation = build(vec![
            ("fade_in", 0_i64.into()),
            ("hold", 0_i64.into()),
            ("fade_out", 0_i64.into()),
        ]);
        animation.update(Duration::from_secs(3));
        assert_eq!(animation.brightness(), 1.0);
    }

    #[test]
    fn dark_at_start_of_fade_in() {
        let animation = build(vec![("text", "HI".into())]);
        let mut frame = Frame::new(17, 7);
        animation.render(&mut frame);
        assert_eq!(frame.lit_pixel_count(), 0);
    }
}
