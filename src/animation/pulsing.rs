//! Centered text whose brightness breathes between a floor and full intensity.

use crate::animation::static_text::Anchor;
use crate::animation::text::{text_options, TextContent, TextStyle};
use crate::animation::{Animation, BuildContext};
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::font;
use crate::frame::Frame;
use crate::input::Action;
use async_trait::async_trait;
use log::debug;
use std::f64::consts::TAU;
use std::time::Duration;

/// Period multipliers cycled by `toggle-a`
const PERIOD_FACTORS: [f64; 3] = [1.0, 0.5, 2.0];

pub struct PulsingText {
    name: String,
    content: TextContent,
    style: TextStyle,
    base_period: f64,
    factor_index: usize,
    min_brightness: f64,
    grid: (usize, usize),
    /// Pulse phase in cycles, kept in `[0, 1)`
    phase: f64,
}

impl PulsingText {
    pub const OPTIONS: &'static [&'static str] = &["period", "min_brightness"];

    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        config.ensure_only(&text_options(Self::OPTIONS))?;
        Ok(Self {
            name: config.name().to_string(),
            base_period: config.f64_in("period", 2.0, 0.1..=60.0)?,
            min_brightness: config.f64_in("min_brightness", 0.1, 0.0..=1.0)?,
            style: TextStyle::from_config(config)?,
            content: TextContent::from_config(config, ctx)?,
            grid: (ctx.width, ctx.height),
            factor_index: 0,
            phase: 0.0,
        })
    }

    /// Current period in seconds.
    pub fn period(&self) -> f64 {
        (self.base_period * PERIOD_FACTORS[self.factor_index]).clamp(0.1, 60.0)
    }

    pub fn brightness(&self) -> f32 {
        let wave = 0.5 - 0.5 * (self.phase * TAU).cos();
        (self.min_brightness + (1.0 - self.min_brightness) * wave) as f32
    }
}

#[async_trait]
impl Animation for PulsingText {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        self.content.start();
    }

    fn update(&mut self, dt: Duration) {
        self.content.refresh();
        self.style.advance(dt);
        self.phase = (self.phase + dt.as_secs_f64() / self.period()).fract();
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
            Action::ToggleA => {
                self.factor_index = (self.factor_index + 1) % PERIOD_FACTORS.len();
                debug!("'{}' pulse period now {:.2}s", self.name, self.period());
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

    fn build(options: Vec<(&str, OptionValue)>) -> PulsingText {
        let config = AnimationConfig::new(
            "pulsing",
            options
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        PulsingText::from_config(&config, &BuildContext::new(17, 7)).unwrap()
    }

    #[test]
    fn brightness_spans_floor_to_full() {
        let mut animation = build(vec![("min_brightness", 0.2.into())]);
        assert!((animation.brightness() - 0.2).abs() < 1e-6);
        animation.update(Duration::from_secs(1));
        assert!((animation.brightness() - 1.0).abs() < 1e-6);
        animation.update(Duration::from_secs(1));
        assert!((animation.brightness() - 0.2).abs() < 1e-4);
    }

    #[test]
    fn toggle_a_halves_then_doubles_period() {
        let mut animation = build(vec![]);
        assert_eq!(animation.period(), 2.0);
        assert!(animation.handle_input(&Action::ToggleA));
        assert_eq!(animation.period(), 1.0);
        animation.handle_input(&Action::ToggleA);
        assert_eq!(animation.period(), 4.0);
        animation.handle_input(&Action::ToggleA);
        assert_eq!(animation.period(), 2.0);
    }

    #[test]
    fn secondary_is_not_consumed() {
        let mut animation = build(vec![]);
        assert!(!animation.handle_input(&Action::Secondary));
    }
}
