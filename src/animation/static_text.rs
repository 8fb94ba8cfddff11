//! Text held at a fixed anchor.
//!
//! Coordinates have their origin at the top-left pixel with x growing right and y
//! growing down. `position` picks the anchor and `offset_x` / `offset_y` shift from it.

use crate::animation::text::{centered_row, text_options, TextContent, TextStyle};
use crate::animation::{Animation, BuildContext};
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::font;
use crate::frame::Frame;
use crate::input::Action;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl Anchor {
    fn parse(value: &str) -> Self {
        match value {
            "top" => Anchor::Top,
            "bottom" => Anchor::Bottom,
            "left" => Anchor::Left,
            "right" => Anchor::Right,
            _ => Anchor::Center,
        }
    }

    /// Top-left corner for text `text_width` pixels wide on a `width`×`height` grid.
    pub fn origin(self, text_width: i32, width: usize, height: usize) -> (i32, i32) {
        let (w, h) = (width as i32, height as i32);
        let center_x = (w - text_width) / 2;
        let center_y = centered_row(height);
        match self {
            Anchor::Center => (center_x, center_y),
            Anchor::Top => (center_x, 0),
            Anchor::Bottom => (center_x, h - font::GLYPH_HEIGHT),
            Anchor::Left => (0, center_y),
            Anchor::Right => (w - text_width, center_y),
        }
    }
}

pub struct StaticText {
    name: String,
    content: TextContent,
    style: TextStyle,
    anchor: Anchor,
    offset: (i32, i32),
    grid: (usize, usize),
}

impl StaticText {
    pub const OPTIONS: &'static [&'static str] = &["position", "offset_x", "offset_y"];

    pub fn from_config(config: &AnimationConfig, ctx: &BuildContext) -> Result<Self> {
        config.ensure_only(&text_options(Self::OPTIONS))?;
        let anchor = Anchor::parse(&config.choice(
            "position",
            "center",
            &["center", "top", "bottom", "left", "right"],
        )?);
        let offset_x = config.i64_in("offset_x", 0, -256..=256)? as i32;
        let offset_y = config.i64_in("offset_y", 0, -256..=256)? as i32;
        Ok(Self {
            name: config.name().to_string(),
            style: TextStyle::from_config(config)?,
            content: TextContent::from_config(config, ctx)?,
            anchor,
            offset: (offset_x, offset_y),
            grid: (ctx.width, ctx.height),
        })
    }

    fn origin(&self) -> (i32, i32) {
        let (x, y) = self.anchor.origin(self.content.width(), self.grid.0, self.grid.1);
        (x + self.offset.0, y + self.offset.1)
    }
}

#[async_trait]
impl Animation for StaticText {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        self.content.start();
    }

    fn update(&mut self, dt: Duration) {
        self.content.refresh();
        self.style.advance(dt);
    }

    fn render(&self, frame: &mut Frame) {
        let (x, y) = self.origin();
        font::draw_text(frame, self.content.text(), x, y, |text_x, _| {
            self.style.color_at(text_x)
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
