//! Transition kinds and their blend functions.

use crate::error::{LedseqError, Result};
use crate::frame::Frame;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// How two entries are combined while a transition is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Instantaneous cut
    None,
    /// Per-pixel crossfade
    Fade,
    /// The incoming entry sweeps over the outgoing one in the given direction
    Wipe(WipeDirection),
}

impl TransitionKind {
    /// Parse `none`, `fade`, `wipe` (leftward) or `wipe-<left|right|up|down>`.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        let kind = match normalized.as_str() {
            "none" | "cut" => TransitionKind::None,
            "fade" | "crossfade" => TransitionKind::Fade,
            "wipe" | "wipe-left" => TransitionKind::Wipe(WipeDirection::Left),
            "wipe-right" => TransitionKind::Wipe(WipeDirection::Right),
            "wipe-up" => TransitionKind::Wipe(WipeDirection::Up),
            "wipe-down" => TransitionKind::Wipe(WipeDirection::Down),
            _ => {
                return Err(LedseqError::invalid_option(
                    "transition",
                    format!("unknown transition '{value}'"),
                ))
            }
        };
        Ok(kind)
    }

    /// Blend `incoming` into `outgoing` in place. `progress` 0 keeps the outgoing
    /// frame and 1 yields the incoming frame.
    pub fn blend(self, outgoing: &mut Frame, incoming: &Frame, progress: f32) {
        let p = progress.clamp(0.0, 1.0);
        let (width, height) = (outgoing.width(), outgoing.height());
        match self {
            TransitionKind::None => {
                if p >= 1.0 {
                    outgoing.clone_from(incoming);
                }
            }
            TransitionKind::Fade => {
                for (x, y, color) in incoming.pixels() {
                    if let Some(from) = outgoing.get(x, y) {
                        outgoing.set(x as i32, y as i32, from.lerp(color, p));
                    }
                }
            }
            TransitionKind::Wipe(direction) => {
                let revealed_cols = (p * width as f32).round() as usize;
                let revealed_rows = (p * height as f32).round() as usize;
                for (x, y, color) in incoming.pixels() {
                    let covered = match direction {
                        WipeDirection::Left => x >= width - revealed_cols,
                        WipeDirection::Right => x < revealed_cols,
                        WipeDirection::Up => y >= height - revealed_rows,
                        WipeDirection::Down => y < revealed_rows,
                    };
                    if covered {
                        outgoing.set(x as i32, y as i32, color);
                    }
                }
            }
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::None => f.write_str("none"),
            TransitionKind::Fade => f.write_str("fade"),
            TransitionKind::Wipe(WipeDirection::Left) => f.write_str("wipe-left"),
            TransitionKind::Wipe(WipeDirection::Right) => f.write_str("wipe-right"),
            TransitionKind::Wipe(WipeDirection::Up) => f.write_str("wipe-up"),
            TransitionKind::Wipe(WipeDirection::Down) => f.write_str("wipe-down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;
    use proptest::prelude::*;

    fn solid(color: Rgb) -> Frame {
        let mut frame = Frame::new(4, 2);
        frame.fill(color);
        frame
    }

    #[test]
    fn parses_names() {
        assert_eq!(TransitionKind::parse("Fade").unwrap(), TransitionKind::Fade);
        assert_eq!(
            TransitionKind::parse("wipe_up").unwrap(),
            TransitionKind::Wipe(WipeDirection::Up)
        );
        assert_eq!(
            TransitionKind::parse("wipe").unwrap(),
            TransitionKind::Wipe(WipeDirection::Left)
        );
        assert!(TransitionKind::parse("dissolve").is_err());
        assert_eq!(TransitionKind::Wipe(WipeDirection::Down).to_string(), "wipe-down");
    }

    #[test]
    fn fade_midpoint_mixes_colors() {
        let mut out = solid(Rgb(200, 0, 0));
        TransitionKind::Fade.blend(&mut out, &solid(Rgb(0, 0, 100)), 0.5);
        assert_eq!(out.get(0, 0), Some(Rgb(100, 0, 50)));
    }

    #[test]
    fn wipe_left_reveals_from_the_right_edge() {
        let mut out = solid(Rgb::RED);
        TransitionKind::Wipe(WipeDirection::Left).blend(&mut out, &solid(Rgb::WHITE), 0.5);
        assert_eq!(out.get(0, 0), Some(Rgb::RED));
        assert_eq!(out.get(1, 1), Some(Rgb::RED));
        assert_eq!(out.get(2, 0), Some(Rgb::WHITE));
        assert_eq!(out.get(3, 1), Some(Rgb::WHITE));
    }

    #[test]
    fn wipe_down_reveals_top_rows_first() {
        let mut out = solid(Rgb::RED);
        TransitionKind::Wipe(WipeDirection::Down).blend(&mut out, &solid(Rgb::WHITE), 0.5);
        assert_eq!(out.get(0, 0), Some(Rgb::WHITE));
        assert_eq!(out.get(0, 1), Some(Rgb::RED));
    }

    proptest! {
        #[test]
        fn endpoints_are_exact(kind_index in 0usize..6, r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let kinds = [
                TransitionKind::None,
                TransitionKind::Fade,
                TransitionKind::Wipe(WipeDirection::Left),
                TransitionKind::Wipe(WipeDirection::Right),
                TransitionKind::Wipe(WipeDirection::Up),
                TransitionKind::Wipe(WipeDirection::Down),
            ];
            let kind = kinds[kind_index];
            let from = solid(Rgb(r, g, b));
            let to = solid(Rgb(b, r, g));

            let mut start = from.clone();
            kind.blend(&mut start, &to, 0.0);
            prop_assert_eq!(&start, &from);

            let mut end = from.clone();
            kind.blend(&mut end, &to, 1.0);
            prop_assert_eq!(&end, &to);
        }
    }
}
