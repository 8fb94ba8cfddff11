//! Terminal-simulated LED grid drawn with ratatui.
//!
//! Each LED is two terminal cells wide so the grid keeps a roughly square aspect.

use crate::display::DisplaySink;
use crate::error::Result;
use crate::frame::{Frame, Rgb};
use ratatui::crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use std::io::{self, Stdout};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

const LIT: &str = "██";
const UNLIT: &str = "··";
const HELP: &str = "a/b/x/y buttons · space A+B · h hold A · q quit";

pub struct TerminalSink {
    terminal: Option<CrosstermTerminal>,
    pending: Frame,
}

impl TerminalSink {
    /// Switch the terminal to raw mode on the alternate screen.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal: Some(terminal),
            pending: Frame::new(width, height),
        })
    }

    /// Restore the terminal. Called automatically on drop.
    pub fn cleanup(&mut self) -> Result<()> {
        if let Some(mut terminal) = self.terminal.take() {
            terminal.show_cursor()?;
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen)?;
        }
        Ok(())
    }
}

/// One text line per LED row.
pub fn frame_lines(frame: &Frame) -> Vec<Line<'static>> {
    (0..frame.height())
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..frame.width())
                .map(|x| {
                    let color = frame.get(x, y).unwrap_or(Rgb::BLACK);
                    if color.is_black() {
                        Span::styled(UNLIT, Style::default().fg(Color::DarkGray))
                    } else {
                        Span::styled(LIT, Style::default().fg(Color::Rgb(color.0, color.1, color.2)))
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

impl DisplaySink for TerminalSink {
    fn dimensions(&self) -> (usize, usize) {
        (self.pending.width(), self.pending.height())
    }

    fn write_pixel(&mut self, x: usize, y: usize, color: Rgb) -> Result<()> {
        self.pending.set(x as i32, y as i32, color);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        let lines = frame_lines(&self.pending);
        let grid_width = (self.pending.width() * 2 + 2) as u16;
        let grid_height = (self.pending.height() + 2) as u16;
        terminal.draw(|f| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(grid_height), Constraint::Length(1), Constraint::Min(0)])
                .split(f.size());
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(grid_width), Constraint::Min(0)])
                .split(rows[0]);
            let grid = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("ledseq"));
            f.render_widget(grid, columns[0]);
            f.render_widget(
                Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
                rows[1],
            );
        })?;
        Ok(())
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
