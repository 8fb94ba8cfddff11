//! Keyboard stand-in for the physical buttons, used by the terminal simulator.
//!
//! | key | effect |
//! |---|---|
//! | `a` `b` `x` `y` | tap the button |
//! | `space` | press A and B together |
//! | `h` | hold A past the long-press duration |
//! | `q` `Esc` `Ctrl-C` | quit |

use crate::error::Result;
use crate::input::raw::{ButtonEvent, ButtonId};
use log::{debug, error};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const TAP_LENGTH: Duration = Duration::from_millis(20);
const HOLD_LENGTH: Duration = Duration::from_millis(1100);

/// What a key press means for the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    Tap(ButtonId),
    Chord(ButtonId, ButtonId),
    Hold(ButtonId),
    Quit,
}

/// Map a key to its simulator command; unmapped keys yield `None`.
pub fn map_key(key: KeyEvent) -> Option<KeyCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(KeyCommand::Quit);
    }
    match key.code {
        KeyCode::Char('a') => Some(KeyCommand::Tap(ButtonId::A)),
        KeyCode::Char('b') => Some(KeyCommand::Tap(ButtonId::B)),
        KeyCode::Char('x') => Some(KeyCommand::Tap(ButtonId::X)),
        KeyCode::Char('y') => Some(KeyCommand::Tap(ButtonId::Y)),
        KeyCode::Char(' ') => Some(KeyCommand::Chord(ButtonId::A, ButtonId::B)),
        KeyCode::Char('h') => Some(KeyCommand::Hold(ButtonId::A)),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyCommand::Quit),
        _ => None,
    }
}

/// Raw edges for a command, timestamped relative to `now`.
pub fn edges(command: &KeyCommand, now: Instant) -> Vec<ButtonEvent> {
    match *command {
        KeyCommand::Tap(button) => vec![
            ButtonEvent::press(button, now),
            ButtonEvent::release(button, now + TAP_LENGTH),
        ],
        KeyCommand::Chord(first, second) => vec![
            ButtonEvent::press(first, now),
            ButtonEvent::press(second, now),
            ButtonEvent::release(first, now + TAP_LENGTH),
            ButtonEvent::release(second, now + TAP_LENGTH),
        ],
        KeyCommand::Hold(_) | KeyCommand::Quit => Vec::new(),
    }
}

fn poll_key(timeout: Duration) -> Result<Option<KeyEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(Some(key)),
        _ => Ok(None),
    }
}

/// Spawn a blocking thread that turns key presses into button edges.
///
/// `quit` is cancelled when the user asks to quit; `shutdown` stops the thread.
pub fn spawn_keyboard_thread(
    tx: UnboundedSender<ButtonEvent>,
    quit: CancellationToken,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            let key = match poll_key(poll_interval) {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(err) => {
                    error!("keyboard input failed: {err}");
                    break;
                }
            };
            let Some(command) = map_key(key) else {
                continue;
            };
            debug!("key command {command:?}");
            match command {
                KeyCommand::Quit => {
                    quit.cancel();
                    break;
                }
                KeyCommand::Hold(button) => {
                    if tx.send(ButtonEvent::press(button, Instant::now())).is_err() {
                        return;
                    }
                    thread::sleep(HOLD_LENGTH);
                    if tx.send(ButtonEvent::release(button, Instant::now())).is_err() {
                        return;
                    }
                }
                other => {
                    for edge in edges(&other, Instant::now()) {
                        if tx.send(edge).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn letters_map_to_buttons() {
        assert_eq!(
            map_key(key(KeyCode::Char('x'))),
            Some(KeyCommand::Tap(ButtonId::X))
        );
        assert_eq!(
            map_key(key(KeyCode::Char(' '))),
            Some(KeyCommand::Chord(ButtonId::A, ButtonId::B))
        );
        assert_eq!(map_key(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn quit_keys() {
        assert_eq!(map_key(key(KeyCode::Esc)), Some(KeyCommand::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyCommand::Quit)
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn chord_edges_press_both_before_releasing() {
        let now = Instant::now();
        let pressed: Vec<bool> = edges(&KeyCommand::Chord(ButtonId::A, ButtonId::B), now)
            .iter()
            .map(|e| e.pressed)
            .collect();
        assert_eq!(pressed, vec![true, true, false, false]);
    }
}
