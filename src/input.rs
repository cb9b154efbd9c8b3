//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] edits and returns the [`Action`] the
//! main loop should dispatch, if any.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the edit, or a variant on [`Action`].
//! 2. Add a `KeyCode` match arm in [`handle_key_event`].
//! 3. Update the help text in [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{Action, App, Field};

/// Process a single key event.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one request.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit = true;
        return None;
    }

    match key.code {
        KeyCode::Esc => app.quit = true,
        KeyCode::Enter | KeyCode::F(2) => return Some(Action::Search),
        KeyCode::F(3) => return Some(Action::Feed),
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_previous(),
        KeyCode::Left if app.focus == Field::Status => app.cycle_status(false),
        KeyCode::Right if app.focus == Field::Status => app.cycle_status(true),
        KeyCode::Char('q') if app.focus == Field::Status => app.quit = true,
        KeyCode::Down => app.select_next(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
    None
}
