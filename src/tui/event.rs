use crossterm::event::{KeyCode, KeyEvent};

use super::app::App;

pub enum KeyAction {
    Quit,
    Refresh,
    /// The selection or panel changed; reload the history panel.
    Reselect,
    Continue,
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Char('r') => return KeyAction::Refresh,
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            return KeyAction::Reselect;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            return KeyAction::Reselect;
        }
        KeyCode::Enter | KeyCode::Char('v') => {
            app.toggle_history();
            return KeyAction::Reselect;
        }
        KeyCode::Char('h') | KeyCode::Left => app.shift_window(-1),
        KeyCode::Char('l') | KeyCode::Right => app.shift_window(1),
        KeyCode::Char('H') => app.shift_window(-12),
        KeyCode::Char('L') => app.shift_window(12),
        KeyCode::Char('t') => app.reset_window(),
        _ => {}
    }
    KeyAction::Continue
}
