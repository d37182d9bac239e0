//! Key and mouse bindings: arrows plus vim (hjkl) and wasd aliases.

use crate::controller::{InputEvent, Key, PointerButton};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Translate a terminal event. Releases, repeats and unbound keys give `None`.
pub fn translate(event: &Event) -> Option<InputEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key_to_input(*key),
        Event::Mouse(mouse) => mouse_to_input(*mouse),
        _ => None,
    }
}

/// Map a key press. Shift is tolerated so `R` and `r` both restart.
pub fn key_to_input(key: KeyEvent) -> Option<InputEvent> {
    let KeyEvent { code, modifiers, .. } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return None;
    }
    let key = match code {
        KeyCode::Left | KeyCode::Char('h' | 'a') => Key::Left,
        KeyCode::Right | KeyCode::Char('l' | 'd') => Key::Right,
        KeyCode::Up | KeyCode::Char('k' | 'w') => Key::Up,
        KeyCode::Down | KeyCode::Char('j' | 's') => Key::Down,
        KeyCode::Esc | KeyCode::Char('q' | 'Q') => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char('r' | 'R') => Key::R,
        _ => return None,
    };
    Some(InputEvent::Key(key))
}

fn mouse_to_input(mouse: MouseEvent) -> Option<InputEvent> {
    let MouseEventKind::Down(button) = mouse.kind else {
        return None;
    };
    let button = match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
    };
    Some(InputEvent::PointerDown {
        button,
        column: mouse.column,
        row: mouse.row,
    })
}
