use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use promtior_core::ChatView;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_STEP: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.chat.keep_in_view(),
        AppEvent::Tick => app.chat.tick_animation(),
        AppEvent::SendFinished(result) => app.on_send_finished(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.chat.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let chat = &mut app.chat;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            chat.scroll_down(chat.half_page());
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            chat.scroll_up(chat.half_page());
        }

        KeyCode::Char('j') | KeyCode::Down => chat.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => chat.scroll_up(1),
        KeyCode::PageDown => chat.scroll_down(chat.half_page()),
        KeyCode::PageUp => chat.scroll_up(chat.half_page()),
        KeyCode::Char('g') => chat.scroll_to_top(),
        KeyCode::Char('G') => chat.scroll_to_bottom(),

        // Back to the input box
        KeyCode::Char('i') | KeyCode::Tab | KeyCode::Enter => chat.focus_input(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.chat.input_mode = InputMode::Normal;
            return;
        }
        KeyCode::PageDown => {
            app.chat.scroll_down(app.chat.half_page());
            return;
        }
        KeyCode::PageUp => {
            app.chat.scroll_up(app.chat.half_page());
            return;
        }
        _ => {}
    }

    // Input box is locked while a reply is pending
    if !app.chat.input_enabled {
        return;
    }

    let chat = &mut app.chat;
    match key.code {
        // Shift+Enter is left alone
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {}
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => {
            if chat.cursor > 0 {
                chat.cursor -= 1;
                let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
                chat.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = chat.input.chars().count();
            if chat.cursor < char_count {
                let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
                chat.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            chat.cursor = chat.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = chat.input.chars().count();
            chat.cursor = (chat.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            chat.cursor = 0;
        }
        KeyCode::End => {
            chat.cursor = chat.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
            chat.input.insert(byte_pos, c);
            chat.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat.scroll_down(WHEEL_STEP),
        MouseEventKind::ScrollUp => app.chat.scroll_up(WHEEL_STEP),
        _ => {}
    }
}
