use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(
    app: &mut App,
    event: AppEvent,
    events: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, events),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Answer { ticket, outcome } => app.on_answer(ticket, outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, events: &mpsc::UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key, events),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Main => FocusPane::Sidebar,
                FocusPane::Sidebar => FocusPane::Main,
            };
        }
        KeyCode::Esc => app.status = None,
        _ => match app.focus {
            FocusPane::Sidebar => handle_sidebar(app, key),
            FocusPane::Main if app.is_chat_view() => handle_chat(app, key),
            FocusPane::Main => handle_note(app, key),
        },
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.notes_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.notes_nav_up(),
        KeyCode::Enter => {
            app.open_selected_note();
            app.focus = FocusPane::Main;
        }
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => app.qna_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.qna_nav_up(),
        KeyCode::Char('s') => app.save_selected_qna(),
        KeyCode::Char('x') => app.detach(),
        KeyCode::Char('G') | KeyCode::End => {
            app.selected_qna = None;
            app.chat_follow = true;
        }
        KeyCode::PageDown => app.scroll_chat_down(10),
        KeyCode::PageUp => app.scroll_chat_up(10),
        _ => {}
    }
}

fn handle_note(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.note_scroll = app.note_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.note_scroll = app.note_scroll.saturating_sub(1),
        KeyCode::PageDown => app.note_scroll = app.note_scroll.saturating_add(10),
        KeyCode::PageUp => app.note_scroll = app.note_scroll.saturating_sub(10),
        KeyCode::Char('i') => {
            app.status = Some("Press n to start a new chat.".to_string());
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, events: &mpsc::UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_input(events),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}
