use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            let was_pending = app.chat.is_pending();
            app.chat.poll_response().await;
            if was_pending && !app.chat.is_pending() {
                // Response just arrived
                app.scroll_to_bottom();
            }
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_up();
        }
        KeyCode::Char('G') | KeyCode::End => {
            app.scroll_to_bottom();
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.chat.submit();
            // Keep the newest exchange (and "Thinking...") in view
            app.scroll_to_bottom();
        }
        KeyCode::Backspace => {
            app.chat.delete_char_before_cursor();
        }
        KeyCode::Delete => {
            app.chat.delete_char_at_cursor();
        }
        KeyCode::Left => {
            app.chat.move_cursor_left();
        }
        KeyCode::Right => {
            app.chat.move_cursor_right();
        }
        KeyCode::Home => {
            app.chat.move_cursor_home();
        }
        KeyCode::End => {
            app.chat.move_cursor_end();
        }
        KeyCode::Up => {
            app.scroll_up();
        }
        KeyCode::Down => {
            app.scroll_down();
        }
        KeyCode::Char(c) => {
            app.chat.insert_char(c);
        }
        _ => {}
    }
}
