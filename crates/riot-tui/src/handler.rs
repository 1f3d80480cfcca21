use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane, InputMode, MobileView, Screen, SettingsField, Tab};
use crate::tui::AppEvent;

/// Rows moved by PageUp/PageDown in the chat
const CHAT_PAGE: u16 = 5;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(width) => app.on_resize(width),
        AppEvent::Feed => app.sync_feed(),
        AppEvent::Tick => app.on_tick().await,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') if app.screen == Screen::Dashboard => {
                app.logout();
                return;
            }
            _ => {}
        }
    }

    match app.screen {
        Screen::Login => handle_login(app, key),
        Screen::Dashboard => match (app.input_mode, app.tab) {
            (InputMode::Normal, Tab::Monitoring) => handle_monitoring_normal(app, key),
            (InputMode::Normal, Tab::Settings) => handle_settings_normal(app, key),
            (InputMode::Editing, Tab::Monitoring) => handle_chat_editing(app, key),
            (InputMode::Editing, Tab::Settings) => handle_api_key_editing(app, key),
        },
    }
}

fn handle_login(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit_login(),
        KeyCode::Backspace => {
            app.password_input.pop();
        }
        KeyCode::Char(c) => {
            app.password_input.push(c);
            app.login_error = None;
        }
        _ => {}
    }
}

/// Keys shared by both dashboard tabs in normal mode. Returns true if handled.
fn handle_dashboard_common(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('1') => app.tab = Tab::Monitoring,
        KeyCode::Char('2') => app.tab = Tab::Settings,
        _ => return false,
    }
    true
}

fn handle_monitoring_normal(app: &mut App, key: KeyEvent) {
    if handle_dashboard_common(app, key) {
        return;
    }

    match key.code {
        // Compact layout view switching
        KeyCode::Char('p') if app.compact => set_mobile_view(app, MobileView::Panel),
        KeyCode::Char('m') if app.compact => set_mobile_view(app, MobileView::Map),
        KeyCode::Char('c') if app.compact => set_mobile_view(app, MobileView::Chat),

        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Animals => FocusPane::Chat,
                FocusPane::Chat => FocusPane::Animals,
            };
            if app.compact {
                app.mobile_view = match app.focus {
                    FocusPane::Animals => MobileView::Panel,
                    FocusPane::Chat => MobileView::Chat,
                };
            }
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Animals => app.animal_nav_down(),
            FocusPane::Chat => app.scroll_chat_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Animals => app.animal_nav_up(),
            FocusPane::Chat => app.scroll_chat_up(1),
        },
        KeyCode::Char('g') => match app.focus {
            FocusPane::Animals => app.animal_nav_first(),
            FocusPane::Chat => app.chat_scroll = 0,
        },
        KeyCode::Char('G') => match app.focus {
            FocusPane::Animals => app.animal_nav_last(),
            FocusPane::Chat => app.scroll_chat_to_bottom(),
        },
        KeyCode::PageDown => app.scroll_chat_down(CHAT_PAGE),
        KeyCode::PageUp => app.scroll_chat_up(CHAT_PAGE),

        KeyCode::Enter => match app.focus {
            FocusPane::Animals => app.select_highlighted(),
            FocusPane::Chat => start_chat_editing(app),
        },
        KeyCode::Char('i') | KeyCode::Char('/') => start_chat_editing(app),

        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => app.deselect_animal(),
        _ => {}
    }
}

fn set_mobile_view(app: &mut App, view: MobileView) {
    app.mobile_view = view;
    app.focus = match view {
        MobileView::Chat => FocusPane::Chat,
        MobileView::Panel | MobileView::Map => FocusPane::Animals,
    };
}

fn start_chat_editing(app: &mut App) {
    // The input box is disabled until the outstanding answer lands
    if app.session.chat.is_sending() {
        return;
    }
    app.focus = FocusPane::Chat;
    if app.compact {
        app.mobile_view = MobileView::Chat;
    }
    app.chat_cursor = app.chat_input.chars().count();
    app.input_mode = InputMode::Editing;
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_chat(),
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

fn handle_settings_normal(app: &mut App, key: KeyEvent) {
    if handle_dashboard_common(app, key) {
        return;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
            app.settings_field = app.settings_field.next();
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
            app.settings_field = app.settings_field.prev();
        }
        KeyCode::Char('v') => app.show_api_key = !app.show_api_key,
        KeyCode::Esc => app.tab = Tab::Monitoring,
        KeyCode::Enter => match app.settings_field {
            SettingsField::ApiKey => {
                app.settings_notice = None;
                app.input_mode = InputMode::Editing;
            }
            SettingsField::Model => app.cycle_model(true),
            SettingsField::Temperature => {}
        },
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('+') => match app.settings_field {
            SettingsField::Model => app.cycle_model(true),
            SettingsField::Temperature => app.adjust_temperature(1),
            SettingsField::ApiKey => {}
        },
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('-') => match app.settings_field {
            SettingsField::Model => app.cycle_model(false),
            SettingsField::Temperature => app.adjust_temperature(-1),
            SettingsField::ApiKey => {}
        },
        _ => {}
    }
}

fn handle_api_key_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            // Discard the edit
            app.api_key_input = app.session.gemini().api_key.clone();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.apply_api_key();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            app.api_key_input.pop();
        }
        KeyCode::Char(c) => app.api_key_input.push(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, logged_in_app};
    use crate::app::COMPACT_WIDTH;
    use riot_core::GeminiConfig;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("saúde", 0), 0);
        assert_eq!(char_to_byte_index("saúde", 3), 4);
        assert_eq!(char_to_byte_index("saúde", 10), 6);
    }

    #[tokio::test]
    async fn test_login_by_keyboard() {
        let mut app = app_with(GeminiConfig::default()).await;
        type_text(&mut app, "riot2025");
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Dashboard);

        // Letters on the dashboard are commands, not password input
        handle_key(&mut app, press(KeyCode::Char('2')));
        assert_eq!(app.tab, Tab::Settings);
    }

    #[tokio::test]
    async fn test_ctrl_l_logs_out() {
        let mut app = logged_in_app().await;
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert_eq!(app.screen, Screen::Login);
        assert!(!app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_chat_typing_with_accents() {
        let mut app = logged_in_app().await;
        handle_key(&mut app, press(KeyCode::Char('i')));
        assert_eq!(app.input_mode, InputMode::Editing);

        type_text(&mut app, "saúde");
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.chat_input, "saúe");

        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.chat_input.is_empty());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.session.chat.messages()[1].text, "saúe");
    }

    #[tokio::test]
    async fn test_resize_switches_compact_keys() {
        let mut app = logged_in_app().await;
        handle_key(&mut app, press(KeyCode::Char('m')));
        assert_eq!(app.mobile_view, MobileView::Panel);

        handle_event(&mut app, AppEvent::Resize(80)).await.unwrap();
        assert!(app.compact);
        handle_key(&mut app, press(KeyCode::Char('m')));
        assert_eq!(app.mobile_view, MobileView::Map);

        handle_event(&mut app, AppEvent::Resize(COMPACT_WIDTH)).await.unwrap();
        assert!(!app.compact);
        assert_eq!(app.focus, FocusPane::Animals);
    }

    #[tokio::test]
    async fn test_settings_keys() {
        let mut app = logged_in_app().await;
        handle_key(&mut app, press(KeyCode::Char('2')));

        handle_key(&mut app, press(KeyCode::Enter));
        type_text(&mut app, "abc");
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.session.gemini().api_key, "abc");

        handle_key(&mut app, press(KeyCode::Down));
        handle_key(&mut app, press(KeyCode::Down));
        assert_eq!(app.settings_field, SettingsField::Temperature);
        handle_key(&mut app, press(KeyCode::Right));
        assert!((app.session.gemini().temperature - 0.8).abs() < 1e-6);
    }
}
