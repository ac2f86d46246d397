//! Key event handling.
//!
//! Manual reload (`r`) is expressed as a synthetic payload-change event
//! carrying a freshly stamped fetch sequence number, so it flows through
//! the same reload path as watcher notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::app::App;
use crate::event::Event;

/// Handle a key event.
pub fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    event_tx: &mpsc::UnboundedSender<Event>,
    seq: &Arc<AtomicU64>,
) {
    // Filter input mode captures most keys
    if app.filter_input_active {
        match key.code {
            KeyCode::Esc => app.cancel_filter(),
            KeyCode::Enter => app.confirm_filter(),
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
            KeyCode::Char(c) => app.push_filter_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),

        // Expansion
        KeyCode::Char('l') | KeyCode::Right => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Enter => app.toggle_selected(),
        KeyCode::Char('E') => app.expand_all(),
        KeyCode::Char('C') => app.collapse_all(),

        // Selection
        KeyCode::Char(' ') => app.toggle_select_current(),
        KeyCode::Char('s') => app.select_subtree_current(),
        KeyCode::Char('u') => app.clear_selection(),
        KeyCode::Char('x') => app.export_selection_preview(),
        KeyCode::Char('d') => app.select_all_departments(),
        KeyCode::Char(c @ '1'..='5') => {
            // '1' selects ministries, '5' selects schools' sub-level
            let level = c as u8 - b'0';
            app.select_institutions_at_level(level);
        }

        // Visibility
        KeyCode::Char('.') => app.toggle_inactive(),
        KeyCode::Char('/') => app.start_filter(),

        // Manual reload: stamp the next fetch sequence and let the main
        // loop re-read the payload exactly as a watcher event would.
        KeyCode::Char('r') => {
            let stamped = seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = event_tx.send(Event::PayloadChange(stamped));
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::org::node::{NodeKey, NodeKind};
    use crate::org::payload::OrgListing;
    use crate::theme::dark_theme;
    use std::path::PathBuf;

    fn test_app() -> App {
        let listing = OrgListing::from_json(
            r#"[
            { "id": 1, "name": "Ministry", "type": "ministry", "level": 1,
              "children": [
                { "id": 2, "name": "Region North", "type": "region", "level": 2,
                  "children": [
                    { "id": 3, "name": "Sector East", "type": "sector", "level": 3 }
                  ] }
              ],
              "departments": [
                { "id": 9, "name": "HR", "department_type": "administrative" }
              ] }
        ]"#,
        )
        .unwrap();
        App::new(
            &listing,
            PathBuf::from("/tmp/listing.json"),
            &AppConfig::default(),
            dark_theme(),
        )
        .unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> Option<Event> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let seq = Arc::new(AtomicU64::new(0));
        handle_key_event(app, KeyEvent::from(code), &tx, &seq);
        rx.try_recv().ok()
    }

    #[test]
    fn q_quits() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::unbounded_channel();
        let seq = Arc::new(AtomicU64::new(0));
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_key_event(&mut app, key, &tx, &seq);
        assert!(app.should_quit);
    }

    #[test]
    fn j_and_k_move_cursor() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_index, 1);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn g_and_shift_g_jump() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.selected_index, app.flat_items.len() - 1);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn l_expands_and_h_collapses() {
        let mut app = test_app();
        app.selected_index = 1; // Region North
        let before = app.flat_items.len();
        press(&mut app, KeyCode::Char('l'));
        assert!(app.flat_items.len() > before);
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.flat_items.len(), before);
    }

    #[test]
    fn space_toggles_selection() {
        let mut app = test_app();
        app.selected_index = 1;
        press(&mut app, KeyCode::Char(' '));
        assert!(app.engine.is_selected(NodeKey::new(NodeKind::Institution, 2)));
        press(&mut app, KeyCode::Char(' '));
        assert!(!app.engine.is_selected(NodeKey::new(NodeKind::Institution, 2)));
    }

    #[test]
    fn s_selects_subtree() {
        let mut app = test_app();
        app.selected_index = 1; // Region North
        press(&mut app, KeyCode::Char('s'));
        assert!(app.engine.is_selected(NodeKey::new(NodeKind::Institution, 2)));
        assert!(app.engine.is_selected(NodeKey::new(NodeKind::Institution, 3)));
    }

    #[test]
    fn digit_selects_level_and_d_selects_departments() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('2'));
        assert!(app.engine.is_selected(NodeKey::new(NodeKind::Institution, 2)));
        press(&mut app, KeyCode::Char('d'));
        assert!(app.engine.is_selected(NodeKey::new(NodeKind::Department, 9)));
        press(&mut app, KeyCode::Char('u'));
        assert!(app.engine.selection().is_empty());
    }

    #[test]
    fn r_emits_stamped_reload_event() {
        let mut app = test_app();
        let event = press(&mut app, KeyCode::Char('r'));
        assert!(matches!(event, Some(Event::PayloadChange(1))));
    }

    #[test]
    fn slash_enters_filter_mode_and_esc_leaves() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('/'));
        assert!(app.filter_input_active);

        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.filter_query, "hr");
        // In filter mode 'h'/'r' type rather than navigate or reload
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(!app.filter_input_active);
        assert!(app.filter_query.is_empty());
    }

    #[test]
    fn filter_mode_enter_confirms_but_keeps_results() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('r'));
        press(&mut app, KeyCode::Enter);
        assert!(!app.filter_input_active);
        assert!(app.is_filtering);
        assert!(app.flat_items.iter().any(|i| i.name == "HR"));
    }

    #[test]
    fn dot_toggles_inactive_visibility() {
        let mut app = test_app();
        let before = app.show_inactive;
        press(&mut app, KeyCode::Char('.'));
        assert_eq!(app.show_inactive, !before);
    }

    #[test]
    fn x_previews_export() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('x'));
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.contains("department_ids"));
        assert!(msg.contains('9'));
    }
}
