use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::debug;
use tui_widgets::popup::PopupState;

use crate::config::{Config, TopBarAction, TopBarButton, UiColors};
use crate::controller::{Action, Dialog, ViewController, View};
use crate::tree::{NodeId, TreeRow};

use super::draw;
use super::edit::{ContactEditor, SearchForm, SearchRow};
use super::panes::Panel;

/// A section in the help dialog (e.g., "Global", "Tree")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    pub controller: ViewController,
    pub focus: Panel,
    pub tree_cursor: usize,
    pub list_selected: usize,
    pub search_form: SearchForm,
    pub editor: ContactEditor,
    pub status: Option<String>,
    // Popup state for dialogs (tui-widgets popup)
    pub modal_popup: PopupState,
}

impl<'a> App<'a> {
    pub fn new(controller: ViewController, config: &'a Config) -> Self {
        let mut app = Self {
            config,
            controller,
            focus: Panel::Tree,
            tree_cursor: 0,
            list_selected: 0,
            search_form: SearchForm::new(config.default_search_field),
            editor: ContactEditor::default(),
            status: None,
            modal_popup: PopupState::default(),
        };
        app.sync_tree_cursor();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Route a key event. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        if self.controller.dialog().is_some() {
            self.handle_dialog_key(key);
            return false;
        }

        // The open contact form owns the keyboard, toolbar keys included.
        if self.editor.active {
            self.handle_editor_key(key);
            return false;
        }

        if let Some(action) = self.top_bar_action_for_key(&key) {
            self.handle_top_bar_action(action);
            return false;
        }

        if self.focus == Panel::Main
            && matches!(self.controller.view(), View::SearchEntry)
            && self.handle_search_form_key(key)
        {
            return false;
        }

        let config = self.config;
        let global = &config.keys.global;
        if self.key_matches_any(&key, &global.quit) {
            return true;
        }
        if self.key_matches_any(&key, &global.search) {
            self.open_search();
            return false;
        }
        if self.key_matches_any(&key, &global.add) {
            self.dispatch(Action::AddContact);
            return false;
        }
        if self.key_matches_any(&key, &global.focus_next) {
            self.focus = self.focus.next();
            return false;
        }

        match self.focus {
            Panel::Tree => self.handle_tree_key(key),
            Panel::Main => self.handle_list_key(key),
        }
        false
    }

    /// Send an action to the controller and bring UI state in line with it.
    fn dispatch(&mut self, action: Action) {
        if let Some(notification) = self.controller.dispatch(action) {
            self.set_status(notification.message);
        }
        self.sync_editor();
        self.sync_tree_cursor();
        self.clamp_list_selection();
    }

    /// Switch to search entry. Coming from a result list, the form starts
    /// out with that list's criteria.
    fn open_search(&mut self) {
        if let View::FilteredList(filter) = self.controller.view() {
            self.search_form.load(filter);
        }
        self.dispatch(Action::Search);
        self.focus = Panel::Main;
    }

    fn sync_editor(&mut self) {
        match self.controller.form() {
            Some(form) => {
                if !self.editor.active || self.editor.target() != form.target {
                    self.editor.start(form);
                    self.focus = Panel::Main;
                }
            }
            None => {
                if self.editor.active {
                    self.editor.cancel();
                }
            }
        }
    }

    fn sync_tree_cursor(&mut self) {
        let rows = self.tree_rows();
        let selected = self.controller.tree().selected();
        if let Some(index) = rows.iter().position(|row| Some(&row.id) == selected) {
            self.tree_cursor = index;
        } else if self.tree_cursor >= rows.len() {
            self.tree_cursor = rows.len().saturating_sub(1);
        }
    }

    fn clamp_list_selection(&mut self) {
        let count = self.controller.store().visible_count();
        if self.list_selected >= count {
            self.list_selected = count.saturating_sub(1);
        }
    }

    pub fn tree_rows(&self) -> Vec<TreeRow> {
        self.controller.tree().rows()
    }

    // =========================================================================
    // Context handlers
    // =========================================================================

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let form = &config.keys.form;
        if self.key_matches_any(&key, &form.cancel)
            || self.key_matches_any(&key, &form.confirm)
            || matches!(key.code, KeyCode::Char('q'))
        {
            self.modal_popup = PopupState::default();
            self.dispatch(Action::CloseDialog);
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let form = &config.keys.form;
        if self.key_matches_any(&key, &form.cancel) {
            self.dispatch(Action::CancelEdit);
            self.set_status("Edit cancelled");
        } else if self.key_matches_any(&key, &form.confirm) {
            let draft = self.editor.draft();
            if draft.is_blank() {
                self.set_status("Contact is empty");
                return;
            }
            match self.controller.dispatch(Action::SaveContact(draft)) {
                Some(notification) => self.set_status(notification.message),
                None => self.set_status("Contact saved"),
            }
            self.sync_editor();
            self.clamp_list_selection();
        } else if self.key_matches_any(&key, &form.next) {
            self.editor.focus_next();
        } else if self.key_matches_any(&key, &form.prev) {
            self.editor.focus_prev();
        } else {
            self.editor.handle_key_event(key);
        }
    }

    /// Keys for the search-entry view. Every key stays in the form except the
    /// pane switch, which returns false to reach the global handlers.
    fn handle_search_form_key(&mut self, key: KeyEvent) -> bool {
        let config = self.config;
        let form = &config.keys.form;
        if self.key_matches_any(&key, &form.cancel) {
            self.focus = Panel::Tree;
            return true;
        }
        if self.key_matches_any(&key, &form.confirm) {
            match self.search_form.to_filter() {
                Some(filter) => self.dispatch(Action::SubmitSearch(filter)),
                None => self.set_status("Enter a search term"),
            }
            return true;
        }
        if self.key_matches_any(&key, &form.next) {
            self.search_form.next_row();
            return true;
        }
        if self.key_matches_any(&key, &form.prev) {
            self.search_form.prev_row();
            return true;
        }

        if self.search_form.row == SearchRow::Field {
            match key.code {
                KeyCode::Left => {
                    self.search_form.field = self.search_form.field.prev();
                    return true;
                }
                KeyCode::Right => {
                    self.search_form.field = self.search_form.field.next();
                    return true;
                }
                _ => {}
            }
        }

        if self.key_matches_any(&key, &form.toggle) && self.search_form.toggle() {
            return true;
        }

        if self.search_form.row == SearchRow::Term {
            self.search_form.handle_key_event(key);
            return true;
        }
        !self.key_matches_any(&key, &config.keys.global.focus_next)
    }

    fn handle_tree_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.tree;
        let rows = self.tree_rows();
        if rows.is_empty() {
            return;
        }

        if self.key_matches_any(&key, &keys.next) {
            self.tree_cursor = (self.tree_cursor + 1).min(rows.len() - 1);
        } else if self.key_matches_any(&key, &keys.prev) {
            self.tree_cursor = self.tree_cursor.saturating_sub(1);
        } else if self.key_matches_any(&key, &keys.confirm) {
            if let Some(row) = rows.get(self.tree_cursor) {
                let id = row.id.clone();
                let to_search = id == NodeId::Search;
                self.dispatch(Action::TreeSelect(id));
                if to_search {
                    self.focus = Panel::Main;
                }
            }
        } else if self.key_matches_any(&key, &keys.toggle) {
            if let Some(row) = rows.get(self.tree_cursor) {
                if row.children_allowed {
                    let id = row.id.clone();
                    self.controller.toggle_tree_node(&id);
                    debug!(node = %id, "toggled tree node");
                }
            }
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.list;
        let count = self.controller.store().visible_count();

        if self.key_matches_any(&key, &keys.next) {
            if count > 0 {
                self.list_selected = (self.list_selected + 1).min(count - 1);
            }
        } else if self.key_matches_any(&key, &keys.prev) {
            self.list_selected = self.list_selected.saturating_sub(1);
        } else if self.key_matches_any(&key, &keys.open) {
            let id = self
                .controller
                .store()
                .visible_records()
                .nth(self.list_selected)
                .map(|record| record.id);
            match id {
                Some(id) => self.dispatch(Action::OpenContact(id)),
                None => self.set_status("No contact selected"),
            }
        }
    }

    // =========================================================================
    // Top bar
    // =========================================================================

    fn top_bar_action_for_key(&self, key: &KeyEvent) -> Option<TopBarAction> {
        for button in &self.config.top_bar.buttons {
            if let Some(number) = button.function_key_number() {
                if key.code == KeyCode::F(number) {
                    return Some(button.action);
                }
            }
        }
        None
    }

    fn handle_top_bar_action(&mut self, action: TopBarAction) {
        match action {
            TopBarAction::Add => self.dispatch(Action::AddContact),
            TopBarAction::Search => self.open_search(),
            TopBarAction::Share => {
                self.modal_popup = PopupState::default();
                self.dispatch(Action::Share);
            }
            TopBarAction::Help => {
                self.modal_popup = PopupState::default();
                self.dispatch(Action::Help);
            }
        }
    }

    // =========================================================================
    // Key matching
    // =========================================================================

    /// Check if the key event matches any of the given bindings
    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }

    // =========================================================================
    // Rendering accessors
    // =========================================================================

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn tree_width(&self) -> u16 {
        self.config.ui.tree_width
    }

    pub fn top_bar_buttons(&self) -> &[TopBarButton] {
        &self.config.top_bar.buttons
    }

    pub fn dialog(&self) -> Option<Dialog> {
        self.controller.dialog()
    }

    /// Generate help content from current keybindings configuration
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let config = self.config;
        let keys = &config.keys;
        let top_bar = self
            .top_bar_buttons()
            .iter()
            .map(|button| HelpEntry {
                action: button.action.title(),
                keys: button.key.clone(),
            })
            .collect();

        vec![
            HelpSection {
                title: "Toolbar",
                entries: top_bar,
            },
            HelpSection {
                title: "Global",
                entries: vec![
                    HelpEntry { action: "Quit", keys: keys.global.quit.join(", ") },
                    HelpEntry { action: "Search", keys: keys.global.search.join(", ") },
                    HelpEntry { action: "Add contact", keys: keys.global.add.join(", ") },
                    HelpEntry { action: "Switch pane", keys: keys.global.focus_next.join(", ") },
                ],
            },
            HelpSection {
                title: "Navigation",
                entries: vec![
                    HelpEntry { action: "Next", keys: keys.tree.next.join(", ") },
                    HelpEntry { action: "Previous", keys: keys.tree.prev.join(", ") },
                    HelpEntry { action: "Open", keys: keys.tree.confirm.join(", ") },
                    HelpEntry { action: "Expand/collapse", keys: keys.tree.toggle.join(", ") },
                ],
            },
            HelpSection {
                title: "Contacts",
                entries: vec![
                    HelpEntry { action: "Next", keys: keys.list.next.join(", ") },
                    HelpEntry { action: "Previous", keys: keys.list.prev.join(", ") },
                    HelpEntry { action: "Edit", keys: keys.list.open.join(", ") },
                ],
            },
            HelpSection {
                title: "Forms",
                entries: vec![
                    HelpEntry { action: "Submit", keys: keys.form.confirm.join(", ") },
                    HelpEntry { action: "Cancel", keys: keys.form.cancel.join(", ") },
                    HelpEntry { action: "Next field", keys: keys.form.next.join(", ") },
                    HelpEntry { action: "Previous field", keys: keys.form.prev.join(", ") },
                    HelpEntry { action: "Toggle option", keys: keys.form.toggle.join(", ") },
                ],
            },
        ]
    }
}

/// Check if the key event matches a single binding string
fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Disallow Ctrl/Alt/Super modifiers (we don't support them)
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name if name.len() > 1 && name.starts_with('f') => match name[1..].parse::<u8>() {
            Ok(n) => event.code == KeyCode::F(n),
            Err(_) => false,
        },
        // Single character - case-sensitive (m != M, since M requires Shift)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::{ContactDraft, FieldId};
    use crate::filter::SearchFilter;
    use crate::store::ContactStore;

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn controller() -> ViewController {
        ViewController::new(ContactStore::with_records([
            ContactDraft::new("Alice", "Smith"),
            ContactDraft::new("Bob", "Jones"),
        ]))
    }

    #[test]
    fn test_search_submit_from_keyboard() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);

        press(&mut app, KeyCode::F(3));
        assert_eq!(app.controller.view(), &View::SearchEntry);
        assert_eq!(app.focus, Panel::Main);

        type_text(&mut app, "smi");
        press(&mut app, KeyCode::Enter);

        let filter = SearchFilter::new(FieldId::LastName, "smi");
        assert_eq!(app.controller.view(), &View::FilteredList(filter));
        assert_eq!(
            app.status.as_deref(),
            Some("Searched for last_name=*smi*, found 1 item(s).")
        );
        assert_eq!(app.tree_cursor, 2);
    }

    #[test]
    fn test_blank_search_is_not_submitted() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        press(&mut app, KeyCode::F(3));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.controller.view(), &View::SearchEntry);
        assert_eq!(app.status.as_deref(), Some("Enter a search term"));
    }

    #[test]
    fn test_quit_key_is_ignored_while_typing_a_search() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        press(&mut app, KeyCode::F(3));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.search_form.term.value(), "q");
    }

    #[test]
    fn test_search_form_option_rows_swallow_plain_keys() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        press(&mut app, KeyCode::F(3));

        press(&mut app, KeyCode::Up);
        assert_eq!(app.search_form.row, SearchRow::Field);
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Char('a'));
        assert!(!app.editor.active);
        assert_eq!(app.controller.view(), &View::SearchEntry);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.search_form.row, SearchRow::MatchCase);
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char('j'));
        assert!(!app.editor.active);
        assert_eq!(app.controller.view(), &View::SearchEntry);
        assert_eq!(app.list_selected, 0);
        assert_eq!(app.focus, Panel::Main);
        assert!(!app.search_form.match_case);
    }

    #[test]
    fn test_search_reopens_with_current_criteria() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        press(&mut app, KeyCode::F(3));
        type_text(&mut app, "jon");
        press(&mut app, KeyCode::Enter);

        // Start from a blank form; the result list supplies the criteria.
        app.search_form = SearchForm::new(FieldId::City);
        press(&mut app, KeyCode::F(3));
        assert_eq!(app.controller.view(), &View::SearchEntry);
        assert_eq!(app.search_form.field, FieldId::LastName);
        assert_eq!(app.search_form.term.value(), "jon");
    }

    #[test]
    fn test_toolbar_keys_are_ignored_while_editing() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        press(&mut app, KeyCode::F(2));
        assert!(app.editor.active);

        press(&mut app, KeyCode::F(3));
        press(&mut app, KeyCode::F(1));
        assert!(app.editor.active);
        assert_eq!(app.controller.view(), &View::AllContacts);
        assert!(app.dialog().is_none());
    }

    #[test]
    fn test_tree_navigation_selects_nodes() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        assert_eq!(app.focus, Panel::Tree);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.controller.view(), &View::SearchEntry);
        assert_eq!(app.focus, Panel::Main);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Panel::Tree);
        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.controller.view(), &View::AllContacts);
    }

    #[test]
    fn test_add_contact_through_form() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);

        press(&mut app, KeyCode::F(2));
        assert!(app.editor.active);
        assert_eq!(app.focus, Panel::Main);

        type_text(&mut app, "Carol");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "White");
        press(&mut app, KeyCode::Enter);

        assert!(!app.editor.active);
        assert_eq!(app.controller.store().len(), 3);
        assert_eq!(app.status.as_deref(), Some("Contact saved"));
        let last = app.controller.store().records().last().unwrap();
        assert_eq!(last.display_name(), "Carol White");
    }

    #[test]
    fn test_edit_existing_contact_from_list() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Panel::Main);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);
        assert!(app.editor.active);
        assert_eq!(app.editor.draft().first_name, "Bob");

        press(&mut app, KeyCode::Esc);
        assert!(!app.editor.active);
        assert!(app.controller.form().is_none());
    }

    #[test]
    fn test_dialogs_swallow_keys_until_closed() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);

        press(&mut app, KeyCode::F(1));
        assert_eq!(app.dialog(), Some(Dialog::Help));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.tree_cursor, 0);
        press(&mut app, KeyCode::Esc);
        assert!(app.dialog().is_none());

        press(&mut app, KeyCode::F(4));
        assert_eq!(app.dialog(), Some(Dialog::Share));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let config = Config::default();
        let mut app = App::new(controller(), &config);
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_key_matches_single() {
        let plain = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert!(key_matches_single(&plain(KeyCode::Enter), "Enter"));
        assert!(key_matches_single(&plain(KeyCode::F(7)), "f7"));
        assert!(key_matches_single(&plain(KeyCode::Char(' ')), "Space"));
        assert!(!key_matches_single(&plain(KeyCode::Char('m')), "M"));
        assert!(!key_matches_single(
            &KeyEvent::new(KeyCode::Char('q'), KeyModifiers::ALT),
            "q"
        ));
    }
}
