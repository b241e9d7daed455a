//! View state machine.
//!
//! Every user action arrives as an [`Action`] and is handled to completion by
//! [`ViewController::dispatch`]. The controller owns the contact store and the
//! navigation tree; renderers borrow them read-only.

use tracing::{debug, info, warn};

use crate::contact::{ContactDraft, ContactId, ContactRecord};
use crate::filter::SearchFilter;
use crate::store::ContactStore;
use crate::tree::{NavigationTree, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    AllContacts,
    SearchEntry,
    FilteredList(SearchFilter),
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::AllContacts => "CONTACTS",
            View::SearchEntry => "SEARCH",
            View::FilteredList(_) => "RESULTS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddContact,
    Search,
    Share,
    Help,
    TreeSelect(NodeId),
    SubmitSearch(SearchFilter),
    OpenContact(ContactId),
    SaveContact(ContactDraft),
    CancelEdit,
    CloseDialog,
}

/// Static dialogs opened from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Share,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Report the outcome of applying `filter`.
    pub fn search_result(filter: &SearchFilter, count: usize) -> Self {
        if count > 0 {
            Self::info(format!(
                "Searched for {}, found {} item(s).",
                filter.pattern(),
                count
            ))
        } else {
            Self::info(format!(
                "Searched for {}, person not found.",
                filter.pattern()
            ))
        }
    }
}

/// Edit form contents. `target` is None for a new contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub target: Option<ContactId>,
    pub draft: ContactDraft,
}

/// What the main pane shows.
#[derive(Debug)]
pub enum ViewPayload<'a> {
    List {
        filter: Option<&'a SearchFilter>,
        records: Vec<&'a ContactRecord>,
    },
    SearchEntry,
}

pub struct ViewController {
    store: ContactStore,
    tree: NavigationTree,
    view: View,
    form: Option<ContactForm>,
    dialog: Option<Dialog>,
    last_notification: Option<Notification>,
}

impl ViewController {
    pub fn new(store: ContactStore) -> Self {
        let mut store = store;
        store.clear_filter();
        Self {
            store,
            tree: NavigationTree::new(),
            view: View::AllContacts,
            form: None,
            dialog: None,
            last_notification: None,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn store(&self) -> &ContactStore {
        &self.store
    }

    pub fn tree(&self) -> &NavigationTree {
        &self.tree
    }

    pub fn form(&self) -> Option<&ContactForm> {
        self.form.as_ref()
    }

    pub fn dialog(&self) -> Option<Dialog> {
        self.dialog
    }

    pub fn last_notification(&self) -> Option<&Notification> {
        self.last_notification.as_ref()
    }

    /// Tree expansion is presentation state and does not change the view.
    pub fn toggle_tree_node(&mut self, id: &NodeId) {
        self.tree.toggle_expanded(id);
    }

    pub fn current_view(&self) -> ViewPayload<'_> {
        match &self.view {
            View::SearchEntry => ViewPayload::SearchEntry,
            View::AllContacts | View::FilteredList(_) => ViewPayload::List {
                filter: self.store.active_filter(),
                records: self.store.visible_records().collect(),
            },
        }
    }

    /// Handle one action. Returns the notification it produced, if any.
    pub fn dispatch(&mut self, action: Action) -> Option<Notification> {
        debug!(?action, view = ?self.view, "dispatch");
        let notification = match action {
            Action::Search => {
                self.view = View::SearchEntry;
                None
            }
            Action::AddContact => {
                self.view = View::AllContacts;
                self.form = Some(ContactForm::default());
                None
            }
            Action::Share => {
                self.dialog = Some(Dialog::Share);
                None
            }
            Action::Help => {
                self.dialog = Some(Dialog::Help);
                None
            }
            Action::CloseDialog => {
                self.dialog = None;
                None
            }
            Action::TreeSelect(id) => self.select_node(id),
            Action::SubmitSearch(filter) => {
                self.tree.save_search(filter.clone());
                Some(self.search(filter))
            }
            Action::OpenContact(id) => {
                if let Some(record) = self.store.get(id) {
                    self.form = Some(ContactForm {
                        target: Some(id),
                        draft: record.fields.clone(),
                    });
                }
                None
            }
            Action::SaveContact(draft) => self.save_contact(draft),
            Action::CancelEdit => {
                self.form = None;
                None
            }
        };

        if let Some(notification) = &notification {
            match notification.severity {
                Severity::Info => info!("{}", notification.message),
                Severity::Warning => warn!("{}", notification.message),
            }
            self.last_notification = Some(notification.clone());
        }
        notification
    }

    fn select_node(&mut self, id: NodeId) -> Option<Notification> {
        if !self.tree.select(&id) {
            return None;
        }
        match id {
            NodeId::ShowAll => {
                self.store.clear_filter();
                self.view = View::AllContacts;
                None
            }
            NodeId::Search => {
                self.view = View::SearchEntry;
                None
            }
            NodeId::Saved(filter) => {
                self.store.clear_filter();
                Some(self.search(filter))
            }
        }
    }

    fn search(&mut self, filter: SearchFilter) -> Notification {
        let count = self.store.apply_filter(filter.clone());
        let notification = Notification::search_result(&filter, count);
        self.view = View::FilteredList(filter);
        notification
    }

    fn save_contact(&mut self, draft: ContactDraft) -> Option<Notification> {
        let target = self.form.take().and_then(|form| form.target);
        match target {
            Some(id) => match self.store.update(id, draft) {
                Ok(()) => {
                    debug!(%id, "contact updated");
                    None
                }
                Err(err) => Some(Notification::warning(err.to_string())),
            },
            None => {
                let id = self.store.insert(draft);
                debug!(%id, "contact added");
                None
            }
        }
    }
}
