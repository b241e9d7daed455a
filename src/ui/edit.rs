use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::contact::{ContactDraft, ContactId, FieldId};
use crate::controller::ContactForm;
use crate::filter::SearchFilter;
use crate::search;

/// Text inputs backing the contact edit form.
#[derive(Default)]
pub struct ContactEditor {
    pub active: bool,
    target: Option<ContactId>,
    inputs: Vec<(FieldId, Input)>,
    focused: usize,
}

impl ContactEditor {
    pub fn start(&mut self, form: &ContactForm) {
        self.active = true;
        self.target = form.target;
        self.focused = 0;
        self.inputs = FieldId::EDITABLE
            .iter()
            .map(|field| (*field, Input::new(form.draft.value(*field).into_owned())))
            .collect();
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.inputs.clear();
        self.focused = 0;
    }

    pub fn target(&self) -> Option<ContactId> {
        self.target
    }

    pub fn draft(&self) -> ContactDraft {
        let mut draft = ContactDraft::default();
        for (field, input) in &self.inputs {
            if let Some(slot) = draft.value_mut(*field) {
                *slot = input.value().trim().to_string();
            }
        }
        draft
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &str)> + '_ {
        self.inputs
            .iter()
            .map(|(field, input)| (*field, input.value()))
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn visual_cursor(&self) -> usize {
        self.inputs
            .get(self.focused)
            .map_or(0, |(_, input)| input.visual_cursor())
    }

    pub fn focus_next(&mut self) {
        if !self.inputs.is_empty() {
            self.focused = (self.focused + 1) % self.inputs.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.inputs.is_empty() {
            self.focused = (self.focused + self.inputs.len() - 1) % self.inputs.len();
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match self.inputs.get_mut(self.focused) {
            Some((_, input)) => input.handle_event(&Event::Key(key)).is_some(),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRow {
    Field,
    Term,
    MatchCase,
    Prefix,
}

impl SearchRow {
    pub const ALL: [SearchRow; 4] = [
        SearchRow::Field,
        SearchRow::Term,
        SearchRow::MatchCase,
        SearchRow::Prefix,
    ];

    fn index(self) -> usize {
        match self {
            SearchRow::Field => 0,
            SearchRow::Term => 1,
            SearchRow::MatchCase => 2,
            SearchRow::Prefix => 3,
        }
    }
}

/// Search-entry form state. Built once at startup and kept across visits so
/// the last criteria stay filled in.
pub struct SearchForm {
    pub field: FieldId,
    pub term: Input,
    pub match_case: bool,
    pub only_prefix: bool,
    pub row: SearchRow,
}

impl SearchForm {
    pub fn new(field: FieldId) -> Self {
        Self {
            field,
            term: Input::default(),
            match_case: false,
            only_prefix: false,
            row: SearchRow::Term,
        }
    }

    pub fn next_row(&mut self) {
        let index = (self.row.index() + 1) % SearchRow::ALL.len();
        self.row = SearchRow::ALL[index];
    }

    pub fn prev_row(&mut self) {
        let len = SearchRow::ALL.len();
        let index = (self.row.index() + len - 1) % len;
        self.row = SearchRow::ALL[index];
    }

    /// Flip the focused option. Returns false when the term row has focus.
    pub fn toggle(&mut self) -> bool {
        match self.row {
            SearchRow::Field => self.field = self.field.next(),
            SearchRow::MatchCase => self.match_case = !self.match_case,
            SearchRow::Prefix => self.only_prefix = !self.only_prefix,
            SearchRow::Term => return false,
        }
        true
    }

    /// Refill the form from an existing filter.
    pub fn load(&mut self, filter: &SearchFilter) {
        self.field = filter.field();
        self.term = Input::new(filter.term().to_string());
        self.match_case = filter.is_match_case();
        self.only_prefix = filter.is_only_prefix();
        self.row = SearchRow::Term;
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.term.handle_event(&Event::Key(key)).is_some()
    }

    /// The filter described by the form, or None while the term is blank.
    pub fn to_filter(&self) -> Option<SearchFilter> {
        let term = search::normalize_query(self.term.value())?;
        Some(
            SearchFilter::new(self.field, term)
                .match_case(self.match_case)
                .only_prefix(self.only_prefix),
        )
    }
}
