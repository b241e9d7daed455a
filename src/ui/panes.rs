/// Panel identifiers for the two-pane layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    /// Navigation tree: Show All, Search and saved searches
    Tree,
    /// Main pane: contact list, search entry or contact form
    Main,
}

impl Panel {
    #[cfg(test)]
    pub const ALL: [Panel; 2] = [Panel::Tree, Panel::Main];

    pub fn title(self) -> &'static str {
        match self {
            Panel::Tree => "NAVIGATION",
            Panel::Main => "CONTACTS",
        }
    }

    /// Next panel, wrapping around
    pub fn next(self) -> Self {
        match self {
            Panel::Tree => Panel::Main,
            Panel::Main => Panel::Tree,
        }
    }
}
