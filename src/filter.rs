use std::fmt;

use serde::Serialize;

use crate::contact::{ContactRecord, FieldId};
use crate::search;

/// A single field/term criterion.
///
/// Equality is by value on all four parts; a saved search in the navigation
/// tree is identified by its filter, so two filters built from the same input
/// are the same tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchFilter {
    field: FieldId,
    term: String,
    match_case: bool,
    only_prefix: bool,
}

impl SearchFilter {
    pub fn new(field: FieldId, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
            match_case: false,
            only_prefix: false,
        }
    }

    pub fn match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    pub fn only_prefix(mut self, only_prefix: bool) -> Self {
        self.only_prefix = only_prefix;
        self
    }

    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_match_case(&self) -> bool {
        self.match_case
    }

    pub fn is_only_prefix(&self) -> bool {
        self.only_prefix
    }

    /// Whether the named field of `record` contains (or starts with) the term.
    pub fn matches(&self, record: &ContactRecord) -> bool {
        search::text_matches(
            &record.field(self.field),
            &self.term,
            self.match_case,
            self.only_prefix,
        )
    }

    /// `field=*term*` as used in notifications.
    pub fn pattern(&self) -> String {
        format!("{}=*{}*", self.field, self.term)
    }
}

/// Tree caption.
impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.only_prefix {
            write!(f, "{}={}*", self.field, self.term)?;
        } else {
            write!(f, "{}=*{}*", self.field, self.term)?;
        }
        if self.match_case {
            f.write_str(" [Aa]")?;
        }
        Ok(())
    }
}

impl Serialize for SearchFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SearchFilter", 4)?;
        state.serialize_field("field", self.field.key())?;
        state.serialize_field("term", &self.term)?;
        state.serialize_field("match_case", &self.match_case)?;
        state.serialize_field("only_prefix", &self.only_prefix)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::{ContactDraft, ContactId};

    fn alice() -> ContactRecord {
        ContactRecord::new(ContactId(0), ContactDraft::new("Alice", "Smith"))
    }

    #[test]
    fn test_equality_is_by_value() {
        let a = SearchFilter::new(FieldId::Name, "smi");
        let b = SearchFilter::new(FieldId::Name, String::from("smi"));
        assert_eq!(a, b);
        assert_ne!(a, a.clone().match_case(true));
        assert_ne!(a, a.clone().only_prefix(true));
        assert_ne!(a, SearchFilter::new(FieldId::LastName, "smi"));
    }

    #[test]
    fn test_case_insensitive_unless_match_case() {
        let record = alice();
        let lower = SearchFilter::new(FieldId::Name, "smith");
        let upper = SearchFilter::new(FieldId::Name, "SMITH");
        assert_eq!(lower.matches(&record), upper.matches(&record));
        assert!(upper.matches(&record));
        assert!(!upper.clone().match_case(true).matches(&record));
        assert!(SearchFilter::new(FieldId::Name, "Smith")
            .match_case(true)
            .matches(&record));
    }

    #[test]
    fn test_prefix_only() {
        let record = alice();
        let prefix = SearchFilter::new(FieldId::LastName, "smi").only_prefix(true);
        assert!(prefix.matches(&record));
        let inner = SearchFilter::new(FieldId::LastName, "mit").only_prefix(true);
        assert!(!inner.matches(&record));
        assert!(SearchFilter::new(FieldId::LastName, "mit").matches(&record));
    }

    #[test]
    fn test_empty_term_matches_everything() {
        assert!(SearchFilter::new(FieldId::Email, "").matches(&alice()));
    }

    #[test]
    fn test_captions() {
        let f = SearchFilter::new(FieldId::LastName, "smi");
        assert_eq!(f.to_string(), "last_name=*smi*");
        assert_eq!(f.pattern(), "last_name=*smi*");
        assert_eq!(
            f.clone().only_prefix(true).match_case(true).to_string(),
            "last_name=smi* [Aa]"
        );
    }
}
