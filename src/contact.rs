use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned record identifier, stable for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContactId(pub u32);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editable contact fields, without an identity.
///
/// Used for seed data, the edit form and record updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub notes: String,
}

impl ContactDraft {
    #[cfg(test)]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    pub fn value(&self, field: FieldId) -> Cow<'_, str> {
        match field {
            FieldId::Name => Cow::Owned(display_name(&self.first_name, &self.last_name)),
            FieldId::FirstName => Cow::Borrowed(&self.first_name),
            FieldId::LastName => Cow::Borrowed(&self.last_name),
            FieldId::Email => Cow::Borrowed(&self.email),
            FieldId::Phone => Cow::Borrowed(&self.phone),
            FieldId::Street => Cow::Borrowed(&self.street),
            FieldId::PostalCode => Cow::Borrowed(&self.postal_code),
            FieldId::City => Cow::Borrowed(&self.city),
            FieldId::Notes => Cow::Borrowed(&self.notes),
        }
    }

    /// Mutable access to a stored attribute. `Name` is derived and has none.
    pub fn value_mut(&mut self, field: FieldId) -> Option<&mut String> {
        match field {
            FieldId::Name => None,
            FieldId::FirstName => Some(&mut self.first_name),
            FieldId::LastName => Some(&mut self.last_name),
            FieldId::Email => Some(&mut self.email),
            FieldId::Phone => Some(&mut self.phone),
            FieldId::Street => Some(&mut self.street),
            FieldId::PostalCode => Some(&mut self.postal_code),
            FieldId::City => Some(&mut self.city),
            FieldId::Notes => Some(&mut self.notes),
        }
    }

    pub fn is_blank(&self) -> bool {
        FieldId::EDITABLE
            .iter()
            .all(|field| self.value(*field).trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactRecord {
    pub id: ContactId,
    #[serde(flatten)]
    pub fields: ContactDraft,
}

impl ContactRecord {
    pub fn new(id: ContactId, fields: ContactDraft) -> Self {
        Self { id, fields }
    }

    /// Resolve a filterable field to the record attribute it names.
    pub fn field(&self, field: FieldId) -> Cow<'_, str> {
        self.fields.value(field)
    }

    pub fn display_name(&self) -> String {
        display_name(&self.fields.first_name, &self.fields.last_name)
    }
}

fn display_name(first: &str, last: &str) -> String {
    match (first.trim().is_empty(), last.trim().is_empty()) {
        (false, false) => format!("{} {}", first.trim(), last.trim()),
        (false, true) => first.trim().to_string(),
        (true, false) => last.trim().to_string(),
        (true, true) => String::new(),
    }
}

/// Fields a search filter can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// Full name, "first last".
    Name,
    FirstName,
    LastName,
    Email,
    Phone,
    Street,
    PostalCode,
    City,
    Notes,
}

impl FieldId {
    pub const ALL: [FieldId; 9] = [
        FieldId::Name,
        FieldId::FirstName,
        FieldId::LastName,
        FieldId::Email,
        FieldId::Phone,
        FieldId::Street,
        FieldId::PostalCode,
        FieldId::City,
        FieldId::Notes,
    ];

    /// Fields backed by a stored attribute, in form order.
    pub const EDITABLE: [FieldId; 8] = [
        FieldId::FirstName,
        FieldId::LastName,
        FieldId::Email,
        FieldId::Phone,
        FieldId::Street,
        FieldId::PostalCode,
        FieldId::City,
        FieldId::Notes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FieldId::Name => "name",
            FieldId::FirstName => "first_name",
            FieldId::LastName => "last_name",
            FieldId::Email => "email",
            FieldId::Phone => "phone",
            FieldId::Street => "street",
            FieldId::PostalCode => "postal_code",
            FieldId::City => "city",
            FieldId::Notes => "notes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldId::Name => "Name",
            FieldId::FirstName => "First name",
            FieldId::LastName => "Last name",
            FieldId::Email => "Email",
            FieldId::Phone => "Phone",
            FieldId::Street => "Street",
            FieldId::PostalCode => "Postal code",
            FieldId::City => "City",
            FieldId::Notes => "Notes",
        }
    }

    /// Parse a field key (case-insensitive, `-` accepted for `_`).
    pub fn from_key(s: &str) -> Option<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        FieldId::ALL.into_iter().find(|field| field.key() == wanted)
    }

    pub fn next(self) -> Self {
        let index = self.index();
        FieldId::ALL[(index + 1) % FieldId::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let index = self.index();
        FieldId::ALL[(index + FieldId::ALL.len() - 1) % FieldId::ALL.len()]
    }

    fn index(self) -> usize {
        FieldId::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
