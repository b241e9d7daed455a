use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::contact::ContactDraft;

const FIRST_NAMES: &[&str] = &[
    "Peter", "Alice", "Joshua", "Mike", "Olivia", "Nina", "Alex", "Rita", "Dan", "Umberto",
    "Henrik", "Rene", "Lisa", "Marge",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Gordon", "Simpson", "Brown", "Clavel", "Simons", "Verne", "Scott", "Allison",
    "Gates", "Rowling", "Barks", "Ross", "Schneider", "Tate",
];

const CITIES: &[&str] = &[
    "Amsterdam", "Berlin", "Helsinki", "Hong Kong", "London", "Luxemburg", "New York", "Oslo",
    "Paris", "Rome", "Stockholm", "Tokyo", "Turku",
];

const STREETS: &[&str] = &[
    "4215 Blandit Av.",
    "452-8121 Sem Ave",
    "279-4475 Tellus Road",
    "4062 Libero. Av.",
    "7081 Pede. Ave",
    "6800 Aliquet St.",
    "P.O. Box 298, 9401 Mauris St.",
    "161-7279 Augue Ave",
    "P.O. Box 496, 1390 Sagittis. Rd.",
    "448-8295 Mi Avenue",
];

const DEFAULT_SEED_SIZE: usize = 24;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read contacts file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse contacts file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The built-in demo contacts. Same input, same output: no randomness.
pub fn default_contacts() -> Vec<ContactDraft> {
    (0..DEFAULT_SEED_SIZE).map(demo_contact).collect()
}

fn demo_contact(i: usize) -> ContactDraft {
    let first = FIRST_NAMES[i % FIRST_NAMES.len()];
    let last = LAST_NAMES[(i * 7 + 3) % LAST_NAMES.len()];
    ContactDraft {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        phone: format!("+358 02 555 {:04}", (i * 37) % 10_000),
        street: STREETS[(i * 3) % STREETS.len()].to_string(),
        postal_code: format!("{:05}", 10_000 + (i * 7_919) % 90_000),
        city: CITIES[(i * 5 + 1) % CITIES.len()].to_string(),
        notes: String::new(),
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SeedFile {
    contact: Vec<ContactDraft>,
}

/// Parse a TOML document made of `[[contact]]` tables.
pub fn parse_str(raw: &str) -> Result<Vec<ContactDraft>, toml::de::Error> {
    let file: SeedFile = toml::from_str(raw)?;
    Ok(file.contact)
}

pub fn load_file(path: &Path) -> Result<Vec<ContactDraft>, SeedError> {
    let raw = fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_contacts_are_deterministic() {
        let a = default_contacts();
        let b = default_contacts();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_SEED_SIZE);
        assert_eq!(a[0].first_name, "Peter");
        assert_eq!(a[0].last_name, "Brown");
        assert_eq!(a[0].email, "peter.brown@example.com");
    }

    #[test]
    fn test_parse_contact_tables() {
        let raw = r#"
[[contact]]
first_name = "Alice"
last_name = "Smith"
city = "Oslo"

[[contact]]
first_name = "Bob"
last_name = "Jones"
notes = "plays chess"
"#;
        let contacts = parse_str(raw).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].city, "Oslo");
        assert_eq!(contacts[0].email, "");
        assert_eq!(contacts[1].notes, "plays chess");
    }

    #[test]
    fn test_empty_file_has_no_contacts() {
        assert!(parse_str("").unwrap().is_empty());
    }

    #[test]
    fn test_load_file_errors_name_the_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        let err = load_file(&missing).unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
        assert!(err.to_string().contains("missing.toml"));

        let broken = temp_dir.path().join("broken.toml");
        fs::write(&broken, "[[contact]\nfirst_name = ").unwrap();
        let err = load_file(&broken).unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));
    }
}
