use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;
use tracing::warn;

use crate::contact::FieldId;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "addrbook";

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
    /// Seed file with `[[contact]]` tables; built-in demo data when None.
    pub contacts: Option<PathBuf>,
    pub default_search_field: FieldId,
    pub keys: Keys,
    pub ui: UiConfig,
    pub top_bar: TopBarConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            contacts: None,
            default_search_field: FieldId::LastName,
            keys: Keys::default(),
            ui: UiConfig::default(),
            top_bar: TopBarConfig::default(),
        }
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

// =============================================================================
// Top Bar Configuration
// =============================================================================

/// Actions available for top bar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBarAction {
    Add,
    Search,
    Share,
    Help,
}

impl TopBarAction {
    /// Display title for the button
    pub fn title(&self) -> &'static str {
        match self {
            TopBarAction::Add => "ADD CONTACT",
            TopBarAction::Search => "SEARCH",
            TopBarAction::Share => "SHARE",
            TopBarAction::Help => "HELP",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Some(TopBarAction::Add),
            "search" => Some(TopBarAction::Search),
            "share" => Some(TopBarAction::Share),
            "help" => Some(TopBarAction::Help),
            _ => None,
        }
    }
}

/// A single top bar button
#[derive(Debug, Clone)]
pub struct TopBarButton {
    pub key: String,
    pub action: TopBarAction,
}

impl TopBarButton {
    /// Get the function key number (1-12) or None if invalid
    pub fn function_key_number(&self) -> Option<u8> {
        let upper = self.key.to_ascii_uppercase();
        if upper.starts_with('F') {
            upper[1..].parse::<u8>().ok().filter(|&n| (1..=12).contains(&n))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopBarConfig {
    pub buttons: Vec<TopBarButton>,
}

impl Default for TopBarConfig {
    fn default() -> Self {
        Self {
            buttons: vec![
                TopBarButton { key: "F1".into(), action: TopBarAction::Help },
                TopBarButton { key: "F2".into(), action: TopBarAction::Add },
                TopBarButton { key: "F3".into(), action: TopBarAction::Search },
                TopBarButton { key: "F4".into(), action: TopBarAction::Share },
            ],
        }
    }
}

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
    /// Width of the navigation tree pane in columns.
    pub tree_width: u16,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiFile::default().into()
    }
}

impl Default for UiColors {
    fn default() -> Self {
        let file = UiColorsFile::default();
        Self {
            border: file.border,
            selection_bg: file.selection_bg,
            selection_fg: file.selection_fg,
            separator: file.separator,
            status_fg: file.status_fg,
            status_bg: file.status_bg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Keys outside text entry
    pub global: GlobalKeys,
    /// Keys while the navigation tree has focus
    pub tree: TreeKeys,
    /// Keys while the contact list has focus
    pub list: ListKeys,
    /// Keys for the search-entry and contact forms
    pub form: FormKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub search: Vec<String>,
    pub add: Vec<String>,
    pub focus_next: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TreeKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub confirm: Vec<String>,
    pub toggle: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub open: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub toggle: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            search: vec!["/".into()],
            add: vec!["a".into()],
            focus_next: vec!["Tab".into()],
        }
    }
}

impl Default for TreeKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            confirm: vec!["Enter".into()],
            toggle: vec!["Space".into()],
        }
    }
}

impl Default for ListKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            open: vec!["Enter".into(), "e".into()],
        }
    }
}

impl Default for FormKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into()],
            next: vec!["Tab".into(), "Down".into()],
            prev: vec!["Backtab".into(), "Up".into()],
            toggle: vec!["Space".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    tree: TreeKeysFile,
    list: ListKeysFile,
    form: FormKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    search: KeyBinding,
    add: KeyBinding,
    focus_next: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            search: KeyBinding::Multiple(defaults.search),
            add: KeyBinding::Multiple(defaults.add),
            focus_next: KeyBinding::Multiple(defaults.focus_next),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TreeKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    confirm: KeyBinding,
    toggle: KeyBinding,
}

impl Default for TreeKeysFile {
    fn default() -> Self {
        let defaults = TreeKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            confirm: KeyBinding::Multiple(defaults.confirm),
            toggle: KeyBinding::Multiple(defaults.toggle),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ListKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    open: KeyBinding,
}

impl Default for ListKeysFile {
    fn default() -> Self {
        let defaults = ListKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            open: KeyBinding::Multiple(defaults.open),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FormKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    toggle: KeyBinding,
}

impl Default for FormKeysFile {
    fn default() -> Self {
        let defaults = FormKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            toggle: KeyBinding::Multiple(defaults.toggle),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                search: file.global.search.into_vec(),
                add: file.global.add.into_vec(),
                focus_next: file.global.focus_next.into_vec(),
            },
            tree: TreeKeys {
                next: file.tree.next.into_vec(),
                prev: file.tree.prev.into_vec(),
                confirm: file.tree.confirm.into_vec(),
                toggle: file.tree.toggle.into_vec(),
            },
            list: ListKeys {
                next: file.list.next.into_vec(),
                prev: file.list.prev.into_vec(),
                open: file.list.open.into_vec(),
            },
            form: FormKeys {
                cancel: file.form.cancel.into_vec(),
                confirm: file.form.confirm.into_vec(),
                next: file.form.next.into_vec(),
                prev: file.form.prev.into_vec(),
                toggle: file.form.toggle.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case (since 'M' means Shift+m, different from 'm').
/// Multi-character key names are case-insensitive (Enter, ENTER, enter are the same).
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        match trimmed.to_ascii_lowercase().as_str() {
            "esc" => "escape".to_string(),
            "shift+tab" => "backtab".to_string(),
            other => other.to_string(),
        }
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

fn validate_key_bindings(keys: &Keys) -> Result<()> {
    check_context_collisions(
        &[
            ("quit", &keys.global.quit),
            ("search", &keys.global.search),
            ("add", &keys.global.add),
            ("focus_next", &keys.global.focus_next),
        ],
        "global",
    )?;

    check_context_collisions(
        &[
            ("next", &keys.tree.next),
            ("prev", &keys.tree.prev),
            ("confirm", &keys.tree.confirm),
            ("toggle", &keys.tree.toggle),
        ],
        "tree",
    )?;

    check_context_collisions(
        &[
            ("next", &keys.list.next),
            ("prev", &keys.list.prev),
            ("open", &keys.list.open),
        ],
        "list",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.form.cancel),
            ("confirm", &keys.form.confirm),
            ("next", &keys.form.next),
            ("prev", &keys.form.prev),
            ("toggle", &keys.form.toggle),
        ],
        "form",
    )?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    contacts: Option<PathBuf>,
    default_search_field: Option<String>,
    keys: KeysFile,
    ui: UiFile,
    top_bar: TopBarFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TopBarFile {
    #[serde(flatten)]
    buttons: HashMap<String, String>,
}

impl From<TopBarFile> for TopBarConfig {
    fn from(file: TopBarFile) -> Self {
        if file.buttons.is_empty() {
            return TopBarConfig::default();
        }

        let mut buttons: Vec<TopBarButton> = Vec::new();

        for (key, action_str) in file.buttons {
            let button = TopBarButton {
                key: key.to_ascii_uppercase(),
                action: TopBarAction::Help,
            };
            if button.function_key_number().is_none() {
                warn!("invalid top_bar key '{}', expected F1-F12", key);
                continue;
            }

            let Some(action) = TopBarAction::from_str(&action_str) else {
                warn!(
                    "invalid top_bar action '{}' for key '{}', expected one of: add, search, share, help",
                    action_str, key
                );
                continue;
            };

            buttons.push(TopBarButton { action, ..button });
        }

        buttons.sort_by_key(|b| b.function_key_number().unwrap_or(0));

        if buttons.is_empty() {
            TopBarConfig::default()
        } else {
            TopBarConfig { buttons }
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
    tree_width: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(95, 175, 215),
            selection_bg: RgbColor::new(95, 175, 215),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(95, 175, 215),
            status_fg: RgbColor::new(95, 175, 215),
            status_bg: RgbColor::new(0, 0, 0),
        }
    }
}

const DEFAULT_TREE_WIDTH: u16 = 28;

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let tree_width = match file.tree_width {
            Some(0) | None => DEFAULT_TREE_WIDTH,
            Some(width) => width,
        };
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                separator: file.colors.separator,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
            tree_width,
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Loading
// =============================================================================

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from `explicit`, or from the default location.
///
/// An explicitly named file must exist; a missing default file means defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let mut config = parse_str(&raw)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

pub fn parse_str(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let default_search_field = match cfg_file.default_search_field.as_deref() {
        Some(key) => FieldId::from_key(key).ok_or_else(|| {
            anyhow!(
                "unknown default_search_field `{}`, expected one of: {}",
                key,
                field_keys()
            )
        })?,
        None => FieldId::LastName,
    };

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: None,
        contacts: cfg_file.contacts.map(|path| expand_tilde(&path)),
        default_search_field,
        keys,
        ui: cfg_file.ui.into(),
        top_bar: cfg_file.top_bar.into(),
    })
}

fn field_keys() -> String {
    FieldId::ALL
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in_table(
        table,
        "",
        &["contacts", "default_search_field", "keys", "ui", "top_bar"],
    );

    if let Some(keys) = table.get("keys").and_then(|v| v.as_table()) {
        warn_unknown_in_table(keys, "keys.", &["global", "tree", "list", "form"]);
        let contexts: [(&str, &[&str]); 4] = [
            ("global", &["quit", "search", "add", "focus_next"]),
            ("tree", &["next", "prev", "confirm", "toggle"]),
            ("list", &["next", "prev", "open"]),
            ("form", &["cancel", "confirm", "next", "prev", "toggle"]),
        ];
        for (context, known) in contexts {
            if let Some(section) = keys.get(context).and_then(|v| v.as_table()) {
                warn_unknown_in_table(section, &format!("keys.{}.", context), known);
            }
        }
    }

    if let Some(ui) = table.get("ui").and_then(|v| v.as_table()) {
        warn_unknown_in_table(ui, "ui.", &["colors", "tree_width"]);
        if let Some(colors) = ui.get("colors").and_then(|v| v.as_table()) {
            warn_unknown_in_table(
                colors,
                "ui.colors.",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                ],
            );
        }
    }
}

fn warn_unknown_in_table(table: &toml::map::Map<String, toml::Value>, prefix: &str, known: &[&str]) {
    let known: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warn!("unknown configuration key `{}{}`", prefix, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_str("").unwrap();
        assert!(config.contacts.is_none());
        assert_eq!(config.default_search_field, FieldId::LastName);
        assert_eq!(config.keys.global.quit, vec!["q".to_string()]);
        assert_eq!(config.top_bar.buttons.len(), 4);
        assert_eq!(config.ui.tree_width, DEFAULT_TREE_WIDTH);
    }

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
contacts = "/tmp/people.toml"
default_search_field = "city"

[keys.tree]
next = "n"
prev = ["p", "Up"]

[ui]
tree_width = 40

[ui.colors]
border = [1, 2, 3]
status_bg = { r = 10, g = 20, b = 30 }

[top_bar]
F5 = "search"
f2 = "add"
F13 = "help"
F6 = "dance"
"#;
        let config = parse_str(raw).unwrap();
        assert_eq!(config.contacts, Some(PathBuf::from("/tmp/people.toml")));
        assert_eq!(config.default_search_field, FieldId::City);
        assert_eq!(config.keys.tree.next, vec!["n".to_string()]);
        assert_eq!(config.keys.tree.prev, vec!["p".to_string(), "Up".to_string()]);
        assert_eq!(config.keys.list.open, ListKeys::default().open);
        assert_eq!(config.ui.tree_width, 40);
        assert_eq!(config.ui.colors.border, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.colors.status_bg, RgbColor::new(10, 20, 30));

        let buttons: Vec<(&str, TopBarAction)> = config
            .top_bar
            .buttons
            .iter()
            .map(|b| (b.key.as_str(), b.action))
            .collect();
        assert_eq!(
            buttons,
            vec![("F2", TopBarAction::Add), ("F5", TopBarAction::Search)]
        );
    }

    #[test]
    fn test_unknown_search_field_is_an_error() {
        let err = parse_str("default_search_field = \"nickname\"").unwrap_err();
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_key_collision_is_an_error() {
        let raw = r#"
[keys.form]
confirm = "Enter"
toggle = "enter"
"#;
        let err = parse_str(raw).unwrap_err();
        assert!(err.to_string().contains("[keys.form]"));
    }

    #[test]
    fn test_single_char_bindings_are_case_sensitive() {
        let raw = r#"
[keys.list]
next = "j"
prev = "J"
"#;
        assert!(parse_str(raw).is_ok());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_records_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "default_search_field = \"email\"\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.config_path, Some(path));
        assert_eq!(config.default_search_field, FieldId::Email);
    }

    #[test]
    fn test_function_key_number() {
        let button = |key: &str| TopBarButton {
            key: key.into(),
            action: TopBarAction::Help,
        };
        assert_eq!(button("F1").function_key_number(), Some(1));
        assert_eq!(button("f12").function_key_number(), Some(12));
        assert_eq!(button("F0").function_key_number(), None);
        assert_eq!(button("G1").function_key_number(), None);
    }
}
