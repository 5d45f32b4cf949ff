use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LadingError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Default transactions extract (CSV or XLSX).
    #[serde(default)]
    pub transactions: Option<String>,
    /// Default commodity-code lookup (delimited text).
    #[serde(default)]
    pub lookup: Option<String>,
    /// Classification rules JSON; the built-in rule set is used when unset.
    #[serde(default)]
    pub rules: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_unclassified_label")]
    pub unclassified_label: String,
    /// Classifications that get a sub-classification breakdown in `report`.
    #[serde(default = "default_breakdowns")]
    pub breakdowns: Vec<String>,
    #[serde(default)]
    pub top_n: Option<usize>,
    /// All-digit codes shorter than this are left-padded with zeros.
    #[serde(default = "default_code_width")]
    pub code_width: usize,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub columns: ColumnMap,
}

/// Accepted raw header names for each canonical column. Matching is
/// case-insensitive and ignores surrounding whitespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnMap {
    #[serde(default = "default_code_aliases")]
    pub code: Vec<String>,
    #[serde(default = "default_description_aliases")]
    pub description: Vec<String>,
    #[serde(default = "default_origin_aliases")]
    pub origin: Vec<String>,
    #[serde(default = "default_weight_aliases")]
    pub weight_kg: Vec<String>,
    #[serde(default = "default_value_aliases")]
    pub value: Vec<String>,
    #[serde(default = "default_lookup_key_aliases")]
    pub lookup_key: Vec<String>,
    #[serde(default = "default_lookup_label_aliases")]
    pub lookup_label: Vec<String>,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_code_aliases() -> Vec<String> {
    aliases(&["code", "hs code", "hs_code", "tariff code", "tariff", "commodity code"])
}

fn default_description_aliases() -> Vec<String> {
    aliases(&["description", "goods description", "commodity description", "commodity"])
}

fn default_origin_aliases() -> Vec<String> {
    aliases(&["origin", "country of origin", "origin country", "country"])
}

fn default_weight_aliases() -> Vec<String> {
    aliases(&["weight_kg", "weight (kg)", "weight", "net weight", "kg"])
}

fn default_value_aliases() -> Vec<String> {
    aliases(&["value", "cif", "cif value", "value (cif)", "cif_value"])
}

fn default_lookup_key_aliases() -> Vec<String> {
    aliases(&["code_group", "hs4", "heading", "code"])
}

fn default_lookup_label_aliases() -> Vec<String> {
    aliases(&["category_label", "category", "label", "description"])
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            code: default_code_aliases(),
            description: default_description_aliases(),
            origin: default_origin_aliases(),
            weight_kg: default_weight_aliases(),
            value: default_value_aliases(),
            lookup_key: default_lookup_key_aliases(),
            lookup_label: default_lookup_label_aliases(),
        }
    }
}

fn default_output_dir() -> String {
    "reports".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_unclassified_label() -> String {
    "Unclassified".to_string()
}

fn default_breakdowns() -> Vec<String> {
    vec!["Fish".to_string(), "Cattle".to_string()]
}

fn default_code_width() -> usize {
    8
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transactions: None,
            lookup: None,
            rules: None,
            output_dir: default_output_dir(),
            currency_symbol: default_currency_symbol(),
            unclassified_label: default_unclassified_label(),
            breakdowns: default_breakdowns(),
            top_n: None,
            code_width: default_code_width(),
            delimiter: None,
            columns: ColumnMap::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("lading")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load settings from `path`, or from the default location when `None`.
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_settings_path(), false),
    };
    if !path.exists() {
        if explicit {
            return Err(LadingError::Settings(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| LadingError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LadingError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
