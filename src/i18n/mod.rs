//! Internationalization (i18n) support for UI strings
//!
//! Language tables are nested YAML maps. They are flattened on load, so
//! `post: { next: ... }` is looked up as `post.next`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Built-in language tables, overridable from the site's languages directory
const BUILTIN: &[(&str, &str)] = &[
    ("en", include_str!("languages/en.yml")),
    ("pt-BR", include_str!("languages/pt-BR.yml")),
];

const FALLBACK: &str = "en";

/// Flat table: dotted key -> translation
type Table = HashMap<String, String>;

/// Internationalization handler
pub struct I18n {
    /// Current language
    language: String,
    tables: HashMap<String, Table>,
}

impl I18n {
    /// Create a handler with no translations loaded
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            tables: HashMap::new(),
        }
    }

    /// Create a handler preloaded with the built-in tables
    pub fn with_builtin(language: &str) -> Result<Self> {
        let mut i18n = Self::new(language);
        for (lang, content) in BUILTIN {
            let table = parse_table(content)
                .with_context(|| format!("Invalid built-in language table {}", lang))?;
            i18n.merge(lang, table);
        }
        Ok(i18n)
    }

    /// Load `<lang>.yml`, `<lang>.yaml` or `<lang>.json` files from a
    /// directory. Their keys override the same keys already loaded.
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml" | "yaml" | "json")) {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            // JSON is a subset of YAML, so one parser covers both
            match parse_table(&fs::read_to_string(&path)?) {
                Ok(table) => {
                    tracing::debug!("Loaded language file: {:?}", path);
                    self.merge(lang, table);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get a translation by key in the current language
    pub fn get(&self, key: &str) -> String {
        self.get_for_lang(&self.language, key)
    }

    /// Get a translation for a specific language, falling back to English
    /// and then to the key itself
    pub fn get_for_lang(&self, lang: &str, key: &str) -> String {
        [lang, FALLBACK]
            .iter()
            .find_map(|l| self.tables.get(*l)?.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: usize) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// Every key of the current language, English filling the gaps
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = self.tables.get(FALLBACK).cloned().unwrap_or_default();
        if let Some(table) = self.tables.get(&self.language) {
            result.extend(table.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        result
    }

    fn merge(&mut self, lang: &str, table: Table) {
        self.tables.entry(lang.to_string()).or_default().extend(table);
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(FALLBACK)
    }
}

fn parse_table(content: &str) -> Result<Table> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let mut table = Table::new();
    flatten(&value, "", &mut table);
    Ok(table)
}

fn flatten(value: &serde_yaml::Value, prefix: &str, table: &mut Table) {
    let text = match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, child) in map {
                let Some(key) = key.as_str() else { continue };
                let full_key = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(child, &full_key, table);
            }
            return;
        }
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Tagged(_) => return,
    };
    if !prefix.is_empty() {
        table.insert(prefix.to_string(), text);
    }
}
