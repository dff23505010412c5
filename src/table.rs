//! Definition tables: the raw input a [`BitRegistry`](crate::BitRegistry) is built from.
//!
//! A table maps a registry name to an ordered list of raw entries. The native
//! file format is YAML, which is also what a registry serializes back to:
//!
//! ```yaml
//! ccdmask:
//!   - [BAD,              0, "Pre-determined bad pixel (any reason)"]
//!   - [HOT,              1, "Hot pixel", {"blat": "foo"}]
//! ```
//!
//! TOML is accepted as well, one array of arrays per registry:
//!
//! ```toml
//! ccdmask = [
//!     ["BAD", 0, "Pre-determined bad pixel (any reason)"],
//!     ["HOT", 1, "Hot pixel", { blat = "foo" }],
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::value::{AttrValue, Extras};

/// One unvalidated definition entry: `[name, bit, comment]` or
/// `[name, bit, comment, extras]`.
///
/// Shape is checked when a registry is built, not here, so malformed entries
/// survive loading and are reported with the registry they belong to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawBitEntry(Vec<AttrValue>);

impl RawBitEntry {
    pub fn new(name: impl Into<String>, bit: u32, comment: impl Into<String>) -> Self {
        Self(vec![
            AttrValue::String(name.into()),
            AttrValue::from(bit),
            AttrValue::String(comment.into()),
        ])
    }

    /// Append an extras mapping as the fourth element.
    pub fn with_extra(mut self, extra: Extras) -> Self {
        self.0.push(AttrValue::Map(extra));
        self
    }

    /// Wrap arbitrary values, well-formed or not.
    pub fn from_values(values: Vec<AttrValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[AttrValue] {
        &self.0
    }
}

/// Registry name → ordered raw entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionTable {
    registries: BTreeMap<String, Vec<RawBitEntry>>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the entries for one registry.
    pub fn insert(&mut self, registry: impl Into<String>, entries: Vec<RawBitEntry>) {
        self.registries.insert(registry.into(), entries);
    }

    pub fn get(&self, registry: &str) -> Option<&[RawBitEntry]> {
        self.registries.get(registry).map(Vec::as_slice)
    }

    /// Registry names in sorted order.
    pub fn registry_names(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Parse from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, TableError> {
        let table: Self = serde_yaml::from_str(content)?;
        table.trace_loaded("yaml");
        Ok(table)
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, TableError> {
        let table: Self = toml::from_str(content)?;
        table.trace_loaded("toml");
        Ok(table)
    }

    /// Load a definition file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str) -> Result<Self, TableError> = match ext.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str,
            Some("toml") => Self::from_toml_str,
            _ => return Err(TableError::UnsupportedFormat(path.display().to_string())),
        };

        let content = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading mask definitions");
        parse(&content)
    }

    fn trace_loaded(&self, format: &str) {
        tracing::debug!(
            format,
            registries = self.registries.len(),
            entries = self.registries.values().map(Vec::len).sum::<usize>(),
            "parsed definition table"
        );
    }
}
