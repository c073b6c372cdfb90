//! Human alias → canonical station resolution.
//!
//! The alias table is loaded once (see [`crate::config`]) and then shared
//! read-only. Aliases are matched case-insensitively and with spaces, dashes
//! and underscores treated as interchangeable.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::model::{Agency, StationKey};

pub const UNKNOWN_STATION: &str = "Unknown station";

/// Which lookup a mapping answers: an explicit agency, or the `DEFAULT`
/// pseudo-type used when the caller gives no preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasSlot {
    Default,
    Agency(Agency),
}

impl AliasSlot {
    fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case("DEFAULT") {
            return Some(AliasSlot::Default);
        }
        label.parse().ok().map(AliasSlot::Agency)
    }
}

/// Mappings registered for one alias, in source-table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    mappings: Vec<(AliasSlot, StationKey)>,
}

impl AliasEntry {
    /// Picks the preferred agency's mapping, else `DEFAULT`, else the first one inserted.
    pub fn select(&self, preferred: Option<Agency>) -> Option<&StationKey> {
        let by_slot = |slot: AliasSlot| {
            self.mappings
                .iter()
                .find(|(s, _)| *s == slot)
                .map(|(_, key)| key)
        };

        preferred
            .and_then(|agency| by_slot(AliasSlot::Agency(agency)))
            .or_else(|| by_slot(AliasSlot::Default))
            .or_else(|| self.mappings.first().map(|(_, key)| key))
    }
}

#[derive(Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: Map<String, Value>,
    #[serde(default)]
    canonical_names: Map<String, Value>,
}

/// Alias table plus the reverse (canonical id → display name) lookups.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, AliasEntry>,
    canonical_names: HashMap<StationKey, String>,
    derived_names: HashMap<StationKey, String>,
    /// Separator-free spelling → first alias registered with it.
    squashed: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read alias table {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("invalid alias table {}", path.display()))
    }

    /// Parses the JSON alias document:
    ///
    /// ```json
    /// {
    ///   "aliases": {
    ///     "grove": "PATH:26728",
    ///     "wtc": { "PATH": "PATH:26734", "MTA": "MTA:137S" }
    ///   },
    ///   "canonical_names": { "PATH:26728": "Grove Street" }
    /// }
    /// ```
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: AliasFile = serde_json::from_str(content)?;
        let mut table = Self::new();

        for (raw_alias, raw_value) in file.aliases {
            let mut mappings = Vec::new();
            match raw_value {
                Value::String(canonical) => {
                    push_mapping(&mut mappings, &raw_alias, "DEFAULT", &canonical);
                }
                Value::Object(by_type) => {
                    for (label, canonical) in by_type {
                        match canonical {
                            Value::String(canonical) => {
                                push_mapping(&mut mappings, &raw_alias, &label, &canonical)
                            }
                            Value::Null => {}
                            other => warn!(alias = %raw_alias, %label, value = %other, "Ignoring non-string alias mapping"),
                        }
                    }
                }
                Value::Null => {}
                other => warn!(alias = %raw_alias, value = %other, "Ignoring malformed alias entry"),
            }
            table.add_alias(&raw_alias, mappings);
        }

        for (raw_key, raw_name) in file.canonical_names {
            let Some(key) = StationKey::parse(&raw_key) else {
                warn!(key = %raw_key, "Ignoring canonical name with invalid station id");
                continue;
            };
            if let Some(name) = raw_name.as_str() {
                table.add_canonical_name(key, name);
            }
        }

        debug!(
            aliases = table.aliases.len(),
            canonical_names = table.canonical_names.len(),
            "Alias table loaded"
        );
        Ok(table)
    }

    /// Registers an alias. Empty aliases or empty mapping lists are ignored.
    ///
    /// The first alias to mention a station also provides its derived display name.
    pub fn add_alias(&mut self, alias: &str, mappings: Vec<(AliasSlot, StationKey)>) {
        let alias_key = alias.trim().to_lowercase();
        if alias_key.is_empty() || mappings.is_empty() {
            return;
        }

        for (_, key) in &mappings {
            self.derived_names
                .entry(key.clone())
                .or_insert_with(|| beautify_alias(&alias_key));
        }
        self.squashed
            .entry(squash(&alias_key))
            .or_insert_with(|| alias_key.clone());
        self.aliases.insert(alias_key, AliasEntry { mappings });
    }

    pub fn add_canonical_name(&mut self, key: StationKey, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.canonical_names.insert(key, name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Looks an alias up by its spelling variants, then by its separator-free form.
    pub fn entry(&self, alias: &str) -> Option<&AliasEntry> {
        candidate_keys(alias)
            .iter()
            .find_map(|candidate| self.aliases.get(candidate))
            .or_else(|| {
                self.squashed
                    .get(&squash(alias))
                    .and_then(|key| self.aliases.get(key))
            })
    }

    /// Resolves a user-supplied alias (or literal `AGENCY:ID`) to a canonical station.
    pub fn resolve(&self, alias: &str, preferred: Option<Agency>) -> Result<StationKey, ResolveError> {
        if alias.trim().is_empty() {
            return Err(ResolveError::MissingAlias);
        }

        if let Some(key) = StationKey::parse(alias) {
            return Ok(key);
        }

        self.entry(alias)
            .and_then(|entry| entry.select(preferred))
            .cloned()
            .ok_or_else(|| ResolveError::UnknownAlias(alias.trim().to_string()))
    }

    /// Display name for a station, e.g. `Grove Street (PATH)`. Never fails.
    pub fn to_human_label(
        &self,
        agency: Option<Agency>,
        station_id: Option<&str>,
        fallback: Option<&str>,
    ) -> String {
        let key = match (agency, station_id.map(str::trim)) {
            (Some(agency), Some(id)) if !id.is_empty() => Some(StationKey::new(agency, id)),
            _ => None,
        };

        let label = key
            .as_ref()
            .and_then(|key| {
                self.canonical_names
                    .get(key)
                    .or_else(|| self.derived_names.get(key))
            })
            .map(String::as_str)
            .or_else(|| fallback.map(str::trim).filter(|f| !f.is_empty()))
            .unwrap_or(UNKNOWN_STATION);

        match agency {
            Some(agency) => format!("{label} ({agency})"),
            None => label.to_string(),
        }
    }
}

fn push_mapping(mappings: &mut Vec<(AliasSlot, StationKey)>, alias: &str, label: &str, canonical: &str) {
    let Some(slot) = AliasSlot::parse(label) else {
        warn!(%alias, %label, "Ignoring alias mapping with unknown agency type");
        return;
    };
    let Some(key) = StationKey::parse(canonical) else {
        warn!(%alias, %canonical, "Ignoring alias mapping with invalid canonical id");
        return;
    };
    // A later mapping for the same slot replaces the earlier one, keeping its position.
    match mappings.iter_mut().find(|(s, _)| *s == slot) {
        Some(existing) => existing.1 = key,
        None => mappings.push((slot, key)),
    }
}

/// Spelling variants tried in order when looking an alias up.
fn candidate_keys(raw: &str) -> Vec<String> {
    let cleaned = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let variants = [
        cleaned.clone(),
        cleaned.replace(' ', "_"),
        cleaned.replace(' ', ""),
        cleaned.replace(' ', "-"),
        cleaned.replace('-', "_"),
        cleaned.replace('-', ""),
        cleaned.replace('_', ""),
        cleaned.replace('_', " "),
        cleaned.replace('_', "-"),
        cleaned.replace('-', " "),
    ];

    let mut out: Vec<String> = Vec::with_capacity(variants.len());
    for variant in variants {
        if !variant.is_empty() && !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}

/// Lowercase with spaces, dashes and underscores removed.
fn squash(alias: &str) -> String {
    alias
        .chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn beautify_alias(alias: &str) -> String {
    alias
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
