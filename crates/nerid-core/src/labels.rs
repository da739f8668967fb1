//! Label registry
//!
//! The one table of entity labels, aliases and display colors. The
//! classifier-facing side resolves raw model labels through it and the
//! renderer-facing side reads colors from it, so the two cannot drift.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Label used for non-entity tokens
pub const BACKGROUND_LABEL: &str = "O";

/// A registered entity label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDef {
    /// Canonical name (e.g., "PER")
    pub name: String,

    /// Display color as `#rrggbb`
    pub color: String,

    /// Alternative names emitted by older models (e.g., "PERSON")
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
}

impl LabelDef {
    pub fn new(name: &str, color: &str, aliases: &[&str], description: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            description: Some(description.to_string()),
        }
    }
}

/// Registry of known labels
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    labels: Vec<LabelDef>,
    /// Lookup index (uppercase name or alias -> position in `labels`)
    lookup: HashMap<String, usize>,
    background: String,
}

impl LabelRegistry {
    /// Default registry for Indonesian personal-data NER models
    pub fn indonesian_pii() -> Self {
        let defs = vec![
            LabelDef::new(BACKGROUND_LABEL, "#ffffff", &[], "Outside any entity"),
            LabelDef::new("PER", "#ffadad", &["PERSON"], "Person name"),
            LabelDef::new("LOC", "#ffda83", &["LOCATION"], "Location or address"),
            LabelDef::new("DATE_TIME", "#fdffb6", &["DOB", "DATE"], "Date, time or birth date"),
            LabelDef::new("EMAIL", "#85e0e0", &[], "Email address"),
            LabelDef::new("GENDER", "#c3c3e0", &[], "Gender"),
            LabelDef::new("SSN", "#d0b3e6", &["ID", "NIK"], "National identity number"),
            LabelDef::new("ACCOUNT", "#b0e0e6", &[], "Bank account number"),
            LabelDef::new("PHONE", "#d1ff85", &["PHONE_NUMBER"], "Phone number"),
        ];

        Self {
            lookup: index(&defs),
            labels: defs,
            background: BACKGROUND_LABEL.to_string(),
        }
    }

    /// Build a registry from configured definitions, validating the table
    pub fn from_defs(defs: Vec<LabelDef>, background: &str) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();

        for def in &defs {
            if def.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "labels.name".to_string(),
                    value: def.name.clone(),
                });
            }
            if !is_hex_color(&def.color) {
                return Err(ConfigError::InvalidValue {
                    key: format!("labels.{}.color", def.name),
                    value: def.color.clone(),
                });
            }

            for key in std::iter::once(&def.name).chain(def.aliases.iter()) {
                if !seen.insert(key.to_uppercase()) {
                    return Err(ConfigError::InvalidValue {
                        key: "labels".to_string(),
                        value: format!("duplicate label or alias '{key}'"),
                    });
                }
            }
        }

        if !defs.iter().any(|d| d.name == background) {
            return Err(ConfigError::MissingRequired(format!(
                "background label '{background}' is not registered"
            )));
        }

        Ok(Self {
            lookup: index(&defs),
            labels: defs,
            background: background.to_string(),
        })
    }

    /// Resolve a name or alias (case-insensitive) to its definition
    pub fn resolve(&self, raw: &str) -> Option<&LabelDef> {
        self.lookup
            .get(&raw.trim().to_uppercase())
            .map(|&idx| &self.labels[idx])
    }

    /// Look up a definition by canonical name only
    pub fn get(&self, name: &str) -> Option<&LabelDef> {
        self.labels.iter().find(|l| l.name == name)
    }

    /// Display color for a canonical label
    pub fn color(&self, name: &str) -> Option<&str> {
        self.get(name).map(|l| l.color.as_str())
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn is_background(&self, name: &str) -> bool {
        name == self.background
    }

    pub fn labels(&self) -> &[LabelDef] {
        &self.labels
    }
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::indonesian_pii()
    }
}

/// Uppercase name and alias index; the first definition wins on collision
fn index(defs: &[LabelDef]) -> HashMap<String, usize> {
    let mut lookup = HashMap::new();
    for (idx, def) in defs.iter().enumerate() {
        for key in std::iter::once(&def.name).chain(def.aliases.iter()) {
            lookup.entry(key.to_uppercase()).or_insert(idx);
        }
    }
    lookup
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_labels() {
        let registry = LabelRegistry::indonesian_pii();
        for name in [
            "PER", "LOC", "DATE_TIME", "EMAIL", "GENDER", "SSN", "ACCOUNT", "PHONE",
        ] {
            assert!(registry.color(name).is_some(), "missing color for {name}");
        }
        assert_eq!(registry.background(), "O");
    }

    #[test]
    fn test_resolve_aliases() {
        let registry = LabelRegistry::indonesian_pii();
        assert_eq!(registry.resolve("PERSON").unwrap().name, "PER");
        assert_eq!(registry.resolve("location").unwrap().name, "LOC");
        assert_eq!(registry.resolve("DOB").unwrap().name, "DATE_TIME");
        assert_eq!(registry.resolve("account").unwrap().name, "ACCOUNT");
        assert!(registry.resolve("VEHICLE_PLATE").is_none());
    }

    #[test]
    fn test_rejects_bad_color() {
        let defs = vec![
            LabelDef::new("O", "#ffffff", &[], ""),
            LabelDef::new("PER", "red", &[], ""),
        ];
        let err = LabelRegistry::from_defs(defs, "O").unwrap_err();
        assert!(err.to_string().contains("labels.PER.color"));
    }

    #[test]
    fn test_rejects_duplicate_alias() {
        let defs = vec![
            LabelDef::new("O", "#ffffff", &[], ""),
            LabelDef::new("PER", "#ffadad", &["NAME"], ""),
            LabelDef::new("ORG", "#aaaaaa", &["name"], ""),
        ];
        assert!(LabelRegistry::from_defs(defs, "O").is_err());
    }

    #[test]
    fn test_requires_background() {
        let defs = vec![LabelDef::new("PER", "#ffadad", &[], "")];
        let err = LabelRegistry::from_defs(defs, "O").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }
}
