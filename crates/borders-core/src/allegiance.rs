//! Allegiance code normalization.
//!
//! Raw allegiance codes from sector data are mapped to the effective code
//! used for borders, so that e.g. every `ImXX` sub-polity draws as one
//! Imperial region and client states draw as non-aligned.

use crate::grid::NON_ALIGNED;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or saving a rule table
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Failed to parse allegiance rules: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read allegiance rules from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One normalization rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllegianceRule {
    /// The code is exactly `code`
    Exact { code: String, effective: String },
    /// `prefix` followed by exactly `suffix_len` more characters
    Prefix {
        prefix: String,
        suffix_len: usize,
        effective: String,
    },
    /// `prefix` followed by a single ASCII digit
    PrefixDigit { prefix: String, effective: String },
    /// Empty or all spaces
    Blank { effective: String },
}

impl AllegianceRule {
    fn exact(code: &str, effective: &str) -> Self {
        AllegianceRule::Exact {
            code: code.to_string(),
            effective: effective.to_string(),
        }
    }

    fn prefix(prefix: &str, suffix_len: usize, effective: &str) -> Self {
        AllegianceRule::Prefix {
            prefix: prefix.to_string(),
            suffix_len,
            effective: effective.to_string(),
        }
    }

    /// The effective code if this rule applies to `code`
    pub fn apply(&self, code: &str) -> Option<&str> {
        match self {
            AllegianceRule::Exact { code: c, effective } => (c == code).then_some(effective.as_str()),
            AllegianceRule::Prefix {
                prefix,
                suffix_len,
                effective,
            } => code
                .strip_prefix(prefix.as_str())
                .filter(|rest| rest.chars().count() == *suffix_len)
                .map(|_| effective.as_str()),
            AllegianceRule::PrefixDigit { prefix, effective } => code
                .strip_prefix(prefix.as_str())
                .filter(|rest| rest.len() == 1 && rest.bytes().all(|b| b.is_ascii_digit()))
                .map(|_| effective.as_str()),
            AllegianceRule::Blank { effective } => code.chars().all(|c| c == ' ').then_some(effective.as_str()),
        }
    }
}

/// Ordered rule table, evaluated first match wins. Codes no rule matches
/// are their own effective code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllegianceRules {
    pub rules: Vec<AllegianceRule>,
}

impl Default for AllegianceRules {
    fn default() -> Self {
        let mut rules = vec![
            AllegianceRule::prefix("Im", 2, "Im"),
            AllegianceRule::prefix("As", 2, "As"),
            AllegianceRule::prefix("Cs", 2, NON_ALIGNED),
            AllegianceRule::prefix("Na", 2, NON_ALIGNED),
            AllegianceRule::exact("XXXX", NON_ALIGNED),
            AllegianceRule::exact("---", NON_ALIGNED),
            AllegianceRule::Blank {
                effective: NON_ALIGNED.to_string(),
            },
        ];
        // Client states
        for client in ["Cs", "Cz", "Hc", "Kc"] {
            rules.push(AllegianceRule::exact(client, NON_ALIGNED));
        }
        rules.push(AllegianceRule::PrefixDigit {
            prefix: "A".to_string(),
            effective: "As".to_string(),
        });
        rules.push(AllegianceRule::exact("--", NON_ALIGNED));
        Self { rules }
    }
}

impl AllegianceRules {
    /// An empty table: every code maps to itself
    pub fn identity() -> Self {
        Self { rules: Vec::new() }
    }

    /// Effective allegiance for a raw code
    pub fn normalize(&self, code: &str) -> String {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(code))
            .unwrap_or(code)
            .to_string()
    }

    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, RulesError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a rule table from a JSON file
    pub fn load(path: &str) -> Result<Self, RulesError> {
        let json = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}
