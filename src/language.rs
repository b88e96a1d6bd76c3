use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const UNTRANSLATED_MARKER: &str = "[untranslated]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated(String),
    /// No mapping exists; carries the original text.
    Untranslated(String),
}

impl Translation {
    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Translated(text) | Self::Untranslated(text) => text,
        }
    }

    pub fn into_label(self) -> String {
        match self {
            Self::Translated(text) => text,
            Self::Untranslated(text) => format!("{} {}", text, UNTRANSLATED_MARKER),
        }
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translated(text) => f.write_str(text),
            Self::Untranslated(text) => write!(f, "{} {}", text, UNTRANSLATED_MARKER),
        }
    }
}

/// Explicit account-name mapping table (e.g. Portuguese to English).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNameTranslator {
    table: BTreeMap<String, String>,
}

impl AccountNameTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut translator = Self::new();
        for (source, target) in pairs {
            translator.insert(source, target);
        }
        translator
    }

    /// Loads a JSON object of `{"source name": "target name"}` pairs.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(table))
    }

    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.table
            .insert(source.into().trim().to_string(), target.into());
    }

    pub fn translate(&self, name: &str) -> Translation {
        match self.table.get(name.trim()) {
            Some(target) => Translation::Translated(target.clone()),
            None => Translation::Untranslated(name.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
