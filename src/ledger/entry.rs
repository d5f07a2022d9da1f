use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::InvocationResult;

/// Extra metadata for entries produced by the TPP generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TppMetadata {
    pub drug_name: String,
    /// "Not specified" when the user left it empty
    pub therapeutic_area: String,
}

/// One query and its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub query: String,
    pub result: InvocationResult,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpp: Option<TppMetadata>,
}

impl LedgerEntry {
    /// Entry stamped now
    pub fn new(query: impl Into<String>, result: InvocationResult) -> Self {
        Self {
            query: query.into(),
            result,
            timestamp: Utc::now(),
            tpp: None,
        }
    }

    /// Attach TPP metadata
    pub fn with_tpp(mut self, drug_name: impl Into<String>, therapeutic_area: Option<&str>) -> Self {
        let area = therapeutic_area
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or("Not specified");
        self.tpp = Some(TppMetadata {
            drug_name: drug_name.into(),
            therapeutic_area: area.to_string(),
        });
        self
    }

    /// First `max` characters of the query, with "..." when cut
    pub fn preview(&self, max: usize) -> String {
        let first_line = self.query.lines().next().unwrap_or("");
        if self.query.chars().count() > max || first_line.len() < self.query.len() {
            format!("{}...", first_line.chars().take(max).collect::<String>())
        } else {
            self.query.clone()
        }
    }

    /// Title used in history lists
    pub fn title(&self, max: usize) -> String {
        match &self.tpp {
            Some(tpp) => format!("{} - {}", tpp.drug_name, tpp.therapeutic_area),
            None => self.preview(max),
        }
    }

    /// Date part of the timestamp (YYYY-MM-DD)
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}
