use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};

use crate::agent::AgentPayload;

/// Section of a TPP the user can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TppComponent {
    ProductArchitecture,
    ClinicalStrategy,
    RegulatoryPathway,
    FinancialAnalysis,
    MarketAssessment,
    IpLandscape,
}

impl TppComponent {
    pub const ALL: [TppComponent; 6] = [
        Self::ProductArchitecture,
        Self::ClinicalStrategy,
        Self::RegulatoryPathway,
        Self::FinancialAnalysis,
        Self::MarketAssessment,
        Self::IpLandscape,
    ];

    /// Checkbox label
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductArchitecture => "Product Architecture",
            Self::ClinicalStrategy => "Clinical Strategy",
            Self::RegulatoryPathway => "Regulatory Pathway",
            Self::FinancialAnalysis => "Financial Analysis",
            Self::MarketAssessment => "Market Assessment",
            Self::IpLandscape => "IP Landscape",
        }
    }

    /// Phrase used in the prompt
    pub fn focus(&self) -> &'static str {
        match self {
            Self::ProductArchitecture => "product architecture and formulation strategy",
            Self::ClinicalStrategy => "clinical trial design and enrollment strategy",
            Self::RegulatoryPathway => "regulatory pathway and FDA strategy",
            Self::FinancialAnalysis => "valuation and investment potential",
            Self::MarketAssessment => "market access and competitive landscape",
            Self::IpLandscape => "patent landscape and IP strategy",
        }
    }

    /// CLI name (`--skip market`)
    pub fn key(&self) -> &'static str {
        match self {
            Self::ProductArchitecture => "product",
            Self::ClinicalStrategy => "clinical",
            Self::RegulatoryPathway => "regulatory",
            Self::FinancialAnalysis => "financial",
            Self::MarketAssessment => "market",
            Self::IpLandscape => "ip",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key().eq_ignore_ascii_case(key))
    }
}

/// A TPP generation request, rendered into one orchestrator prompt
#[derive(Debug, Clone)]
pub struct TppRequest {
    pub drug_name: String,
    pub therapeutic_area: Option<String>,
    /// Selected components, in `TppComponent::ALL` order
    pub components: Vec<TppComponent>,
}

impl TppRequest {
    /// Request with every component selected
    pub fn new(drug_name: impl Into<String>, therapeutic_area: Option<String>) -> Self {
        Self {
            drug_name: drug_name.into(),
            therapeutic_area,
            components: TppComponent::ALL.to_vec(),
        }
    }

    /// Keep only the components marked in `selected` (indexed like `ALL`)
    pub fn with_selection(mut self, selected: &[bool; 6]) -> Self {
        self.components = TppComponent::ALL
            .into_iter()
            .zip(selected)
            .filter(|(_, on)| **on)
            .map(|(c, _)| c)
            .collect();
        self
    }

    /// Drop the given components
    pub fn without(mut self, skipped: &[TppComponent]) -> Self {
        self.components.retain(|c| !skipped.contains(c));
        self
    }

    fn area(&self) -> Option<&str> {
        self.therapeutic_area
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Orchestrator prompt. Errors when the drug name is blank.
    pub fn prompt(&self) -> Result<String> {
        let drug = self.drug_name.trim();
        if drug.is_empty() {
            bail!("Drug name is required");
        }

        let context = self.area().map(|a| format!(" in {}", a)).unwrap_or_default();
        let focus = self
            .components
            .iter()
            .map(|c| format!("- {}", c.focus()))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            r#"Generate a comprehensive Target Product Profile for {}{}.

Please analyze and provide insights on:
{}

Use publicly available information and provide evidence-based recommendations with citations."#,
            drug, context, focus
        ))
    }
}

/// `TPP_<drug>_<YYYYmmdd_HHMMSS>.json`. Characters outside `[A-Za-z0-9._-]`
/// in the drug name become `_`, so the name is always a single path component.
pub fn export_file_name(drug_name: &str, at: DateTime<Local>) -> String {
    let drug: String = drug_name
        .trim()
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();
    format!("TPP_{}_{}.json", drug, at.format("%Y%m%d_%H%M%S"))
}

/// Write a finished profile as pretty JSON into `dir`. The orchestrator
/// prompt for the profile comes from [`TppRequest::prompt`].
pub fn export(payload: &AgentPayload, drug_name: &str, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("Failed to create export directory")?;
    let path = dir.join(export_file_name(drug_name, Local::now()));
    let content = serde_json::to_string_pretty(payload).context("Failed to serialize TPP")?;
    fs::write(&path, content).context(format!("Failed to write TPP: {}", path.display()))?;
    tracing::info!(path = %path.display(), "Exported TPP");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_with_all_components() {
        let request = TppRequest::new("Pembrolizumab", Some("Oncology".into()));
        let prompt = request.prompt().unwrap();

        assert!(prompt.starts_with(
            "Generate a comprehensive Target Product Profile for Pembrolizumab in Oncology."
        ));
        for component in TppComponent::ALL {
            assert!(prompt.contains(&format!("- {}", component.focus())));
        }
        assert!(prompt.ends_with("evidence-based recommendations with citations."));
    }

    #[test]
    fn test_prompt_without_area() {
        let request = TppRequest::new("Nivolumab", Some("   ".into()));
        let prompt = request.prompt().unwrap();
        assert!(prompt.contains("for Nivolumab.\n"));
    }

    #[test]
    fn test_prompt_requires_drug_name() {
        assert!(TppRequest::new("  ", None).prompt().is_err());
    }

    #[test]
    fn test_selection_keeps_order() {
        let request = TppRequest::new("X", None)
            .with_selection(&[false, true, false, true, false, false]);
        assert_eq!(
            request.components,
            vec![TppComponent::ClinicalStrategy, TppComponent::FinancialAnalysis]
        );

        let prompt = request.prompt().unwrap();
        assert!(!prompt.contains("patent landscape"));
        assert!(prompt.contains("- valuation and investment potential"));
    }

    #[test]
    fn test_without_components() {
        let request = TppRequest::new("X", None)
            .without(&[TppComponent::IpLandscape, TppComponent::MarketAssessment]);
        assert_eq!(request.components.len(), 4);
        assert!(!request.components.contains(&TppComponent::IpLandscape));
    }

    #[test]
    fn test_component_keys() {
        for component in TppComponent::ALL {
            assert_eq!(TppComponent::from_key(component.key()), Some(component));
        }
        assert_eq!(TppComponent::from_key("IP"), Some(TppComponent::IpLandscape));
        assert_eq!(TppComponent::from_key("pricing"), None);
    }

    #[test]
    fn test_export_file_name() {
        let at = Local.with_ymd_and_hms(2025, 10, 22, 9, 5, 3).unwrap();
        assert_eq!(
            export_file_name("Drug X 100", at),
            "TPP_Drug_X_100_20251022_090503.json"
        );
        assert_eq!(
            export_file_name("Trastuzumab/Pertuzumab", at),
            "TPP_Trastuzumab_Pertuzumab_20251022_090503.json"
        );
        assert_eq!(
            export_file_name("../../etc/passwd", at),
            "TPP_.._.._etc_passwd_20251022_090503.json"
        );
    }

    #[test]
    fn test_export_combination_product_stays_in_dir() {
        let temp_dir = TempDir::new().unwrap();
        let payload = AgentPayload::default();

        let path = export(&payload, "Trastuzumab/Pertuzumab", temp_dir.path()).unwrap();
        assert_eq!(path.parent(), Some(temp_dir.path()));
        assert!(path.exists());

        let path = export(&payload, "../escape", temp_dir.path()).unwrap();
        assert_eq!(path.parent(), Some(temp_dir.path()));
    }

    #[test]
    fn test_export_writes_payload() {
        let temp_dir = TempDir::new().unwrap();
        let payload = AgentPayload {
            recommendation: Some("Proceed".into()),
            confidence: Some(0.81),
            ..Default::default()
        };

        let path = export(&payload, "Atezolizumab", temp_dir.path()).unwrap();
        assert!(path.starts_with(temp_dir.path()));

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: AgentPayload = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, payload);
    }
}
