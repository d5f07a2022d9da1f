use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source citation attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCitation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Response payload of an agent or of the orchestrator
///
/// Every field is optional on the wire. Keys this client does not know about
/// are kept in `extra` so the payload can be exported unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// In [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// ISO-8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceCitation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    // Orchestrator only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanistic_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deterministic_scoring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilistic_risk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_contributions: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Treat empty strings as absent, the way the panels do
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl AgentPayload {
    /// Main text: `response`, falling back to `recommendation`
    pub fn narrative(&self) -> Option<&str> {
        non_empty(&self.response).or_else(|| non_empty(&self.recommendation))
    }

    pub fn sources(&self) -> &[SourceCitation] {
        self.sources.as_deref().unwrap_or(&[])
    }

    pub fn conflicts(&self) -> &[String] {
        self.conflicts.as_deref().unwrap_or(&[])
    }

    pub fn mechanistic(&self) -> Option<&str> {
        non_empty(&self.mechanistic_analysis)
    }

    pub fn deterministic(&self) -> Option<&str> {
        non_empty(&self.deterministic_scoring)
    }

    pub fn probabilistic(&self) -> Option<&str> {
        non_empty(&self.probabilistic_risk)
    }

    /// Whether any of the three analysis paradigms is present
    pub fn has_tri_paradigm(&self) -> bool {
        self.mechanistic().is_some() || self.deterministic().is_some() || self.probabilistic().is_some()
    }

    /// Agent contributions in key order
    pub fn contributions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.agent_contributions
            .iter()
            .flatten()
            .map(|(agent, text)| (agent.as_str(), text.as_str()))
    }

    pub fn contribution_count(&self) -> usize {
        self.agent_contributions.as_ref().map_or(0, |c| c.len())
    }
}

/// Outcome of one gateway call. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum InvocationResult {
    Success(AgentPayload),
    Failure(String),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn payload(&self) -> Option<&AgentPayload> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orchestrator_payload() -> AgentPayload {
        serde_json::from_value(json!({
            "recommendation": "Advance to Phase 3",
            "mechanisticAnalysis": "PD-1 blockade",
            "deterministicScoring": "Score 7/10",
            "probabilisticRisk": "",
            "confidence": 0.72,
            "sources": [{"title": "FDA guidance", "url": "https://fda.gov/x", "excerpt": "..."}],
            "agentContributions": {"VERA": "formulation ok", "FINN": "NPV positive"},
            "conflicts": ["FINN and CLIA disagree on launch timing"],
            "traceId": "trace-1",
            "timestamp": "2025-10-22T10:11:12.000Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_orchestrator_fields_are_typed() {
        let payload = orchestrator_payload();
        assert_eq!(payload.narrative(), Some("Advance to Phase 3"));
        assert_eq!(payload.mechanistic(), Some("PD-1 blockade"));
        assert_eq!(payload.probabilistic(), None);
        assert!(payload.has_tri_paradigm());
        assert_eq!(payload.contribution_count(), 2);
        assert_eq!(payload.sources().len(), 1);
        assert_eq!(payload.conflicts().len(), 1);
        assert!(payload.extra.is_empty());
    }

    #[test]
    fn test_narrative_prefers_response() {
        let payload: AgentPayload =
            serde_json::from_value(json!({"response": "r", "recommendation": "x"})).unwrap();
        assert_eq!(payload.narrative(), Some("r"));

        let payload: AgentPayload = serde_json::from_value(json!({"response": ""})).unwrap();
        assert_eq!(payload.narrative(), None);
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let payload: AgentPayload =
            serde_json::from_value(json!({"response": "y", "metadata": {"tokens": 12}})).unwrap();
        assert_eq!(payload.extra.get("metadata"), Some(&json!({"tokens": 12})));
    }

    #[test]
    fn test_payload_json_round_trip() {
        let expected = orchestrator_payload();
        let text = serde_json::to_string(&expected).unwrap();
        let parsed: AgentPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_invocation_result_accessors() {
        let ok = InvocationResult::Success(AgentPayload::default());
        assert!(ok.is_success());
        assert!(ok.payload().is_some());
        assert!(ok.error().is_none());

        let failed = InvocationResult::Failure("boom".into());
        assert!(!failed.is_success());
        assert!(failed.payload().is_none());
        assert_eq!(failed.error(), Some("boom"));
    }
}
