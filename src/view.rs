use ratatui::prelude::*;

use crate::agent::{AgentCatalog, AgentDescriptor, AgentPayload, InvocationResult};
use crate::ledger::LedgerEntry;

const EXCERPT_CHARS: usize = 200;

fn heading(text: impl Into<String>, color: Color) -> Line<'static> {
    Line::styled(text.into(), Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn label_value(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn body(text: &str) -> impl Iterator<Item = Line<'static>> + '_ {
    text.lines().map(|l| Line::raw(l.to_string()))
}

fn separator() -> Line<'static> {
    Line::styled("─".repeat(40), Style::default().fg(Color::DarkGray))
}

/// `0.8` -> `80.0%`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Time part of an ISO-8601 timestamp (`HH:MM:SS`), or the input unchanged
pub fn format_time(timestamp: &str) -> String {
    match timestamp.split_once('T') {
        Some((_, time)) => time.chars().take(8).collect(),
        None => timestamp.to_string(),
    }
}

/// First 200 characters followed by "..."
pub fn truncate_excerpt(excerpt: &str) -> String {
    format!("{}...", excerpt.chars().take(EXCERPT_CHARS).collect::<String>())
}

fn error_lines(message: &str) -> Vec<Line<'static>> {
    vec![Line::styled(
        format!("❌ Error: {}", message),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )]
}

fn source_lines(payload: &AgentPayload) -> Vec<Line<'static>> {
    let mut lines = vec![];
    for (i, source) in payload.sources().iter().enumerate() {
        lines.push(Line::styled(
            format!("{}. {}", i + 1, source.title.as_deref().unwrap_or("Untitled")),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
        if let Some(excerpt) = &source.excerpt {
            lines.push(Line::styled(
                format!("   {}", truncate_excerpt(excerpt)),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    lines
}

/// Panel for a specialist agent reply
pub fn agent_panel(result: &InvocationResult, agent: &AgentDescriptor) -> Vec<Line<'static>> {
    let payload = match result {
        InvocationResult::Success(payload) => payload,
        InvocationResult::Failure(message) => return error_lines(message),
    };

    let mut lines = vec![heading(format!("{} {}", agent.icon, agent.full_name), Color::Cyan)];
    lines.push(Line::from(""));
    if let Some(text) = payload.narrative() {
        lines.extend(body(text));
        lines.push(Line::from(""));
    }

    let mut meta = vec![];
    if let Some(confidence) = payload.confidence {
        meta.push(label_value("Confidence", format_confidence(confidence), Color::Green));
    }
    if let Some(timestamp) = &payload.timestamp {
        meta.push(label_value("Timestamp", format_time(timestamp), Color::Blue));
    }
    if !payload.sources().is_empty() {
        meta.push(label_value("Sources", payload.sources().len().to_string(), Color::Magenta));
    }
    lines.extend(meta);

    if !payload.sources().is_empty() {
        lines.push(separator());
        lines.push(heading("📚 Sources", Color::Magenta));
        lines.extend(source_lines(payload));
    }
    lines
}

/// Panel for an orchestrator reply with the tri-paradigm breakdown
pub fn orchestrator_panel(
    result: &InvocationResult,
    catalog: &AgentCatalog,
) -> Vec<Line<'static>> {
    let payload = match result {
        InvocationResult::Success(payload) => payload,
        InvocationResult::Failure(message) => return error_lines(message),
    };
    let sophie = catalog.orchestrator();

    let mut lines = vec![heading(format!("{} {}", sophie.icon, sophie.full_name), Color::Magenta)];
    lines.push(Line::from(""));

    if let Some(recommendation) = &payload.recommendation {
        lines.push(heading("🎯 Strategic Recommendation", Color::Yellow));
        lines.extend(body(recommendation));
    } else if let Some(text) = payload.narrative() {
        lines.extend(body(text));
    }

    if payload.has_tri_paradigm() {
        lines.push(separator());
        lines.push(heading("🧬 Tri-Paradigm Analysis", Color::Cyan));
        let paradigms = [
            ("⚙️ Mechanistic", payload.mechanistic()),
            ("📐 Deterministic", payload.deterministic()),
            ("🎲 Probabilistic", payload.probabilistic()),
        ];
        for (title, text) in paradigms {
            if let Some(text) = text {
                lines.push(heading(title, Color::White));
                lines.extend(body(text));
            }
        }
    }

    if payload.contribution_count() > 0 {
        lines.push(separator());
        lines.push(heading("🤝 Agent Contributions", Color::Green));
        for (agent, contribution) in payload.contributions() {
            let icon = catalog.by_name(agent).map_or("🔹", |d| d.icon.as_str());
            lines.push(heading(format!("{} {}", icon, agent), Color::White));
            lines.extend(body(contribution));
        }
    }

    lines.push(separator());
    if let Some(confidence) = payload.confidence {
        lines.push(label_value("Confidence", format_confidence(confidence), Color::Green));
    }
    if payload.sources.is_some() {
        lines.push(label_value("Total Sources", payload.sources().len().to_string(), Color::Magenta));
    }
    if payload.agent_contributions.is_some() {
        lines.push(label_value("Agents Consulted", payload.contribution_count().to_string(), Color::Blue));
    }
    if !payload.conflicts().is_empty() {
        lines.push(label_value("Conflicts Identified", payload.conflicts().len().to_string(), Color::Red));
        lines.push(separator());
        lines.push(heading("⚠️ Conflicts Identified:", Color::Yellow));
        for conflict in payload.conflicts() {
            lines.push(Line::raw(format!("- {}", conflict)));
        }
    }
    lines
}

/// Header for a replayed history entry
pub fn entry_header(entry: &LedgerEntry) -> Vec<Line<'static>> {
    let mut lines = vec![];
    match &entry.tpp {
        Some(tpp) => {
            lines.push(label_value("Drug", tpp.drug_name.clone(), Color::White));
            lines.push(label_value("Therapeutic Area", tpp.therapeutic_area.clone(), Color::White));
            lines.push(label_value("Generated", entry.timestamp.to_rfc3339(), Color::Blue));
        }
        None => {
            lines.push(label_value("Query", entry.query.clone(), Color::White));
            lines.push(label_value("Time", entry.timestamp.to_rfc3339(), Color::Blue));
        }
    }
    lines.push(separator());
    lines
}

/// Lines as plain text, one per line. Used by the one-shot commands.
pub fn to_plain(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::agent::AgentId;

    fn payload(value: serde_json::Value) -> InvocationResult {
        InvocationResult::Success(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_confidence(0.8), "80.0%");
        assert_eq!(format_confidence(0.726), "72.6%");
        assert_eq!(format_time("2025-10-22T14:03:59.123Z"), "14:03:59");
        assert_eq!(format_time("yesterday"), "yesterday");
        assert_eq!(truncate_excerpt("short"), "short...");
        assert_eq!(truncate_excerpt(&"x".repeat(300)).chars().count(), 203);
    }

    #[test]
    fn test_agent_panel() {
        let result = payload(json!({
            "response": "Use a lyophilized formulation.",
            "confidence": 0.85,
            "timestamp": "2025-10-22T08:00:01Z",
            "sources": [{"title": "ICH Q1A", "excerpt": "Stability testing"}, {}]
        }));
        let text = to_plain(&agent_panel(&result, &AgentDescriptor::of(AgentId::Vera)));

        assert!(text.contains("Product & Clinical Intelligence"));
        assert!(text.contains("Use a lyophilized formulation."));
        assert!(text.contains("Confidence: 85.0%"));
        assert!(text.contains("Timestamp: 08:00:01"));
        assert!(text.contains("Sources: 2"));
        assert!(text.contains("1. ICH Q1A"));
        assert!(text.contains("Stability testing..."));
        assert!(text.contains("2. Untitled"));
    }

    #[test]
    fn test_agent_panel_failure() {
        let result = InvocationResult::Failure("Agent returned status 500".into());
        let text = to_plain(&agent_panel(&result, &AgentDescriptor::finn()));
        assert_eq!(text, "❌ Error: Agent returned status 500");
    }

    #[test]
    fn test_agent_panel_falls_back_to_recommendation() {
        let result = payload(json!({"recommendation": "Partner early"}));
        let text = to_plain(&agent_panel(&result, &AgentDescriptor::finn()));
        assert!(text.contains("Partner early"));
        assert!(!text.contains("Confidence"));
    }

    #[test]
    fn test_orchestrator_panel() {
        let catalog = AgentCatalog::default();
        let result = payload(json!({
            "recommendation": "Pursue accelerated approval",
            "mechanisticAnalysis": "Target engagement confirmed",
            "deterministicScoring": "",
            "probabilisticRisk": "PoS 45%",
            "confidence": 0.7,
            "sources": [],
            "agentContributions": {"NORA": "Breakthrough designation likely", "OTHER": "n/a"},
            "conflicts": ["Timeline mismatch"]
        }));
        let text = to_plain(&orchestrator_panel(&result, &catalog));

        assert!(text.contains("Strategic Orchestration Engine"));
        assert!(text.contains("🎯 Strategic Recommendation"));
        assert!(text.contains("Pursue accelerated approval"));
        assert!(text.contains("Target engagement confirmed"));
        assert!(!text.contains("📐 Deterministic"));
        assert!(text.contains("PoS 45%"));
        assert!(text.contains("⚖️ NORA"));
        assert!(text.contains("🔹 OTHER"));
        assert!(text.contains("Total Sources: 0"));
        assert!(text.contains("Agents Consulted: 2"));
        assert!(text.contains("Conflicts Identified: 1"));
        assert!(text.contains("- Timeline mismatch"));
    }

    #[test]
    fn test_orchestrator_panel_minimal() {
        let catalog = AgentCatalog::default();
        let text = to_plain(&orchestrator_panel(&payload(json!({"response": "ok"})), &catalog));
        assert!(text.contains("ok"));
        assert!(!text.contains("Tri-Paradigm"));
        assert!(!text.contains("Agent Contributions"));
        assert!(!text.contains("Conflicts"));
    }

    #[test]
    fn test_entry_header() {
        let entry = LedgerEntry::new("prompt", InvocationResult::Failure("x".into()))
            .with_tpp("Nivolumab", Some("Oncology"));
        let text = to_plain(&entry_header(&entry));
        assert!(text.contains("Drug: Nivolumab"));
        assert!(text.contains("Therapeutic Area: Oncology"));

        let entry = LedgerEntry::new("What is a CRADA?", InvocationResult::Failure("x".into()));
        assert!(to_plain(&entry_header(&entry)).contains("Query: What is a CRADA?"));
    }
}
