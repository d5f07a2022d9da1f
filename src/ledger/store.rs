use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::LedgerEntry;
use crate::agent::AgentId;

/// Which ledger an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Agent(AgentId),
    Orchestrator,
}

/// Append-only interaction history for one session
#[derive(Debug, Default, Serialize)]
pub struct Ledger {
    agents: HashMap<AgentId, Vec<LedgerEntry>>,
    orchestrator: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Timestamps never go backwards within a scope.
    pub fn append(&mut self, scope: Scope, mut entry: LedgerEntry) {
        let entries = match scope {
            Scope::Agent(id) => self.agents.entry(id).or_default(),
            Scope::Orchestrator => &mut self.orchestrator,
        };
        if let Some(last) = entries.last() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        entries.push(entry);
    }

    /// All entries, oldest first
    pub fn all(&self, scope: Scope) -> &[LedgerEntry] {
        match scope {
            Scope::Agent(id) => self.agents.get(&id).map(Vec::as_slice).unwrap_or(&[]),
            Scope::Orchestrator => &self.orchestrator,
        }
    }

    /// Up to `n` entries, most recent first
    pub fn recent(&self, scope: Scope, n: usize) -> Vec<&LedgerEntry> {
        self.all(scope).iter().rev().take(n).collect()
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.all(scope).len()
    }

    pub fn is_empty(&self) -> bool {
        self.orchestrator.is_empty() && self.agents.values().all(Vec::is_empty)
    }

    /// Agents that have at least one entry, in catalog order
    pub fn agents_with_history(&self) -> Vec<AgentId> {
        AgentId::ALL
            .into_iter()
            .filter(|id| self.len(Scope::Agent(*id)) > 0)
            .collect()
    }
}

/// A user session: owns its ledger, nothing is shared between sessions
#[derive(Debug, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ledger: Ledger,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ledger: Ledger::new(),
        }
    }

    /// Write the whole session as JSON into `dir`
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).context("Failed to create export directory")?;
        let path = dir.join(format!(
            "socratiq_session_{}.json",
            self.started_at.format("%Y%m%d_%H%M%S")
        ));
        let content = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        fs::write(&path, content).context(format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    use crate::agent::{AgentPayload, InvocationResult};

    fn entry(query: &str) -> LedgerEntry {
        LedgerEntry::new(query, InvocationResult::Success(AgentPayload::default()))
    }

    #[test]
    fn test_recent_and_all_ordering() {
        let mut ledger = Ledger::new();
        let scope = Scope::Agent(AgentId::Vera);
        for i in 0..5 {
            ledger.append(scope, entry(&format!("q{}", i)));
        }

        let all: Vec<&str> = ledger.all(scope).iter().map(|e| e.query.as_str()).collect();
        assert_eq!(all, ["q0", "q1", "q2", "q3", "q4"]);

        let recent: Vec<&str> = ledger.recent(scope, 3).iter().map(|e| e.query.as_str()).collect();
        assert_eq!(recent, ["q4", "q3", "q2"]);

        assert_eq!(ledger.recent(scope, 5).len(), 5);
        assert_eq!(ledger.recent(scope, 10).len(), 5);
        assert!(ledger.recent(scope, 0).is_empty());
    }

    #[test]
    fn test_scopes_are_isolated() {
        let mut ledger = Ledger::new();
        ledger.append(Scope::Agent(AgentId::Vera), entry("vera"));
        ledger.append(Scope::Agent(AgentId::Vera), entry("vera again"));

        assert_eq!(ledger.len(Scope::Agent(AgentId::Vera)), 2);
        assert_eq!(ledger.len(Scope::Agent(AgentId::Finn)), 0);
        assert_eq!(ledger.len(Scope::Orchestrator), 0);

        ledger.append(Scope::Orchestrator, entry("sophie"));
        assert_eq!(ledger.len(Scope::Agent(AgentId::Vera)), 2);
        assert_eq!(ledger.len(Scope::Orchestrator), 1);
        assert_eq!(ledger.agents_with_history(), vec![AgentId::Vera]);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert!(ledger.all(Scope::Agent(AgentId::Clia)).is_empty());
        assert!(ledger.agents_with_history().is_empty());
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut ledger = Ledger::new();
        let first = entry("first");
        let first_ts = first.timestamp;
        ledger.append(Scope::Orchestrator, first);

        let mut earlier = entry("earlier clock");
        earlier.timestamp = first_ts - Duration::seconds(30);
        ledger.append(Scope::Orchestrator, earlier);

        let all = ledger.all(Scope::Orchestrator);
        assert_eq!(all[1].timestamp, first_ts);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_sessions_do_not_share_entries() {
        let mut alice = Session::new();
        let bob = Session::new();
        alice.ledger.append(Scope::Agent(AgentId::Nora), entry("patents"));

        assert_ne!(alice.id, bob.id);
        assert_eq!(alice.ledger.len(Scope::Agent(AgentId::Nora)), 1);
        assert!(bob.ledger.is_empty());
    }

    #[test]
    fn test_session_export() {
        let dir = tempdir().unwrap();
        let mut session = Session::new();
        session.ledger.append(Scope::Agent(AgentId::Finn), entry("valuation"));
        session.ledger.append(
            Scope::Orchestrator,
            LedgerEntry::new("tpp", InvocationResult::Failure("Agent returned status 502".into()))
                .with_tpp("Atezolizumab", None),
        );

        let path = session.export(dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("socratiq_session_"));

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["ledger"]["agents"]["FINN"][0]["query"], "valuation");
        assert_eq!(value["ledger"]["orchestrator"][0]["tpp"]["drug_name"], "Atezolizumab");
        assert_eq!(value["ledger"]["orchestrator"][0]["result"]["status"], "failure");
    }
}
