use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Specialist agent identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentId {
    Vera,
    Finn,
    Nora,
    Clia,
}

impl AgentId {
    /// All agents, in display order
    pub const ALL: [AgentId; 4] = [Self::Vera, Self::Finn, Self::Nora, Self::Clia];

    /// Identifier as used on the wire and in agentContributions keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vera => "VERA",
            Self::Finn => "FINN",
            Self::Nora => "NORA",
            Self::Clia => "CLIA",
        }
    }

    /// Index in `ALL`
    pub fn index(&self) -> usize {
        match self {
            Self::Vera => 0,
            Self::Finn => 1,
            Self::Nora => 2,
            Self::Clia => 3,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VERA" => Ok(Self::Vera),
            "FINN" => Ok(Self::Finn),
            "NORA" => Ok(Self::Nora),
            "CLIA" => Ok(Self::Clia),
            other => Err(format!(
                "unknown agent '{}' (expected one of: vera, finn, nora, clia)",
                other.to_ascii_lowercase()
            )),
        }
    }
}

/// Who a call is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Agent(AgentId),
    Orchestrator,
}

/// Static description of a remote agent function
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDescriptor {
    pub target: Target,
    /// Short name (VERA, Sophie, ...)
    pub name: String,
    pub full_name: String,
    pub icon: String,
    /// Remote function name
    pub function: String,
    pub description: String,
}

impl AgentDescriptor {
    /// Product & Clinical Intelligence
    pub fn vera() -> Self {
        Self {
            target: Target::Agent(AgentId::Vera),
            name: "VERA".into(),
            full_name: "Product & Clinical Intelligence".into(),
            icon: "🔬".into(),
            function: "SocratIQ-VERA-Agent-prod".into(),
            description: "Expert in product architecture, formulation, manufacturing, stability, packaging, and quality systems".into(),
        }
    }

    /// Financial & Investment Intelligence
    pub fn finn() -> Self {
        Self {
            target: Target::Agent(AgentId::Finn),
            name: "FINN".into(),
            full_name: "Financial & Investment Intelligence".into(),
            icon: "💰".into(),
            function: "SocratIQ-FINN-Agent-prod".into(),
            description: "Specialist in valuation, deal structure, due diligence, portfolio strategy, and risk assessment".into(),
        }
    }

    /// Legal, Regulatory & IP Intelligence
    pub fn nora() -> Self {
        Self {
            target: Target::Agent(AgentId::Nora),
            name: "NORA".into(),
            full_name: "Legal, Regulatory & IP Intelligence".into(),
            icon: "⚖️".into(),
            function: "SocratIQ-NORA-Agent-prod".into(),
            description: "Authority on regulatory pathways, FDA strategy, CRADAs, patent landscape, and compliance".into(),
        }
    }

    /// Clinical Trials & Market Intelligence
    pub fn clia() -> Self {
        Self {
            target: Target::Agent(AgentId::Clia),
            name: "CLIA".into(),
            full_name: "Clinical Trials & Market Intelligence".into(),
            icon: "📊".into(),
            function: "SocratIQ-CLIA-Agent-prod".into(),
            description: "Expert in protocol design, clinical operations, market access, competitive intelligence, and evidence generation".into(),
        }
    }

    /// Sophie, the orchestrator
    pub fn sophie() -> Self {
        Self {
            target: Target::Orchestrator,
            name: "Sophie".into(),
            full_name: "Strategic Orchestration Engine".into(),
            icon: "🧠".into(),
            function: "SocratIQ-Sophie-Orchestrator-prod".into(),
            description: "Multi-agent coordinator using Tri-Paradigm Reasoning (Mechanistic, Deterministic, Probabilistic)".into(),
        }
    }

    /// Descriptor for an agent id
    pub fn of(id: AgentId) -> Self {
        match id {
            AgentId::Vera => Self::vera(),
            AgentId::Finn => Self::finn(),
            AgentId::Nora => Self::nora(),
            AgentId::Clia => Self::clia(),
        }
    }

    pub fn is_orchestrator(&self) -> bool {
        self.target == Target::Orchestrator
    }
}

/// The fixed set of descriptors for one process run
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: [AgentDescriptor; 4],
    orchestrator: AgentDescriptor,
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self {
            agents: AgentId::ALL.map(AgentDescriptor::of),
            orchestrator: AgentDescriptor::sophie(),
        }
    }
}

impl AgentCatalog {
    /// Build the catalog, resolving function names through `resolve`
    pub fn with_functions(resolve: impl Fn(&AgentDescriptor) -> String) -> Self {
        let mut catalog = Self::default();
        for agent in catalog.agents.iter_mut() {
            agent.function = resolve(agent);
        }
        catalog.orchestrator.function = resolve(&catalog.orchestrator);
        catalog
    }

    pub fn agent(&self, id: AgentId) -> &AgentDescriptor {
        &self.agents[id.index()]
    }

    pub fn orchestrator(&self) -> &AgentDescriptor {
        &self.orchestrator
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    /// Look up by wire name, used for agentContributions keys
    pub fn by_name(&self, name: &str) -> Option<&AgentDescriptor> {
        name.parse::<AgentId>().ok().map(|id| self.agent(id))
    }
}
