mod config;
mod descriptor;
pub(crate) mod gateway;
mod payload;

pub use config::GatewayConfig;
pub use descriptor::{AgentCatalog, AgentDescriptor, AgentId, Target};
pub use gateway::InvocationGateway;
pub use payload::{AgentPayload, InvocationResult};
