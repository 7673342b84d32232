//! Builds the configured agent roster into the `BTreeMap<AgentId, Arc<dyn
//! Agent>>` the orchestrator expects.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bench_agent::{Agent, HttpAgentClient, RandomClickerAgent, UrlRewriter};
use bench_types::AgentId;

use crate::config::{AgentEntry, AgentKind};

pub fn build_agents(entries: &[AgentEntry], call_timeout: Duration) -> BTreeMap<AgentId, Arc<dyn Agent>> {
    let mut agents: BTreeMap<AgentId, Arc<dyn Agent>> = BTreeMap::new();
    for entry in entries {
        let agent: Arc<dyn Agent> = match &entry.kind {
            AgentKind::Http { base_url } => {
                // No separate local host for this wiring; the agent calls
                // the same origin it is handed, so the rewriter is a no-op.
                let rewriter = UrlRewriter::new(base_url.clone(), base_url.clone());
                Arc::new(HttpAgentClient::new(entry.id.clone(), base_url.clone(), call_timeout, rewriter))
            }
            AgentKind::RandomClicker => Arc::new(RandomClickerAgent::new(entry.id.clone())),
        };
        agents.insert(AgentId::from(entry.id.as_str()), agent);
    }
    agents
}
