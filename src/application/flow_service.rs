// Flow service - catalog search and progress views
use crate::domain::flow::{Flow, FlowCommand, FlowProgress, FlowState};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommandEntry {
    pub flow_id: String,
    pub command: FlowCommand,
}

#[derive(Clone)]
pub struct FlowService {
    flows: Arc<Vec<Flow>>,
}

impl FlowService {
    pub fn new(flows: Vec<Flow>) -> Self {
        Self {
            flows: Arc::new(flows),
        }
    }

    pub fn list_flows(&self, search: Option<&str>) -> Vec<Flow> {
        self.flows
            .iter()
            .filter(|f| search.is_none_or(|q| f.matches(q)))
            .cloned()
            .collect()
    }

    pub fn get_flow(&self, flow_id: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.id == flow_id)
    }

    /// Commands across the catalog, first occurrence of each command id wins.
    pub fn search_commands(&self, search: Option<&str>) -> Vec<CommandEntry> {
        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        let mut seen: BTreeMap<&str, CommandEntry> = BTreeMap::new();

        for flow in self.flows.iter() {
            for command in &flow.commands {
                let hit = needle.is_empty()
                    || command.id.to_lowercase().contains(&needle)
                    || command.name.to_lowercase().contains(&needle);
                if hit {
                    seen.entry(command.id.as_str()).or_insert_with(|| CommandEntry {
                        flow_id: flow.id.clone(),
                        command: command.clone(),
                    });
                }
            }
        }

        seen.into_values().collect()
    }

    pub fn progress(&self, flow_id: &str, state: Option<&FlowState>) -> Option<FlowProgress> {
        self.get_flow(flow_id)
            .map(|flow| FlowProgress::compute(flow, state))
    }
}
