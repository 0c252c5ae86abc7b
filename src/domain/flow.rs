// Flow domain model and derived progress
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCommand {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub commands: Vec<FlowCommand>,
}

impl Flow {
    /// Case-insensitive substring match on id, name and description.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.id.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Last-known flow execution reported by the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub flow_id: String,
    pub index: usize,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Completed,
    Current,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub command_id: String,
    pub name: String,
    pub status: SlotStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowProgress {
    pub flow_id: String,
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
    pub slots: Vec<SlotView>,
}

pub fn slot_status(slot: usize, index: usize) -> SlotStatus {
    match slot.cmp(&index) {
        std::cmp::Ordering::Less => SlotStatus::Completed,
        std::cmp::Ordering::Equal => SlotStatus::Current,
        std::cmp::Ordering::Greater => SlotStatus::Pending,
    }
}

/// `round(100 * completed / total)`, 0 for an empty flow.
pub fn progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    (100.0 * completed as f64 / total as f64).round() as u32
}

impl FlowProgress {
    /// A state for a different flow leaves every slot pending.
    pub fn compute(flow: &Flow, state: Option<&FlowState>) -> Self {
        let total = flow.commands.len();
        let index = state.filter(|s| s.flow_id == flow.id).map(|s| s.index);

        let slots = flow
            .commands
            .iter()
            .enumerate()
            .map(|(i, cmd)| SlotView {
                command_id: cmd.id.clone(),
                name: cmd.name.clone(),
                status: index.map_or(SlotStatus::Pending, |idx| slot_status(i, idx)),
            })
            .collect();

        let completed = index.map_or(0, |idx| idx.min(total));

        Self {
            flow_id: flow.id.clone(),
            completed,
            total,
            percent: progress_percent(completed, total),
            slots,
        }
    }
}
