use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Backend-computed trust standing. Score and tier are opaque display
/// values; nothing here recomputes them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrustSnapshot {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub consecutive_approvals: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Approved,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyAction {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub status: ActionStatus,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgencySnapshot {
    #[serde(default)]
    pub actions: Vec<AgencyAction>,
}

impl AgencySnapshot {
    pub fn count_with_status(&self, status: ActionStatus) -> usize {
        self.actions
            .iter()
            .filter(|action| action.status == status)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LimbicSnapshot {
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillsSnapshot {
    #[serde(default)]
    pub skills: Vec<SkillProgress>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}
