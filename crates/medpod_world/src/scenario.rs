//! Scripted host actions (power cuts, admissions, removals) applied at a
//! given tick.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use medpod_core::{OccupantId, PodId, WardState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub execute_at_tick: u64,
    pub action: HostAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostAction {
    CutPower {
        pod_id: PodId,
    },
    RestorePower {
        pod_id: PodId,
    },
    /// Put a patient into the pod. Without an explicit occupant a new
    /// patient is generated from the condition templates.
    Admit {
        pod_id: PodId,
        #[serde(default)]
        occupant_id: Option<OccupantId>,
    },
    /// Take the occupant out of the pod. A patient removed mid-treatment is
    /// never woken, so their induced incapacitation stays until something
    /// else lifts it.
    Remove {
        pod_id: PodId,
    },
}

impl HostAction {
    pub fn pod_id(&self) -> &PodId {
        match self {
            Self::CutPower { pod_id }
            | Self::RestorePower { pod_id }
            | Self::Admit { pod_id, .. }
            | Self::Remove { pod_id } => pod_id,
        }
    }
}

#[derive(Deserialize)]
struct ScenarioFile {
    actions: Vec<ScheduledAction>,
}

pub fn load_scenario(path: &Path) -> Result<Vec<ScheduledAction>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let file: ScenarioFile = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    Ok(file.actions)
}

/// Every scripted action must target a pod that exists in `state`.
pub fn validate_scenario(actions: &[ScheduledAction], state: &WardState) -> Result<()> {
    for scheduled in actions {
        let pod_id = scheduled.action.pod_id();
        ensure!(
            state.pods.contains_key(pod_id),
            "scenario action at tick {} targets unknown pod '{pod_id}'",
            scheduled.execute_at_tick,
        );
    }
    Ok(())
}
