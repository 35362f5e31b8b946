//! Read-only views of a pod for UIs and logs.

use serde::{Deserialize, Serialize};

use crate::{Constants, OccupantId, PodId, PodState, TreatmentStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub pod_id: PodId,
    pub status: TreatmentStatus,
    pub powered: bool,
    pub occupant: Option<OccupantId>,
    pub diagnosing_progress_pct: f32,
    pub healing_progress_pct: f32,
    pub power_output: f32,
    pub conditions_remaining: usize,
}

pub fn diagnosing_progress_pct(pod: &PodState, constants: &Constants) -> f32 {
    let max = constants.diagnosing_ticks;
    if max == 0 {
        return 0.0;
    }
    let remaining = pod.session.diagnosing_ticks_remaining.min(max);
    (max - remaining) as f32 / max as f32 * 100.0
}

pub fn healing_progress_pct(pod: &PodState) -> f32 {
    let total = pod.session.total_healing_ticks;
    if total == 0 {
        return 0.0;
    }
    pod.session.progress_healing_ticks as f32 / total as f32 * 100.0
}

pub fn snapshot(pod: &PodState, constants: &Constants) -> PodSnapshot {
    PodSnapshot {
        pod_id: pod.id.clone(),
        status: pod.session.status,
        powered: pod.powered,
        occupant: pod.occupant.clone(),
        diagnosing_progress_pct: diagnosing_progress_pct(pod, constants),
        healing_progress_pct: healing_progress_pct(pod),
        power_output: pod.power_output,
        conditions_remaining: pod.session.condition_queue.len(),
    }
}

/// Two-line inspector text: power draw, then treatment status.
#[allow(clippy::cast_possible_truncation)]
pub fn inspect_text(pod: &PodState, constants: &Constants) -> String {
    let power_line = format!("Power needed: {:.0} W", -pod.power_output);

    let status_line = if pod.powered {
        match pod.session.status {
            TreatmentStatus::DiagnosisStarted => format!(
                "Diagnosing ({}%)",
                diagnosing_progress_pct(pod, constants) as i32
            ),
            TreatmentStatus::DiagnosisFinished => "Diagnosis complete".to_string(),
            TreatmentStatus::HealingStarted | TreatmentStatus::HealingFinished => {
                format!("Reatomizing ({}%)", healing_progress_pct(pod) as i32)
            }
            TreatmentStatus::PatientDischarged => "100% Clear".to_string(),
            TreatmentStatus::Error => "Error".to_string(),
            TreatmentStatus::Idle => "Idle".to_string(),
        }
    } else {
        "Error: No power".to_string()
    };

    format!("{power_line}\n{status_line}")
}
