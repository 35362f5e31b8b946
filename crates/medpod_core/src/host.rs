//! Collaborator contracts a host simulation provides to the ward.

use crate::{Condition, ConditionId, OccupantId, PodId, StatusEffectKind};

pub trait PowerProvider {
    fn power_available(&self, pod: &PodId) -> bool;
    /// Receives the pod's power output for the tick. Consumers report
    /// negative values.
    fn set_requested_draw(&mut self, pod: &PodId, level: f32);
}

pub trait OccupancyProvider {
    fn current_occupant(&self, pod: &PodId) -> Option<OccupantId>;
}

/// Per-occupant access to the host health system.
pub trait ConditionProvider {
    fn list_conditions(&self, occupant: &OccupantId) -> Vec<Condition>;
    fn remove_condition(&mut self, occupant: &OccupantId, condition: &ConditionId);
    fn add_status_effect(&mut self, occupant: &OccupantId, kind: StatusEffectKind);
    fn remove_status_effect_by_kind(&mut self, occupant: &OccupantId, kind: StatusEffectKind);
}

/// Everything the tick driver needs from a host.
pub trait PodHost: PowerProvider + OccupancyProvider + ConditionProvider {}

impl<T: PowerProvider + OccupancyProvider + ConditionProvider> PodHost for T {}
