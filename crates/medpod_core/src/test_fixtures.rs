//! Shared test fixtures for medpod_core and downstream crates.
//!
//! `base_content()` provides default timings (300-tick diagnosis, 300 ticks
//! per unit of normalized severity, 60-tick checks). `RecordingHost` is an
//! in-memory host that records every status effect request.

use std::collections::HashMap;

use crate::host::{ConditionProvider, OccupancyProvider, PowerProvider};
use crate::{
    BodyRegion, BodyRegionDef, Cell, Condition, ConditionId, ConditionTemplateDef, Constants,
    Counters, MetaState, OccupantId, PodContent, PodId, PodState, Rotation, StatusEffectKind,
    WardState,
};

pub fn base_content() -> PodContent {
    PodContent {
        content_version: "test".to_string(),
        body_regions: vec![
            BodyRegionDef {
                index: 1,
                label: "torso".to_string(),
                max_health: 40.0,
            },
            BodyRegionDef {
                index: 3,
                label: "left arm".to_string(),
                max_health: 10.0,
            },
        ],
        condition_templates: vec![ConditionTemplateDef {
            id: "cut".to_string(),
            label: "Cut".to_string(),
            severity_min: 1.0,
            severity_max: 5.0,
            whole_body: false,
        }],
        constants: Constants::default(),
    }
}

/// Empty ward at tick 0.
pub fn base_state(content: &PodContent) -> WardState {
    WardState {
        meta: MetaState {
            tick: 0,
            seed: 42,
            schema_version: 1,
            content_version: content.content_version.clone(),
        },
        pods: HashMap::new(),
        blockers: crate::BlockerRegistry::default(),
        counters: Counters::default(),
    }
}

/// A single powered pod with its check phase pinned to tick 0.
pub fn test_pod(content: &PodContent) -> PodState {
    let mut pod = PodState::new(
        PodId("pod_0001".to_string()),
        Cell::new(5, 0, 5),
        Rotation::North,
        &content.constants,
    );
    pod.check_offset = 0;
    pod
}

pub fn patient() -> OccupantId {
    OccupantId("patient_0001".to_string())
}

pub fn condition(id: &str, region: Option<(u32, f32)>, severity: f32) -> Condition {
    Condition {
        id: ConditionId(id.to_string()),
        kind: "cut".to_string(),
        region: region.map(|(index, max_health)| BodyRegion {
            index,
            label: format!("region_{index}"),
            max_health,
        }),
        severity,
    }
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub unpowered: Vec<PodId>,
    pub beds: HashMap<PodId, OccupantId>,
    pub conditions: HashMap<OccupantId, Vec<Condition>>,
    pub active_effects: HashMap<OccupantId, Vec<StatusEffectKind>>,
    pub applied: Vec<(OccupantId, StatusEffectKind)>,
    pub removed: Vec<(OccupantId, StatusEffectKind)>,
    pub draws: HashMap<PodId, f32>,
}

impl RecordingHost {
    /// Host with `occupant` lying in `pod` carrying `conditions`.
    pub fn with_patient(pod: &PodId, occupant: &OccupantId, conditions: Vec<Condition>) -> Self {
        let mut host = Self::default();
        host.beds.insert(pod.clone(), occupant.clone());
        host.conditions.insert(occupant.clone(), conditions);
        host
    }

    pub fn applied_count(&self, kind: StatusEffectKind) -> usize {
        self.applied.iter().filter(|(_, k)| *k == kind).count()
    }

    pub fn has_effect(&self, occupant: &OccupantId, kind: StatusEffectKind) -> bool {
        self.active_effects
            .get(occupant)
            .is_some_and(|effects| effects.contains(&kind))
    }

    pub fn cut_power(&mut self, pod: &PodId) {
        self.unpowered.push(pod.clone());
    }

    pub fn restore_power(&mut self, pod: &PodId) {
        self.unpowered.retain(|p| p != pod);
    }
}

impl PowerProvider for RecordingHost {
    fn power_available(&self, pod: &PodId) -> bool {
        !self.unpowered.contains(pod)
    }

    fn set_requested_draw(&mut self, pod: &PodId, level: f32) {
        self.draws.insert(pod.clone(), level);
    }
}

impl OccupancyProvider for RecordingHost {
    fn current_occupant(&self, pod: &PodId) -> Option<OccupantId> {
        self.beds.get(pod).cloned()
    }
}

impl ConditionProvider for RecordingHost {
    fn list_conditions(&self, occupant: &OccupantId) -> Vec<Condition> {
        self.conditions.get(occupant).cloned().unwrap_or_default()
    }

    fn remove_condition(&mut self, occupant: &OccupantId, condition: &ConditionId) {
        if let Some(list) = self.conditions.get_mut(occupant) {
            list.retain(|c| &c.id != condition);
        }
    }

    fn add_status_effect(&mut self, occupant: &OccupantId, kind: StatusEffectKind) {
        self.active_effects
            .entry(occupant.clone())
            .or_default()
            .push(kind);
        self.applied.push((occupant.clone(), kind));
    }

    fn remove_status_effect_by_kind(&mut self, occupant: &OccupantId, kind: StatusEffectKind) {
        if let Some(effects) = self.active_effects.get_mut(occupant) {
            effects.retain(|k| *k != kind);
        }
        self.removed.push((occupant.clone(), kind));
    }
}
