//! In-memory host: power lines, beds and patients for a simulated ward.

use std::collections::{BTreeMap, BTreeSet};

use medpod_core::{
    BodyRegion, Condition, ConditionId, ConditionProvider, Event, EventEnvelope,
    OccupancyProvider, OccupantId, PodContent, PodId, PowerProvider, StatusEffectKind,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scenario::{HostAction, ScheduledAction};

const MAX_CONDITIONS_PER_PATIENT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub conditions: Vec<Condition>,
    pub effects: Vec<StatusEffectKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimHost {
    pub unpowered: BTreeSet<PodId>,
    pub beds: BTreeMap<PodId, OccupantId>,
    pub patients: BTreeMap<OccupantId, PatientRecord>,
    /// Last draw requested by each pod (negative watts).
    pub draws: BTreeMap<PodId, f32>,
    pub schedule: Vec<ScheduledAction>,
    pub next_patient_id: u64,
    pub next_condition_id: u64,
}

impl SimHost {
    pub fn set_power(&mut self, pod: &PodId, available: bool) {
        if available {
            self.unpowered.remove(pod);
        } else {
            self.unpowered.insert(pod.clone());
        }
    }

    /// Put `occupant` in the pod's bed. Returns whoever was lying there.
    pub fn admit(&mut self, pod: &PodId, occupant: OccupantId) -> Option<OccupantId> {
        self.patients.entry(occupant.clone()).or_default();
        self.beds.insert(pod.clone(), occupant)
    }

    pub fn remove(&mut self, pod: &PodId) -> Option<OccupantId> {
        self.beds.remove(pod)
    }

    pub fn patient(&self, occupant: &OccupantId) -> Option<&PatientRecord> {
        self.patients.get(occupant)
    }

    /// Total watts currently requested by every pod.
    pub fn total_requested_draw(&self) -> f32 {
        self.draws.values().map(|draw| -draw).sum()
    }

    /// Register a new patient with one to three random conditions drawn
    /// from the content's templates.
    pub fn generate_patient(&mut self, content: &PodContent, rng: &mut impl Rng) -> OccupantId {
        self.next_patient_id += 1;
        let occupant = OccupantId(format!("patient_{:04}", self.next_patient_id));

        let count = if content.condition_templates.is_empty() {
            0
        } else {
            rng.gen_range(1..=MAX_CONDITIONS_PER_PATIENT)
        };
        let mut conditions = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(template) = content.condition_templates.choose(rng) else {
                break;
            };
            let region = if template.whole_body {
                None
            } else {
                content
                    .body_regions
                    .choose(rng)
                    .map(|def| BodyRegion {
                        index: def.index,
                        label: def.label.clone(),
                        max_health: def.max_health,
                    })
            };
            self.next_condition_id += 1;
            conditions.push(Condition {
                id: ConditionId(format!("cond_{:06}", self.next_condition_id)),
                kind: template.id.clone(),
                region,
                severity: rng.gen_range(template.severity_min..=template.severity_max),
            });
        }

        tracing::debug!(patient = %occupant, conditions = conditions.len(), "patient generated");
        self.patients.insert(
            occupant.clone(),
            PatientRecord {
                conditions,
                effects: Vec::new(),
            },
        );
        occupant
    }

    /// Apply every scheduled action due at or before `tick`, in schedule
    /// order. Returns the actions applied.
    pub fn run_due_actions(
        &mut self,
        tick: u64,
        content: &PodContent,
        rng: &mut impl Rng,
    ) -> Vec<HostAction> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.schedule)
            .into_iter()
            .partition(|scheduled| scheduled.execute_at_tick <= tick);
        self.schedule = pending;
        due.sort_by_key(|scheduled| scheduled.execute_at_tick);

        let mut applied = Vec::with_capacity(due.len());
        for scheduled in due {
            self.apply(&scheduled.action, content, rng);
            applied.push(scheduled.action);
        }
        applied
    }

    pub fn apply(&mut self, action: &HostAction, content: &PodContent, rng: &mut impl Rng) {
        tracing::info!(?action, "host action");
        match action {
            HostAction::CutPower { pod_id } => self.set_power(pod_id, false),
            HostAction::RestorePower { pod_id } => self.set_power(pod_id, true),
            HostAction::Admit {
                pod_id,
                occupant_id,
            } => {
                let occupant = match occupant_id {
                    Some(id) => id.clone(),
                    None => self.generate_patient(content, rng),
                };
                self.admit(pod_id, occupant);
            }
            HostAction::Remove { pod_id } => {
                self.remove(pod_id);
            }
        }
    }

    /// React to the ward's events: discharged patients get up and leave.
    pub fn observe(&mut self, events: &[EventEnvelope]) {
        for envelope in events {
            if let Event::PatientDischarged {
                pod_id,
                occupant_id,
            } = &envelope.event
            {
                if self.beds.get(pod_id) == Some(occupant_id) {
                    self.beds.remove(pod_id);
                    tracing::debug!(pod = %pod_id, patient = %occupant_id, "patient left pod");
                }
            }
        }
    }
}

impl PowerProvider for SimHost {
    fn power_available(&self, pod: &PodId) -> bool {
        !self.unpowered.contains(pod)
    }

    fn set_requested_draw(&mut self, pod: &PodId, level: f32) {
        self.draws.insert(pod.clone(), level);
    }
}

impl OccupancyProvider for SimHost {
    fn current_occupant(&self, pod: &PodId) -> Option<OccupantId> {
        self.beds.get(pod).cloned()
    }
}

impl ConditionProvider for SimHost {
    fn list_conditions(&self, occupant: &OccupantId) -> Vec<Condition> {
        self.patients
            .get(occupant)
            .map(|record| record.conditions.clone())
            .unwrap_or_default()
    }

    fn remove_condition(&mut self, occupant: &OccupantId, condition: &ConditionId) {
        if let Some(record) = self.patients.get_mut(occupant) {
            record.conditions.retain(|c| &c.id != condition);
        }
    }

    fn add_status_effect(&mut self, occupant: &OccupantId, kind: StatusEffectKind) {
        let record = self.patients.entry(occupant.clone()).or_default();
        if !record.effects.contains(&kind) {
            record.effects.push(kind);
        }
    }

    fn remove_status_effect_by_kind(&mut self, occupant: &OccupantId, kind: StatusEffectKind) {
        if let Some(record) = self.patients.get_mut(occupant) {
            record.effects.retain(|k| *k != kind);
        }
    }
}
