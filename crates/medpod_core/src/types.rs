//! Type definitions for `medpod_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the ward simulation.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::blocker::{BlockerRegistry, Cell, Rotation};
use crate::effects::StatusEffectKind;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(PodId);
string_id!(OccupantId);
string_id!(ConditionId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

/// Treatment phase of a pod. Exactly one is active at any tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatmentStatus {
    #[default]
    Idle,
    DiagnosisStarted,
    DiagnosisFinished,
    HealingStarted,
    HealingFinished,
    PatientDischarged,
    /// Terminal. Only an administrative reset leaves it.
    Error,
}

impl TreatmentStatus {
    /// Phases during which the occupant is (or is about to be) held under
    /// incapacitation. Interrupting these wakes the occupant abruptly.
    pub fn is_mid_treatment(self) -> bool {
        matches!(
            self,
            Self::DiagnosisFinished | Self::HealingStarted | Self::HealingFinished
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DiagnosisStarted => "diagnosis_started",
            Self::DiagnosisFinished => "diagnosis_finished",
            Self::HealingStarted => "healing_started",
            Self::HealingFinished => "healing_finished",
            Self::PatientDischarged => "patient_discharged",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for TreatmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Body region a condition is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyRegion {
    /// Position in the host body hierarchy. Lower indices are treated first.
    pub index: u32,
    pub label: String,
    pub max_health: f32,
}

/// A treatable health issue read from the occupant at diagnosis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    /// Host-side definition name, e.g. `"cut"` or `"malnutrition"`.
    pub kind: String,
    /// `None` means the condition affects the whole body.
    pub region: Option<BodyRegion>,
    pub severity: f32,
}

impl Condition {
    /// Whole-body conditions, and regions reporting a non-positive
    /// capacity, count as a capacity of 1.
    pub fn region_max_health(&self) -> f32 {
        self.region
            .as_ref()
            .map(|r| r.max_health)
            .filter(|max| *max > 0.0)
            .unwrap_or(1.0)
    }

    pub fn region_label(&self) -> &str {
        self.region.as_ref().map_or("whole body", |r| r.label.as_str())
    }

    /// Severities below 1 are already fractional; larger values are scaled
    /// by the region's health capacity.
    pub fn normalized_severity(&self) -> f32 {
        if self.severity < 1.0 {
            self.severity
        } else {
            self.severity / self.region_max_health()
        }
    }
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardState {
    pub meta: MetaState,
    pub pods: HashMap<PodId, PodState>,
    pub blockers: BlockerRegistry,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_pod_id: u64,
}

/// One medical pod building and its treatment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodState {
    pub id: PodId,
    pub position: Cell,
    pub rotation: Rotation,
    /// Last power signal received from the host.
    pub powered: bool,
    /// Last occupancy signal received from the host.
    pub occupant: Option<OccupantId>,
    /// Power output reported to the host grid. Consumers are negative.
    pub power_output: f32,
    /// Phase offset of the periodic check, so pods sharing a ward do not all
    /// check on the same tick.
    pub check_offset: u64,
    pub session: TreatmentSession,
}

/// Per-pod treatment progress. Counters are cleared on discharge and on
/// abandonment, never carried into the next diagnosis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreatmentSession {
    pub status: TreatmentStatus,
    /// Occupant the current cycle was started for.
    pub patient: Option<OccupantId>,
    pub diagnosing_ticks_remaining: u64,
    pub healing_ticks_remaining: u64,
    pub progress_healing_ticks: u64,
    pub total_healing_ticks: u64,
    pub condition_queue: VecDeque<Condition>,
    pub accumulated_normalized_severity: f32,
    /// Whether incapacitation has been requested and not yet lifted.
    pub incapacitated: bool,
}

impl TreatmentSession {
    /// Drop all diagnosis and healing data. Status is left untouched.
    pub fn clear_treatment(&mut self) {
        self.patient = None;
        self.diagnosing_ticks_remaining = 0;
        self.healing_ticks_remaining = 0;
        self.progress_healing_ticks = 0;
        self.total_healing_ticks = 0;
        self.condition_queue.clear();
        self.accumulated_normalized_severity = 0.0;
        self.incapacitated = false;
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PodInstalled {
        pod_id: PodId,
        blocker: Cell,
    },
    PodDecommissioned {
        pod_id: PodId,
    },
    StatusChanged {
        pod_id: PodId,
        from: TreatmentStatus,
        to: TreatmentStatus,
    },
    DiagnosisCompleted {
        pod_id: PodId,
        occupant_id: OccupantId,
        condition_count: usize,
        total_healing_ticks: u64,
        accumulated_normalized_severity: f32,
    },
    /// Only emitted at `EventLevel::Debug`.
    HealingScheduled {
        pod_id: PodId,
        condition_id: ConditionId,
        normalized_severity: f32,
        healing_ticks: u64,
    },
    ConditionTreated {
        pod_id: PodId,
        occupant_id: OccupantId,
        condition_id: ConditionId,
    },
    StatusEffectApplied {
        pod_id: PodId,
        occupant_id: OccupantId,
        effect: StatusEffectKind,
    },
    StatusEffectRemoved {
        pod_id: PodId,
        occupant_id: OccupantId,
        effect: StatusEffectKind,
    },
    TreatmentInterrupted {
        pod_id: PodId,
        interrupted: TreatmentStatus,
    },
    SessionAbandoned {
        pod_id: PodId,
        status: TreatmentStatus,
    },
    PatientDischarged {
        pod_id: PodId,
        occupant_id: OccupantId,
    },
    TransitionRejected {
        pod_id: PodId,
        from: TreatmentStatus,
    },
    PodReset {
        pod_id: PodId,
        from: TreatmentStatus,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodContent {
    pub content_version: String,
    pub body_regions: Vec<BodyRegionDef>,
    pub condition_templates: Vec<ConditionTemplateDef>,
    pub constants: Constants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyRegionDef {
    pub index: u32,
    pub label: String,
    pub max_health: f32,
}

/// Template the simulated host draws patient conditions from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionTemplateDef {
    pub id: String,
    pub label: String,
    pub severity_min: f32,
    pub severity_max: f32,
    /// Whole-body conditions never attach to a region.
    #[serde(default)]
    pub whole_body: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub ticks_per_second: u64,
    /// Interval of the coarse transition check.
    pub check_interval_ticks: u64,
    pub diagnosis_seconds: u64,
    /// Healing time for a condition of normalized severity 1.
    pub healing_seconds_per_severity: u64,
    pub idle_power_draw: f32,
    pub diagnosing_power_draw: f32,
    pub healing_power_draw: f32,
    // Derived fields, filled by derive_tick_values()
    #[serde(default)]
    pub diagnosing_ticks: u64,
    #[serde(default)]
    pub healing_ticks_per_severity: u64,
}

impl Constants {
    /// Convert the second-based durations into tick counts.
    pub fn derive_tick_values(&mut self) {
        self.diagnosing_ticks = self.diagnosis_seconds * self.ticks_per_second;
        self.healing_ticks_per_severity = self.healing_seconds_per_severity * self.ticks_per_second;
    }
}

impl Default for Constants {
    fn default() -> Self {
        let mut constants = Self {
            ticks_per_second: 60,
            check_interval_ticks: 60,
            diagnosis_seconds: 5,
            healing_seconds_per_severity: 5,
            idle_power_draw: 125.0,
            diagnosing_power_draw: 500.0,
            healing_power_draw: 1000.0,
            diagnosing_ticks: 0,
            healing_ticks_per_severity: 0,
        };
        constants.derive_tick_values();
        constants
    }
}
