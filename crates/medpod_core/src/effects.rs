//! Status effects the pod requests on its occupant.
//!
//! The set of effects is closed; each kind maps to the def name the host
//! health system knows it by through a static table.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::host::ConditionProvider;
use crate::{OccupantId, PodError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectKind {
    /// Keeps the occupant in the pod for the duration of treatment.
    InducedIncapacitation,
    /// Applied when the occupant wakes after a completed cycle.
    NormalAftereffect,
    /// Applied when treatment is cut short.
    AbruptAftereffect,
}

#[derive(Debug, PartialEq, Eq)]
pub struct StatusEffectDef {
    pub kind: StatusEffectKind,
    pub def_name: &'static str,
    pub label: &'static str,
}

/// Indexed by `StatusEffectKind as usize`.
static STATUS_EFFECT_DEFS: [StatusEffectDef; 3] = [
    StatusEffectDef {
        kind: StatusEffectKind::InducedIncapacitation,
        def_name: "medpod_induced_coma",
        label: "induced coma",
    },
    StatusEffectDef {
        kind: StatusEffectKind::NormalAftereffect,
        def_name: "medpod_cortical_stimulation",
        label: "cortical stimulation",
    },
    StatusEffectDef {
        kind: StatusEffectKind::AbruptAftereffect,
        def_name: "medpod_cortical_stimulation_improper",
        label: "improper cortical stimulation",
    },
];

impl StatusEffectKind {
    pub const ALL: [StatusEffectKind; 3] = [
        Self::InducedIncapacitation,
        Self::NormalAftereffect,
        Self::AbruptAftereffect,
    ];

    pub fn def(self) -> &'static StatusEffectDef {
        &STATUS_EFFECT_DEFS[self as usize]
    }

    pub fn def_name(self) -> &'static str {
        self.def().def_name
    }

    /// Aftereffect for leaving incapacitation.
    pub fn aftereffect(normal: bool) -> Self {
        if normal {
            Self::NormalAftereffect
        } else {
            Self::AbruptAftereffect
        }
    }
}

impl FromStr for StatusEffectKind {
    type Err = PodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STATUS_EFFECT_DEFS
            .iter()
            .find(|def| def.def_name == s)
            .map(|def| def.kind)
            .ok_or_else(|| PodError::UnknownStatusEffect(s.to_string()))
    }
}

impl std::fmt::Display for StatusEffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.def().label)
    }
}

pub fn induce_incapacitation(conditions: &mut impl ConditionProvider, occupant: &OccupantId) {
    conditions.add_status_effect(occupant, StatusEffectKind::InducedIncapacitation);
}

/// Lift incapacitation and apply the matching aftereffect. Returns the
/// aftereffect that was applied.
pub fn remove_incapacitation_and_apply_aftereffect(
    conditions: &mut impl ConditionProvider,
    occupant: &OccupantId,
    normal: bool,
) -> StatusEffectKind {
    conditions.remove_status_effect_by_kind(occupant, StatusEffectKind::InducedIncapacitation);
    let aftereffect = StatusEffectKind::aftereffect(normal);
    conditions.add_status_effect(occupant, aftereffect);
    aftereffect
}
