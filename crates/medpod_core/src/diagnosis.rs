//! Diagnosis and severity math. Pure functions; host state is never touched.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::{Condition, Constants};

/// Result of diagnosing an occupant, cached by the session until the healing
/// loop has consumed the queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnosis {
    pub queue: VecDeque<Condition>,
    pub total_healing_ticks: u64,
    pub accumulated_normalized_severity: f32,
}

/// Treatment order: body region index ascending with whole-body conditions
/// last, then raw severity descending within a region.
pub fn treatment_order(a: &Condition, b: &Condition) -> Ordering {
    let region_order = match (&a.region, &b.region) {
        (Some(ra), Some(rb)) => ra.index.cmp(&rb.index),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    region_order.then_with(|| b.severity.total_cmp(&a.severity))
}

/// Ticks needed to heal one condition. Never zero, so a countdown always
/// runs and the healing phase can complete.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn healing_ticks_for(condition: &Condition, constants: &Constants) -> u64 {
    let scaled = condition.normalized_severity() * constants.healing_ticks_per_severity as f32;
    (scaled.ceil().max(0.0) as u64).max(1)
}

pub fn diagnose(mut conditions: Vec<Condition>, constants: &Constants) -> Diagnosis {
    conditions.sort_by(treatment_order);

    let mut total_healing_ticks = 0_u64;
    let mut accumulated_normalized_severity = 0.0_f32;
    for condition in &conditions {
        let normalized = condition.normalized_severity();
        accumulated_normalized_severity += normalized;
        total_healing_ticks =
            total_healing_ticks.saturating_add(healing_ticks_for(condition, constants));
        tracing::debug!(
            condition = %condition.id,
            kind = %condition.kind,
            region = condition.region_label(),
            severity = condition.severity,
            normalized,
            "diagnosed condition"
        );
    }

    Diagnosis {
        queue: conditions.into(),
        total_healing_ticks,
        accumulated_normalized_severity,
    }
}
