//! Ways a treatment cycle ends early: power loss, the occupant leaving,
//! an administrative reset, or the pod being removed.

use super::TickContext;
use crate::host::ConditionProvider;
use crate::{Event, PodState, TreatmentStatus};

impl PodState {
    /// Power is gone: wake the occupant with the aftereffect matching the
    /// interrupted phase and fall back to `Idle`. Runs every unpowered tick;
    /// once idle it has nothing left to do.
    pub(super) fn handle_power_loss(
        &mut self,
        ctx: &mut TickContext<'_>,
        conditions: &mut impl ConditionProvider,
    ) {
        let interrupted = self.session.status;
        if interrupted == TreatmentStatus::Idle {
            return;
        }

        if let Some(occupant) = self.occupant.clone() {
            if interrupted.is_mid_treatment() {
                self.wake_occupant(ctx, conditions, &occupant, false);
            } else if interrupted == TreatmentStatus::PatientDischarged {
                // Treatment had already completed.
                self.wake_occupant(ctx, conditions, &occupant, true);
            }
        }

        tracing::info!(pod = %self.id, %interrupted, "treatment interrupted by power loss");
        ctx.emit(Event::TreatmentInterrupted {
            pod_id: self.id.clone(),
            interrupted,
        });
        self.session.clear_treatment();
        self.set_status(ctx, TreatmentStatus::Idle);
    }

    /// The occupant left (or was swapped) mid-cycle. Diagnosis and healing
    /// data are dropped; no status effects are touched.
    pub(super) fn abandon_session(&mut self, ctx: &mut TickContext<'_>) {
        let status = self.session.status;
        if matches!(status, TreatmentStatus::Idle | TreatmentStatus::Error) {
            return;
        }
        tracing::info!(pod = %self.id, %status, "occupant gone, abandoning session");
        ctx.emit(Event::SessionAbandoned {
            pod_id: self.id.clone(),
            status,
        });
        self.session.clear_treatment();
        self.set_status(ctx, TreatmentStatus::Idle);
    }

    /// Administrative exit from any status, `Error` included. An occupant
    /// still under incapacitation is woken abruptly.
    pub fn reset(&mut self, ctx: &mut TickContext<'_>, conditions: &mut impl ConditionProvider) {
        let from = self.session.status;
        if self.session.incapacitated {
            if let Some(occupant) = self.session.patient.clone().or_else(|| self.occupant.clone()) {
                self.wake_occupant(ctx, conditions, &occupant, false);
            }
        }
        tracing::info!(pod = %self.id, %from, "pod reset");
        ctx.emit(Event::PodReset {
            pod_id: self.id.clone(),
            from,
        });
        self.session.clear_treatment();
        self.set_status(ctx, TreatmentStatus::Idle);
    }

    /// The pod is being removed from the map. A powered pod in the middle of
    /// treatment wakes its occupant abruptly first.
    pub fn decommission(
        &mut self,
        ctx: &mut TickContext<'_>,
        conditions: &mut impl ConditionProvider,
    ) {
        if self.powered && self.session.status.is_mid_treatment() {
            if let Some(occupant) = self.occupant.clone() {
                self.wake_occupant(ctx, conditions, &occupant, false);
            }
        }
        self.session.clear_treatment();
        ctx.emit(Event::PodDecommissioned {
            pod_id: self.id.clone(),
        });
    }
}
