mod interruption;

use crate::blocker::{Cell, Rotation};
use crate::diagnosis::{diagnose, healing_ticks_for};
use crate::effects::{self, StatusEffectKind};
use crate::host::ConditionProvider;
use crate::{
    Constants, Counters, Event, EventEnvelope, EventLevel, OccupantId, PodId, PodState,
    TreatmentSession, TreatmentStatus,
};

/// Context shared by every pod advanced in one ward tick.
pub struct TickContext<'a> {
    pub tick: u64,
    pub constants: &'a Constants,
    pub event_level: EventLevel,
    pub counters: &'a mut Counters,
    pub events: &'a mut Vec<EventEnvelope>,
}

impl TickContext<'_> {
    pub(crate) fn emit(&mut self, event: Event) {
        let envelope = crate::emit(self.counters, self.tick, event);
        self.events.push(envelope);
    }
}

/// Stable per-pod phase for the periodic check.
fn check_offset(id: &PodId, interval: u64) -> u64 {
    let hash = id
        .0
        .bytes()
        .fold(0_u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
    hash % interval.max(1)
}

impl PodState {
    /// A powered, empty pod with an idle session.
    pub fn new(id: PodId, position: Cell, rotation: Rotation, constants: &Constants) -> Self {
        let check_offset = check_offset(&id, constants.check_interval_ticks);
        Self {
            id,
            position,
            rotation,
            powered: true,
            occupant: None,
            power_output: -constants.idle_power_draw,
            check_offset,
            session: TreatmentSession::default(),
        }
    }

    pub fn status(&self) -> TreatmentStatus {
        self.session.status
    }

    pub fn power_lost(&mut self) {
        self.powered = false;
    }

    pub fn power_restored(&mut self) {
        self.powered = true;
    }

    pub fn occupant_changed(&mut self, occupant: Option<OccupantId>) {
        self.occupant = occupant;
    }

    fn is_check_tick(&self, tick: u64, constants: &Constants) -> bool {
        (tick + self.check_offset) % constants.check_interval_ticks.max(1) == 0
    }

    /// Advance the treatment state machine by one tick.
    ///
    /// Order of operations:
    /// 1. Request the idle baseline draw.
    /// 2. Power loss: handle the interruption and stop.
    /// 3. On the periodic check, run at most one check-driven transition.
    /// 4. Decrement the countdown belonging to the current phase, raising
    ///    the draw to that phase's level.
    pub fn advance(&mut self, ctx: &mut TickContext<'_>, conditions: &mut impl ConditionProvider) {
        self.power_output = -ctx.constants.idle_power_draw;

        if !self.powered {
            self.handle_power_loss(ctx, conditions);
            return;
        }

        if self.is_check_tick(ctx.tick, ctx.constants) {
            self.run_check(ctx, conditions);
        }

        self.run_countdowns(ctx);
    }

    fn run_check(&mut self, ctx: &mut TickContext<'_>, conditions: &mut impl ConditionProvider) {
        let Some(occupant) = self.occupant.clone() else {
            self.abandon_session(ctx);
            return;
        };

        if self
            .session
            .patient
            .as_ref()
            .is_some_and(|patient| patient != &occupant)
        {
            self.abandon_session(ctx);
        }

        match self.session.status {
            TreatmentStatus::Idle => {
                self.session.patient = Some(occupant);
                self.session.diagnosing_ticks_remaining = ctx.constants.diagnosing_ticks;
                self.switch_state(ctx);
            }
            TreatmentStatus::DiagnosisFinished => self.begin_healing(ctx, conditions, &occupant),
            TreatmentStatus::HealingFinished => self.finish_condition(ctx, conditions, &occupant),
            TreatmentStatus::PatientDischarged => self.discharge(ctx, conditions, &occupant),
            TreatmentStatus::DiagnosisStarted
            | TreatmentStatus::HealingStarted
            | TreatmentStatus::Error => {}
        }
    }

    fn run_countdowns(&mut self, ctx: &mut TickContext<'_>) {
        let session = &mut self.session;
        match session.status {
            TreatmentStatus::DiagnosisStarted if session.diagnosing_ticks_remaining > 0 => {
                session.diagnosing_ticks_remaining -= 1;
                self.power_output = -ctx.constants.diagnosing_power_draw;
                if session.diagnosing_ticks_remaining == 0 {
                    self.switch_state(ctx);
                }
            }
            TreatmentStatus::HealingStarted if session.healing_ticks_remaining > 0 => {
                session.healing_ticks_remaining -= 1;
                session.progress_healing_ticks += 1;
                self.power_output = -ctx.constants.healing_power_draw;
                if session.healing_ticks_remaining == 0 {
                    self.switch_state(ctx);
                }
            }
            _ => {}
        }
    }

    /// Diagnose the occupant, put them under and schedule the first condition.
    fn begin_healing(
        &mut self,
        ctx: &mut TickContext<'_>,
        conditions: &mut impl ConditionProvider,
        occupant: &OccupantId,
    ) {
        let diagnosis = diagnose(conditions.list_conditions(occupant), ctx.constants);
        tracing::debug!(
            pod = %self.id,
            occupant = %occupant,
            conditions = diagnosis.queue.len(),
            total_healing_ticks = diagnosis.total_healing_ticks,
            total_normalized_severity = diagnosis.accumulated_normalized_severity,
            "diagnosis complete"
        );

        self.session.condition_queue = diagnosis.queue;
        self.session.total_healing_ticks = diagnosis.total_healing_ticks;
        self.session.accumulated_normalized_severity = diagnosis.accumulated_normalized_severity;
        self.session.progress_healing_ticks = 0;

        effects::induce_incapacitation(conditions, occupant);
        self.session.incapacitated = true;
        ctx.emit(Event::StatusEffectApplied {
            pod_id: self.id.clone(),
            occupant_id: occupant.clone(),
            effect: StatusEffectKind::InducedIncapacitation,
        });
        ctx.emit(Event::DiagnosisCompleted {
            pod_id: self.id.clone(),
            occupant_id: occupant.clone(),
            condition_count: self.session.condition_queue.len(),
            total_healing_ticks: self.session.total_healing_ticks,
            accumulated_normalized_severity: self.session.accumulated_normalized_severity,
        });

        if self.schedule_next_condition(ctx) {
            self.switch_state(ctx);
        } else {
            // Nothing to treat: go straight to discharge.
            self.set_status(ctx, TreatmentStatus::PatientDischarged);
        }
    }

    /// Remove the condition just healed and move on to the next one.
    fn finish_condition(
        &mut self,
        ctx: &mut TickContext<'_>,
        conditions: &mut impl ConditionProvider,
        occupant: &OccupantId,
    ) {
        if let Some(treated) = self.session.condition_queue.pop_front() {
            conditions.remove_condition(occupant, &treated.id);
            ctx.emit(Event::ConditionTreated {
                pod_id: self.id.clone(),
                occupant_id: occupant.clone(),
                condition_id: treated.id,
            });
        }

        if self.schedule_next_condition(ctx) {
            self.set_status(ctx, TreatmentStatus::HealingStarted);
        } else {
            self.switch_state(ctx);
        }
    }

    /// Wake the occupant normally and close the cycle.
    fn discharge(
        &mut self,
        ctx: &mut TickContext<'_>,
        conditions: &mut impl ConditionProvider,
        occupant: &OccupantId,
    ) {
        self.wake_occupant(ctx, conditions, occupant, true);
        ctx.emit(Event::PatientDischarged {
            pod_id: self.id.clone(),
            occupant_id: occupant.clone(),
        });
        self.switch_state(ctx);
        self.session.clear_treatment();
    }

    /// Load the head of the queue into the healing countdown. Returns false
    /// when the queue is empty.
    fn schedule_next_condition(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let Some(head) = self.session.condition_queue.front() else {
            return false;
        };
        let healing_ticks = healing_ticks_for(head, ctx.constants);
        self.session.healing_ticks_remaining = healing_ticks;
        tracing::debug!(
            pod = %self.id,
            condition = %head.id,
            normalized_severity = head.normalized_severity(),
            healing_ticks,
            "healing scheduled"
        );
        if ctx.event_level == EventLevel::Debug {
            let event = Event::HealingScheduled {
                pod_id: self.id.clone(),
                condition_id: head.id.clone(),
                normalized_severity: head.normalized_severity(),
                healing_ticks,
            };
            ctx.emit(event);
        }
        true
    }

    fn wake_occupant(
        &mut self,
        ctx: &mut TickContext<'_>,
        conditions: &mut impl ConditionProvider,
        occupant: &OccupantId,
        normal: bool,
    ) {
        let was_incapacitated = self.session.incapacitated;
        let aftereffect =
            effects::remove_incapacitation_and_apply_aftereffect(conditions, occupant, normal);
        self.session.incapacitated = false;

        if was_incapacitated {
            ctx.emit(Event::StatusEffectRemoved {
                pod_id: self.id.clone(),
                occupant_id: occupant.clone(),
                effect: StatusEffectKind::InducedIncapacitation,
            });
        }
        ctx.emit(Event::StatusEffectApplied {
            pod_id: self.id.clone(),
            occupant_id: occupant.clone(),
            effect: aftereffect,
        });
    }

    /// Step to the next status on the treatment ring. A status with no
    /// successor lands in `Error`.
    fn switch_state(&mut self, ctx: &mut TickContext<'_>) {
        match self.session.status.successor() {
            Ok(next) => self.set_status(ctx, next),
            Err(err) => {
                tracing::error!(pod = %self.id, %err, "rejected status transition");
                ctx.emit(Event::TransitionRejected {
                    pod_id: self.id.clone(),
                    from: self.session.status,
                });
                self.set_status(ctx, TreatmentStatus::Error);
            }
        }
    }

    fn set_status(&mut self, ctx: &mut TickContext<'_>, to: TreatmentStatus) {
        let from = self.session.status;
        if from == to {
            return;
        }
        self.session.status = to;
        ctx.emit(Event::StatusChanged {
            pod_id: self.id.clone(),
            from,
            to,
        });
    }
}

impl TreatmentStatus {
    /// Next status on the treatment ring.
    pub fn successor(self) -> Result<Self, crate::PodError> {
        match self {
            Self::Idle => Ok(Self::DiagnosisStarted),
            Self::DiagnosisStarted => Ok(Self::DiagnosisFinished),
            Self::DiagnosisFinished => Ok(Self::HealingStarted),
            Self::HealingStarted => Ok(Self::HealingFinished),
            Self::HealingFinished => Ok(Self::PatientDischarged),
            Self::PatientDischarged => Ok(Self::Idle),
            Self::Error => Err(crate::PodError::InvalidTransition { from: self }),
        }
    }
}
