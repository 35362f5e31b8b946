use crate::blocker::{blocker_cell, Cell, Rotation};
use crate::host::{ConditionProvider, OccupancyProvider, PodHost, PowerProvider};
use crate::pod::TickContext;
use crate::{
    Event, EventEnvelope, EventLevel, PodContent, PodError, PodId, PodState, WardState,
};

/// Advance the ward by one tick.
///
/// Order of operations, per pod in id order:
/// 1. Forward power and occupancy changes from the host as signals.
/// 2. Advance the pod's treatment state machine.
/// 3. Report the pod's power output back to the host.
///
/// Then increment the tick counter. Returns all events produced this tick.
pub fn tick(
    state: &mut WardState,
    host: &mut impl PodHost,
    content: &PodContent,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    let current_tick = state.meta.tick;

    let mut pod_ids: Vec<PodId> = state.pods.keys().cloned().collect();
    pod_ids.sort();

    for pod_id in pod_ids {
        let Some(pod) = state.pods.get_mut(&pod_id) else {
            continue;
        };
        sync_signals(pod, &*host);

        let mut ctx = TickContext {
            tick: current_tick,
            constants: &content.constants,
            event_level,
            counters: &mut state.counters,
            events: &mut events,
        };
        pod.advance(&mut ctx, host);
        host.set_requested_draw(&pod_id, pod.power_output);
    }

    state.meta.tick += 1;
    events
}

fn sync_signals<H: PowerProvider + OccupancyProvider>(pod: &mut PodState, host: &H) {
    let available = host.power_available(&pod.id);
    if available != pod.powered {
        if available {
            pod.power_restored();
        } else {
            pod.power_lost();
        }
    }

    let occupant = host.current_occupant(&pod.id);
    if occupant != pod.occupant {
        pod.occupant_changed(occupant);
    }
}

/// Place a new pod and reserve its machinery cell. Returns the new pod id
/// and the events produced.
pub fn install_pod(
    state: &mut WardState,
    content: &PodContent,
    position: Cell,
    rotation: Rotation,
) -> (PodId, Vec<EventEnvelope>) {
    state.counters.next_pod_id += 1;
    let pod_id = PodId(format!("pod_{:04}", state.counters.next_pod_id));
    let blocker = blocker_cell(position, rotation);

    if let Some(stale) = state.blockers.reserve(blocker, pod_id.clone()) {
        tracing::warn!(
            pod = %pod_id,
            cell = %blocker,
            previous_owner = %stale.owner,
            "replacing existing blocker reservation"
        );
    }
    state.pods.insert(
        pod_id.clone(),
        PodState::new(pod_id.clone(), position, rotation, &content.constants),
    );

    let event = crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::PodInstalled {
            pod_id: pod_id.clone(),
            blocker,
        },
    );
    (pod_id, vec![event])
}

/// Remove a pod from the ward, waking an occupant under treatment and
/// releasing the blocker reservation.
pub fn decommission_pod(
    state: &mut WardState,
    host: &mut impl ConditionProvider,
    content: &PodContent,
    pod_id: &PodId,
) -> Result<Vec<EventEnvelope>, PodError> {
    let mut pod = state
        .pods
        .remove(pod_id)
        .ok_or_else(|| PodError::UnknownPod(pod_id.clone()))?;

    let mut events = Vec::new();
    let mut ctx = TickContext {
        tick: state.meta.tick,
        constants: &content.constants,
        event_level: EventLevel::Normal,
        counters: &mut state.counters,
        events: &mut events,
    };
    pod.decommission(&mut ctx, host);
    state.blockers.release(pod_id);
    Ok(events)
}

/// Administrative reset of one pod back to `Idle`.
pub fn reset_pod(
    state: &mut WardState,
    host: &mut impl ConditionProvider,
    content: &PodContent,
    pod_id: &PodId,
) -> Result<Vec<EventEnvelope>, PodError> {
    let pod = state
        .pods
        .get_mut(pod_id)
        .ok_or_else(|| PodError::UnknownPod(pod_id.clone()))?;

    let mut events = Vec::new();
    let mut ctx = TickContext {
        tick: state.meta.tick,
        constants: &content.constants,
        event_level: EventLevel::Normal,
        counters: &mut state.counters,
        events: &mut events,
    };
    pod.reset(&mut ctx, host);
    Ok(events)
}
