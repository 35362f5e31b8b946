use super::*;
use crate::test_fixtures::{base_content, base_state, condition, patient, test_pod, RecordingHost};

mod admin;

// --- Shared test helpers ------------------------------------------------

const MAX_TEST_TICKS: u64 = 10_000;

fn pod_id() -> PodId {
    PodId("pod_0001".to_string())
}

/// Region 1 at 0.5 severity (150 ticks), whole body at 0.25 (75 ticks).
fn two_conditions() -> Vec<Condition> {
    vec![
        condition("cond_whole", None, 0.25),
        condition("cond_torso", Some((1, 10.0)), 5.0),
    ]
}

fn ward_with_patient(conditions: Vec<Condition>) -> (PodContent, WardState, RecordingHost) {
    let content = base_content();
    let mut state = base_state(&content);
    let pod = test_pod(&content);
    state.pods.insert(pod.id.clone(), pod);
    let host = RecordingHost::with_patient(&pod_id(), &patient(), conditions);
    (content, state, host)
}

fn pod(state: &WardState) -> &PodState {
    &state.pods[&pod_id()]
}

fn run_ticks(
    state: &mut WardState,
    host: &mut RecordingHost,
    content: &PodContent,
    ticks: u64,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(tick(state, host, content, EventLevel::Normal));
    }
    events
}

/// Tick until `done` holds after a tick. Panics if it never does.
fn run_until(
    state: &mut WardState,
    host: &mut RecordingHost,
    content: &PodContent,
    done: impl Fn(&WardState, &[EventEnvelope]) -> bool,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..MAX_TEST_TICKS {
        events.extend(tick(state, host, content, EventLevel::Normal));
        if done(state, &events) {
            return events;
        }
    }
    panic!("condition not reached within {MAX_TEST_TICKS} ticks");
}

fn run_until_status(
    state: &mut WardState,
    host: &mut RecordingHost,
    content: &PodContent,
    status: TreatmentStatus,
) -> Vec<EventEnvelope> {
    run_until(state, host, content, |s, _| pod(s).status() == status)
}

fn status_trail(events: &[EventEnvelope]) -> Vec<TreatmentStatus> {
    let mut trail = vec![TreatmentStatus::Idle];
    trail.extend(events.iter().filter_map(|e| match &e.event {
        Event::StatusChanged { to, .. } => Some(*to),
        _ => None,
    }));
    trail
}

fn count_events(events: &[EventEnvelope], matches: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| matches(&e.event)).count()
}
