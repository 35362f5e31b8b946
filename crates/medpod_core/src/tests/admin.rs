use super::*;

fn force_error(state: &mut WardState) {
    state
        .pods
        .get_mut(&pod_id())
        .unwrap()
        .session
        .status = TreatmentStatus::Error;
}

#[test]
fn error_status_is_sticky_while_powered() {
    let (content, mut state, mut host) = ward_with_patient(two_conditions());
    force_error(&mut state);

    let events = run_ticks(&mut state, &mut host, &content, 300);
    assert!(events.is_empty());
    assert_eq!(pod(&state).status(), TreatmentStatus::Error);
    assert!(host.applied.is_empty());
}

#[test]
fn power_loss_returns_error_pod_to_idle() {
    let (content, mut state, mut host) = ward_with_patient(two_conditions());
    force_error(&mut state);

    host.cut_power(&pod_id());
    let events = run_ticks(&mut state, &mut host, &content, 1);
    assert_eq!(pod(&state).status(), TreatmentStatus::Idle);
    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::TreatmentInterrupted {
            interrupted: TreatmentStatus::Error,
            ..
        }
    )));
    assert!(host.applied.is_empty());

    host.restore_power(&pod_id());
    run_ticks(&mut state, &mut host, &content, 120);
    assert_ne!(pod(&state).status(), TreatmentStatus::Error);
}

#[test]
fn reset_leaves_error_and_resumes_on_next_check() {
    let (content, mut state, mut host) = ward_with_patient(two_conditions());
    force_error(&mut state);

    let events = reset_pod(&mut state, &mut host, &content, &pod_id()).unwrap();
    assert!(events.iter().any(|e| matches!(
        e.event,
        Event::PodReset {
            from: TreatmentStatus::Error,
            ..
        }
    )));
    assert_eq!(pod(&state).status(), TreatmentStatus::Idle);

    run_ticks(&mut state, &mut host, &content, 1);
    assert_eq!(pod(&state).status(), TreatmentStatus::DiagnosisStarted);
}

#[test]
fn reset_mid_healing_wakes_occupant_abruptly() {
    let (content, mut state, mut host) = ward_with_patient(two_conditions());
    run_until_status(
        &mut state,
        &mut host,
        &content,
        TreatmentStatus::HealingStarted,
    );

    reset_pod(&mut state, &mut host, &content, &pod_id()).unwrap();

    assert_eq!(pod(&state).status(), TreatmentStatus::Idle);
    assert_eq!(host.applied_count(StatusEffectKind::AbruptAftereffect), 1);
    assert!(!host.has_effect(&patient(), StatusEffectKind::InducedIncapacitation));
    assert!(pod(&state).session.condition_queue.is_empty());
}

#[test]
fn reset_while_diagnosing_touches_no_effects() {
    let (content, mut state, mut host) = ward_with_patient(two_conditions());
    run_ticks(&mut state, &mut host, &content, 50);

    reset_pod(&mut state, &mut host, &content, &pod_id()).unwrap();

    assert_eq!(pod(&state).status(), TreatmentStatus::Idle);
    assert!(host.applied.is_empty());
}

#[test]
fn admin_operations_reject_unknown_pod() {
    let (content, mut state, mut host) = ward_with_patient(vec![]);
    let missing = PodId("pod_9999".to_string());

    assert_eq!(
        reset_pod(&mut state, &mut host, &content, &missing).unwrap_err(),
        PodError::UnknownPod(missing.clone())
    );
    assert_eq!(
        decommission_pod(&mut state, &mut host, &content, &missing).unwrap_err(),
        PodError::UnknownPod(missing)
    );
}

#[test]
fn install_reserves_blocker_behind_bed() {
    let content = base_content();
    let mut state = base_state(&content);

    let (pod_id, events) = install_pod(&mut state, &content, Cell::new(5, 0, 5), Rotation::North);

    assert_eq!(pod_id.0, "pod_0001");
    assert!(state.pods.contains_key(&pod_id));
    assert_eq!(state.blockers.owner_at(Cell::new(5, 0, 4)), Some(&pod_id));
    assert!(matches!(
        events[0].event,
        Event::PodInstalled { blocker, .. } if blocker == Cell::new(5, 0, 4)
    ));
}

#[test]
fn install_replaces_stale_blocker() {
    let content = base_content();
    let mut state = base_state(&content);

    install_pod(&mut state, &content, Cell::new(5, 0, 5), Rotation::North);
    let (second, _) = install_pod(&mut state, &content, Cell::new(6, 0, 4), Rotation::East);

    assert_eq!(state.blockers.len(), 1);
    assert_eq!(state.blockers.owner_at(Cell::new(5, 0, 4)), Some(&second));
}

#[test]
fn decommission_mid_treatment_wakes_and_releases_blocker() {
    let content = base_content();
    let mut state = base_state(&content);
    let (id, _) = install_pod(&mut state, &content, Cell::new(5, 0, 5), Rotation::North);
    state.pods.get_mut(&id).unwrap().check_offset = 0;
    let mut host = RecordingHost::with_patient(&id, &patient(), two_conditions());
    run_until_status(
        &mut state,
        &mut host,
        &content,
        TreatmentStatus::HealingStarted,
    );

    let events = decommission_pod(&mut state, &mut host, &content, &id).unwrap();

    assert!(state.pods.is_empty());
    assert!(state.blockers.is_empty());
    assert_eq!(host.applied_count(StatusEffectKind::AbruptAftereffect), 1);
    assert_eq!(
        count_events(&events, |e| matches!(e, Event::PodDecommissioned { .. })),
        1
    );
}

#[test]
fn decommission_unpowered_pod_requests_no_aftereffect() {
    let (content, mut state, mut host) = ward_with_patient(two_conditions());
    run_until_status(
        &mut state,
        &mut host,
        &content,
        TreatmentStatus::HealingStarted,
    );
    state.pods.get_mut(&pod_id()).unwrap().power_lost();

    decommission_pod(&mut state, &mut host, &content, &pod_id()).unwrap();

    assert!(state.pods.is_empty());
    assert_eq!(host.applied_count(StatusEffectKind::AbruptAftereffect), 0);
}

#[test]
fn idle_decommission_only_reports_removal() {
    let (content, mut state, mut host) = ward_with_patient(vec![]);
    host.beds.clear();

    let events = decommission_pod(&mut state, &mut host, &content, &pod_id()).unwrap();

    assert_eq!(events.len(), 1);
    assert!(host.applied.is_empty());
}
