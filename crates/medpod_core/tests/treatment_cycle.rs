//! Integration test: two installed pods treat their patients independently.

use medpod_core::test_fixtures::{base_content, base_state, condition, RecordingHost};
use medpod_core::*;

fn occupant(id: &str) -> OccupantId {
    OccupantId(id.to_string())
}

#[test]
fn two_pods_treat_independently() {
    let content = base_content();
    let mut state = base_state(&content);
    let (north, _) = install_pod(&mut state, &content, Cell::new(0, 0, 0), Rotation::North);
    let (south, _) = install_pod(&mut state, &content, Cell::new(4, 0, 0), Rotation::South);
    assert_eq!(state.blockers.len(), 2);

    let mut host = RecordingHost::with_patient(
        &north,
        &occupant("alice"),
        vec![condition("burn", Some((1, 40.0)), 10.0)],
    );
    host.beds.insert(south.clone(), occupant("bob"));
    host.conditions.insert(
        occupant("bob"),
        vec![
            condition("gunshot", Some((3, 10.0)), 4.0),
            condition("infection", None, 0.2),
        ],
    );

    let mut events = Vec::new();
    let mut saw_reatomizing = false;
    for _ in 0..3_000 {
        events.extend(tick(&mut state, &mut host, &content, EventLevel::Normal));
        saw_reatomizing |= inspect_text(&state.pods[&south], &content.constants)
            .contains("Reatomizing");
    }

    let discharged: Vec<&OccupantId> = events
        .iter()
        .filter_map(|e| match &e.event {
            Event::PatientDischarged { occupant_id, .. } => Some(occupant_id),
            _ => None,
        })
        .collect();
    assert!(discharged.contains(&&occupant("alice")));
    assert!(discharged.contains(&&occupant("bob")));
    assert!(saw_reatomizing);

    assert!(host.list_conditions(&occupant("alice")).is_empty());
    assert!(host.list_conditions(&occupant("bob")).is_empty());
    assert_eq!(host.applied_count(StatusEffectKind::NormalAftereffect), 2);
    assert_eq!(host.applied_count(StatusEffectKind::AbruptAftereffect), 0);
}

#[test]
fn power_cut_on_one_pod_leaves_the_other_running() {
    let content = base_content();
    let mut state = base_state(&content);
    let (first, _) = install_pod(&mut state, &content, Cell::new(0, 0, 0), Rotation::West);
    let (second, _) = install_pod(&mut state, &content, Cell::new(4, 0, 0), Rotation::East);

    let mut host = RecordingHost::with_patient(
        &first,
        &occupant("alice"),
        vec![condition("burn", None, 1.0)],
    );
    host.beds.insert(second.clone(), occupant("bob"));
    host.conditions
        .insert(occupant("bob"), vec![condition("bruise", None, 1.0)]);

    // Both pods are deep in healing by now: 1.0 severity heals for 300 ticks.
    for _ in 0..500 {
        tick(&mut state, &mut host, &content, EventLevel::Normal);
    }
    assert_eq!(state.pods[&first].status(), TreatmentStatus::HealingStarted);
    assert_eq!(state.pods[&second].status(), TreatmentStatus::HealingStarted);

    host.cut_power(&first);
    tick(&mut state, &mut host, &content, EventLevel::Normal);

    assert_eq!(state.pods[&first].status(), TreatmentStatus::Idle);
    assert_eq!(state.pods[&second].status(), TreatmentStatus::HealingStarted);
    assert_eq!(
        inspect_text(&state.pods[&first], &content.constants),
        "Power needed: 125 W\nError: No power"
    );
    assert_eq!(host.applied_count(StatusEffectKind::AbruptAftereffect), 1);
}
