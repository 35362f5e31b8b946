use crate::state::{EventTx, SharedSim, SimState};
use medpod_core::EventEnvelope;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Run due host actions, advance the ward one tick and let the host react
/// to the resulting events.
pub fn step(sim: &mut SimState) -> Vec<EventEnvelope> {
    let SimState {
        ward,
        host,
        content,
        rng,
        event_level,
    } = sim;
    host.run_due_actions(ward.meta.tick, content, rng);
    let events = medpod_core::tick(ward, host, content, *event_level);
    host.observe(&events);
    events
}

pub async fn run_tick_loop(
    sim: SharedSim,
    event_tx: EventTx,
    ticks_per_sec: f64,
    max_ticks: Option<u64>,
    paused: Arc<AtomicBool>,
) {
    let mut interval = if ticks_per_sec > 0.0 {
        let mut iv = tokio::time::interval(Duration::from_secs_f64(1.0 / ticks_per_sec));
        iv.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
        Some(iv)
    } else {
        None
    };

    loop {
        if paused.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            continue;
        }

        let (events, done) = {
            let mut guard = sim.lock();
            let events = step(&mut guard);
            let done = max_ticks.is_some_and(|max| guard.ward.meta.tick >= max);
            (events, done)
        };

        if !events.is_empty() {
            let _ = event_tx.send(events);
        }

        if done {
            tracing::info!("max ticks reached, stopping tick loop");
            break;
        }

        if let Some(ref mut iv) = interval {
            iv.tick().await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medpod_core::test_fixtures::base_content;
    use medpod_core::{EventLevel, TreatmentStatus};
    use medpod_world::build_initial_state;
    use parking_lot::Mutex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sim() -> SimState {
        let content = base_content();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (ward, host) = build_initial_state(&content, 0, 1, &mut rng);
        SimState {
            ward,
            host,
            content,
            rng,
            event_level: EventLevel::Normal,
        }
    }

    #[test]
    fn step_advances_the_ward() {
        let mut sim = sim();
        for _ in 0..60 {
            step(&mut sim);
        }
        assert_eq!(sim.ward.meta.tick, 60);
        let pod = sim.ward.pods.values().next().unwrap();
        assert_eq!(pod.status(), TreatmentStatus::DiagnosisStarted);
    }

    #[tokio::test]
    async fn loop_stops_at_max_ticks() {
        let shared = Arc::new(Mutex::new(sim()));
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1024);

        run_tick_loop(
            shared.clone(),
            event_tx,
            0.0,
            Some(120),
            Arc::new(AtomicBool::new(false)),
        )
        .await;

        assert_eq!(shared.lock().ward.meta.tick, 120);
    }
}
