use medpod_core::{EventEnvelope, EventLevel, PodContent, WardState};
use medpod_world::SimHost;
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct SimState {
    pub ward: WardState,
    pub host: SimHost,
    pub content: PodContent,
    pub rng: ChaCha8Rng,
    pub event_level: EventLevel,
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub ticks_per_sec: f64,
    pub paused: Arc<AtomicBool>,
}
