//! `medpod_core`: deterministic medical pod treatment tick.
//!
//! No IO, no network. The host health system, power grid and bed occupancy
//! are reached only through the traits in [`host`].

pub mod blocker;
pub mod diagnosis;
pub mod effects;
mod engine;
mod error;
pub mod host;
pub mod inspect;
mod pod;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use blocker::{blocker_cell, BlockerRegistry, BlockerReservation, Cell, Rotation};
pub use effects::StatusEffectKind;
pub use engine::{decommission_pod, install_pod, reset_pod, tick};
pub use error::PodError;
pub use host::{ConditionProvider, OccupancyProvider, PodHost, PowerProvider};
pub use inspect::{inspect_text, snapshot, PodSnapshot};
pub use pod::TickContext;
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
