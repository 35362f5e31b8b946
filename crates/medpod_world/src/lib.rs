//! Content loading, ward generation and the simulated host shared between
//! medpod_cli and medpod_daemon.

mod scenario;
mod sim_host;

use anyhow::{Context, Result};
use medpod_core::{
    install_pod, BlockerRegistry, BodyRegionDef, Cell, ConditionTemplateDef, Constants, Counters,
    MetaState, PodContent, PodId, Rotation, WardState,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub use scenario::{load_scenario, validate_scenario, HostAction, ScheduledAction};
pub use sim_host::{PatientRecord, SimHost};

/// Pods are laid out in a row, this many cells apart.
const POD_SPACING: i32 = 3;

#[derive(Deserialize)]
struct BodyRegionsFile {
    content_version: String,
    regions: Vec<BodyRegionDef>,
}

#[derive(Deserialize)]
struct ConditionTemplatesFile {
    templates: Vec<ConditionTemplateDef>,
}

/// Ward state, host and generator position saved together so a resumed run
/// continues the same patient sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedWard {
    pub state: WardState,
    pub host: SimHost,
    pub rng: ChaCha8Rng,
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches duplicate region indices or template ids, empty severity ranges,
/// and timing constants that would stall the check cycle.
pub fn validate_content(content: &PodContent) {
    let mut region_indices = HashSet::new();
    for region in &content.body_regions {
        assert!(
            region_indices.insert(region.index),
            "body region index {} is defined more than once",
            region.index,
        );
        assert!(
            region.max_health > 0.0,
            "body region '{}' has non-positive max health: {}",
            region.label,
            region.max_health,
        );
    }

    let mut template_ids = HashSet::new();
    for template in &content.condition_templates {
        assert!(
            template_ids.insert(template.id.as_str()),
            "condition template '{}' is defined more than once",
            template.id,
        );
        assert!(
            template.severity_min > 0.0 && template.severity_min <= template.severity_max,
            "condition template '{}' has an invalid severity range {}..={}",
            template.id,
            template.severity_min,
            template.severity_max,
        );
        assert!(
            template.whole_body || !content.body_regions.is_empty(),
            "condition template '{}' targets a body region but no regions are defined",
            template.id,
        );
    }

    let c = &content.constants;
    assert!(c.ticks_per_second > 0, "ticks_per_second must be positive");
    assert!(
        c.check_interval_ticks > 0,
        "check_interval_ticks must be positive"
    );
    assert!(c.diagnosis_seconds > 0, "diagnosis_seconds must be positive");
    assert!(
        c.healing_seconds_per_severity > 0,
        "healing_seconds_per_severity must be positive"
    );
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let json = std::fs::read_to_string(dir.join(file)).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {file}"))
}

pub fn load_content(content_dir: &str) -> Result<PodContent> {
    let dir = Path::new(content_dir);
    let mut constants: Constants = read_json(dir, "constants.json")?;
    constants.derive_tick_values();
    let regions_file: BodyRegionsFile = read_json(dir, "body_regions.json")?;
    let templates_file: ConditionTemplatesFile = read_json(dir, "condition_templates.json")?;

    let content = PodContent {
        content_version: regions_file.content_version,
        body_regions: regions_file.regions,
        condition_templates: templates_file.templates,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// Fresh ward with `pod_count` powered pods, each holding a newly generated
/// patient.
pub fn build_initial_state(
    content: &PodContent,
    seed: u64,
    pod_count: usize,
    rng: &mut impl Rng,
) -> (WardState, SimHost) {
    let mut state = WardState {
        meta: MetaState {
            tick: 0,
            seed,
            schema_version: 1,
            content_version: content.content_version.clone(),
        },
        pods: HashMap::new(),
        blockers: BlockerRegistry::default(),
        counters: Counters::default(),
    };
    let mut host = SimHost::default();

    let mut x = 0;
    for _ in 0..pod_count {
        let (pod_id, _) = install_pod(&mut state, content, Cell::new(x, 0, 0), Rotation::North);
        let patient = host.generate_patient(content, rng);
        host.admit(&pod_id, patient);
        x += POD_SPACING;
    }
    (state, host)
}

pub fn load_saved_ward(path: &Path) -> Result<SavedWard> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading state file: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing state file: {}", path.display()))
}

pub fn save_ward(
    path: &Path,
    state: &WardState,
    host: &SimHost,
    rng: &ChaCha8Rng,
) -> Result<()> {
    let saved = SavedWard {
        state: state.clone(),
        host: host.clone(),
        rng: rng.clone(),
    };
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &saved)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Pod ids in a stable order.
pub fn sorted_pod_ids(state: &WardState) -> Vec<PodId> {
    let mut ids: Vec<PodId> = state.pods.keys().cloned().collect();
    ids.sort();
    ids
}
