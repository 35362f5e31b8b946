use thiserror::Error;

use crate::{PodId, TreatmentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PodError {
    /// The status ring has no successor for `from`.
    #[error("no transition out of status '{from}'")]
    InvalidTransition { from: TreatmentStatus },
    #[error("unknown pod '{0}'")]
    UnknownPod(PodId),
    #[error("unknown status effect def '{0}'")]
    UnknownStatusEffect(String),
}
