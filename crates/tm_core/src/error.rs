use thiserror::Error;

/// Failures while capturing or restoring combat snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("combat model has no units to capture")]
    EmptyModel,
}

/// Failures raised by the speculative executor.
///
/// `Precondition` means nothing was mutated and nothing was registered;
/// the caller can simply wait for the authoritative result instead.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("precondition failed: {reason}")]
    Precondition { reason: String },

    #[error("actor not found: {id}")]
    ActorNotFound { id: String },

    #[error("unknown skill: {id}")]
    UnknownSkill { id: String },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl ExecutionError {
    /// True when the failure left the combat model untouched.
    pub fn left_model_untouched(&self) -> bool {
        match self {
            ExecutionError::Precondition { .. } => true,
            ExecutionError::ActorNotFound { .. } => true,
            ExecutionError::UnknownSkill { .. } => true,
            ExecutionError::Snapshot(_) => true,
        }
    }
}

/// Failures while loading the skill catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate skill id: {0}")]
    DuplicateSkill(String),
}
