use thiserror::Error;

/// Failures the loader must tell apart.
///
/// `Unavailable` and `Write` abort the current run, which is safe to retry in
/// full. `KeyConflict` means two distinct things were given the same natural
/// key upstream and is never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    #[error("write to {label} failed: {message}")]
    Write { label: String, message: String },

    #[error("conflicting records for {label}.{key} = {value:?}: {detail}")]
    KeyConflict { label: String, key: String, value: String, detail: String },

    #[error("record for {label} has no {key} value")]
    MissingKey { label: String, key: String },

    #[error("{0:?} is not a valid label, relationship type or property name")]
    InvalidIdentifier(String),
}

impl StoreError {
    /// Process exit code for a run that ends with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            StoreError::KeyConflict { .. } => 3,
            StoreError::Unavailable(_)
            | StoreError::Write { .. }
            | StoreError::MissingKey { .. }
            | StoreError::InvalidIdentifier(_) => 2,
        }
    }
}
