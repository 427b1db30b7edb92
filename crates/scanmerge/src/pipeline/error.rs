use std::path::PathBuf;

use thiserror::Error;

use crate::assembler::Zone;
use crate::db::DatabaseError;
use crate::error::{AssembleError, RecordError, StorageError};

use super::context::CaseState;

/// Why a single case was abandoned.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("Detail lookup failed: {0}")]
    DetailLookup(#[source] DatabaseError),

    #[error("No detail row for case '{case_id}'")]
    DetailMissing { case_id: String },

    #[error("Removing earlier documents failed: {0}")]
    Cleanup(#[source] RecordError),

    #[error("Unsupported process type {0}")]
    UnsupportedProcessType(i64),

    #[error("Assembling {zone} zone failed: {source}")]
    Assemble {
        zone: Zone,
        #[source]
        source: AssembleError,
    },

    #[error("Recording {zone} zone failed: {source}")]
    Record {
        zone: Zone,
        #[source]
        source: RecordError,
    },

    #[error("Disposing of source images at '{path}' failed: {source}")]
    Dispose {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("Marking case succeeded failed: {0}")]
    MarkSucceeded(#[source] DatabaseError),

    /// The source images are already gone but the outcome was not stored.
    #[error("Source images disposed but outcome update failed: {0}")]
    OutcomeAfterDisposal(#[source] DatabaseError),
}

impl CaseError {
    /// The state the case was in when it failed.
    pub fn state(&self) -> CaseState {
        match self {
            CaseError::DetailLookup(_) | CaseError::DetailMissing { .. } => CaseState::Pending,
            CaseError::Cleanup(_) => CaseState::Cleaning,
            CaseError::UnsupportedProcessType(_) | CaseError::Assemble { .. } => {
                CaseState::Assembling
            }
            CaseError::Record { .. } => CaseState::Recording,
            CaseError::Dispose { .. }
            | CaseError::MarkSucceeded(_)
            | CaseError::OutcomeAfterDisposal(_) => CaseState::Disposing,
        }
    }

    /// Store and source images disagree; needs an operator.
    pub fn is_severe(&self) -> bool {
        matches!(self, CaseError::OutcomeAfterDisposal(_))
    }

    /// Failure reason stored on the work list.
    pub fn reason(&self) -> String {
        format!("{}: {}", self.state(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseWarning {
    /// The outer zone of a dual-zone case had no images.
    EmptyOuterZone { path: PathBuf },
}
