use std::fmt;
use std::path::PathBuf;

use crate::assembler::CompositeDocument;
use crate::db::case_repo::{CaseDetail, CaseInput};
use crate::recorder::ArchivalRecord;

use super::error::CaseWarning;
use super::runner::AssemblyPlan;

/// Where a case is in its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Pending,
    Cleaning,
    Assembling,
    Recording,
    Disposing,
    Succeeded,
    Failed,
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaseState::Pending => "pending",
            CaseState::Cleaning => "cleaning",
            CaseState::Assembling => "assembling",
            CaseState::Recording => "recording",
            CaseState::Disposing => "disposing",
            CaseState::Succeeded => "succeeded",
            CaseState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct CaseContext {
    // Input
    pub case: CaseInput,
    pub state: CaseState,

    // Set once the detail row is fetched
    pub detail: Option<CaseDetail>,
    pub image_dir: Option<PathBuf>,

    // Cleanup result
    pub removed_records: usize,

    pub plan: Option<AssemblyPlan>,

    // One entry per assembled zone, in assembly order
    pub documents: Vec<CompositeDocument>,
    pub records: Vec<ArchivalRecord>,

    // Set when source images were moved to the backup root
    pub disposed_to: Option<PathBuf>,

    // Non-fatal warnings
    pub warnings: Vec<CaseWarning>,
}

impl CaseContext {
    pub fn new(case: CaseInput) -> Self {
        Self {
            case,
            state: CaseState::Pending,
            detail: None,
            image_dir: None,
            removed_records: 0,
            plan: None,
            documents: Vec::new(),
            records: Vec::new(),
            disposed_to: None,
            warnings: Vec::new(),
        }
    }
}
