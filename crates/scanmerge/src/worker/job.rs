use crate::pipeline::CaseContext;

/// Terminal result of one case, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub case_id: String,
    pub success: bool,
    pub documents: usize,
    pub warnings: usize,
    pub error: Option<String>,
    /// Source images were disposed of but the success update was lost.
    pub severe: bool,
}

impl CaseReport {
    pub fn success(ctx: &CaseContext) -> Self {
        Self {
            case_id: ctx.case.case_id.clone(),
            success: true,
            documents: ctx.documents.len(),
            warnings: ctx.warnings.len(),
            error: None,
            severe: false,
        }
    }

    pub fn failure(case_id: &str, error: String, severe: bool) -> Self {
        Self {
            case_id: case_id.to_string(),
            success: false,
            documents: 0,
            warnings: 0,
            error: Some(error),
            severe,
        }
    }
}

/// Aggregate counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub severe: usize,
}

impl RunSummary {
    pub fn from_reports(reports: &[CaseReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if report.severe {
                summary.severe += 1;
            }
        }
        summary
    }

    pub fn has_severe(&self) -> bool {
        self.severe > 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} case(s): {} succeeded, {} failed, {} severe",
            self.total, self.succeeded, self.failed, self.severe
        )
    }
}
