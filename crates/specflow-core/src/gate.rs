use crate::artifact::ArtifactSet;
use crate::config::Thresholds;
use crate::error::Result;
use crate::tasks::{self, TaskIssue};
use crate::types::{ArtifactKind, Phase};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// Artifacts a phase needs before it may start, and those whose absence
/// only warrants a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRequirements {
    pub required: &'static [ArtifactKind],
    pub advisory: &'static [ArtifactKind],
}

const DESIGN_DOCS: &[ArtifactKind] = &[
    ArtifactKind::Research,
    ArtifactKind::DataModel,
    ArtifactKind::Quickstart,
    ArtifactKind::ContractsDir,
];

pub fn requirements(phase: Phase) -> PhaseRequirements {
    use ArtifactKind::*;
    match phase {
        Phase::Specify => PhaseRequirements {
            required: &[],
            advisory: &[],
        },
        Phase::Plan => PhaseRequirements {
            required: &[Spec],
            advisory: &[Constitution],
        },
        Phase::Tasks => PhaseRequirements {
            required: &[Spec, Plan],
            advisory: DESIGN_DOCS,
        },
        Phase::Implement => PhaseRequirements {
            required: &[Spec, Plan, Tasks],
            advisory: &[Research, DataModel, Quickstart, ContractsDir, Constitution],
        },
    }
}

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub phase: Phase,
    pub allowed: bool,
    /// Required kinds that are absent, in the phase's declared order.
    pub missing: Vec<ArtifactKind>,
    pub warnings: Vec<String>,
    /// Advisory kinds that are present.
    pub available: Vec<ArtifactKind>,
}

/// Decide whether `phase` may start. Missing files are reported in the
/// decision, never as errors.
pub fn check(phase: Phase, artifacts: &ArtifactSet, thresholds: &Thresholds) -> GateDecision {
    let req = requirements(phase);

    let missing: Vec<ArtifactKind> = req
        .required
        .iter()
        .copied()
        .filter(|&k| !artifacts.is_present(k, thresholds))
        .collect();

    let mut warnings = Vec::new();
    let mut available = Vec::new();
    for &kind in req.advisory {
        let status = artifacts.probe(kind, thresholds);
        if status.present {
            available.push(kind);
        } else if status.exists {
            warnings.push(format!("{} looks like an unfilled stub: {}", kind, status.path.display()));
        } else {
            warnings.push(format!("{} not found: {}", kind, status.path.display()));
        }
    }

    if phase == Phase::Implement && !missing.contains(&ArtifactKind::Tasks) {
        warnings.extend(task_warnings(artifacts));
    }

    tracing::debug!(%phase, allowed = missing.is_empty(), ?missing, "gate checked");
    GateDecision {
        phase,
        allowed: missing.is_empty(),
        missing,
        warnings,
        available,
    }
}

/// Like [`check`] but takes the phase by name; an unknown name is an
/// `InvalidPhase` error.
pub fn check_named(phase: &str, artifacts: &ArtifactSet, thresholds: &Thresholds) -> Result<GateDecision> {
    Ok(check(phase.parse()?, artifacts, thresholds))
}

fn task_warnings(artifacts: &ArtifactSet) -> Vec<String> {
    let path = artifacts.path(ArtifactKind::Tasks);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => return vec![format!("tasks unreadable: {e}")],
    };
    let records: Vec<_> = tasks::parse(&text).collect();
    tasks::validate(&records)
        .into_iter()
        .filter(|issue| {
            matches!(
                issue,
                TaskIssue::MissingId { .. } | TaskIssue::DuplicateId { .. } | TaskIssue::EmptyTitle { .. }
            )
        })
        .map(|issue| format!("tasks.md {issue}"))
        .collect()
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.allowed { "allowed" } else { "blocked" };
        write!(f, "{}: {verdict}", self.phase)?;
        if !self.missing.is_empty() {
            let names: Vec<&str> = self.missing.iter().map(|k| k.as_str()).collect();
            write!(f, " (missing: {})", names.join(", "))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
