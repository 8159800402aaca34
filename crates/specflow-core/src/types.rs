use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Specify,
    Plan,
    Tasks,
    Implement,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[Phase::Specify, Phase::Plan, Phase::Tasks, Phase::Implement]
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self as usize + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Specify => "specify",
            Phase::Plan => "plan",
            Phase::Tasks => "tasks",
            Phase::Implement => "implement",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::SpecflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "specify" => Ok(Phase::Specify),
            "plan" => Ok(Phase::Plan),
            "tasks" => Ok(Phase::Tasks),
            "implement" => Ok(Phase::Implement),
            _ => Err(crate::error::SpecflowError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Spec,
    Plan,
    Tasks,
    Research,
    DataModel,
    Quickstart,
    ContractsDir,
    Constitution,
}

impl ArtifactKind {
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::Spec,
            ArtifactKind::Plan,
            ArtifactKind::Tasks,
            ArtifactKind::Research,
            ArtifactKind::DataModel,
            ArtifactKind::Quickstart,
            ArtifactKind::ContractsDir,
            ArtifactKind::Constitution,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Spec => "spec",
            ArtifactKind::Plan => "plan",
            ArtifactKind::Tasks => "tasks",
            ArtifactKind::Research => "research",
            ArtifactKind::DataModel => "data-model",
            ArtifactKind::Quickstart => "quickstart",
            ArtifactKind::ContractsDir => "contracts-dir",
            ArtifactKind::Constitution => "constitution",
        }
    }

    /// File or directory name inside the feature directory. The constitution
    /// lives at the repository root and is named by config instead.
    pub fn filename(self) -> &'static str {
        match self {
            ArtifactKind::Spec => "spec.md",
            ArtifactKind::Plan => "plan.md",
            ArtifactKind::Tasks => "tasks.md",
            ArtifactKind::Research => "research.md",
            ArtifactKind::DataModel => "data-model.md",
            ArtifactKind::Quickstart => "quickstart.md",
            ArtifactKind::ContractsDir => "contracts",
            ArtifactKind::Constitution => "constitution.md",
        }
    }

    pub fn is_dir(self) -> bool {
        matches!(self, ArtifactKind::ContractsDir)
    }

    /// Template shipped for this kind, if the tool scaffolds it.
    pub fn template_name(self) -> Option<&'static str> {
        match self {
            ArtifactKind::Spec => Some("spec-template.md"),
            ArtifactKind::Plan => Some("plan-template.md"),
            ArtifactKind::Tasks => Some("tasks-template.md"),
            _ => None,
        }
    }

    /// The phase whose work produces this artifact.
    pub fn produced_in(self) -> Phase {
        match self {
            ArtifactKind::Spec | ArtifactKind::Constitution => Phase::Specify,
            ArtifactKind::Plan
            | ArtifactKind::Research
            | ArtifactKind::DataModel
            | ArtifactKind::Quickstart
            | ArtifactKind::ContractsDir => Phase::Plan,
            ArtifactKind::Tasks => Phase::Tasks,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = crate::error::SpecflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spec" => Ok(ArtifactKind::Spec),
            "plan" => Ok(ArtifactKind::Plan),
            "tasks" => Ok(ArtifactKind::Tasks),
            "research" => Ok(ArtifactKind::Research),
            "data-model" | "data_model" => Ok(ArtifactKind::DataModel),
            "quickstart" => Ok(ArtifactKind::Quickstart),
            "contracts-dir" | "contracts" => Ok(ArtifactKind::ContractsDir),
            "constitution" => Ok(ArtifactKind::Constitution),
            _ => Err(crate::error::SpecflowError::InvalidArtifactKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_parse_is_case_insensitive() {
        assert_eq!(Phase::from_str("Implement").unwrap(), Phase::Implement);
        assert_eq!(Phase::from_str(" tasks ").unwrap(), Phase::Tasks);
        assert!(Phase::from_str("deploy").is_err());
    }

    #[test]
    fn phase_order() {
        assert!(Phase::Specify < Phase::Plan);
        assert_eq!(Phase::Tasks.next(), Some(Phase::Implement));
        assert_eq!(Phase::Implement.next(), None);
    }

    #[test]
    fn artifact_kind_serde_names_match_as_str() {
        for &kind in ArtifactKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(ArtifactKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }
}
