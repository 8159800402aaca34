use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANUAL_START: &str = "<!-- MANUAL ADDITIONS START -->";
pub const MANUAL_END: &str = "<!-- MANUAL ADDITIONS END -->";

// ---------------------------------------------------------------------------
// SectionMarkers
// ---------------------------------------------------------------------------

/// Fixed lines delimiting the human-owned region of a context file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMarkers {
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_end")]
    pub end: String,
}

fn default_start() -> String {
    MANUAL_START.to_string()
}

fn default_end() -> String {
    MANUAL_END.to_string()
}

impl Default for SectionMarkers {
    fn default() -> Self {
        Self {
            start: default_start(),
            end: default_end(),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentFormat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentFormat {
    /// Carries every generated section.
    FullDocument,
    /// Short pointer to a full document. `target` names the agent whose file
    /// it links to; `None` means the configured canonical agent.
    ReferenceStub {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl AgentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentFormat::FullDocument => "full_document",
            AgentFormat::ReferenceStub { .. } => "reference_stub",
        }
    }
}

// ---------------------------------------------------------------------------
// AgentProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub key: String,
    pub name: String,
    /// Path relative to the repository root.
    pub context_file: PathBuf,
    pub format: AgentFormat,
    #[serde(default)]
    pub markers: SectionMarkers,
}

impl AgentProfile {
    pub fn full(key: &str, name: &str, path: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            context_file: PathBuf::from(path),
            format: AgentFormat::FullDocument,
            markers: SectionMarkers::default(),
        }
    }

    pub fn stub(key: &str, name: &str, path: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            context_file: PathBuf::from(path),
            format: AgentFormat::ReferenceStub { target: None },
            markers: SectionMarkers::default(),
        }
    }

    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.context_file)
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.format, AgentFormat::ReferenceStub { .. })
    }
}

/// Every agent ecosystem the synchronizer knows about out of the box.
/// Agents reading the shared `AGENTS.md` appear once per key but are written
/// once per path.
pub fn builtin_profiles() -> Vec<AgentProfile> {
    vec![
        AgentProfile::full("agents", "AGENTS.md", "AGENTS.md"),
        AgentProfile::full("claude", "Claude Code", "CLAUDE.md"),
        AgentProfile::full("gemini", "Gemini CLI", "GEMINI.md"),
        AgentProfile::full(
            "copilot",
            "GitHub Copilot",
            ".github/copilot-instructions.md",
        ),
        AgentProfile::stub("cursor-agent", "Cursor", ".cursor/rules/specify-rules.mdc"),
        AgentProfile::full("qwen", "Qwen Code", "QWEN.md"),
        AgentProfile::full("opencode", "opencode", "AGENTS.md"),
        AgentProfile::full("codex", "Codex CLI", "AGENTS.md"),
        AgentProfile::full("amp", "Amp", "AGENTS.md"),
        AgentProfile::full("q", "Amazon Q Developer CLI", "AGENTS.md"),
        AgentProfile::stub("windsurf", "Windsurf", ".windsurf/rules/specify-rules.md"),
        AgentProfile::stub("kilocode", "Kilo Code", ".kilocode/rules/specify-rules.md"),
        AgentProfile::stub("auggie", "Auggie CLI", ".augment/rules/specify-rules.md"),
        AgentProfile::stub("roo", "Roo Code", ".roo/rules/specify-rules.md"),
        AgentProfile::full("codebuddy", "CodeBuddy", "CODEBUDDY.md"),
        AgentProfile::full("qoder", "Qoder CLI", "QODER.md"),
        AgentProfile::full("shai", "SHAI", "SHAI.md"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_keys_are_unique() {
        let profiles = builtin_profiles();
        let keys: HashSet<_> = profiles.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys.len(), profiles.len());
    }

    #[test]
    fn stubs_live_under_tool_directories() {
        for p in builtin_profiles().iter().filter(|p| p.is_stub()) {
            assert!(p.context_file.components().count() > 1, "{}", p.key);
        }
    }

    #[test]
    fn profile_yaml_uses_defaults() {
        let yaml = "key: zed\nname: Zed\ncontext_file: .rules\nformat:\n  type: reference_stub\n";
        let p: AgentProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.format, AgentFormat::ReferenceStub { target: None });
        assert_eq!(p.markers, SectionMarkers::default());
    }
}
