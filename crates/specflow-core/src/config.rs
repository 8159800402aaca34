use crate::agents::profile::{builtin_profiles, AgentFormat, AgentProfile};
use crate::error::Result;
use crate::paths;
use crate::types::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Minimum byte size per artifact kind below which a file counts as an
/// untouched template stub. Kinds not listed fall back to 1 byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(pub BTreeMap<ArtifactKind, u64>);

impl Thresholds {
    pub fn min_bytes(&self, kind: ArtifactKind) -> u64 {
        self.0.get(&kind).copied().unwrap_or(1)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        let mut m = BTreeMap::new();
        m.insert(ArtifactKind::Spec, 200);
        m.insert(ArtifactKind::Plan, 200);
        m.insert(ArtifactKind::Tasks, 50);
        m.insert(ArtifactKind::Research, 1);
        m.insert(ArtifactKind::DataModel, 1);
        m.insert(ArtifactKind::Quickstart, 1);
        m.insert(ArtifactKind::Constitution, 1);
        Self(m)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_specs_dir")]
    pub specs_dir: PathBuf,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default = "default_constitution")]
    pub constitution: PathBuf,
    /// Name of the environment variable that overrides branch-based
    /// feature detection.
    #[serde(default = "default_feature_env")]
    pub feature_env: String,
    #[serde(default = "default_slug_max_words")]
    pub slug_max_words: usize,
    /// Create and check out a branch for each new feature in git repositories.
    #[serde(default = "default_true")]
    pub branches: bool,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_recent_changes_cap")]
    pub recent_changes_cap: usize,
    #[serde(default = "default_canonical_agent")]
    pub canonical_agent: String,
    /// Extra agent profiles; an entry whose key matches a built-in replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentProfile>,
}

fn default_version() -> u32 {
    1
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_SPECS_DIR)
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_TEMPLATES_DIR)
}

fn default_constitution() -> PathBuf {
    PathBuf::from(paths::DEFAULT_CONSTITUTION)
}

fn default_feature_env() -> String {
    "SPECIFY_FEATURE".to_string()
}

fn default_slug_max_words() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_recent_changes_cap() -> usize {
    3
}

fn default_canonical_agent() -> String {
    "agents".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            specs_dir: default_specs_dir(),
            templates_dir: default_templates_dir(),
            constitution: default_constitution(),
            feature_env: default_feature_env(),
            slug_max_words: default_slug_max_words(),
            branches: true,
            thresholds: Thresholds::default(),
            recent_changes_cap: default_recent_changes_cap(),
            canonical_agent: default_canonical_agent(),
            agents: Vec::new(),
        }
    }
}

impl Config {
    /// Load `.specify/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        crate::io::atomic_write(&path, self.to_yaml()?.as_bytes())
    }

    /// Built-in profiles with configured entries layered on top, in
    /// built-in order followed by new keys in config order.
    pub fn agent_profiles(&self) -> Vec<AgentProfile> {
        let mut profiles = builtin_profiles();
        for extra in &self.agents {
            match profiles.iter_mut().find(|p| p.key == extra.key) {
                Some(slot) => *slot = extra.clone(),
                None => profiles.push(extra.clone()),
            }
        }
        profiles
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let profiles = self.agent_profiles();

        // 1. Canonical agent must exist and be a full document
        match profiles.iter().find(|p| p.key == self.canonical_agent) {
            None => warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("canonical_agent '{}' is not a known agent", self.canonical_agent),
            }),
            Some(p) if !matches!(p.format, AgentFormat::FullDocument) => {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "canonical_agent '{}' must be a full_document profile",
                        self.canonical_agent
                    ),
                })
            }
            Some(_) => {}
        }

        // 2. Stub targets must resolve to full documents
        for p in &profiles {
            if let AgentFormat::ReferenceStub { target: Some(target) } = &p.format {
                let ok = profiles
                    .iter()
                    .any(|t| &t.key == target && matches!(t.format, AgentFormat::FullDocument));
                if !ok {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "agent '{}' points to '{target}', which is not a full_document profile",
                            p.key
                        ),
                    });
                }
            }
        }

        // 3. Profiles sharing a path must agree on format and markers
        let mut by_path: HashMap<&Path, &AgentProfile> = HashMap::new();
        for p in &profiles {
            if let Some(prev) = by_path.insert(p.context_file.as_path(), p) {
                if prev.format != p.format || prev.markers != p.markers {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "agents '{}' and '{}' share {} but disagree on format or markers",
                            prev.key,
                            p.key,
                            p.context_file.display()
                        ),
                    });
                }
            }
        }

        // 4. Numeric knobs
        if self.recent_changes_cap == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "recent_changes_cap is 0; Recent Changes will always be empty".to_string(),
            });
        }
        if self.slug_max_words == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "slug_max_words must be at least 1".to_string(),
            });
        }
        if self.feature_env.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "feature_env is empty; environment override disabled".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::profile::SectionMarkers;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.specs_dir, PathBuf::from("specs"));
        assert_eq!(cfg.recent_changes_cap, 3);
        assert_eq!(cfg.thresholds.min_bytes(ArtifactKind::Spec), 200);
        assert_eq!(cfg.thresholds.min_bytes(ArtifactKind::ContractsDir), 1);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specify")).unwrap();
        std::fs::write(
            dir.path().join(".specify/config.yaml"),
            "specs_dir: docs/specs\nthresholds:\n  spec: 10\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.specs_dir, PathBuf::from("docs/specs"));
        assert_eq!(cfg.thresholds.min_bytes(ArtifactKind::Spec), 10);
        // Kinds absent from an explicit table fall back to 1 byte.
        assert_eq!(cfg.thresholds.min_bytes(ArtifactKind::Plan), 1);
        assert_eq!(cfg.feature_env, "SPECIFY_FEATURE");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.slug_max_words = 4;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.slug_max_words, 4);
        assert_eq!(loaded.thresholds, Thresholds::default());
    }

    #[test]
    fn configured_agent_replaces_builtin() {
        let mut cfg = Config::default();
        cfg.agents.push(AgentProfile {
            key: "claude".to_string(),
            name: "Claude".to_string(),
            context_file: PathBuf::from("docs/CLAUDE.md"),
            format: AgentFormat::FullDocument,
            markers: SectionMarkers::default(),
        });
        let profiles = cfg.agent_profiles();
        let claude: Vec<_> = profiles.iter().filter(|p| p.key == "claude").collect();
        assert_eq!(claude.len(), 1);
        assert_eq!(claude[0].context_file, PathBuf::from("docs/CLAUDE.md"));
    }

    #[test]
    fn default_config_is_valid() {
        let warnings = Config::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn validate_flags_bad_stub_target() {
        let mut cfg = Config::default();
        cfg.agents.push(AgentProfile {
            key: "custom".to_string(),
            name: "Custom".to_string(),
            context_file: PathBuf::from(".custom/rules.md"),
            format: AgentFormat::ReferenceStub {
                target: Some("nope".to_string()),
            },
            markers: SectionMarkers::default(),
        });
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("custom")));
    }

    #[test]
    fn validate_flags_zero_word_cap() {
        let cfg = Config {
            slug_max_words: 0,
            ..Config::default()
        };
        assert!(cfg.validate().iter().any(|w| w.level == WarnLevel::Error));
    }
}
