use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Values the synchronizer writes into every full context document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedContext {
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub structure: String,
    #[serde(default)]
    pub commands: String,
    #[serde(default)]
    pub code_style: String,
    /// Newest first.
    #[serde(default)]
    pub recent_changes: Vec<String>,
}

/// Technical-context fields read from a plan's `**Field**: value` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanTech {
    pub language: Option<String>,
    pub dependencies: Option<String>,
    pub storage: Option<String>,
    pub testing: Option<String>,
    pub project_type: Option<String>,
}

const PLACEHOLDERS: &[&str] = &["NEEDS CLARIFICATION", "N/A"];

fn field(plan: &str, label: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*]?\s*\*\*([^*]+)\*\*:\s*(.+?)\s*$").unwrap());
    re.captures_iter(plan)
        .find(|c| c.get(1).map(|m| m.as_str().trim()) == Some(label))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty() && !PLACEHOLDERS.iter().any(|p| v.starts_with(p)))
}

impl PlanTech {
    pub fn from_plan(plan: &str) -> Self {
        Self {
            language: field(plan, "Language/Version"),
            dependencies: field(plan, "Primary Dependencies"),
            storage: field(plan, "Storage"),
            testing: field(plan, "Testing"),
            project_type: field(plan, "Project Type"),
        }
    }

    /// `"Rust 1.80 + clap"`, `"Rust 1.80"`, or `None` when neither is known.
    pub fn stack(&self) -> Option<String> {
        match (&self.language, &self.dependencies) {
            (Some(l), Some(d)) => Some(format!("{l} + {d}")),
            (Some(l), None) => Some(l.clone()),
            (None, Some(d)) => Some(d.clone()),
            (None, None) => None,
        }
    }
}

impl DerivedContext {
    /// Derive the context for `feature` (its branch/directory name) from the
    /// text of its plan.
    pub fn from_plan(plan: &str, feature: &str) -> Self {
        let tech = PlanTech::from_plan(plan);
        let mut technologies = Vec::new();
        if let Some(stack) = tech.stack() {
            technologies.push(format!("{stack} ({feature})"));
        }
        if let Some(storage) = &tech.storage {
            technologies.push(format!("{storage} ({feature})"));
        }

        let is_web = tech
            .project_type
            .as_deref()
            .map(|t| t.to_lowercase().contains("web"))
            .unwrap_or(false);
        let structure = if is_web {
            "backend/\nfrontend/\ntests/".to_string()
        } else {
            "src/\ntests/".to_string()
        };

        let language = tech.language.clone().unwrap_or_default();
        let commands = commands_for(&language);
        let code_style = if language.is_empty() {
            "Follow standard conventions".to_string()
        } else {
            format!("{language}: Follow standard conventions")
        };

        let recent_changes = match tech.stack() {
            Some(stack) => vec![format!("{feature}: Added {stack}")],
            None => vec![format!("{feature}: Updated plan")],
        };

        Self {
            technologies,
            structure,
            commands,
            code_style,
            recent_changes,
        }
    }
}

fn commands_for(language: &str) -> String {
    let lower = language.to_lowercase();
    if lower.contains("python") {
        "cd src && pytest && ruff check .".to_string()
    } else if lower.contains("rust") {
        "cargo test && cargo clippy".to_string()
    } else if lower.contains("javascript") || lower.contains("typescript") {
        "npm test && npm run lint".to_string()
    } else if lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w == "go" || w == "golang")
    {
        "go test ./... && go vet ./...".to_string()
    } else if language.is_empty() {
        "# Add commands for your language".to_string()
    } else {
        format!("# Add commands for {language}")
    }
}
