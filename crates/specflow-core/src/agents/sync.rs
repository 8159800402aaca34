use crate::agents::derive::DerivedContext;
use crate::agents::document::{self, ContextDocument, GeneratedSections};
use crate::agents::profile::{AgentFormat, AgentProfile, SectionMarkers, MANUAL_END, MANUAL_START};
use crate::context::Repo;
use crate::error::{Result, SpecflowError};
use crate::io;
use crate::paths;
use crate::template::{self, TemplateSource};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Read-merge-write attempts per file before giving up with `WriteConflict`.
pub const MAX_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

impl SyncOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOutcome::Created => "created",
            SyncOutcome::Updated => "updated",
            SyncOutcome::Unchanged => "unchanged",
        }
    }
}

/// One written (or skipped) context file. Agents sharing a file share a
/// report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub agents: Vec<String>,
    pub path: PathBuf,
    pub outcome: SyncOutcome,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Merge rules
// ---------------------------------------------------------------------------

/// Prior entries in their order, then new ones not already recorded.
pub fn merge_technologies(prior: &[String], new: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(prior.len() + new.len());
    for entry in prior.iter().chain(new) {
        if !out.contains(entry) {
            out.push(entry.clone());
        }
    }
    out
}

/// New entries first, then prior entries not repeated, capped at `cap`.
pub fn merge_recent_changes(prior: &[String], new: &[String], cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in new.iter().chain(prior) {
        if !out.contains(entry) {
            out.push(entry.clone());
        }
    }
    out.truncate(cap);
    out
}

fn merge_sections(prior: &GeneratedSections, derived: &DerivedContext, cap: usize) -> GeneratedSections {
    GeneratedSections {
        technologies: merge_technologies(&prior.technologies, &derived.technologies),
        structure: derived.structure.clone(),
        commands: derived.commands.clone(),
        code_style: derived.code_style.clone(),
        recent_changes: merge_recent_changes(&prior.recent_changes, &derived.recent_changes, cap),
    }
}

/// Relative link from the directory holding `from` to `to`, both relative
/// to the repository root.
pub fn relative_link(from: &Path, to: &Path) -> String {
    let depth = from.parent().map(|p| p.components().count()).unwrap_or(0);
    let mut link = "../".repeat(depth);
    let target: Vec<String> = to
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    link.push_str(&target.join("/"));
    link
}

/// Replace `path` with `data` only if it still holds `expected` (`None`
/// meaning absent). Returns false when someone else changed it first.
pub fn commit(path: &Path, expected: Option<&str>, data: &str) -> Result<bool> {
    let current = io::read_optional(path)?;
    if current.as_deref() != expected {
        return Ok(false);
    }
    io::atomic_write(path, data.as_bytes())?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

pub struct Synchronizer {
    root: PathBuf,
    project: String,
    today: String,
    templates_dir: PathBuf,
    recent_changes_cap: usize,
    profiles: Vec<AgentProfile>,
    canonical: AgentProfile,
}

impl Synchronizer {
    pub fn new(repo: &Repo) -> Result<Self> {
        let profiles = repo.config.agent_profiles();
        let canonical = profiles
            .iter()
            .find(|p| p.key == repo.config.canonical_agent)
            .cloned()
            .ok_or_else(|| SpecflowError::UnknownAgent(repo.config.canonical_agent.clone()))?;
        let project = repo
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Project".to_string());
        Ok(Self {
            root: repo.root.clone(),
            project,
            today: chrono::Local::now().format("%Y-%m-%d").to_string(),
            templates_dir: paths::templates_dir(&repo.root, &repo.config),
            recent_changes_cap: repo.config.recent_changes_cap,
            profiles,
            canonical,
        })
    }

    /// Override the date written into `**Last updated**`.
    pub fn with_date(mut self, today: &str) -> Self {
        self.today = today.to_string();
        self
    }

    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    /// Look up profiles by key.
    pub fn select(&self, keys: &[String]) -> Result<Vec<AgentProfile>> {
        keys.iter()
            .map(|k| {
                self.profiles
                    .iter()
                    .find(|p| &p.key == k)
                    .cloned()
                    .ok_or_else(|| SpecflowError::UnknownAgent(k.clone()))
            })
            .collect()
    }

    /// Every profile whose context file already exists; when none do, the
    /// canonical profile plus `claude`.
    pub fn default_selection(&self) -> Vec<AgentProfile> {
        let existing: Vec<AgentProfile> = self
            .profiles
            .iter()
            .filter(|p| p.path_in(&self.root).is_file())
            .cloned()
            .collect();
        if !existing.is_empty() {
            return existing;
        }
        let mut picked = vec![self.canonical.clone()];
        if let Some(claude) = self.profiles.iter().find(|p| p.key == "claude") {
            picked.push(claude.clone());
        }
        picked
    }

    fn target_of(&self, stub: &AgentProfile) -> AgentProfile {
        if let AgentFormat::ReferenceStub { target: Some(key) } = &stub.format {
            if let Some(found) = self
                .profiles
                .iter()
                .find(|p| &p.key == key && !p.is_stub())
            {
                return found.clone();
            }
            tracing::warn!(agent = %stub.key, target = %key, "stub target unknown; linking to canonical");
        }
        self.canonical.clone()
    }

    /// Regenerate the context files of `selected`. Stubs pull their target
    /// into the run; profiles sharing a path are written once.
    pub fn synchronize(&self, selected: &[AgentProfile], derived: &DerivedContext) -> Result<Vec<SyncReport>> {
        let mut wanted: Vec<AgentProfile> = selected.to_vec();
        for stub in selected.iter().filter(|p| p.is_stub()) {
            let target = self.target_of(stub);
            if !wanted.iter().any(|p| p.key == target.key) {
                wanted.push(target);
            }
        }

        // Full documents first so every stub links to an up-to-date file.
        let mut groups: Vec<(AgentProfile, Vec<String>)> = Vec::new();
        for p in wanted.iter().filter(|p| !p.is_stub()).chain(wanted.iter().filter(|p| p.is_stub())) {
            match groups.iter_mut().find(|(g, _)| g.context_file == p.context_file) {
                Some((_, keys)) => {
                    if !keys.contains(&p.key) {
                        keys.push(p.key.clone());
                    }
                }
                None => groups.push((p.clone(), vec![p.key.clone()])),
            }
        }

        let mut reports = Vec::with_capacity(groups.len());
        for (profile, keys) in groups {
            let report = if profile.is_stub() {
                let target = self.target_of(&profile);
                self.write_with_retry(&profile, keys, |doc| self.render_stub(&profile, &target, doc))?
            } else {
                self.write_with_retry(&profile, keys, |doc| self.render_full(&profile, derived, doc))?
            };
            tracing::info!(path = %report.path.display(), outcome = report.outcome.as_str(), "context file synced");
            reports.push(report);
        }
        Ok(reports)
    }

    fn skeleton(&self, markers: &SectionMarkers) -> Result<String> {
        let source = TemplateSource::lookup(&self.templates_dir, paths::AGENT_TEMPLATE);
        let text = template::render(
            &source.read()?,
            &[("PROJECT NAME", self.project.as_str()), ("DATE", self.today.as_str())],
        );
        Ok(text.replace(MANUAL_START, &markers.start).replace(MANUAL_END, &markers.end))
    }

    /// Render a full document; `None` from the date helper means the body is
    /// unchanged and the old date stands.
    fn render_full(&self, profile: &AgentProfile, derived: &DerivedContext, doc: &ContextDocument) -> Rendered {
        let sections = merge_sections(&doc.prior_sections(), derived, self.recent_changes_cap);
        let fresh = document::render_full(&self.project, &self.today, &sections, doc, &profile.markers);
        let keep_date = doc
            .last_updated()
            .map(|old| document::render_full(&self.project, &old, &sections, doc, &profile.markers));
        Rendered { fresh, keep_date }
    }

    fn render_stub(&self, profile: &AgentProfile, target: &AgentProfile, doc: &ContextDocument) -> Rendered {
        let link = relative_link(&profile.context_file, &target.context_file);
        let display = target.context_file.display().to_string();
        let mdc = profile
            .context_file
            .extension()
            .map(|e| e == "mdc")
            .unwrap_or(false);
        let fresh = document::render_stub(&profile.name, &display, &link, mdc, doc, &profile.markers);
        Rendered {
            fresh,
            keep_date: None,
        }
    }

    fn write_with_retry<F>(&self, profile: &AgentProfile, agents: Vec<String>, render: F) -> Result<SyncReport>
    where
        F: Fn(&ContextDocument) -> Rendered,
    {
        let path = profile.path_in(&self.root);
        for attempt in 1..=MAX_ATTEMPTS {
            let original = io::read_optional(&path)?;
            let base = match &original {
                Some(text) => text.clone(),
                None if profile.is_stub() => String::new(),
                None => self.skeleton(&profile.markers)?,
            };
            let doc = ContextDocument::parse(&base, &profile.markers);

            let mut warnings = Vec::new();
            if original.is_some() && !doc.markers_found {
                let w = SpecflowError::MissingManualMarkers { path: path.clone() };
                tracing::warn!("{w}");
                warnings.push(w.to_string());
            }
            if doc.has_trailing_content() {
                let w = format!(
                    "{}: text after the manual region end marker was kept in place",
                    path.display()
                );
                tracing::warn!("{w}");
                warnings.push(w);
            }

            let rendered = render(&doc);
            if let Some(existing) = &original {
                let same = rendered.keep_date.as_deref() == Some(existing.as_str())
                    || rendered.fresh == *existing;
                if same {
                    return Ok(SyncReport {
                        agents,
                        path,
                        outcome: SyncOutcome::Unchanged,
                        warnings,
                    });
                }
            }

            if commit(&path, original.as_deref(), &rendered.fresh)? {
                let outcome = if original.is_some() {
                    SyncOutcome::Updated
                } else {
                    SyncOutcome::Created
                };
                return Ok(SyncReport {
                    agents,
                    path,
                    outcome,
                    warnings,
                });
            }
            tracing::debug!(path = %path.display(), attempt, "context file changed during sync; retrying");
        }
        Err(SpecflowError::WriteConflict {
            path,
            attempts: MAX_ATTEMPTS,
        })
    }
}

struct Rendered {
    fresh: String,
    /// Same body stamped with the date already in the file.
    keep_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
