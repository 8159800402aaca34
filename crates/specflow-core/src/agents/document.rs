//! Agent context files as three regions: a generated prefix owned by the
//! synchronizer, a manual region between fixed markers owned by humans, and
//! whatever follows the end marker.
//!
//! The manual region's bytes are copied forward unchanged on every render.
//! A file with no (or unmatched) markers is treated as entirely manual.

use crate::agents::profile::SectionMarkers;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    ActiveTechnologies,
    ProjectStructure,
    Commands,
    CodeStyle,
    RecentChanges,
}

impl SectionKind {
    pub fn all() -> &'static [SectionKind] {
        &[
            SectionKind::ActiveTechnologies,
            SectionKind::ProjectStructure,
            SectionKind::Commands,
            SectionKind::CodeStyle,
            SectionKind::RecentChanges,
        ]
    }

    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::ActiveTechnologies => "Active Technologies",
            SectionKind::ProjectStructure => "Project Structure",
            SectionKind::Commands => "Commands",
            SectionKind::CodeStyle => "Code Style",
            SectionKind::RecentChanges => "Recent Changes",
        }
    }

    fn from_heading(heading: &str) -> Option<Self> {
        SectionKind::all()
            .iter()
            .copied()
            .find(|k| k.heading() == heading.trim())
    }
}

/// Content of every synchronizer-owned section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedSections {
    pub technologies: Vec<String>,
    pub structure: String,
    pub commands: String,
    pub code_style: String,
    pub recent_changes: Vec<String>,
}

// ---------------------------------------------------------------------------
// ContextDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    /// Everything before the start marker.
    pub generated: String,
    /// Bytes strictly between the markers, or the whole file when unmarked.
    pub manual: String,
    /// Everything after the end marker.
    pub trailing: String,
    pub markers_found: bool,
}

impl ContextDocument {
    pub fn parse(text: &str, markers: &SectionMarkers) -> Self {
        if let Some(start) = text.find(&markers.start) {
            let manual_from = start + markers.start.len();
            if let Some(offset) = text[manual_from..].find(&markers.end) {
                let manual_to = manual_from + offset;
                return Self {
                    generated: text[..start].to_string(),
                    manual: text[manual_from..manual_to].to_string(),
                    trailing: text[manual_to + markers.end.len()..].to_string(),
                    markers_found: true,
                };
            }
        }
        Self {
            generated: String::new(),
            manual: text.to_string(),
            trailing: String::new(),
            markers_found: false,
        }
    }

    /// True when something other than whitespace follows the end marker.
    pub fn has_trailing_content(&self) -> bool {
        !self.trailing.trim().is_empty()
    }

    pub fn last_updated(&self) -> Option<String> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"\*\*Last updated\*\*: (\d{4}-\d{2}-\d{2})").unwrap()
        });
        re.captures(&self.generated)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Read back the generated sections this document currently carries.
    pub fn prior_sections(&self) -> GeneratedSections {
        let mut out = GeneratedSections::default();
        let mut current: Option<SectionKind> = None;
        let mut body: Vec<&str> = Vec::new();
        let mut in_fence = false;

        for line in self.generated.lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
            }
            if !in_fence {
                let next = if let Some(heading) = line.strip_prefix("## ") {
                    Some(SectionKind::from_heading(heading))
                } else if line.starts_with("# ") {
                    Some(None)
                } else {
                    None
                };
                if let Some(next) = next {
                    if let Some(kind) = current {
                        apply_section(&mut out, kind, &body);
                    }
                    body.clear();
                    current = next;
                    continue;
                }
            }
            if current.is_some() {
                body.push(line);
            }
        }
        if let Some(kind) = current {
            apply_section(&mut out, kind, &body);
        }
        out
    }

    /// Render the manual region with its markers and whatever followed them.
    pub fn render_manual(&self, markers: &SectionMarkers) -> String {
        let mut out = String::new();
        out.push_str(&markers.start);
        if self.markers_found {
            out.push_str(&self.manual);
        } else {
            out.push('\n');
            if !self.manual.is_empty() {
                out.push_str(&self.manual);
                if !self.manual.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push_str(&markers.end);
        if self.trailing.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&self.trailing);
        }
        out
    }
}

fn apply_section(out: &mut GeneratedSections, kind: SectionKind, body: &[&str]) {
    match kind {
        SectionKind::ActiveTechnologies => out.technologies = bullets(body),
        SectionKind::RecentChanges => out.recent_changes = bullets(body),
        SectionKind::ProjectStructure => out.structure = unfenced(body),
        SectionKind::Commands => out.commands = unfenced(body),
        SectionKind::CodeStyle => out.code_style = body.join("\n").trim().to_string(),
    }
}

fn bullets(body: &[&str]) -> Vec<String> {
    body.iter()
        .filter_map(|l| l.trim().strip_prefix("- "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn unfenced(body: &[&str]) -> String {
    body.iter()
        .filter(|l| !l.trim_start().starts_with("```"))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a full context document: generated sections, then the manual
/// region carried over from `doc`.
pub fn render_full(
    project: &str,
    date: &str,
    sections: &GeneratedSections,
    doc: &ContextDocument,
    markers: &SectionMarkers,
) -> String {
    let mut out = format!(
        "# {project} Development Guidelines\n\n\
         Auto-generated from all feature plans. **Last updated**: {date}\n\n"
    );

    push_heading(&mut out, SectionKind::ActiveTechnologies);
    for tech in &sections.technologies {
        out.push_str(&format!("- {tech}\n"));
    }
    out.push('\n');

    push_heading(&mut out, SectionKind::ProjectStructure);
    push_fenced(&mut out, "text", &sections.structure);

    push_heading(&mut out, SectionKind::Commands);
    push_fenced(&mut out, "bash", &sections.commands);

    push_heading(&mut out, SectionKind::CodeStyle);
    if !sections.code_style.is_empty() {
        out.push_str(&sections.code_style);
        out.push('\n');
    }
    out.push('\n');

    push_heading(&mut out, SectionKind::RecentChanges);
    for change in &sections.recent_changes {
        out.push_str(&format!("- {change}\n"));
    }
    out.push('\n');

    out.push_str(&doc.render_manual(markers));
    out
}

/// Render a pointer document naming the canonical full document.
/// `link` is relative to the stub's own directory.
pub fn render_stub(
    agent_name: &str,
    canonical_display: &str,
    link: &str,
    mdc_frontmatter: bool,
    doc: &ContextDocument,
    markers: &SectionMarkers,
) -> String {
    let mut out = String::new();
    if mdc_frontmatter {
        out.push_str(
            "---\ndescription: Project context maintained by specflow\nglobs:\nalwaysApply: true\n---\n\n",
        );
    }
    out.push_str(&format!(
        "# {agent_name} Project Context\n\n\
         The project's development guidelines live in [{canonical_display}]({link}).\n\
         Read that file before making changes; it is regenerated from every feature plan.\n\n"
    ));
    out.push_str(&doc.render_manual(markers));
    out
}

fn push_heading(out: &mut String, kind: SectionKind) {
    out.push_str("## ");
    out.push_str(kind.heading());
    out.push('\n');
}

fn push_fenced(out: &mut String, lang: &str, body: &str) {
    out.push_str("```");
    out.push_str(lang);
    out.push('\n');
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out.push_str("```\n\n");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::profile::{MANUAL_END, MANUAL_START};

    fn markers() -> SectionMarkers {
        SectionMarkers::default()
    }

    fn sample_sections() -> GeneratedSections {
        GeneratedSections {
            technologies: vec!["Rust 1.80 + clap (001-cli)".to_string()],
            structure: "src/\ntests/".to_string(),
            commands: "cargo test && cargo clippy".to_string(),
            code_style: "Rust: Follow standard conventions".to_string(),
            recent_changes: vec!["001-cli: Added Rust 1.80 + clap".to_string()],
        }
    }

    #[test]
    fn parse_splits_three_regions() {
        let text = format!("# Head\n{MANUAL_START}\nmine\n{MANUAL_END}\ntail\n");
        let doc = ContextDocument::parse(&text, &markers());
        assert!(doc.markers_found);
        assert_eq!(doc.generated, "# Head\n");
        assert_eq!(doc.manual, "\nmine\n");
        assert_eq!(doc.trailing, "\ntail\n");
        assert!(doc.has_trailing_content());
    }

    #[test]
    fn parse_without_markers_keeps_everything_manual() {
        let text = "# Hand written\n\nNotes.\n";
        let doc = ContextDocument::parse(text, &markers());
        assert!(!doc.markers_found);
        assert_eq!(doc.manual, text);
        let rendered = doc.render_manual(&markers());
        assert!(rendered.contains(text));
        assert!(rendered.starts_with(MANUAL_START));
    }

    #[test]
    fn end_marker_before_start_is_unmarked() {
        let text = format!("{MANUAL_END}\nstuff\n{MANUAL_START}\n");
        let doc = ContextDocument::parse(&text, &markers());
        assert!(!doc.markers_found);
        assert_eq!(doc.manual, text);
    }

    #[test]
    fn marker_prefixes_inside_manual_region_survive() {
        let manual = "\n<!-- MANUAL ADDITIONS\n<!-- MANUAL ADDITIONS END\n## Commands\n- fake\n";
        let text = format!("{MANUAL_START}{manual}{MANUAL_END}\n");
        let doc = ContextDocument::parse(&text, &markers());
        assert_eq!(doc.manual, manual);
        let out = render_full("p", "2026-01-01", &sample_sections(), &doc, &markers());
        let again = ContextDocument::parse(&out, &markers());
        assert_eq!(again.manual, manual);
    }

    #[test]
    fn prior_sections_read_back_rendered_output() {
        let doc = ContextDocument::parse(&format!("{MANUAL_START}\n{MANUAL_END}\n"), &markers());
        let out = render_full("proj", "2026-10-16", &sample_sections(), &doc, &markers());
        let reparsed = ContextDocument::parse(&out, &markers());
        assert_eq!(reparsed.prior_sections(), sample_sections());
        assert_eq!(reparsed.last_updated().as_deref(), Some("2026-10-16"));
    }

    #[test]
    fn render_is_stable_across_reparse() {
        let doc = ContextDocument::parse(&format!("{MANUAL_START}\nkeep\n{MANUAL_END}\n"), &markers());
        let first = render_full("proj", "2026-10-16", &sample_sections(), &doc, &markers());
        let doc2 = ContextDocument::parse(&first, &markers());
        let second = render_full("proj", "2026-10-16", &doc2.prior_sections(), &doc2, &markers());
        assert_eq!(first, second);
    }

    #[test]
    fn stub_links_and_keeps_manual_region() {
        let doc = ContextDocument::parse(&format!("{MANUAL_START}\nlocal rule\n{MANUAL_END}\n"), &markers());
        let out = render_stub("Cursor", "AGENTS.md", "../../AGENTS.md", true, &doc, &markers());
        assert!(out.starts_with("---\n"));
        assert!(out.contains("[AGENTS.md](../../AGENTS.md)"));
        assert!(out.contains("\nlocal rule\n"));
    }
}
