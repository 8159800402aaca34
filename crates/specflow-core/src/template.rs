use crate::error::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const SPEC_TEMPLATE: &str = "\
# Feature Specification: [FEATURE NAME]

**Feature Branch**: `[###-feature-name]`
**Created**: [DATE]
**Status**: Draft
**Input**: User description: \"[DESCRIPTION]\"

## User Scenarios & Testing *(mandatory)*

### User Story 1 - [Brief Title] (Priority: P1)

[Describe this user journey in plain language]

**Acceptance Scenarios**:

1. **Given** [initial state], **When** [action], **Then** [expected outcome]

### Edge Cases

- What happens when [boundary condition]?

## Requirements *(mandatory)*

### Functional Requirements

- **FR-001**: System MUST [specific capability]

### Key Entities *(include if feature involves data)*

- **[Entity 1]**: [What it represents, key attributes without implementation]

## Success Criteria *(mandatory)*

- **SC-001**: [Measurable metric]
";

pub const PLAN_TEMPLATE: &str = "\
# Implementation Plan: [FEATURE]

**Branch**: `[###-feature-name]` | **Date**: [DATE] | **Spec**: [link]

## Summary

[Primary requirement + technical approach from research]

## Technical Context

**Language/Version**: NEEDS CLARIFICATION
**Primary Dependencies**: NEEDS CLARIFICATION
**Storage**: N/A
**Testing**: NEEDS CLARIFICATION
**Target Platform**: NEEDS CLARIFICATION
**Project Type**: single
**Performance Goals**: NEEDS CLARIFICATION
**Constraints**: NEEDS CLARIFICATION

## Constitution Check

[Gates determined from the constitution file]

## Project Structure

```text
specs/[###-feature]/
├── plan.md
├── research.md
├── data-model.md
├── quickstart.md
├── contracts/
└── tasks.md
```
";

pub const TASKS_TEMPLATE: &str = "\
# Tasks: [FEATURE NAME]

**Input**: Design documents from `specs/[###-feature-name]/`
**Prerequisites**: plan.md (required), spec.md (required)

## Format: `- [ ] [ID] [P?] [Story] Description`

- **[P]**: Can run in parallel (different files, no dependencies)
- **[AUTO]**: Safe for unattended execution
- **[REVIEW]**: Needs human review before completion
- **[SANDBOX]**: Must run in an isolated environment
- **[Story]**: Which user story this task belongs to (e.g., US1)

## Phase 1: Setup

- [ ] [T001] Create project structure per implementation plan

## Phase 2: User Story 1

- [ ] [T002] [P] [US1] Write contract test
- [ ] [T003] [US1] Implement the story (depends on T002)
";

pub const AGENT_FILE_TEMPLATE: &str = "\
# [PROJECT NAME] Development Guidelines

Auto-generated from all feature plans. **Last updated**: [DATE]

## Active Technologies

## Project Structure

## Commands

## Code Style

## Recent Changes

<!-- MANUAL ADDITIONS START -->
<!-- MANUAL ADDITIONS END -->
";

/// Bundled copy of a named template.
pub fn bundled(name: &str) -> Option<&'static str> {
    match name {
        "spec-template.md" => Some(SPEC_TEMPLATE),
        "plan-template.md" => Some(PLAN_TEMPLATE),
        "tasks-template.md" => Some(TASKS_TEMPLATE),
        crate::paths::AGENT_TEMPLATE => Some(AGENT_FILE_TEMPLATE),
        _ => None,
    }
}

pub fn bundled_names() -> &'static [&'static str] {
    &[
        "spec-template.md",
        "plan-template.md",
        "tasks-template.md",
        crate::paths::AGENT_TEMPLATE,
    ]
}

// ---------------------------------------------------------------------------
// TemplateSource
// ---------------------------------------------------------------------------

/// Where template text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Text(String),
    Bundled(&'static str),
    /// Create an empty file.
    Empty,
}

impl TemplateSource {
    /// A file in `templates_dir` if one exists, else the bundled copy.
    pub fn lookup(templates_dir: &Path, name: &str) -> Self {
        let on_disk = templates_dir.join(name);
        if on_disk.is_file() {
            return TemplateSource::File(on_disk);
        }
        match bundled(name) {
            Some(text) => TemplateSource::Bundled(text),
            None => TemplateSource::Empty,
        }
    }

    pub fn read(&self) -> Result<String> {
        Ok(match self {
            TemplateSource::File(path) => std::fs::read_to_string(path)?,
            TemplateSource::Text(text) => text.clone(),
            TemplateSource::Bundled(text) => (*text).to_string(),
            TemplateSource::Empty => String::new(),
        })
    }
}

/// Replace `[KEY]` placeholders. Unknown placeholders are left alone.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("[{key}]"), value);
    }
    out
}

/// Placeholders filled in when an artifact is scaffolded. Every other
/// `[...]` token is left for the author.
pub const SCAFFOLD_KEYS: &[&str] = &[
    "FEATURE NAME",
    "FEATURE",
    "###-feature-name",
    "###-feature",
    "DATE",
    "DESCRIPTION",
];

/// True when `text` is `template` with only the scaffold placeholders
/// substituted, i.e. nobody has edited the copy yet. Line endings and
/// trailing whitespace are ignored.
pub fn is_unfilled(template: &str, text: &str) -> bool {
    static KEYS: OnceLock<Regex> = OnceLock::new();
    let keys = KEYS.get_or_init(|| {
        let alternatives: Vec<String> = SCAFFOLD_KEYS.iter().map(|k| regex::escape(k)).collect();
        Regex::new(&format!(r"\[(?:{})\]", alternatives.join("|"))).unwrap()
    });

    let template = template.replace("\r\n", "\n");
    if template.trim().is_empty() {
        return false;
    }
    let mut pattern = String::from(r"\A");
    let mut last = 0;
    for m in keys.find_iter(&template) {
        pattern.push_str(&regex::escape(&template[last..m.start()]));
        pattern.push_str("(?s:.*?)");
        last = m.end();
    }
    pattern.push_str(&regex::escape(template[last..].trim_end()));
    pattern.push_str(r"\s*\z");

    let text = text.replace("\r\n", "\n");
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(&text),
        Err(e) => {
            tracing::debug!(error = %e, "template too large to compare; treating copy as edited");
            false
        }
    }
}
