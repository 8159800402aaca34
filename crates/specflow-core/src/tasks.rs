//! Checklist parser for `tasks.md`.
//!
//! A task line is `- [ ] [T###] [TAG]... [US#] Title`; only the checkbox is
//! mandatory. Parsing never fails: a bad line becomes a record without an ID
//! or with an empty title, and [`validate`] reports it.

use crate::error::{Result, SpecflowError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// TaskTag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTag {
    Parallel,
    Auto,
    Review,
    Sandbox,
}

impl TaskTag {
    pub fn all() -> &'static [TaskTag] {
        &[TaskTag::Parallel, TaskTag::Auto, TaskTag::Review, TaskTag::Sandbox]
    }

    /// The bracketed token as written in the checklist, without brackets.
    pub fn token(self) -> &'static str {
        match self {
            TaskTag::Parallel => "P",
            TaskTag::Auto => "AUTO",
            TaskTag::Review => "REVIEW",
            TaskTag::Sandbox => "SANDBOX",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        TaskTag::all().iter().copied().find(|t| t.token() == token)
    }
}

impl fmt::Display for TaskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Option<String>,
    pub tags: BTreeSet<TaskTag>,
    pub story_ref: Option<String>,
    pub title: String,
    pub done: bool,
    /// 1-based line in the source text.
    pub line: usize,
    /// Name from the enclosing `## Phase N: Name` heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// IDs named in a `(depends on T001, T002)` clause of the title.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TaskRecord {
    pub fn has_tag(&self, tag: TaskTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Canonical checklist line: `- [x] [T002] [P] [US1] Title`.
    pub fn to_line(&self) -> String {
        let mut parts: Vec<String> = vec![if self.done { "- [x]" } else { "- [ ]" }.to_string()];
        if let Some(id) = &self.id {
            parts.push(format!("[{id}]"));
        }
        for tag in &self.tags {
            parts.push(format!("[{}]", tag.token()));
        }
        if let Some(story) = &self.story_ref {
            parts.push(format!("[{story}]"));
        }
        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Line grammar
// ---------------------------------------------------------------------------

struct Grammar {
    checkbox: Regex,
    bracket_id: Regex,
    bare_id: Regex,
    tag: Regex,
    story: Regex,
    phase: Regex,
    depends: Regex,
    task_id: Regex,
}

fn grammar() -> &'static Grammar {
    static G: OnceLock<Grammar> = OnceLock::new();
    G.get_or_init(|| Grammar {
        checkbox: Regex::new(r"^\s*[-*]\s+\[([ xX])\](?:\s+(.*))?$").unwrap(),
        bracket_id: Regex::new(r"^\[(T\d+)\]\s*").unwrap(),
        bare_id: Regex::new(r"^(T\d+)(?:\s+|$)").unwrap(),
        tag: Regex::new(r"^\[(P|AUTO|REVIEW|SANDBOX)\]\s*").unwrap(),
        story: Regex::new(r"^\[(US\d+)\]\s*").unwrap(),
        phase: Regex::new(r"^##\s+Phase\s+\d+[A-Za-z]?\s*:\s*(.+?)\s*$").unwrap(),
        depends: Regex::new(r"\(depends on ([^)]*)\)").unwrap(),
        task_id: Regex::new(r"\bT\d+\b").unwrap(),
    })
}

/// Parse the part of a checklist line after the checkbox.
fn parse_body(body: &str) -> (Option<String>, BTreeSet<TaskTag>, Option<String>, String) {
    let g = grammar();
    let mut rest = body.trim_start();

    let mut id = None;
    if let Some(c) = g.bracket_id.captures(rest) {
        id = Some(c[1].to_string());
        rest = &rest[c[0].len()..];
    } else if let Some(c) = g.bare_id.captures(rest) {
        id = Some(c[1].to_string());
        rest = &rest[c[0].len()..];
    }

    let mut tags = BTreeSet::new();
    while let Some(c) = g.tag.captures(rest) {
        if let Some(tag) = TaskTag::from_token(&c[1]) {
            tags.insert(tag);
        }
        rest = &rest[c[0].len()..];
    }

    let mut story_ref = None;
    if let Some(c) = g.story.captures(rest) {
        story_ref = Some(c[1].to_string());
        rest = &rest[c[0].len()..];
    }

    (id, tags, story_ref, rest.trim_end().to_string())
}

fn dependencies(title: &str) -> Vec<String> {
    let g = grammar();
    let mut deps = Vec::new();
    for clause in g.depends.captures_iter(title) {
        for m in g.task_id.find_iter(&clause[1]) {
            let dep = m.as_str().to_string();
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
    }
    deps
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Lazily parse `text` into task records in file order. Calling `parse`
/// again on the same text yields the same sequence.
pub fn parse(text: &str) -> TaskIter<'_> {
    TaskIter {
        lines: text.lines().enumerate(),
        phase: None,
        in_fence: false,
    }
}

pub struct TaskIter<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    phase: Option<String>,
    in_fence: bool,
}

impl Iterator for TaskIter<'_> {
    type Item = TaskRecord;

    fn next(&mut self) -> Option<TaskRecord> {
        let g = grammar();
        for (idx, line) in self.lines.by_ref() {
            if line.trim_start().starts_with("```") {
                self.in_fence = !self.in_fence;
                continue;
            }
            if self.in_fence {
                continue;
            }
            if line.starts_with("## ") {
                self.phase = g.phase.captures(line).map(|c| c[1].to_string());
                continue;
            }
            let Some(caps) = g.checkbox.captures(line) else {
                continue;
            };
            let done = !caps[1].trim().is_empty();
            let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let (id, tags, story_ref, title) = parse_body(body);
            let depends_on = dependencies(&title);
            return Some(TaskRecord {
                id,
                tags,
                story_ref,
                title,
                done,
                line: idx + 1,
                phase: self.phase.clone(),
                depends_on,
            });
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskIssue {
    MissingId { line: usize },
    EmptyTitle { line: usize },
    DuplicateId { id: String, line: usize, first_line: usize },
    UnknownDependency { id: String, dependency: String, line: usize },
    DependencyCycle { ids: Vec<String> },
}

impl fmt::Display for TaskIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskIssue::MissingId { line } => write!(f, "line {line}: task has no ID"),
            TaskIssue::EmptyTitle { line } => write!(f, "line {line}: task has an empty title"),
            TaskIssue::DuplicateId {
                id,
                line,
                first_line,
            } => write!(f, "line {line}: duplicate task ID {id} (first on line {first_line})"),
            TaskIssue::UnknownDependency {
                id,
                dependency,
                line,
            } => write!(f, "line {line}: {id} depends on unknown task {dependency}"),
            TaskIssue::DependencyCycle { ids } => {
                write!(f, "dependency cycle: {}", ids.join(" -> "))
            }
        }
    }
}

/// Structural problems in a parsed task list. Never fails; an empty result
/// means the list is well formed.
pub fn validate(records: &[TaskRecord]) -> Vec<TaskIssue> {
    let mut issues = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for r in records {
        match &r.id {
            None => issues.push(TaskIssue::MissingId { line: r.line }),
            Some(id) => {
                if let Some(&first_line) = first_seen.get(id.as_str()) {
                    issues.push(TaskIssue::DuplicateId {
                        id: id.clone(),
                        line: r.line,
                        first_line,
                    });
                } else {
                    first_seen.insert(id, r.line);
                }
            }
        }
        if r.title.is_empty() {
            issues.push(TaskIssue::EmptyTitle { line: r.line });
        }
    }

    for r in records {
        let Some(id) = &r.id else { continue };
        for dep in &r.depends_on {
            if !first_seen.contains_key(dep.as_str()) {
                issues.push(TaskIssue::UnknownDependency {
                    id: id.clone(),
                    dependency: dep.clone(),
                    line: r.line,
                });
            }
        }
    }

    if let Some(cycle) = find_cycle(records) {
        issues.push(TaskIssue::DependencyCycle { ids: cycle });
    }
    issues
}

fn find_cycle(records: &[TaskRecord]) -> Option<Vec<String>> {
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for r in records {
        if let Some(id) = &r.id {
            graph
                .entry(id.as_str())
                .or_default()
                .extend(r.depends_on.iter().map(String::as_str));
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        node: &'a str,
        graph: &BTreeMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let from = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = stack[from..].iter().map(|s| s.to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        stack.push(node);
        for &dep in graph.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            if graph.contains_key(dep) {
                if let Some(cycle) = visit(dep, graph, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    for &node in graph.keys() {
        let mut stack = Vec::new();
        if let Some(cycle) = visit(node, &graph, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Task list operations
// ---------------------------------------------------------------------------

/// Flip the checkbox of task `id` in `text`, leaving every other byte as is.
pub fn set_done(text: &str, id: &str, done: bool) -> Result<String> {
    let g = grammar();
    let mut out = String::with_capacity(text.len());
    let mut found = false;
    let mut in_fence = false;

    for chunk in text.split_inclusive('\n') {
        let line = chunk.trim_end_matches(['\n', '\r']);
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !found && !in_fence {
            if let Some(caps) = g.checkbox.captures(line) {
                let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let (task_id, ..) = parse_body(body);
                if task_id.as_deref() == Some(id) {
                    let mark = caps.get(1).map(|m| m.start()).unwrap_or(0);
                    out.push_str(&chunk[..mark]);
                    out.push(if done { 'x' } else { ' ' });
                    out.push_str(&chunk[mark + 1..]);
                    found = true;
                    continue;
                }
            }
        }
        out.push_str(chunk);
    }

    if !found {
        return Err(SpecflowError::TaskNotFound(id.to_string()));
    }
    Ok(out)
}

/// First undone task whose dependencies are all done.
pub fn next_ready(records: &[TaskRecord]) -> Option<&TaskRecord> {
    let done: HashSet<&str> = records
        .iter()
        .filter(|r| r.done)
        .filter_map(|r| r.id.as_deref())
        .collect();
    records
        .iter()
        .find(|r| !r.done && r.depends_on.iter().all(|d| done.contains(d.as_str())))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    pub by_tag: BTreeMap<TaskTag, usize>,
}

impl fmt::Display for TaskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} done, {} pending", self.done, self.total, self.pending)?;
        for (tag, count) in &self.by_tag {
            write!(f, ", {count} [{tag}]")?;
        }
        Ok(())
    }
}

pub fn summary(records: &[TaskRecord]) -> TaskSummary {
    let mut s = TaskSummary {
        total: records.len(),
        ..TaskSummary::default()
    };
    for r in records {
        if r.done {
            s.done += 1;
        } else {
            s.pending += 1;
        }
        for &tag in &r.tags {
            *s.by_tag.entry(tag).or_default() += 1;
        }
    }
    s
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
