use crate::config::Config;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECIFY_DIR: &str = ".specify";
pub const CONFIG_FILE: &str = ".specify/config.yaml";
pub const DEFAULT_SPECS_DIR: &str = "specs";
pub const DEFAULT_TEMPLATES_DIR: &str = ".specify/templates";
pub const DEFAULT_CONSTITUTION: &str = "constitution.md";

/// Lock file taken by the feature allocator, inside the specs root.
pub const ALLOC_LOCK_FILE: &str = ".specflow.lock";

pub const AGENT_TEMPLATE: &str = "agent-file-template.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn specify_dir(root: &Path) -> PathBuf {
    root.join(SPECIFY_DIR)
}

pub fn specs_root(root: &Path, cfg: &Config) -> PathBuf {
    root.join(&cfg.specs_dir)
}

pub fn templates_dir(root: &Path, cfg: &Config) -> PathBuf {
    root.join(&cfg.templates_dir)
}

pub fn constitution_path(root: &Path, cfg: &Config) -> PathBuf {
    root.join(&cfg.constitution)
}

pub fn feature_dir(specs_root: &Path, name: &str) -> PathBuf {
    specs_root.join(name)
}

pub fn alloc_lock_path(specs_root: &Path) -> PathBuf {
    specs_root.join(ALLOC_LOCK_FILE)
}

// ---------------------------------------------------------------------------
// Feature names
// ---------------------------------------------------------------------------

static FEATURE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn feature_name_re() -> &'static Regex {
    FEATURE_NAME_RE.get_or_init(|| Regex::new(r"^(\d{3,})-([a-z0-9][a-z0-9\-]*)$").unwrap())
}

/// Split `NNN-slug` into its number and slug. Anything else yields `None`.
pub fn parse_feature_name(name: &str) -> Option<(u32, &str)> {
    let caps = feature_name_re().captures(name)?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    Some((number, caps.get(2)?.as_str()))
}

/// Leading number of a directory or branch name (`004-x` -> 4), without
/// requiring a well-formed slug. Used when scanning for the highest number.
pub fn leading_number(name: &str) -> Option<u32> {
    let digits: &str = name.split('-').next()?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.len() == name.len()
    {
        return None;
    }
    digits.parse().ok()
}

/// Number of a branch named exactly `NNN-slug` with a three-digit prefix.
/// Date-like or version-like branches (`2024-release-prep`) do not count.
pub fn branch_feature_number(branch: &str) -> Option<u32> {
    let (number, _) = parse_feature_name(branch)?;
    (branch.find('-') == Some(3)).then_some(number)
}

pub fn format_number(number: u32) -> String {
    format!("{number:03}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
