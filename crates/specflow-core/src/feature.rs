use crate::error::{Result, SpecflowError};
use crate::paths;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// FeatureIdentity
// ---------------------------------------------------------------------------

/// Number, slug, branch and directory of one feature. Immutable once
/// allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureIdentity {
    #[serde(serialize_with = "padded")]
    pub number: u32,
    pub slug: String,
    pub branch_name: String,
    pub directory: PathBuf,
}

fn padded<S: Serializer>(number: &u32, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&paths::format_number(*number))
}

impl FeatureIdentity {
    pub fn new(specs_root: &Path, number: u32, slug: &str) -> Self {
        let branch_name = format!("{}-{slug}", paths::format_number(number));
        Self {
            number,
            slug: slug.to_string(),
            directory: paths::feature_dir(specs_root, &branch_name),
            branch_name,
        }
    }

    /// Identity for an existing directory named `name`. Directories whose
    /// names do not follow `NNN-slug` exactly keep their name as the slug.
    pub fn from_dir_name(specs_root: &Path, name: &str) -> Option<Self> {
        let number = paths::leading_number(name)?;
        let slug = match paths::parse_feature_name(name) {
            Some((_, slug)) => slug.to_string(),
            None => name.split_once('-').map(|(_, s)| s).unwrap_or(name).to_string(),
        };
        Some(Self {
            number,
            slug,
            branch_name: name.to_string(),
            directory: paths::feature_dir(specs_root, name),
        })
    }

    pub fn name(&self) -> &str {
        &self.branch_name
    }
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Lowercase, collapse every run of non-alphanumeric ASCII into one hyphen,
/// trim hyphens, keep the first `max_words` words.
pub fn slugify(description: &str, max_words: usize) -> Result<String> {
    if description.trim().is_empty() {
        return Err(SpecflowError::EmptyDescription);
    }
    let lowered = description.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(max_words.max(1))
        .collect();
    if words.is_empty() {
        return Err(SpecflowError::EmptySlug(description.to_string()));
    }
    Ok(words.join("-"))
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Every directory under `specs_root` that carries a numeric prefix, sorted
/// by number then name. A missing specs root yields an empty list.
pub fn list(specs_root: &Path) -> Result<Vec<FeatureIdentity>> {
    let entries = match std::fs::read_dir(specs_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut features = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(id) = FeatureIdentity::from_dir_name(specs_root, &name) {
            features.push(id);
        }
    }
    features.sort_by(|a, b| (a.number, &a.branch_name).cmp(&(b.number, &b.branch_name)));
    Ok(features)
}

/// Find the feature a key refers to: an exact directory name, or a numeric
/// prefix (`004`, `4`) matching exactly one directory.
pub fn find(specs_root: &Path, key: &str) -> Result<Option<FeatureIdentity>> {
    let key = key.trim();
    if key.is_empty() {
        return Ok(None);
    }
    let features = list(specs_root)?;
    if let Some(hit) = features.iter().find(|f| f.branch_name == key) {
        return Ok(Some(hit.clone()));
    }
    let number = if key.bytes().all(|b| b.is_ascii_digit()) {
        key.parse::<u32>().ok()
    } else {
        paths::leading_number(key)
    };
    let Some(number) = number else {
        return Ok(None);
    };
    let mut matches = features.into_iter().filter(|f| f.number == number);
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(Some(only)),
        (Some(_), Some(_)) => {
            tracing::warn!(key, number, "several feature directories share this number");
            Ok(None)
        }
        _ => Ok(None),
    }
}

/// Highest number used by any directory in `specs_root` or any `NNN-slug`
/// branch in `branches`; 0 when there are none.
pub fn highest_number(specs_root: &Path, branches: &[String]) -> Result<u32> {
    let from_dirs = list(specs_root)?.iter().map(|f| f.number).max().unwrap_or(0);
    let from_branches = branches
        .iter()
        .filter_map(|b| paths::branch_feature_number(b))
        .max()
        .unwrap_or(0);
    Ok(from_dirs.max(from_branches))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
