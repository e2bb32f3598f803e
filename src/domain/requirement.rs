//! Requirement line model for pip-compatible requirements files
//!
//! Handles the line shapes `uv export --format requirements-txt` emits:
//! - Requirements: `requests==2.31.0`, `httpx[http2]>=0.24`, `pywin32==306 ; sys_platform == 'win32'`
//! - Editable / local entries: `-e .`, `-e ./packages/core`, `app @ file:///src/app`
//! - Comments and indented `# via` annotations
//! - Option lines: `--index-url ...`

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

// name, optional [extras], remainder
static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(\[[^\]]*\])?\s*(.*)$").unwrap()
});

static NAME_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalizes a package name the way pip compares them (PEP 503)
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATOR_RE
        .replace_all(name.trim(), "-")
        .to_ascii_lowercase()
}

/// A single parsed requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name as written
    pub name: String,
    /// Extras including brackets, e.g. `[http2]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<String>,
    /// Version specifier or direct reference (`==1.0`, `>=2,<3`, `@ file:///...`)
    pub specifier: String,
    /// Environment marker after `;`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl Requirement {
    /// Parse a requirement from a trimmed, non-comment line
    pub fn parse(line: &str) -> Option<Self> {
        let caps = REQUIREMENT_RE.captures(line.trim())?;
        let name = caps.get(1)?.as_str().to_string();
        let extras = caps.get(2).map(|m| m.as_str().to_string());
        let rest = caps.get(3).map(|m| m.as_str()).unwrap_or("");

        let (specifier, marker) = match rest.split_once(';') {
            Some((spec, marker)) => (spec.trim(), Some(marker.trim().to_string())),
            None => (rest.trim(), None),
        };

        Some(Self {
            name,
            extras,
            specifier: specifier.to_string(),
            marker,
        })
    }

    /// PEP 503 normalized name, used as package identity
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Returns the pinned version for `==` requirements
    pub fn pinned_version(&self) -> Option<&str> {
        let version = self.specifier.strip_prefix("==")?.trim();
        if version.is_empty() || version.contains(',') {
            None
        } else {
            Some(version)
        }
    }

    /// Returns true for PEP 508 direct references (`name @ url`)
    pub fn is_direct_reference(&self) -> bool {
        self.specifier.starts_with('@')
    }
}

/// Classification of one line of a requirements file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementLine {
    /// Empty or whitespace-only
    Blank,
    /// Comment line, including indented `# via` annotations
    Comment,
    /// pip option (`-e`, `--index-url`, `-r`, ...)
    Option,
    /// A package requirement
    Requirement(Requirement),
    /// Anything that does not parse as one of the above
    Unrecognized,
}

impl RequirementLine {
    /// Classify a raw line
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            RequirementLine::Blank
        } else if trimmed.starts_with('#') {
            RequirementLine::Comment
        } else if trimmed.starts_with('-') {
            RequirementLine::Option
        } else {
            match Requirement::parse(trimmed) {
                Some(req) => RequirementLine::Requirement(req),
                None => RequirementLine::Unrecognized,
            }
        }
    }
}

/// Returns true if the line installs the project itself from its own
/// directory rather than naming an external package. Other local paths,
/// such as workspace members or vendored wheels, are real dependencies.
pub fn is_self_reference(
    line: &str,
    project_name: Option<&str>,
    project_root: Option<&Path>,
) -> bool {
    let trimmed = line.trim();
    if trimmed == "." || trimmed == "./" {
        return true;
    }
    if let Some(target) = editable_target(trimmed) {
        return is_project_path(target, project_root);
    }

    let Some(req) = Requirement::parse(trimmed) else {
        return false;
    };
    if !req.is_direct_reference() {
        return false;
    }
    if project_name.is_some_and(|project| normalize_name(project) == req.normalized_name()) {
        return true;
    }
    is_project_path(req.specifier.trim_start_matches('@'), project_root)
}

// `-e <target>`, `--editable <target>` or `--editable=<target>`
fn editable_target(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("--editable")
        .or_else(|| line.strip_prefix("-e"))?;
    if !(rest.is_empty() || rest.starts_with([' ', '\t', '='])) {
        return None;
    }
    Some(rest.trim_start_matches([' ', '\t', '=']).trim())
}

fn is_project_path(target: &str, project_root: Option<&Path>) -> bool {
    let target = target.split(['#', ';']).next().unwrap_or_default().trim();
    if target == "." || target == "./" {
        return true;
    }
    let Some(root) = project_root else {
        return false;
    };
    let path = target
        .strip_prefix("file://")
        .or_else(|| target.strip_prefix("file:"))
        .unwrap_or(target);
    !path.is_empty() && Path::new(path) == root
}

/// Returns true for indented comment lines that annotate the preceding entry
fn is_annotation(line: &str) -> bool {
    line.starts_with(char::is_whitespace) && line.trim_start().starts_with('#')
}

/// An ordered requirements file that keeps every line as written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementsFile {
    lines: Vec<String>,
}

impl RequirementsFile {
    /// Parse requirements text, keeping line order
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Raw lines in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Iterate the parsed requirements in file order
    pub fn requirements(&self) -> impl Iterator<Item = Requirement> + '_ {
        self.lines
            .iter()
            .filter_map(|line| match RequirementLine::parse(line) {
                RequirementLine::Requirement(req) => Some(req),
                _ => None,
            })
    }

    /// Normalized names of every requirement
    pub fn package_names(&self) -> BTreeSet<String> {
        self.requirements().map(|r| r.normalized_name()).collect()
    }

    /// Map of normalized name to specifier (last occurrence wins)
    pub fn specifiers(&self) -> BTreeMap<String, String> {
        self.requirements()
            .map(|r| (r.normalized_name(), r.specifier))
            .collect()
    }

    /// Returns true if a package with this (normalized) name is listed
    pub fn contains(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.requirements().any(|r| r.normalized_name() == wanted)
    }

    /// Drop editable/local self-install entries. Returns the filtered file and
    /// the removed lines.
    pub fn strip_self_references(
        &self,
        project_name: Option<&str>,
        project_root: Option<&Path>,
    ) -> (Self, Vec<String>) {
        self.retain_entries(|line| !is_self_reference(line, project_name, project_root))
    }

    /// Drop requirements whose normalized name is in `names`, together with
    /// their annotation lines.
    pub fn without_packages(&self, names: &BTreeSet<String>) -> (Self, Vec<String>) {
        self.retain_entries(|line| match RequirementLine::parse(line) {
            RequirementLine::Requirement(req) => !names.contains(&req.normalized_name()),
            _ => true,
        })
    }

    /// Render back to text. Output is deterministic: `\n` separators and a
    /// trailing newline whenever there is at least one line.
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Number of requirement entries
    pub fn len(&self) -> usize {
        self.requirements().count()
    }

    /// Returns true if no requirement entries are present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain_entries(&self, keep: impl Fn(&str) -> bool) -> (Self, Vec<String>) {
        let mut kept = Vec::with_capacity(self.lines.len());
        let mut removed = Vec::new();
        let mut dropping = false;

        for line in &self.lines {
            if dropping && is_annotation(line) {
                continue;
            }
            dropping = false;

            if is_annotation(line) || keep(line) {
                kept.push(line.clone());
            } else {
                removed.push(line.trim().to_string());
                dropping = true;
            }
        }

        (Self { lines: kept }, removed)
    }
}
