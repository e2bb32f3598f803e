//! Drift between a committed production list and a regenerated one

use super::requirement::RequirementsFile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic version change type of an updated package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Not comparable as versions (ranges, URLs, PEP 440 only forms)
    Unknown,
}

impl ChangeType {
    /// Determine the change type between two version strings
    pub fn from_versions(old: &str, new: &str) -> Self {
        match (lenient_semver(old), lenient_semver(new)) {
            (Some(old), Some(new)) => {
                if old.major != new.major {
                    ChangeType::Major
                } else if old.minor != new.minor {
                    ChangeType::Minor
                } else {
                    ChangeType::Patch
                }
            }
            _ => ChangeType::Unknown,
        }
    }

    /// Determine the change type between two specifiers. Only exact `==`
    /// pins are comparable.
    pub fn from_specifiers(old: &str, new: &str) -> Self {
        match (pinned_version(old), pinned_version(new)) {
            (Some(old), Some(new)) => Self::from_versions(old, new),
            _ => ChangeType::Unknown,
        }
    }

    /// Plain label
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::Major => "major",
            ChangeType::Minor => "minor",
            ChangeType::Patch => "patch",
            ChangeType::Unknown => "?",
        }
    }
}

fn pinned_version(specifier: &str) -> Option<&str> {
    specifier
        .trim()
        .strip_prefix("==")
        .map(str::trim)
        .filter(|v| !v.contains(','))
}

/// Pads `1` / `1.2` to three components so `semver` accepts it
fn lenient_semver(version: &str) -> Option<semver::Version> {
    let version = version.trim().trim_start_matches("==").trim_start_matches('v');
    let parts: Vec<&str> = version.split('.').collect();
    let padded = match parts.len() {
        1 => format!("{}.0.0", version),
        2 => format!("{}.0", version),
        3 => version.to_string(),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// One package-level difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackageChange {
    /// Present only in the regenerated list
    Added { name: String, specifier: String },
    /// Present only in the previous list
    Removed { name: String, specifier: String },
    /// Present in both with a different specifier
    Updated {
        name: String,
        old: String,
        new: String,
        change: ChangeType,
    },
}

impl PackageChange {
    /// Normalized package name of this change
    pub fn name(&self) -> &str {
        match self {
            PackageChange::Added { name, .. }
            | PackageChange::Removed { name, .. }
            | PackageChange::Updated { name, .. } => name,
        }
    }
}

impl fmt::Display for PackageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageChange::Added { name, specifier } => write!(f, "+ {}{}", name, specifier),
            PackageChange::Removed { name, specifier } => write!(f, "- {}{}", name, specifier),
            PackageChange::Updated {
                name,
                old,
                new,
                change,
            } => write!(f, "~ {} {} -> {} [{}]", name, old, new, change.label()),
        }
    }
}

/// Drift signal of one sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Drift {
    /// No previous production list existed
    NoBaseline,
    /// Byte-identical to the previous list
    Unchanged,
    /// Contents differ; `changes` lists package-level differences, which may be
    /// empty when only comments or ordering changed
    Changed { changes: Vec<PackageChange> },
}

impl Drift {
    /// Compare previous and regenerated production list contents
    pub fn detect(previous: &[u8], current: &[u8]) -> Self {
        if previous == current {
            return Drift::Unchanged;
        }
        let old = RequirementsFile::parse(&String::from_utf8_lossy(previous));
        let new = RequirementsFile::parse(&String::from_utf8_lossy(current));
        Drift::Changed {
            changes: package_changes(&old, &new),
        }
    }

    /// Returns true when the production list changed
    pub fn is_changed(&self) -> bool {
        matches!(self, Drift::Changed { .. })
    }

    /// Short label for output
    pub fn label(&self) -> &'static str {
        match self {
            Drift::NoBaseline => "new",
            Drift::Unchanged => "unchanged",
            Drift::Changed { .. } => "changed",
        }
    }
}

/// Package-level differences in name order
pub fn package_changes(old: &RequirementsFile, new: &RequirementsFile) -> Vec<PackageChange> {
    let old_specs = old.specifiers();
    let new_specs = new.specifiers();
    let mut changes = Vec::new();

    for (name, old_spec) in &old_specs {
        match new_specs.get(name) {
            None => changes.push(PackageChange::Removed {
                name: name.clone(),
                specifier: old_spec.clone(),
            }),
            Some(new_spec) if new_spec != old_spec => {
                changes.push(PackageChange::Updated {
                    name: name.clone(),
                    old: old_spec.clone(),
                    new: new_spec.clone(),
                    change: ChangeType::from_specifiers(old_spec, new_spec),
                });
            }
            Some(_) => {}
        }
    }
    for (name, new_spec) in &new_specs {
        if !old_specs.contains_key(name) {
            changes.push(PackageChange::Added {
                name: name.clone(),
                specifier: new_spec.clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.name().cmp(b.name()));
    changes
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_from_versions() {
        assert_eq!(ChangeType::from_versions("1.0.0", "2.0.0"), ChangeType::Major);
        assert_eq!(ChangeType::from_versions("1.0.0", "1.1.0"), ChangeType::Minor);
        assert_eq!(ChangeType::from_versions("1.0.0", "1.0.1"), ChangeType::Patch);
        assert_eq!(ChangeType::from_versions("1.0", "1.1"), ChangeType::Minor);
        assert_eq!(ChangeType::from_versions("2024.2.2", "2024.7.4"), ChangeType::Minor);
        assert_eq!(ChangeType::from_versions("1.0.0.post1", "1.0.1"), ChangeType::Unknown);
    }

    #[test]
    fn test_change_type_from_specifiers() {
        assert_eq!(
            ChangeType::from_specifiers("==1.0.0", "==2.0.0"),
            ChangeType::Major
        );
        assert_eq!(ChangeType::from_specifiers(">=2", "<3"), ChangeType::Unknown);
        assert_eq!(
            ChangeType::from_specifiers("==1.0", ">=1.0,<2"),
            ChangeType::Unknown
        );
    }

    #[test]
    fn test_drift_unchanged() {
        let content = b"pkgA==1.0.0\n";
        assert_eq!(Drift::detect(content, content), Drift::Unchanged);
    }

    #[test]
    fn test_drift_changed_version() {
        let drift = Drift::detect(b"pkgA==1.0.0\n", b"pkgA==1.1.0\n");
        assert!(drift.is_changed());
        assert_eq!(drift.label(), "changed");

        let Drift::Changed { changes } = drift else {
            panic!("expected changed drift");
        };
        assert_eq!(
            changes,
            vec![PackageChange::Updated {
                name: "pkga".to_string(),
                old: "==1.0.0".to_string(),
                new: "==1.1.0".to_string(),
                change: ChangeType::Minor,
            }]
        );
    }

    #[test]
    fn test_drift_keeps_operators() {
        let drift = Drift::detect(b"pkgA>=2\n", b"pkgA<3\n");
        let Drift::Changed { changes } = drift else {
            panic!("expected changed drift");
        };
        assert_eq!(
            changes,
            vec![PackageChange::Updated {
                name: "pkga".to_string(),
                old: ">=2".to_string(),
                new: "<3".to_string(),
                change: ChangeType::Unknown,
            }]
        );
    }

    #[test]
    fn test_drift_added_and_removed() {
        let drift = Drift::detect(b"a==1.0\nb==1.0\n", b"a==1.0\nc==2.0\n");
        let Drift::Changed { changes } = drift else {
            panic!("expected changed drift");
        };
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], PackageChange::Removed { name, .. } if name == "b"));
        assert!(matches!(&changes[1], PackageChange::Added { name, .. } if name == "c"));
    }

    #[test]
    fn test_drift_comment_only_change() {
        let drift = Drift::detect(b"# old header\na==1.0\n", b"# new header\na==1.0\n");
        assert_eq!(drift, Drift::Changed { changes: vec![] });
    }

    #[test]
    fn test_package_change_display() {
        let change = PackageChange::Updated {
            name: "requests".to_string(),
            old: "==2.31.0".to_string(),
            new: "==2.32.0".to_string(),
            change: ChangeType::Minor,
        };
        assert_eq!(change.to_string(), "~ requests ==2.31.0 -> ==2.32.0 [minor]");
    }
}
