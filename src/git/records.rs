//! git::records
//!
//! Self-contained values returned by the facade.
//!
//! Every record is built by copying fields out of a transient upstream
//! object (see `git::adapt`), so records are `'static`, `Send` and `Sync`
//! and stay valid after the handle that produced them is closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{BranchName, Oid, RefName};

/// A person and point in time attached to a commit or tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

/// Immutable snapshot of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// The commit id
    pub id: Oid,
    /// Who wrote the change
    pub author: Signature,
    /// Who recorded the commit
    pub committer: Signature,
    /// First line of the message
    pub summary: String,
    /// Full message
    pub message: String,
    /// Author time in UTC
    pub timestamp: DateTime<Utc>,
    /// Parent ids in order; empty for a root commit
    pub parents: Vec<Oid>,
}

impl CommitRecord {
    /// Whether this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether this commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Immutable snapshot of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Full ref name (`refs/heads/main`), or `HEAD` when detached
    pub name: RefName,
    /// Peeled commit id, or the direct target for non-commit refs
    pub target: Oid,
}

impl ReferenceRecord {
    /// The branch this reference names, if it is a local branch ref.
    pub fn branch(&self) -> Option<BranchName> {
        self.name
            .strip_prefix("refs/heads/")
            .and_then(|b| BranchName::new(b).ok())
    }
}

/// How a path changed between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Renamed,
}

impl ChangeKind {
    /// Single-letter code as shown by `git diff --name-status`.
    pub fn code(&self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Deleted => 'D',
            ChangeKind::Modified => 'M',
            ChangeKind::Renamed => 'R',
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
            ChangeKind::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

/// One changed path in a diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffEntry {
    /// The path after the change (the old path for deletions)
    pub path: String,
    /// The path before a rename; `None` for every other kind
    pub old_path: Option<String>,
    /// What happened to the path
    pub change: ChangeKind,
}

/// Caller-supplied identity used to sign new commits and tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    /// Create an author identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Which branches [`list_branches`](crate::git::RepositoryHandle::list_branches)
/// returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BranchFilter {
    Local,
    Remote,
    #[default]
    All,
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree is clean (untracked files don't count).
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }

    /// Check if there are any staged changes ready to commit.
    pub fn has_staged(&self) -> bool {
        self.staged > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    fn sig() -> Signature {
        Signature {
            name: "Alice Author".to_string(),
            email: "alice@authors.tld".to_string(),
            when: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    mod commit_record {
        use super::*;

        fn record(parents: Vec<Oid>) -> CommitRecord {
            CommitRecord {
                id: oid('a'),
                author: sig(),
                committer: sig(),
                summary: "Add file".to_string(),
                message: "Add file\n\nbody\n".to_string(),
                timestamp: sig().when,
                parents,
            }
        }

        #[test]
        fn root_and_merge() {
            assert!(record(vec![]).is_root());
            assert!(!record(vec![oid('b')]).is_root());
            assert!(!record(vec![oid('b')]).is_merge());
            assert!(record(vec![oid('b'), oid('c')]).is_merge());
        }

        #[test]
        fn serializes_as_plain_data() {
            let json = serde_json::to_value(record(vec![oid('b')])).unwrap();
            assert_eq!(json["id"], "a".repeat(40));
            assert_eq!(json["parents"][0], "b".repeat(40));
            assert_eq!(json["author"]["email"], "alice@authors.tld");
        }

        #[test]
        fn records_are_owned_values() {
            fn assert_owned<T: Send + Sync + Clone + 'static>() {}
            assert_owned::<CommitRecord>();
            assert_owned::<ReferenceRecord>();
            assert_owned::<DiffEntry>();
        }
    }

    mod reference_record {
        use super::*;

        #[test]
        fn branch_of_branch_ref() {
            let record = ReferenceRecord {
                name: RefName::new("refs/heads/feature/x").unwrap(),
                target: oid('a'),
            };
            assert_eq!(record.branch().unwrap().as_str(), "feature/x");
        }

        #[test]
        fn no_branch_for_detached_head() {
            let record = ReferenceRecord {
                name: RefName::head(),
                target: oid('a'),
            };
            assert!(record.branch().is_none());
        }
    }

    mod change_kind {
        use super::*;

        #[test]
        fn codes_and_display() {
            assert_eq!(ChangeKind::Added.code(), 'A');
            assert_eq!(ChangeKind::Renamed.code(), 'R');
            assert_eq!(ChangeKind::Modified.to_string(), "modified");
        }

        #[test]
        fn serde_lowercase() {
            assert_eq!(
                serde_json::to_string(&ChangeKind::Deleted).unwrap(),
                "\"deleted\""
            );
        }
    }

    mod worktree_status {
        use super::*;

        #[test]
        fn default_is_clean() {
            let status = WorktreeStatus::default();
            assert!(status.is_clean());
            assert!(!status.has_staged());
        }

        #[test]
        fn staged_changes() {
            let status = WorktreeStatus {
                staged: 3,
                ..Default::default()
            };
            assert!(!status.is_clean());
            assert!(status.has_staged());
        }

        #[test]
        fn conflicts_make_dirty() {
            let status = WorktreeStatus {
                has_conflicts: true,
                ..Default::default()
            };
            assert!(!status.is_clean());
        }

        #[test]
        fn untracked_not_dirty() {
            let status = WorktreeStatus {
                untracked: 5,
                ..Default::default()
            };
            assert!(status.is_clean());
        }
    }
}
