//! git::history
//!
//! Lazy commit traversal.

use super::adapt;
use super::error::{classify, Context, FacadeError, Translate};
use super::records::CommitRecord;

/// Lazy, finite sequence of commits, newest first.
///
/// Produced by [`RepositoryHandle::list_commits`](crate::git::RepositoryHandle::list_commits).
/// Commits are read and copied one at a time as the iterator advances, so
/// walking a prefix of a very large history costs only that prefix.
/// Ordering is topological with time as the tie-break: a child always
/// comes before its parents.
///
/// The iterator borrows the handle; the records it yields do not. Each call
/// to `list_commits` starts an independent traversal.
pub struct CommitHistory<'repo> {
    repo: &'repo git2::Repository,
    walk: git2::Revwalk<'repo>,
    failed: bool,
}

impl<'repo> CommitHistory<'repo> {
    pub(crate) fn start(
        repo: &'repo git2::Repository,
        tip: git2::Oid,
    ) -> Result<Self, FacadeError> {
        let mut walk = repo.revwalk().translate(Context::Op("start history walk"))?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .translate(Context::Op("sort history walk"))?;
        walk.push(tip).translate(Context::Op("start history walk"))?;

        Ok(Self {
            repo,
            walk,
            failed: false,
        })
    }

    fn read(&self, id: git2::Oid) -> Result<CommitRecord, FacadeError> {
        let commit = self.repo.find_commit(id).translate(Context::Op("read commit"))?;
        adapt::commit_record(&commit)
    }
}

impl Iterator for CommitHistory<'_> {
    type Item = Result<CommitRecord, FacadeError>;

    fn next(&mut self) -> Option<Self::Item> {
        // A failed step ends the sequence; the error is yielded once.
        if self.failed {
            return None;
        }

        let item = match self.walk.next()? {
            Ok(id) => self.read(id),
            Err(e) => Err(classify(e, Context::Op("walk history"))),
        };

        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

impl std::fmt::Debug for CommitHistory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitHistory")
            .field("path", &self.repo.path())
            .field("failed", &self.failed)
            .finish()
    }
}
