//! git::adapt
//!
//! One adapter per upstream object kind. Each adapter copies fields out of
//! a borrowed `git2` object into an owned record; nothing returned here
//! borrows from the wrapped library.

use chrono::{DateTime, Utc};

use super::error::FacadeError;
use super::records::{Author, ChangeKind, CommitRecord, DiffEntry, ReferenceRecord, Signature};
use crate::core::types::{Oid, RefName};

/// Convert an upstream object id.
pub(crate) fn oid(id: git2::Oid) -> Result<Oid, FacadeError> {
    Oid::new(id.to_string()).map_err(|e| FacadeError::UnderlyingLibrary {
        message: format!("unexpected object id from library: {}", e),
    })
}

/// Convert a facade object id for an upstream call.
pub(crate) fn git_oid(id: &Oid) -> Result<git2::Oid, FacadeError> {
    git2::Oid::from_str(id.as_str()).map_err(|_| FacadeError::InvalidArgument {
        message: format!("invalid object id: {}", id),
    })
}

fn timestamp(time: git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Copy a signature. Names and emails that are not UTF-8 are converted
/// lossily rather than failing the whole read.
pub(crate) fn signature(sig: &git2::Signature<'_>) -> Signature {
    Signature {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        when: timestamp(sig.when()),
    }
}

/// Build an upstream signature stamped with the current time.
pub(crate) fn git_signature(author: &Author) -> Result<git2::Signature<'static>, FacadeError> {
    git2::Signature::now(&author.name, &author.email).map_err(|e| FacadeError::InvalidArgument {
        message: format!(
            "invalid author '{} <{}>': {}",
            author.name,
            author.email,
            e.message()
        ),
    })
}

/// Copy a commit.
pub(crate) fn commit_record(commit: &git2::Commit<'_>) -> Result<CommitRecord, FacadeError> {
    let author = signature(&commit.author());
    let committer = signature(&commit.committer());
    let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();
    let summary = message.lines().next().unwrap_or("").trim().to_string();

    let parents = commit
        .parent_ids()
        .map(oid)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CommitRecord {
        id: oid(commit.id())?,
        timestamp: author.when,
        author,
        committer,
        summary,
        message,
        parents,
    })
}

/// Copy a reference.
///
/// Commit-ish refs report the peeled commit; refs pointing at other
/// objects (blobs, trees) report their direct target. Symbolic refs are
/// resolved first. Returns `Ok(None)` for refs the facade cannot name
/// (non-UTF-8 or invalid names) so enumeration can skip them.
pub(crate) fn reference_record(
    reference: &git2::Reference<'_>,
) -> Result<Option<ReferenceRecord>, FacadeError> {
    let Some(raw_name) = reference.name() else {
        return Ok(None);
    };
    let Ok(name) = RefName::new(raw_name) else {
        tracing::warn!(name = raw_name, "skipping reference with invalid name");
        return Ok(None);
    };

    let target = match reference.peel_to_commit() {
        Ok(commit) => commit.id(),
        Err(_) => {
            let resolved = reference.resolve().map_err(|e| FacadeError::UnderlyingLibrary {
                message: format!("{}: {}", raw_name, e.message()),
            })?;
            match resolved.target() {
                Some(id) => id,
                None => return Ok(None),
            }
        }
    };

    Ok(Some(ReferenceRecord {
        name,
        target: oid(target)?,
    }))
}

/// Map an upstream delta status onto the four stable change kinds.
///
/// Copies count as additions of the new path and type changes as
/// modifications. Unmodified and ignored entries produce no change.
pub(crate) fn change_kind(status: git2::Delta) -> Option<ChangeKind> {
    use git2::Delta;

    match status {
        Delta::Added | Delta::Copied | Delta::Untracked => Some(ChangeKind::Added),
        Delta::Deleted => Some(ChangeKind::Deleted),
        Delta::Modified | Delta::Typechange | Delta::Conflicted | Delta::Unreadable => {
            Some(ChangeKind::Modified)
        }
        Delta::Renamed => Some(ChangeKind::Renamed),
        Delta::Unmodified | Delta::Ignored => None,
    }
}

fn file_path(file: &git2::DiffFile<'_>) -> Option<String> {
    file.path().map(|p| p.to_string_lossy().into_owned())
}

/// Copy a diff delta.
pub(crate) fn diff_entry(delta: &git2::DiffDelta<'_>) -> Option<DiffEntry> {
    let change = change_kind(delta.status())?;

    let old = file_path(&delta.old_file());
    let new = file_path(&delta.new_file());

    let (path, old_path) = match change {
        ChangeKind::Deleted => (old.or(new)?, None),
        ChangeKind::Renamed => (new?, old),
        _ => (new.or(old)?, None),
    };

    Some(DiffEntry {
        path,
        old_path,
        change,
    })
}
