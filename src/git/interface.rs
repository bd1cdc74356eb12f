//! git::interface
//!
//! The repository handle and its operations.
//!
//! Every method follows the same shape: validate arguments with the
//! `core::types` constructors, call into `git2`, translate any failure with
//! `error::classify`, and copy results out through `adapt`. Nothing in a
//! public signature here mentions `git2`.
//!
//! # Concurrency
//!
//! [`RepositoryHandle`] is `Send` but not `Sync`. The wrapped repository
//! object is not safe for concurrent use and the facade does not add
//! locking; share a handle across threads only behind your own mutex.
//!
//! # Resources
//!
//! Native resources (the repository, its index, revwalks, diffs, object
//! handles) are owned by values that are dropped on every exit path, so an
//! early `?` return never leaks them.

use std::path::Path;

use tracing::{debug, instrument};

use super::adapt;
use super::error::{classify, Context, FacadeError, Translate};
use super::history::CommitHistory;
use super::records::{
    Author, BranchFilter, CommitRecord, DiffEntry, ReferenceRecord, WorktreeStatus,
};
use crate::core::config::Settings;
use crate::core::types::{BranchName, Oid, RefName};

/// An open repository.
///
/// Created by [`open`](Self::open), [`init`](Self::init) or
/// [`clone`](Self::clone); released by [`close`](Self::close) or drop.
///
/// # Example
///
/// ```no_run
/// use stablegit::git::{Author, RepositoryHandle};
/// use std::path::Path;
///
/// let repo = RepositoryHandle::open(Path::new("."))?;
/// let head = repo.head()?;
/// for commit in repo.list_commits("HEAD")?.take(10) {
///     let commit = commit?;
///     println!("{} {}", commit.id.short(7), commit.summary);
/// }
///
/// repo.stage(&["README.md"])?;
/// let record = repo.commit("Update readme", &Author::new("Alice", "alice@example.com"))?;
/// assert_eq!(record.parents, vec![head.target]);
/// # Ok::<(), stablegit::git::FacadeError>(())
/// ```
pub struct RepositoryHandle {
    repo: git2::Repository,
    settings: Settings,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("path", &self.repo.path())
            .field("settings", &self.settings)
            .finish()
    }
}

impl RepositoryHandle {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the repository at `path` with default settings.
    ///
    /// `path` must be the working directory or the git directory itself;
    /// parent directories are not searched unless
    /// [`Settings::discover`] is set (see [`open_with`](Self::open_with)).
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NotFound`] if no repository exists at `path`
    /// - [`FacadeError::CorruptRepository`] if the repository is malformed
    pub fn open(path: &Path) -> Result<Self, FacadeError> {
        Self::open_with(path, Settings::default())
    }

    /// Open the repository at `path` with explicit settings.
    #[instrument(skip_all, fields(path = %path.display(), discover = settings.discover))]
    pub fn open_with(path: &Path, settings: Settings) -> Result<Self, FacadeError> {
        if !path.exists() {
            return Err(FacadeError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let flags = if settings.discover {
            git2::RepositoryOpenFlags::empty()
        } else {
            git2::RepositoryOpenFlags::NO_SEARCH
        };
        let repo = git2::Repository::open_ext(path, flags, std::iter::empty::<&std::ffi::OsStr>())
            .translate(Context::Open(path))?;

        Self::probe_head(&repo, path)?;
        debug!(git_dir = %repo.path().display(), "opened repository");

        Ok(Self { repo, settings })
    }

    /// Read `HEAD` once so a malformed repository fails at open time
    /// instead of on first use.
    fn probe_head(repo: &git2::Repository, path: &Path) -> Result<(), FacadeError> {
        match repo.head() {
            Ok(_) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(()),
            Err(e) => Err(FacadeError::CorruptRepository {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            }),
        }
    }

    /// Create a new (non-bare) repository at `path` with default settings.
    ///
    /// Missing parent directories are created. Initializing an existing
    /// repository is harmless and returns a handle to it.
    pub fn init(path: &Path) -> Result<Self, FacadeError> {
        Self::init_with(path, Settings::default())
    }

    /// Create a new repository at `path`, honoring
    /// [`Settings::initial_branch`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn init_with(path: &Path, settings: Settings) -> Result<Self, FacadeError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.mkpath(true);
        if let Some(branch) = &settings.initial_branch {
            opts.initial_head(branch.as_str());
        }

        let repo = git2::Repository::init_opts(path, &opts).translate(Context::Open(path))?;
        debug!(git_dir = %repo.path().display(), "initialized repository");

        Ok(Self { repo, settings })
    }

    /// Clone `url` into `dest`.
    ///
    /// `dest` includes the repository's own directory name. Only the
    /// transports built into the wrapped library are available; with the
    /// default build that means local paths and `file://` URLs.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::DestinationExists`] if `dest` exists
    /// - [`FacadeError::NotFound`] if nothing can be cloned from `url`
    #[instrument(skip_all, fields(url = url, dest = %dest.display(), bare = bare))]
    pub fn clone(url: &str, dest: &Path, bare: bool) -> Result<Self, FacadeError> {
        if dest.exists() {
            return Err(FacadeError::DestinationExists {
                path: dest.to_path_buf(),
            });
        }

        if let Some(source) = local_source(url) {
            if !source.exists() {
                return Err(FacadeError::NotFound {
                    path: source.to_path_buf(),
                });
            }
        }

        let repo = git2::build::RepoBuilder::new()
            .bare(bare)
            .clone(url, dest)
            .translate(Context::Open(Path::new(url)))?;
        debug!("cloned repository");

        Ok(Self {
            repo,
            settings: Settings::default(),
        })
    }

    /// Release the repository.
    ///
    /// Equivalent to dropping the handle; provided so the release point can
    /// be explicit.
    pub fn close(self) {
        debug!(git_dir = %self.repo.path().display(), "closing repository");
    }

    /// Path to the git directory (`.git` for normal repositories).
    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    /// Path to the working directory, `None` for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Whether the repository has no working directory.
    pub fn is_bare(&self) -> bool {
        self.repo.is_bare()
    }

    /// The settings this handle was opened with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn require_workdir(&self) -> Result<&Path, FacadeError> {
        self.repo.workdir().ok_or(FacadeError::BareRepository)
    }

    // =========================================================================
    // HEAD and Branches
    // =========================================================================

    /// The reference `HEAD` currently resolves to.
    ///
    /// On a branch the record is named after the branch
    /// (`refs/heads/main`); when detached it is named `HEAD`.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::UnbornBranch`] if there are no commits yet
    pub fn head(&self) -> Result<ReferenceRecord, FacadeError> {
        let head = self.repo.head().translate(Context::Resolve("HEAD"))?;
        adapt::reference_record(&head)?.ok_or_else(|| FacadeError::UnderlyingLibrary {
            message: "HEAD has no resolvable target".to_string(),
        })
    }

    /// The branch `HEAD` names, whether or not it has commits yet.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::DetachedHead`] if `HEAD` is detached
    pub fn current_branch(&self) -> Result<BranchName, FacadeError> {
        if self.is_head_detached()? {
            return Err(FacadeError::DetachedHead);
        }

        let head = self
            .repo
            .find_reference("HEAD")
            .translate(Context::Resolve("HEAD"))?;
        let target = head.symbolic_target().ok_or(FacadeError::DetachedHead)?;
        let name = target
            .strip_prefix("refs/heads/")
            .ok_or_else(|| FacadeError::UnderlyingLibrary {
                message: format!("HEAD points outside refs/heads: {}", target),
            })?;

        Ok(BranchName::new(name)?)
    }

    fn is_head_detached(&self) -> Result<bool, FacadeError> {
        self.repo.head_detached().translate(Context::Resolve("HEAD"))
    }

    /// The remote-tracking branch the current branch follows
    /// (e.g. `origin/main`), or `None` if it has no upstream.
    pub fn upstream_branch(&self) -> Result<Option<String>, FacadeError> {
        let name = self.current_branch()?;
        let branch = match self.repo.find_branch(name.as_str(), git2::BranchType::Local) {
            Ok(b) => b,
            // Unborn branches have no ref yet, hence no upstream
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(classify(e, Context::Branch(name.as_str()))),
        };

        match branch.upstream() {
            Ok(upstream) => Ok(upstream.name().ok().flatten().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(classify(e, Context::Branch(name.as_str()))),
        }
    }

    /// List branch names.
    ///
    /// Local branches are reported by short name (`main`), remote-tracking
    /// branches as `<remote>/<branch>`. Names that are not UTF-8 are skipped.
    pub fn list_branches(&self, filter: BranchFilter) -> Result<Vec<String>, FacadeError> {
        let branch_type = match filter {
            BranchFilter::Local => Some(git2::BranchType::Local),
            BranchFilter::Remote => Some(git2::BranchType::Remote),
            BranchFilter::All => None,
        };

        let branches = self
            .repo
            .branches(branch_type)
            .translate(Context::Op("list branches"))?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.translate(Context::Op("list branches"))?;
            if let Some(name) = branch.name().ok().flatten() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    /// Create a local branch pointing at the commit `at_rev` resolves to.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::RefConflict`] if the branch already exists
    /// - [`FacadeError::NoSuchRef`] if `at_rev` does not resolve
    #[instrument(skip(self), fields(path = %self.repo.path().display()))]
    pub fn create_branch(&self, name: &str, at_rev: &str) -> Result<ReferenceRecord, FacadeError> {
        let branch_name = BranchName::new(name)?;
        let target = self.resolve_commit(at_rev)?;

        let branch = self
            .repo
            .branch(branch_name.as_str(), &target, false)
            .translate(Context::Branch(name))?;

        adapt::reference_record(branch.get())?.ok_or_else(|| FacadeError::UnderlyingLibrary {
            message: format!("created branch {} has no target", name),
        })
    }

    /// Check out a local branch and point `HEAD` at it.
    ///
    /// Uses a safe checkout: local modifications that would be overwritten
    /// make the operation fail instead of being discarded.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchBranch`] if the branch does not exist
    /// - [`FacadeError::BareRepository`] on a bare repository
    #[instrument(skip(self), fields(path = %self.repo.path().display()))]
    pub fn checkout(&self, name: &str) -> Result<(), FacadeError> {
        self.require_workdir()?;

        let branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .translate(Context::Branch(name))?;
        let reference = branch.into_reference();
        let refname = reference
            .name()
            .ok_or_else(|| FacadeError::NoSuchBranch {
                name: name.to_string(),
            })?
            .to_string();
        let tree = reference
            .peel_to_tree()
            .translate(Context::Branch(name))?;

        let mut opts = git2::build::CheckoutBuilder::new();
        opts.safe();
        self.repo
            .checkout_tree(tree.as_object(), Some(&mut opts))
            .translate(Context::Op("checkout"))?;
        self.repo
            .set_head(&refname)
            .translate(Context::Resolve(&refname))?;

        debug!(branch = name, "checked out branch");
        Ok(())
    }

    /// The commit at the tip of a local branch.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchBranch`] if the branch does not exist
    pub fn head_of_branch(&self, name: &str) -> Result<CommitRecord, FacadeError> {
        let branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .translate(Context::Branch(name))?;
        let commit = branch
            .get()
            .peel_to_commit()
            .translate(Context::Branch(name))?;
        adapt::commit_record(&commit)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Resolve a revision string to a commit.
    ///
    /// `HEAD` is read directly so an unborn branch is reported as such;
    /// everything else goes through revision parsing (branch names, full
    /// ref names, ids, `HEAD~2` and friends).
    fn resolve_commit(&self, rev: &str) -> Result<git2::Commit<'_>, FacadeError> {
        if rev == "HEAD" {
            let head = self.repo.head().translate(Context::Resolve(rev))?;
            return head.peel_to_commit().translate(Context::Resolve(rev));
        }

        let object = self
            .repo
            .revparse_single(rev)
            .translate(Context::Resolve(rev))?;
        object.peel_to_commit().translate(Context::Resolve(rev))
    }

    /// Read a single commit.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchRef`] if `rev` does not resolve
    /// - [`FacadeError::UnbornBranch`] if `rev` is `HEAD` and there are no commits
    pub fn find_commit(&self, rev: &str) -> Result<CommitRecord, FacadeError> {
        adapt::commit_record(&self.resolve_commit(rev)?)
    }

    /// Walk history starting at `from`, newest first.
    ///
    /// The returned iterator is lazy and finite; calling this again starts
    /// a new, independent walk. `from` may be `HEAD`, a branch, a full ref
    /// name or a commit id.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::UnbornBranch`] if `from` is `HEAD` and there are no commits
    /// - [`FacadeError::NoSuchRef`] if `from` does not resolve
    pub fn list_commits(&self, from: &str) -> Result<CommitHistory<'_>, FacadeError> {
        let tip = self.resolve_commit(from)?.id();
        CommitHistory::start(&self.repo, tip)
    }

    // =========================================================================
    // Staging and Committing
    // =========================================================================

    /// Add paths to the index.
    ///
    /// Paths are relative to the working directory. A path that is tracked
    /// but gone from disk is staged as a deletion.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchPath`] if a path neither exists nor is tracked
    /// - [`FacadeError::InvalidArgument`] for absolute paths
    /// - [`FacadeError::BareRepository`] on a bare repository
    #[instrument(skip_all, fields(path = %self.repo.path().display(), count = paths.len()))]
    pub fn stage<S: AsRef<str>>(&self, paths: &[S]) -> Result<(), FacadeError> {
        let workdir = self.require_workdir()?;
        let mut index = self.repo.index().translate(Context::Op("open index"))?;

        for path in paths {
            let path = path.as_ref();
            let relative = Path::new(path);
            if relative.is_absolute() {
                return Err(FacadeError::InvalidArgument {
                    message: format!("path must be relative to the working directory: {}", path),
                });
            }

            if workdir.join(relative).exists() {
                index.add_path(relative).translate(Context::Stage(path))?;
            } else if index.get_path(relative, 0).is_some() {
                index.remove_path(relative).translate(Context::Stage(path))?;
            } else {
                return Err(FacadeError::NoSuchPath {
                    path: path.to_string(),
                });
            }
        }

        index.write().translate(Context::Op("write index"))
    }

    /// Commit the staged changes plus any changes to tracked files.
    ///
    /// Modified and deleted tracked files are staged first (like
    /// `git commit -a`); untracked files are left alone. The new commit
    /// advances the current branch, creating it if unborn.
    ///
    /// Staging happens before the emptiness check, so a failed commit can
    /// leave tracked changes staged.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NothingToCommit`] if the tree would not change
    /// - [`FacadeError::DetachedHead`] if `HEAD` is detached
    /// - [`FacadeError::BareRepository`] on a bare repository
    #[instrument(skip_all, fields(path = %self.repo.path().display()))]
    pub fn commit(&self, message: &str, author: &Author) -> Result<CommitRecord, FacadeError> {
        self.require_workdir()?;
        let parent = self.commit_parent()?;

        let mut index = self.repo.index().translate(Context::Op("open index"))?;
        index
            .update_all(["*"], None)
            .translate(Context::Op("stage tracked changes"))?;
        index.write().translate(Context::Op("write index"))?;
        let tree_id = index.write_tree().translate(Context::Op("write tree"))?;

        let unchanged = match &parent {
            Some(p) => p.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            debug!("index matches parent tree, nothing to commit");
            return Err(FacadeError::NothingToCommit);
        }

        let tree = self.repo.find_tree(tree_id).translate(Context::Op("read tree"))?;
        let signature = adapt::git_signature(author)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let id = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .translate(Context::Op("create commit"))?;
        debug!(id = %id, parents = parents.len(), "created commit");

        let commit = self.repo.find_commit(id).translate(Context::Op("read commit"))?;
        adapt::commit_record(&commit)
    }

    /// Stage `files`, then [`commit`](Self::commit).
    pub fn commit_files<S: AsRef<str>>(
        &self,
        message: &str,
        files: &[S],
        author: &Author,
    ) -> Result<CommitRecord, FacadeError> {
        self.stage(files)?;
        self.commit(message, author)
    }

    /// The commit a new commit would have as its parent.
    ///
    /// `None` on an unborn branch. Detached-head commits are refused.
    fn commit_parent(&self) -> Result<Option<git2::Commit<'_>>, FacadeError> {
        if self.is_head_detached()? {
            return Err(FacadeError::DetachedHead);
        }

        match self.repo.head() {
            Ok(head) => Ok(Some(
                head.peel_to_commit().translate(Context::Resolve("HEAD"))?,
            )),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(classify(e, Context::Resolve("HEAD"))),
        }
    }

    /// Identity for new commits when the caller has none.
    ///
    /// Configured settings win; otherwise `user.name` and `user.email` from
    /// the repository's git configuration are used.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::MissingIdentity`] if either value is missing
    pub fn default_author(&self) -> Result<Author, FacadeError> {
        if let (Some(name), Some(email)) = (&self.settings.author_name, &self.settings.author_email)
        {
            return Ok(Author::new(name, email));
        }

        let mut config = self.repo.config().translate(Context::Op("read config"))?;
        let snapshot = config.snapshot().translate(Context::Op("read config"))?;

        let name = self
            .settings
            .author_name
            .clone()
            .or_else(|| snapshot.get_string("user.name").ok());
        let email = self
            .settings
            .author_email
            .clone()
            .or_else(|| snapshot.get_string("user.email").ok());

        match (name, email) {
            (Some(name), Some(email)) => Ok(Author::new(name, email)),
            _ => Err(FacadeError::MissingIdentity),
        }
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    fn statuses(&self, include_untracked: bool) -> Result<git2::Statuses<'_>, FacadeError> {
        self.require_workdir()?;

        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false);

        self.repo
            .statuses(Some(&mut opts))
            .translate(Context::Op("read status"))
    }

    /// Tracked files modified or deleted in the working tree.
    pub fn files_changed(&self) -> Result<Vec<String>, FacadeError> {
        let statuses = self.statuses(false)?;
        let paths = statuses
            .iter()
            .filter(|e| e.status().is_wt_modified() || e.status().is_wt_deleted())
            .map(|e| String::from_utf8_lossy(e.path_bytes()).into_owned())
            .collect();
        Ok(paths)
    }

    /// Files present in the working tree but not tracked (ignored files
    /// excluded).
    pub fn files_untracked(&self) -> Result<Vec<String>, FacadeError> {
        let statuses = self.statuses(true)?;
        let paths = statuses
            .iter()
            .filter(|e| e.status().is_wt_new())
            .map(|e| String::from_utf8_lossy(e.path_bytes()).into_owned())
            .collect();
        Ok(paths)
    }

    /// Working tree status summary.
    pub fn status(&self) -> Result<WorktreeStatus, FacadeError> {
        let statuses = self.statuses(true)?;
        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }

            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }

            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }

            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    // =========================================================================
    // Diffs
    // =========================================================================

    /// Paths that differ between the trees of two commits.
    ///
    /// Renames are detected according to the handle's settings. Entries
    /// come back in the wrapped library's delta order, which today is
    /// byte-wise by path; sort the result if you need a guaranteed order.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchRef`] if either revision does not resolve
    pub fn diff(&self, from: &str, to: &str) -> Result<Vec<DiffEntry>, FacadeError> {
        let old = self.commit_tree(&self.resolve_commit(from)?)?;
        let new = self.commit_tree(&self.resolve_commit(to)?)?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old), Some(&new), None)
            .translate(Context::Op("diff trees"))?;
        self.collect_entries(diff)
    }

    /// Paths changed by a single commit relative to its parent.
    ///
    /// A root commit is compared with the empty tree. Merge commits have no
    /// single parent to compare with and yield an empty list.
    pub fn diff_commit(&self, rev: &str) -> Result<Vec<DiffEntry>, FacadeError> {
        let commit = self.resolve_commit(rev)?;
        let tree = self.commit_tree(&commit)?;

        let parent_tree = match commit.parent_count() {
            0 => None,
            1 => {
                let parent = commit.parent(0).translate(Context::Op("read parent"))?;
                Some(self.commit_tree(&parent)?)
            }
            n => {
                debug!(parents = n, "merge commit, no single-parent diff");
                return Ok(Vec::new());
            }
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .translate(Context::Op("diff commit"))?;
        self.collect_entries(diff)
    }

    /// Paths that differ between `HEAD` and the working directory,
    /// including staged changes. Untracked files are not reported.
    pub fn diff_workdir(&self) -> Result<Vec<DiffEntry>, FacadeError> {
        self.require_workdir()?;

        let head_tree = match self.resolve_commit("HEAD") {
            Ok(commit) => Some(self.commit_tree(&commit)?),
            Err(FacadeError::UnbornBranch) => None,
            Err(e) => return Err(e),
        };

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(head_tree.as_ref(), None)
            .translate(Context::Op("diff working directory"))?;
        self.collect_entries(diff)
    }

    fn commit_tree<'r>(&'r self, commit: &git2::Commit<'r>) -> Result<git2::Tree<'r>, FacadeError> {
        commit.tree().translate(Context::Op("read commit tree"))
    }

    fn collect_entries(&self, mut diff: git2::Diff<'_>) -> Result<Vec<DiffEntry>, FacadeError> {
        if self.settings.detect_renames {
            let mut opts = git2::DiffFindOptions::new();
            opts.renames(true)
                .rename_threshold(self.settings.rename_threshold);
            diff.find_similar(Some(&mut opts))
                .translate(Context::Op("detect renames"))?;
        }

        let entries = diff
            .deltas()
            .filter_map(|delta| adapt::diff_entry(&delta))
            .collect();
        Ok(entries)
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Tag names, without the `refs/tags/` prefix.
    pub fn list_tags(&self) -> Result<Vec<String>, FacadeError> {
        let names = self.repo.tag_names(None).translate(Context::Op("list tags"))?;
        let tags = names.iter().flatten().map(String::from).collect();
        Ok(tags)
    }

    /// Create an annotated tag on `rev` (default `HEAD`).
    ///
    /// Returns the id of the new tag object.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::RefConflict`] if the tag already exists
    /// - [`FacadeError::InvalidArgument`] if `name` is not a valid tag name
    #[instrument(skip(self, message, tagger), fields(path = %self.repo.path().display()))]
    pub fn tag(
        &self,
        name: &str,
        rev: Option<&str>,
        message: &str,
        tagger: &Author,
    ) -> Result<Oid, FacadeError> {
        let refname = RefName::for_tag(name)?;
        let target = self.resolve_commit(rev.unwrap_or("HEAD"))?;
        let signature = adapt::git_signature(tagger)?;

        let id = self
            .repo
            .tag(name, target.as_object(), &signature, message, false)
            .translate(Context::Resolve(refname.as_str()))?;

        adapt::oid(id)
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Read a reference by full name.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchRef`] if the reference does not exist
    pub fn find_reference(&self, name: &str) -> Result<ReferenceRecord, FacadeError> {
        let reference = self
            .repo
            .find_reference(name)
            .translate(Context::Resolve(name))?;
        adapt::reference_record(&reference)?.ok_or_else(|| FacadeError::NoSuchRef {
            name: name.to_string(),
        })
    }

    /// List references whose names start with `prefix`.
    ///
    /// References the facade cannot represent (non-UTF-8 or invalid names,
    /// symbolic refs to nowhere) are skipped.
    pub fn list_references(&self, prefix: &str) -> Result<Vec<ReferenceRecord>, FacadeError> {
        let pattern = format!("{}*", prefix);
        let refs = self
            .repo
            .references_glob(&pattern)
            .translate(Context::Op("list references"))?;

        let mut records = Vec::new();
        for reference in refs {
            let reference = reference.translate(Context::Op("list references"))?;
            if let Some(record) = adapt::reference_record(&reference)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Create or move a reference with compare-and-swap semantics.
    ///
    /// The update only happens if the reference currently points at
    /// `expected_old`; `None` means the reference must not exist yet.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::RefConflict`] if the current value differs
    /// - [`FacadeError::InvalidArgument`] if `name` is invalid or symbolic,
    ///   or `target` is not in the object database
    #[instrument(skip(self, log_message), fields(path = %self.repo.path().display()))]
    pub fn set_reference(
        &self,
        name: &str,
        target: &Oid,
        expected_old: Option<&Oid>,
        log_message: &str,
    ) -> Result<(), FacadeError> {
        let refname = RefName::new(name)?;
        let new_id = adapt::git_oid(target)?;
        if self.repo.find_object(new_id, None).is_err() {
            return Err(FacadeError::InvalidArgument {
                message: format!("object does not exist: {}", target),
            });
        }

        let current = self.current_target(refname.as_str())?;
        check_expected(refname.as_str(), expected_old, current.as_ref())?;

        let result = match expected_old {
            None => self.repo.reference(refname.as_str(), new_id, false, log_message),
            Some(expected) => self.repo.reference_matching(
                refname.as_str(),
                new_id,
                true,
                adapt::git_oid(expected)?,
                log_message,
            ),
        };

        result.map(|_| ()).map_err(|e| match e.code() {
            // Lost a race with another writer between the check and the write
            git2::ErrorCode::Exists | git2::ErrorCode::Modified => FacadeError::RefConflict {
                name: refname.to_string(),
                expected: describe(expected_old),
                actual: "<changed>".to_string(),
            },
            _ => classify(e, Context::Resolve(refname.as_str())),
        })
    }

    /// Delete a reference with compare-and-swap semantics.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NoSuchRef`] if the reference does not exist
    /// - [`FacadeError::RefConflict`] if it does not point at `expected_old`
    /// - [`FacadeError::InvalidArgument`] if it is a symbolic reference
    #[instrument(skip(self), fields(path = %self.repo.path().display()))]
    pub fn delete_reference(&self, name: &str, expected_old: &Oid) -> Result<(), FacadeError> {
        let current = self.current_target(name)?.ok_or_else(|| FacadeError::NoSuchRef {
            name: name.to_string(),
        })?;
        check_expected(name, Some(expected_old), Some(&current))?;

        let mut reference = self
            .repo
            .find_reference(name)
            .translate(Context::Resolve(name))?;
        reference.delete().translate(Context::Resolve(name))
    }

    /// Direct target of a reference, without peeling. `Ok(None)` if it
    /// does not exist.
    ///
    /// Symbolic references (such as `HEAD`) are rejected: a compare-and-swap
    /// on them can never succeed against a direct id.
    fn current_target(&self, name: &str) -> Result<Option<Oid>, FacadeError> {
        match self.repo.find_reference(name) {
            Ok(reference) => {
                if reference.kind() == Some(git2::ReferenceType::Symbolic) {
                    return Err(FacadeError::InvalidArgument {
                        message: format!("{} is a symbolic reference", name),
                    });
                }
                match reference.target() {
                    Some(id) => Ok(Some(adapt::oid(id)?)),
                    None => Ok(None),
                }
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(classify(e, Context::Resolve(name))),
        }
    }
}

/// The filesystem path a clone source names, if it is local.
///
/// Plain paths and `file://` URLs are local; anything else with a scheme
/// (or scp-style `host:path`) is left to the transport.
fn local_source(url: &str) -> Option<&Path> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(Path::new(path));
    }
    if url.contains("://") {
        return None;
    }
    // scp-style `user@host:path`; a colon before any slash marks a remote
    match (url.find(':'), url.find('/')) {
        (Some(colon), Some(slash)) if colon < slash => None,
        (Some(_), None) => None,
        _ => Some(Path::new(url)),
    }
}

fn describe(oid: Option<&Oid>) -> String {
    oid.map(|o| o.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

/// Verify a compare-and-swap precondition.
fn check_expected(name: &str, expected: Option<&Oid>, actual: Option<&Oid>) -> Result<(), FacadeError> {
    if expected == actual {
        return Ok(());
    }
    Err(FacadeError::RefConflict {
        name: name.to_string(),
        expected: describe(expected),
        actual: describe(actual),
    })
}
