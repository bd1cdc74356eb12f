//! git::error
//!
//! The facade's closed error taxonomy and the translation from the wrapped
//! library's errors into it.
//!
//! [`FacadeError`] has no variant and no `From` impl that
//! mentions a `git2` type. Upstream errors are classified by
//! [`classify`] at each call site, using a [`Context`] that says what the
//! facade was doing; only the upstream message survives.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::TypeError;

/// Errors from facade operations.
///
/// Upgrading the wrapped library must never change which variant a caller
/// sees for a given situation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FacadeError {
    /// No repository exists at the path.
    #[error("no repository found at {}", path.display())]
    NotFound {
        /// The path that was opened
        path: PathBuf,
    },

    /// The repository exists but its data is malformed.
    #[error("corrupt repository at {}: {message}", path.display())]
    CorruptRepository {
        /// The repository path
        path: PathBuf,
        /// What the wrapped library reported
        message: String,
    },

    /// `HEAD` names a branch that has no commits yet.
    #[error("branch has no commits yet")]
    UnbornBranch,

    /// The commit would not change anything.
    #[error("nothing to commit")]
    NothingToCommit,

    /// `HEAD` is detached; the operation needs a named branch.
    #[error("HEAD is detached")]
    DetachedHead,

    /// The operation needs a working directory.
    #[error("bare repository has no working directory")]
    BareRepository,

    /// A revision or reference does not resolve.
    #[error("no such reference: {name}")]
    NoSuchRef {
        /// The revision or ref name as given
        name: String,
    },

    /// A local branch does not exist.
    #[error("no such branch: {name}")]
    NoSuchBranch {
        /// The branch name as given
        name: String,
    },

    /// A path to stage neither exists on disk nor is tracked.
    #[error("no such path: {path}")]
    NoSuchPath {
        /// The path relative to the working directory
        path: String,
    },

    /// A clone destination already exists.
    #[error("destination already exists: {}", path.display())]
    DestinationExists {
        /// The destination path
        path: PathBuf,
    },

    /// A reference update's precondition failed.
    #[error("ref conflict on {name}: expected {expected}, found {actual}")]
    RefConflict {
        /// The ref being updated
        name: String,
        /// The expected old value (`<none>` for "must not exist")
        expected: String,
        /// The actual current value (`<none>` if absent)
        actual: String,
    },

    /// No author identity is configured anywhere.
    #[error("no author identity configured (set user.name and user.email)")]
    MissingIdentity,

    /// A caller-supplied name or id failed validation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem
        message: String,
    },

    /// Any other failure reported by the wrapped library.
    #[error("underlying library error: {message}")]
    UnderlyingLibrary {
        /// The wrapped library's message
        message: String,
    },
}

impl From<TypeError> for FacadeError {
    fn from(err: TypeError) -> Self {
        FacadeError::InvalidArgument {
            message: err.to_string(),
        }
    }
}

/// What the facade was doing when the wrapped library failed.
///
/// The same upstream error code means different things in different
/// places (a `NotFound` while opening is a missing repository, while
/// resolving a revision it is a missing ref), so classification always
/// needs one of these.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Context<'a> {
    /// Opening or initializing the repository at a path.
    Open(&'a std::path::Path),
    /// Resolving a revision string or reference name.
    Resolve(&'a str),
    /// Looking up a local branch by name.
    Branch(&'a str),
    /// Staging a working-tree path.
    Stage(&'a str),
    /// Anything else; the label is prefixed to the message.
    Op(&'a str),
}

/// Translate a wrapped-library error into a [`FacadeError`].
pub(crate) fn classify(err: git2::Error, ctx: Context<'_>) -> FacadeError {
    use git2::ErrorCode;

    tracing::debug!(
        code = ?err.code(),
        class = ?err.class(),
        context = ?ctx,
        "translating git2 error: {}",
        err.message()
    );

    let message = err.message().to_string();

    // Codes that mean the same thing regardless of context
    match err.code() {
        ErrorCode::UnbornBranch => return FacadeError::UnbornBranch,
        ErrorCode::BareRepo => return FacadeError::BareRepository,
        _ => {}
    }

    match ctx {
        Context::Open(path) => match err.code() {
            ErrorCode::NotFound => FacadeError::NotFound {
                path: path.to_path_buf(),
            },
            _ if is_corruption_class(err.class()) => FacadeError::CorruptRepository {
                path: path.to_path_buf(),
                message,
            },
            _ => FacadeError::UnderlyingLibrary { message },
        },
        Context::Resolve(name) => match err.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous => {
                FacadeError::NoSuchRef {
                    name: name.to_string(),
                }
            }
            ErrorCode::Exists => FacadeError::RefConflict {
                name: name.to_string(),
                expected: "<none>".to_string(),
                actual: "<exists>".to_string(),
            },
            ErrorCode::Peel => FacadeError::InvalidArgument {
                message: format!("{} does not name a commit", name),
            },
            _ => FacadeError::UnderlyingLibrary {
                message: format!("{}: {}", name, message),
            },
        },
        Context::Branch(name) => match err.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec => FacadeError::NoSuchBranch {
                name: name.to_string(),
            },
            ErrorCode::Exists => FacadeError::RefConflict {
                name: format!("refs/heads/{}", name),
                expected: "<none>".to_string(),
                actual: "<exists>".to_string(),
            },
            _ => FacadeError::UnderlyingLibrary {
                message: format!("{}: {}", name, message),
            },
        },
        Context::Stage(path) => match err.code() {
            ErrorCode::NotFound => FacadeError::NoSuchPath {
                path: path.to_string(),
            },
            _ => FacadeError::UnderlyingLibrary {
                message: format!("{}: {}", path, message),
            },
        },
        Context::Op(label) => FacadeError::UnderlyingLibrary {
            message: format!("{}: {}", label, message),
        },
    }
}

/// Error classes that indicate malformed repository data rather than an
/// environmental failure.
fn is_corruption_class(class: git2::ErrorClass) -> bool {
    use git2::ErrorClass;

    matches!(
        class,
        ErrorClass::Repository
            | ErrorClass::Reference
            | ErrorClass::Odb
            | ErrorClass::Object
            | ErrorClass::Index
            | ErrorClass::Zlib
            | ErrorClass::Config
            | ErrorClass::Tree
    )
}

/// Shorthand for `map_err(|e| classify(e, ctx))`.
pub(crate) trait Translate<T> {
    fn translate(self, ctx: Context<'_>) -> Result<T, FacadeError>;
}

impl<T> Translate<T> for Result<T, git2::Error> {
    fn translate(self, ctx: Context<'_>) -> Result<T, FacadeError> {
        self.map_err(|e| classify(e, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{ErrorClass, ErrorCode};
    use std::path::Path;

    fn upstream(code: ErrorCode, class: ErrorClass, msg: &str) -> git2::Error {
        git2::Error::new(code, class, msg)
    }

    mod classify {
        use super::*;

        #[test]
        fn open_not_found_is_not_found() {
            let err = upstream(ErrorCode::NotFound, ErrorClass::Repository, "could not find");
            let path = Path::new("/nowhere");
            assert_eq!(
                classify(err, Context::Open(path)),
                FacadeError::NotFound {
                    path: path.to_path_buf()
                }
            );
        }

        #[test]
        fn open_repository_class_is_corrupt() {
            let err = upstream(
                ErrorCode::GenericError,
                ErrorClass::Reference,
                "corrupted loose reference file: HEAD",
            );
            let result = classify(err, Context::Open(Path::new("/repo")));
            match result {
                FacadeError::CorruptRepository { message, .. } => {
                    assert!(message.contains("corrupted loose reference"));
                }
                other => panic!("expected CorruptRepository, got {other:?}"),
            }
        }

        #[test]
        fn open_os_failure_is_underlying() {
            let err = upstream(ErrorCode::GenericError, ErrorClass::Os, "permission denied");
            assert!(matches!(
                classify(err, Context::Open(Path::new("/repo"))),
                FacadeError::UnderlyingLibrary { .. }
            ));
        }

        #[test]
        fn unborn_wins_over_context() {
            let err = upstream(ErrorCode::UnbornBranch, ErrorClass::Reference, "unborn");
            assert_eq!(
                classify(err, Context::Resolve("HEAD")),
                FacadeError::UnbornBranch
            );
        }

        #[test]
        fn resolve_failures_are_no_such_ref() {
            for code in [ErrorCode::NotFound, ErrorCode::InvalidSpec, ErrorCode::Ambiguous] {
                let err = upstream(code, ErrorClass::Reference, "nope");
                assert_eq!(
                    classify(err, Context::Resolve("refs/heads/x")),
                    FacadeError::NoSuchRef {
                        name: "refs/heads/x".to_string()
                    }
                );
            }
        }

        #[test]
        fn branch_not_found_is_no_such_branch() {
            let err = upstream(ErrorCode::NotFound, ErrorClass::Reference, "nope");
            assert_eq!(
                classify(err, Context::Branch("feature")),
                FacadeError::NoSuchBranch {
                    name: "feature".to_string()
                }
            );
        }

        #[test]
        fn branch_exists_is_conflict() {
            let err = upstream(ErrorCode::Exists, ErrorClass::Reference, "exists");
            assert!(matches!(
                classify(err, Context::Branch("feature")),
                FacadeError::RefConflict { name, .. } if name == "refs/heads/feature"
            ));
        }

        #[test]
        fn stage_not_found_is_no_such_path() {
            let err = upstream(ErrorCode::NotFound, ErrorClass::Os, "could not find");
            assert_eq!(
                classify(err, Context::Stage("a.txt")),
                FacadeError::NoSuchPath {
                    path: "a.txt".to_string()
                }
            );
        }

        #[test]
        fn stage_other_os_failure_is_underlying() {
            let err = upstream(ErrorCode::GenericError, ErrorClass::Os, "permission denied");
            assert_eq!(
                classify(err, Context::Stage("secret.txt")),
                FacadeError::UnderlyingLibrary {
                    message: "secret.txt: permission denied".to_string()
                }
            );
        }

        #[test]
        fn op_keeps_message_only() {
            let err = upstream(ErrorCode::Locked, ErrorClass::Index, "index is locked");
            assert_eq!(
                classify(err, Context::Op("write index")),
                FacadeError::UnderlyingLibrary {
                    message: "write index: index is locked".to_string()
                }
            );
        }
    }

    #[test]
    fn type_error_becomes_invalid_argument() {
        let err: FacadeError = TypeError::InvalidOid("bad".into()).into();
        assert!(matches!(err, FacadeError::InvalidArgument { message } if message.contains("bad")));
    }

    #[test]
    fn display_formatting() {
        let err = FacadeError::RefConflict {
            name: "refs/heads/main".to_string(),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ref conflict on refs/heads/main: expected abc, found def"
        );
        assert_eq!(FacadeError::NothingToCommit.to_string(), "nothing to commit");
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<FacadeError>();
    }
}
