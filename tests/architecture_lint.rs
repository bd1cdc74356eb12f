//! Architecture enforcement tests.
//!
//! The crate's public surface must not leak the wrapped git binding. These
//! tests read the source tree and fail when:
//!
//! 1. Any module outside `src/git/` names `git2`
//! 2. Anything re-exports `git2` or its types
//! 3. A public function signature in the facade mentions a `git2` type
//! 4. `FacadeError` grows a `From` impl or field carrying a `git2` type

use std::fs;
use std::path::{Path, PathBuf};

/// Recursively collect `.rs` files under `dir`.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).unwrap_or_else(|_| panic!("Failed to read {}", dir.display()));
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().is_some_and(|e| e == "rs") {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()))
}

/// Lines of code with line comments and doc comments removed.
fn code_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content.lines().enumerate().filter_map(|(i, line)| {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") {
            None
        } else {
            Some((i + 1, line))
        }
    })
}

/// Collect `pub fn` signatures, joining continuation lines up to the
/// opening brace.
fn public_signatures(content: &str) -> Vec<(usize, String)> {
    let mut signatures = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (line_no, line) in code_lines(content) {
        let trimmed = line.trim();
        if current.is_none() && trimmed.starts_with("pub fn ") {
            current = Some((line_no, String::new()));
        }
        if let Some((_, sig)) = current.as_mut() {
            sig.push_str(trimmed);
            sig.push(' ');
            if trimmed.ends_with('{') || trimmed.ends_with(';') {
                signatures.push(current.take().unwrap());
            }
        }
    }

    signatures
}

#[test]
fn only_git_module_names_git2() {
    let src = src_dir();
    let git_dir = src.join("git");
    let mut violations = Vec::new();

    for file in rust_files(&src) {
        if file.starts_with(&git_dir) {
            continue;
        }
        let content = read(&file);
        for (line_no, line) in code_lines(&content) {
            if line.contains("git2") {
                violations.push(format!("{}:{}: {}", file.display(), line_no, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "git2 used outside src/git/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn nothing_reexports_git2() {
    let mut violations = Vec::new();

    for file in rust_files(&src_dir()) {
        let content = read(&file);
        for (line_no, line) in code_lines(&content) {
            let trimmed = line.trim();
            if trimmed.starts_with("pub use") && trimmed.contains("git2") {
                violations.push(format!("{}:{}: {}", file.display(), line_no, trimmed));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "git2 re-exported:\n{}",
        violations.join("\n")
    );
}

#[test]
fn public_facade_signatures_are_git2_free() {
    let git_dir = src_dir().join("git");
    let mut violations = Vec::new();

    for file in rust_files(&git_dir) {
        let content = read(&file);
        for (line_no, sig) in public_signatures(&content) {
            if sig.contains("git2") {
                violations.push(format!("{}:{}: {}", file.display(), line_no, sig));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "public signatures mention git2:\n{}",
        violations.join("\n")
    );
}

#[test]
fn facade_error_does_not_wrap_git2() {
    let content = read(&src_dir().join("git/error.rs"));

    // The enum body runs from its declaration to the first closing brace
    // at column zero.
    let start = content
        .find("pub enum FacadeError")
        .expect("FacadeError not found");
    let end = content[start..]
        .find("\n}")
        .map(|i| start + i)
        .expect("FacadeError body not closed");
    let body = &content[start..end];
    assert!(
        !body.contains("git2"),
        "FacadeError variants must not carry git2 types"
    );

    assert!(
        !content.contains("From<git2::Error> for FacadeError"),
        "FacadeError must not have a public From<git2::Error>"
    );
}

#[test]
fn git_submodules_stay_private() {
    let content = read(&src_dir().join("git/mod.rs"));
    for (line_no, line) in code_lines(&content) {
        let trimmed = line.trim();
        assert!(
            !trimmed.starts_with("pub mod"),
            "src/git/mod.rs:{}: submodules must be private, re-export items instead",
            line_no
        );
    }
}
