//! Property-based tests for the validated types and record extraction.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;
use tempfile::TempDir;

use stablegit::core::config::Settings;
use stablegit::core::types::{BranchName, Oid, RefName};
use stablegit::git::{Author, RepositoryHandle};

/// Strategy for generating valid branch name characters.
fn branch_name_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('_'),
        Just('.'),
        Just('/'),
    ]
}

/// Strategy for generating valid branch names.
fn valid_branch_name() -> impl Strategy<Value = String> {
    prop::collection::vec(branch_name_char(), 1..50).prop_filter_map(
        "must be valid branch name",
        |chars| {
            let name: String = chars.into_iter().collect();
            let bad_whole = name.starts_with('-')
                || name.starts_with('/')
                || name.ends_with('/')
                || name.ends_with(".lock")
                || name.contains("..")
                || name.contains("//");
            let bad_component = name
                .split('/')
                .any(|c| c.starts_with('.') || c.ends_with(".lock"));
            if bad_whole || bad_component {
                None
            } else {
                Some(name)
            }
        },
    )
}

/// Strategy for generating valid hex OIDs (SHA-1 or SHA-256 length).
fn valid_oid_string() -> impl Strategy<Value = String> {
    let hex = prop::sample::select(vec![
        '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'A', 'B',
        'C', 'D', 'E', 'F',
    ]);
    prop_oneof![
        prop::collection::vec(hex.clone(), 40),
        prop::collection::vec(hex, 64),
    ]
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    /// Any valid branch name round-trips through serde.
    #[test]
    fn branch_name_serde_roundtrip(name in valid_branch_name()) {
        let branch = BranchName::new(&name).unwrap();
        let json = serde_json::to_string(&branch).unwrap();
        let parsed: BranchName = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(branch, parsed);
    }

    /// Ids are stored lowercase regardless of input case.
    #[test]
    fn oid_normalized_to_lowercase(oid_str in valid_oid_string()) {
        let oid = Oid::new(&oid_str).unwrap();
        prop_assert_eq!(oid.as_str(), oid_str.to_lowercase());
    }

    /// Every valid branch name yields a valid branch ref that strips back.
    #[test]
    fn branch_name_to_refname(name in valid_branch_name()) {
        let branch = BranchName::new(&name).unwrap();
        let refname = RefName::for_branch(&branch);
        prop_assert!(refname.is_branch_ref());
        prop_assert!(RefName::new(refname.as_str()).is_ok());
        prop_assert_eq!(refname.strip_prefix("refs/heads/"), Some(name.as_str()));
    }

    /// Valid branch names are also valid tag names.
    #[test]
    fn branch_name_is_valid_tag(name in valid_branch_name()) {
        let tag = RefName::for_tag(&name).unwrap();
        prop_assert!(tag.is_tag_ref());
        prop_assert!(!tag.is_branch_ref());
    }

    /// Short ids are prefixes of the full id.
    #[test]
    fn oid_short_is_prefix(oid_str in valid_oid_string(), len in 1usize..70) {
        let oid = Oid::new(&oid_str).unwrap();
        let short = oid.short(len);
        prop_assert_eq!(short.len(), len.min(oid_str.len()));
        prop_assert!(oid.as_str().starts_with(short));
    }

    /// Names containing forbidden characters are always rejected.
    #[test]
    fn forbidden_chars_rejected(
        prefix in valid_branch_name(),
        bad in prop::sample::select(vec![' ', '~', '^', ':', '\\', '?', '*', '[']),
    ) {
        let name = format!("{}{}", prefix, bad);
        prop_assert!(BranchName::new(&name).is_err());
        let refname = format!("refs/heads/{}", name);
        prop_assert!(RefName::new(refname).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The summary of a committed message is its first line, and the
    /// message itself survives the round trip through the repository.
    #[test]
    fn commit_summary_is_first_line(
        first in "[A-Za-z][A-Za-z0-9 ]{0,30}[A-Za-z0-9]",
        body in "[A-Za-z0-9 .,\n]{0,80}",
    ) {
        let dir = TempDir::new().unwrap();
        let repo = RepositoryHandle::init_with(dir.path(), Settings::default()).unwrap();
        std::fs::write(dir.path().join("file.txt"), "content\n").unwrap();

        let message = format!("{}\n\n{}\n", first, body);
        let record = repo
            .commit_files(&message, &["file.txt"], &Author::new("Prop", "prop@example.com"))
            .unwrap();

        prop_assert_eq!(&record.summary, &first);
        prop_assert_eq!(repo.find_commit("HEAD").unwrap(), record);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Any linear history walks back newest first, complete and repeatable.
    #[test]
    fn history_lists_every_commit_newest_first(count in 1usize..8) {
        let dir = TempDir::new().unwrap();
        let repo = RepositoryHandle::init_with(dir.path(), Settings::default()).unwrap();
        let author = Author::new("Prop", "prop@example.com");

        let mut created = Vec::new();
        for i in 0..count {
            std::fs::write(dir.path().join("file.txt"), format!("v{}\n", i)).unwrap();
            let record = repo
                .commit_files(&format!("commit {}", i), &["file.txt"], &author)
                .unwrap();
            created.push(record.id);
        }
        created.reverse();

        let walked: Vec<_> = repo
            .list_commits("HEAD")
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        let ids: Vec<_> = walked.iter().map(|c| c.id.clone()).collect();
        prop_assert_eq!(&ids, &created);
        for pair in walked.windows(2) {
            prop_assert!(pair[0].timestamp >= pair[1].timestamp);
        }

        let again: Vec<_> = repo
            .list_commits("HEAD")
            .unwrap()
            .map(|c| c.unwrap().id)
            .collect();
        prop_assert_eq!(again, created);
    }
}

#[cfg(test)]
mod deterministic {
    use super::*;

    #[test]
    fn branch_name_validation_consistent() {
        let test_cases = vec![
            ("main", true),
            ("feature/foo", true),
            ("", false),
            (".hidden", false),
            ("-flag", false),
            ("bad..path", false),
            ("branch.lock", false),
            ("branch/", false),
            ("@", false),
            ("user@work", true),
            ("a@{b", false),
        ];

        for (name, expected_valid) in test_cases {
            assert_eq!(
                BranchName::new(name).is_ok(),
                expected_valid,
                "Branch name '{}' validation mismatch",
                name
            );
        }
    }

    #[test]
    fn oid_validation_consistent() {
        assert!(Oid::new("abc123def4567890abc123def4567890abc12345").is_ok());
        assert!(
            Oid::new("abc123def4567890abc123def4567890abc123def4567890abc123def456789a").is_ok()
        );
        assert!(Oid::new("abc123").is_err());
        assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        assert!(Oid::new("abc123def4567890abc123def4567890abc1234").is_err());
    }
}
