//! Integration tests for the git layer.
//!
//! These tests stream real commits through `git fast-import` and read them
//! back both through [`Git`] and the git CLI.

mod common;

use common::{branch, TestRepo};

use docshelf::core::types::FileMode;
use docshelf::git::{with_commit, CommitOptions, CommitSession, GitError, IdentityOverrides};

fn options() -> CommitOptions {
    CommitOptions::default()
}

mod sessions {
    use super::*;

    #[test]
    fn first_commit_creates_branch() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        let mut session = CommitSession::start(&git, &pages, "first", &options()).unwrap();
        assert!(session.parent().is_none());
        session
            .write_file("docs/index.html", b"<h1>hi</h1>", FileMode::Regular)
            .unwrap();
        let oid = session.finish().unwrap();

        assert_eq!(git.branch_tip(&pages).unwrap(), Some(oid.clone()));
        assert!(git.commit_parents(&oid).unwrap().is_empty());
        assert_eq!(
            repo.show("gh-pages", "docs/index.html").as_deref(),
            Some("<h1>hi</h1>")
        );
        assert_eq!(git.commit_info(&oid).unwrap().summary, "first");
    }

    #[test]
    fn second_commit_has_parent() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        let first = with_commit(&git, &pages, "one", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();
        let second = with_commit(&git, &pages, "two", &options(), |s| {
            s.write_file("b.txt", b"b", FileMode::Regular)
        })
        .unwrap();

        assert_eq!(git.commit_parents(&second).unwrap(), vec![first]);
        assert_eq!(repo.ls_tree("gh-pages"), ["a.txt", "b.txt"]);
    }

    #[test]
    fn source_checkout_untouched() {
        let repo = TestRepo::new();
        let git = repo.git();
        let head = repo.run_git(&["rev-parse", "HEAD"]);

        with_commit(&git, &branch("gh-pages"), "docs", &options(), |s| {
            s.write_file("index.html", b"x", FileMode::Regular)
        })
        .unwrap();

        assert_eq!(repo.run_git(&["rev-parse", "HEAD"]), head);
        assert_eq!(repo.run_git(&["status", "--porcelain"]), "");
        assert_eq!(repo.run_git(&["symbolic-ref", "HEAD"]).trim(), "refs/heads/main");
    }

    #[test]
    fn delete_all_and_paths() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        with_commit(&git, &pages, "seed", &options(), |s| {
            s.write_file("1.0/index.html", b"1", FileMode::Regular)?;
            s.write_file("2.0/index.html", b"2", FileMode::Regular)?;
            s.write_file("keep.txt", b"k", FileMode::Regular)
        })
        .unwrap();

        with_commit(&git, &pages, "drop 1.0", &options(), |s| s.delete_paths(&["1.0"])).unwrap();
        assert_eq!(repo.ls_tree("gh-pages"), ["2.0/index.html", "keep.txt"]);

        with_commit(&git, &pages, "reset", &options(), |s| {
            s.delete_all()?;
            s.write_file("new.txt", b"n", FileMode::Regular)
        })
        .unwrap();
        assert_eq!(repo.ls_tree("gh-pages"), ["new.txt"]);
    }

    #[test]
    fn executable_and_symlink_modes() {
        let repo = TestRepo::new();
        let git = repo.git();

        with_commit(&git, &branch("gh-pages"), "modes", &options(), |s| {
            s.write_file("run.sh", b"#!/bin/sh\n", FileMode::Executable)?;
            s.write_file("link", b"run.sh", FileMode::Symlink)
        })
        .unwrap();

        let listing = repo.run_git(&["ls-tree", "gh-pages"]);
        assert!(listing.contains("100755 blob"));
        assert!(listing.contains("120000 blob"));
    }

    #[test]
    fn unusual_paths_round_trip() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");
        let odd = "dir with space/quote \"q\".txt";

        with_commit(&git, &pages, "odd", &options(), |s| {
            s.write_file(odd, b"odd", FileMode::Regular)?;
            s.write_file("tab\there.txt", b"tab", FileMode::Regular)
        })
        .unwrap();

        assert_eq!(git.read_file(&pages, odd).unwrap(), Some(b"odd".to_vec()));
        assert_eq!(
            git.read_file(&pages, "tab\there.txt").unwrap(),
            Some(b"tab".to_vec())
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        let result = with_commit(&git, &pages, "bad", &options(), |s| {
            s.write_file("../outside.txt", b"x", FileMode::Regular)
        });
        assert!(matches!(result, Err(GitError::InvalidPath(_))));
        assert!(repo.tip("gh-pages").is_none());
    }

    #[test]
    fn rejects_deleting_above_root() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");
        let first = with_commit(&git, &pages, "one", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();

        for path in ["../outside", "..", "a/../../b"] {
            let result = with_commit(&git, &pages, "bad", &options(), |s| {
                s.write_file("b.txt", b"b", FileMode::Regular)?;
                s.delete_paths(&[path])
            });
            assert!(matches!(result, Err(GitError::InvalidPath(_))), "{path}");
        }
        assert_eq!(repo.tip("gh-pages"), Some(first.to_string()));
    }

    #[test]
    fn importer_failure_carries_diagnostics() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");
        let lock = repo.path().join(".git/refs/heads/gh-pages.lock");
        std::fs::create_dir_all(lock.parent().unwrap()).unwrap();
        std::fs::write(&lock, "").unwrap();

        let mut session = CommitSession::start(&git, &pages, "locked", &options()).unwrap();
        session
            .write_file("index.html", b"x", FileMode::Regular)
            .unwrap();
        match session.finish() {
            Err(GitError::CommitWrite { diagnostics }) => {
                assert!(diagnostics.contains("cannot lock ref"), "{diagnostics}");
            }
            other => panic!("expected CommitWrite, got {other:?}"),
        }
        assert!(repo.tip("gh-pages").is_none());
    }
}

mod empty_commits {
    use super::*;

    #[test]
    fn no_change_rolls_back_to_parent() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        let first = with_commit(&git, &pages, "one", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();

        let result = with_commit(&git, &pages, "same", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        });
        assert!(matches!(result, Err(GitError::EmptyCommit { .. })));
        assert_eq!(repo.tip("gh-pages"), Some(first.to_string()));
        assert_eq!(repo.commit_count("gh-pages"), 1);
    }

    #[test]
    fn empty_root_commit_removes_branch() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        let result = with_commit(&git, &pages, "nothing", &options(), |_| Ok::<(), GitError>(()));
        assert!(matches!(result, Err(GitError::EmptyCommit { .. })));
        assert!(repo.tip("gh-pages").is_none());
    }

    #[test]
    fn allowed_when_requested() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");
        let allow = CommitOptions {
            allow_empty: true,
            ..Default::default()
        };

        with_commit(&git, &pages, "one", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();
        with_commit(&git, &pages, "again", &allow, |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();

        assert_eq!(repo.commit_count("gh-pages"), 2);
    }
}

mod aborts {
    use super::*;

    #[test]
    fn abort_leaves_tip() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        let first = with_commit(&git, &pages, "one", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();

        let mut session = CommitSession::start(&git, &pages, "two", &options()).unwrap();
        session
            .write_file("secret.txt", b"s", FileMode::Regular)
            .unwrap();
        session.abort();

        assert_eq!(repo.tip("gh-pages"), Some(first.to_string()));
        assert!(repo.show("gh-pages", "secret.txt").is_none());
    }

    #[test]
    fn dropped_session_aborts() {
        let repo = TestRepo::new();
        let git = repo.git();
        let pages = branch("gh-pages");

        {
            let mut session = CommitSession::start(&git, &pages, "dropped", &options()).unwrap();
            session
                .write_file("a.txt", b"a", FileMode::Regular)
                .unwrap();
        }

        assert!(repo.tip("gh-pages").is_none());
    }

    #[test]
    fn caller_error_is_returned_unchanged() {
        #[derive(Debug)]
        enum Failure {
            Git,
            Mine,
        }
        impl From<GitError> for Failure {
            fn from(_: GitError) -> Self {
                Failure::Git
            }
        }

        let repo = TestRepo::new();
        let git = repo.git();
        let result = with_commit(&git, &branch("gh-pages"), "x", &options(), |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)?;
            Err(Failure::Mine)
        });

        assert!(matches!(result, Err(Failure::Mine)));
        assert!(repo.tip("gh-pages").is_none());
    }
}

mod identity {
    use super::*;

    #[test]
    fn overrides_apply() {
        let repo = TestRepo::new();
        let git = repo.git();
        let options = CommitOptions {
            allow_empty: false,
            identity: IdentityOverrides {
                name: Some("Docs Bot".into()),
                email: Some("bot@example.com".into()),
                date: Some("1700000000 +0200".into()),
            },
        };

        let oid = with_commit(&git, &branch("gh-pages"), "who", &options, |s| {
            s.write_file("a.txt", b"a", FileMode::Regular)
        })
        .unwrap();

        let info = git.commit_info(&oid).unwrap();
        assert_eq!(info.committer_name, "Docs Bot");
        assert_eq!(info.committer_email, "bot@example.com");
        assert_eq!(info.committer_time.timestamp(), 1_700_000_000);
        assert_eq!(info.committer_time.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn bad_date_fails_before_writing() {
        let repo = TestRepo::new();
        let git = repo.git();
        let options = CommitOptions {
            allow_empty: false,
            identity: IdentityOverrides {
                date: Some("yesterday-ish".into()),
                ..Default::default()
            },
        };

        let result = CommitSession::start(&git, &branch("gh-pages"), "x", &options);
        assert!(matches!(result, Err(GitError::InvalidDate { .. })));
    }
}

mod reads {
    use super::*;

    fn seed(repo: &TestRepo) {
        let git = repo.git();
        with_commit(&git, &branch("gh-pages"), "seed", &options(), |s| {
            s.write_file("1.0/index.html", b"one", FileMode::Regular)?;
            s.write_file("1.0/guide/page.html", b"page", FileMode::Regular)?;
            s.write_file("latest", b"1.0", FileMode::Symlink)?;
            s.write_file("loop-a", b"loop-b", FileMode::Symlink)?;
            s.write_file("loop-b", b"loop-a", FileMode::Symlink)
        })
        .unwrap();
    }

    #[test]
    fn follows_symlinks() {
        let repo = TestRepo::new();
        seed(&repo);
        let git = repo.git();
        let pages = branch("gh-pages");

        assert_eq!(
            git.read_file(&pages, "latest/index.html").unwrap(),
            Some(b"one".to_vec())
        );
        assert_eq!(
            git.read_file(&pages, "latest/guide/page.html").unwrap(),
            Some(b"page".to_vec())
        );
    }

    #[test]
    fn missing_things_are_none() {
        let repo = TestRepo::new();
        seed(&repo);
        let git = repo.git();

        assert_eq!(git.read_file(&branch("gh-pages"), "nope.html").unwrap(), None);
        assert_eq!(git.read_file(&branch("gh-pages"), "1.0").unwrap(), None);
        assert_eq!(git.read_file(&branch("other"), "1.0/index.html").unwrap(), None);
    }

    #[test]
    fn symlink_loop_is_an_error() {
        let repo = TestRepo::new();
        seed(&repo);
        let result = repo.git().read_file(&branch("gh-pages"), "loop-a/x");
        assert!(matches!(result, Err(GitError::SymlinkLoop { .. })));
    }

    #[test]
    fn list_files_below_prefix() {
        let repo = TestRepo::new();
        seed(&repo);
        let git = repo.git();

        let files = git.list_files(&branch("gh-pages"), "1.0").unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(names, ["guide/page.html", "index.html"]);
        assert_eq!(files[1].data, b"one");

        assert!(git.list_files(&branch("gh-pages"), "2.0").unwrap().is_empty());
        assert!(git.list_files(&branch("absent"), "").unwrap().is_empty());
    }
}
