#[cfg(test)]
mod tests {
    use crate::exec::{Executor, Task};
    use crate::fs::{FileKind, Filesystem, OsFilesystem};
    use crate::{BuildError, GlobError, GlobOutcome, Globber, ThreadPoolExecutor};
    use std::collections::VecDeque;
    use std::io;
    use std::num::NonZeroUsize;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    /// Create every entry under `base`; names ending in `/` become
    /// directories, everything else becomes an empty file.
    fn plant(base: &Path, entries: &[&str]) {
        for entry in entries {
            let path = base.join(entry);
            if entry.ends_with('/') {
                std::fs::create_dir_all(&path).unwrap();
            } else {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(&path, b"").unwrap();
            }
        }
    }

    fn run(base: &Path, patterns: &[&str]) -> Vec<PathBuf> {
        let globber = Globber::init(base).patterns(patterns).build().unwrap();
        match globber.glob().unwrap() {
            GlobOutcome::Matched(mut paths) => {
                paths.sort();
                paths
            }
            GlobOutcome::Canceled => panic!("nothing cancelled this query"),
        }
    }

    fn absolute(base: &Path, relative: &[&str]) -> Vec<PathBuf> {
        let mut paths: Vec<_> = relative.iter().map(|rel| base.join(rel)).collect();
        paths.sort();
        paths
    }

    #[test]
    fn exact_path_patterns_resolve_a_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["x/y/z"]);
        assert_eq!(run(dir.path(), &["x/y/z"]), absolute(dir.path(), &["x/y/z"]));
        assert_eq!(run(dir.path(), &["x/*/z"]), absolute(dir.path(), &["x/y/z"]));
        assert_eq!(run(dir.path(), &["x/?/z"]), absolute(dir.path(), &["x/y/z"]));
        assert_eq!(run(dir.path(), &["x/q/z"]), absolute(dir.path(), &[]));
    }

    #[test]
    fn literal_pattern_matches_a_directory_too() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["sub/c.txt"]);
        assert_eq!(run(dir.path(), &["sub"]), absolute(dir.path(), &["sub"]));
    }

    #[test]
    fn star_stays_in_the_top_directory() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt", "b.txt", "sub/c.txt"]);
        assert_eq!(
            run(dir.path(), &["*.txt"]),
            absolute(dir.path(), &["a.txt", "b.txt"])
        );
    }

    #[test]
    fn recursive_prefix_descends_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt", "b.txt", "sub/c.txt"]);
        assert_eq!(
            run(dir.path(), &["**/*.txt"]),
            absolute(dir.path(), &["a.txt", "b.txt", "sub/c.txt"])
        );
    }

    #[test]
    fn doubled_recursive_segments_emit_each_match_once() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a/a/foo.txt"]);
        assert_eq!(
            run(dir.path(), &["**/a/**/foo.txt"]),
            absolute(dir.path(), &["a/a/foo.txt"])
        );
    }

    #[test]
    fn hidden_files_need_an_explicit_dot() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &[".hidden", "a"]);
        assert_eq!(run(dir.path(), &["*"]), absolute(dir.path(), &["a"]));
        assert_eq!(run(dir.path(), &[".*"]), absolute(dir.path(), &[".hidden"]));
    }

    #[test]
    fn recursive_alone_matches_the_world_including_the_base() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["f", "sub/g", "sub/deeper/h"]);
        let mut expected = absolute(
            dir.path(),
            &["f", "sub", "sub/g", "sub/deeper", "sub/deeper/h"],
        );
        // Zero components consumed: the base itself is a match.
        expected.push(dir.path().to_path_buf());
        expected.sort();
        assert_eq!(run(dir.path(), &["**"]), expected);
    }

    #[test]
    fn exclude_directories_keeps_only_files() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["f", "sub/g", "sub/deeper/h"]);
        let globber = Globber::init(dir.path())
            .pattern("**")
            .exclude_directories(true)
            .build()
            .unwrap();
        let GlobOutcome::Matched(mut paths) = globber.glob().unwrap() else {
            panic!("nothing cancelled this query");
        };
        paths.sort();
        assert_eq!(
            paths,
            absolute(dir.path(), &["f", "sub/g", "sub/deeper/h"])
        );
    }

    #[test]
    fn recursive_tail_includes_its_anchor() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a/f.txt", "a/sub/g.txt", "b/h.txt"]);
        assert_eq!(
            run(dir.path(), &["a/**"]),
            absolute(dir.path(), &["a", "a/f.txt", "a/sub", "a/sub/g.txt"])
        );
    }

    #[test]
    fn recursive_head_matches_at_every_depth() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["y", "one/y", "one/two/y", "one/two/n"]);
        assert_eq!(
            run(dir.path(), &["**/y"]),
            absolute(dir.path(), &["y", "one/y", "one/two/y"])
        );
    }

    #[test]
    fn invalid_pattern_fails_before_any_io() {
        let result = Globber::init("/definitely/absent/base")
            .pattern("a//b")
            .build();
        assert!(matches!(result, Err(BuildError::Pattern(_))));
    }

    #[test]
    fn relative_base_is_rejected() {
        let result = Globber::init("relative/base").pattern("*").build();
        assert!(matches!(result, Err(BuildError::BaseNotAbsolute(_))));
    }

    #[test]
    fn empty_pattern_set_is_an_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt"]);
        assert_eq!(run(dir.path(), &[]), absolute(dir.path(), &[]));
    }

    #[test]
    fn missing_base_is_an_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never/created");
        assert_eq!(run(&gone, &["**"]), Vec::<PathBuf>::new());
    }

    #[test]
    fn file_base_is_an_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["plain"]);
        assert_eq!(run(&dir.path().join("plain"), &["*"]), Vec::<PathBuf>::new());
    }

    #[test]
    fn querying_twice_agrees() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt", "sub/b.txt"]);
        let globber = Globber::init(dir.path()).pattern("**/*.txt").build().unwrap();
        let GlobOutcome::Matched(mut first) = globber.glob().unwrap() else {
            panic!("nothing cancelled this query");
        };
        let GlobOutcome::Matched(mut second) = globber.glob().unwrap() else {
            panic!("nothing cancelled this query");
        };
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    #[test]
    fn pattern_union_equals_query_union() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt", "b.rs", "sub/c.txt", "sub/d.rs"]);
        let combined = run(dir.path(), &["**/*.txt", "**/*.rs"]);
        let mut separate = run(dir.path(), &["**/*.txt"]);
        separate.extend(run(dir.path(), &["**/*.rs"]));
        separate.sort();
        separate.dedup();
        assert_eq!(combined, separate);
    }

    #[test]
    fn overlapping_patterns_never_duplicate_results() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt", "sub/b.txt"]);
        let paths = run(dir.path(), &["**/*.txt", "*.txt", "a.txt"]);
        assert_eq!(paths, absolute(dir.path(), &["a.txt", "sub/b.txt"]));
    }

    fn no_deeper(dir: &Path) -> bool {
        !dir.ends_with("skipme")
    }

    #[test]
    fn dir_filter_prunes_whole_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        plant(
            dir.path(),
            &["keep/a.txt", "skipme/b.txt", "skipme/nested/c.txt"],
        );
        let globber = Globber::init(dir.path())
            .pattern("**/*.txt")
            .dir_filter(Some(no_deeper))
            .build()
            .unwrap();
        let GlobOutcome::Matched(mut paths) = globber.glob().unwrap() else {
            panic!("nothing cancelled this query");
        };
        paths.sort();
        assert_eq!(paths, absolute(dir.path(), &["keep/a.txt"]));
    }

    fn exploding_filter(_: &Path) -> bool {
        panic!("filter blew up")
    }

    #[test]
    fn panicking_filter_surfaces_as_a_fault() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt"]);
        let globber = Globber::init(dir.path())
            .pattern("*")
            .dir_filter(Some(exploding_filter))
            .build()
            .unwrap();
        match globber.glob() {
            Err(GlobError::Fault(what)) => assert!(what.contains("filter blew up")),
            other => panic!("expected a fault, got {other:?}"),
        }
    }

    #[test]
    fn thread_pool_agrees_with_inline_execution() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = Vec::new();
        for outer in 0..4 {
            for inner in 0..3 {
                for file in 0..4 {
                    entries.push(format!("d{outer}/e{inner}/f{file}.txt"));
                    entries.push(format!("d{outer}/e{inner}/f{file}.rs"));
                }
            }
        }
        let borrowed: Vec<&str> = entries.iter().map(String::as_str).collect();
        plant(dir.path(), &borrowed);

        let inline = run(dir.path(), &["**/*.txt"]);
        assert_eq!(inline.len(), 48);

        let pool = Arc::new(ThreadPoolExecutor::new(NonZeroUsize::new(4).unwrap()));
        let globber = Globber::init(dir.path())
            .pattern("**/*.txt")
            .executor(pool)
            .build()
            .unwrap();
        let GlobOutcome::Matched(mut parallel) = globber.glob().unwrap() else {
            panic!("nothing cancelled this query");
        };
        parallel.sort();
        assert_eq!(parallel, inline);
    }

    // --- doubles for the executor and filesystem seams ---

    /// Collects tasks instead of running them, so a test controls exactly
    /// when (and whether) traversal work happens.
    #[derive(Default)]
    struct DeferringExecutor {
        tasks: Mutex<VecDeque<Task>>,
    }

    impl Executor for DeferringExecutor {
        fn execute(&self, task: Task) {
            self.tasks.lock().unwrap().push_back(task);
        }
    }

    impl DeferringExecutor {
        fn drain(&self) {
            loop {
                let task = self.tasks.lock().unwrap().pop_front();
                match task {
                    Some(task) => task(),
                    None => break,
                }
            }
        }
    }

    #[test]
    fn cancel_before_work_runs_completes_as_canceled() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt", "sub/b.txt"]);
        let executor = Arc::new(DeferringExecutor::default());
        let globber = Globber::init(dir.path())
            .pattern("**")
            .executor(Arc::clone(&executor) as Arc<dyn Executor>)
            .build()
            .unwrap();

        let handle = globber.launch();
        handle.cancel();
        executor.drain();
        assert!(matches!(handle.wait(), Ok(GlobOutcome::Canceled)));
    }

    #[test]
    fn deferred_query_completes_normally_when_drained() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["a.txt"]);
        let executor = Arc::new(DeferringExecutor::default());
        let globber = Globber::init(dir.path())
            .pattern("*.txt")
            .executor(Arc::clone(&executor) as Arc<dyn Executor>)
            .build()
            .unwrap();

        let handle = globber.launch();
        executor.drain();
        match handle.wait() {
            Ok(GlobOutcome::Matched(paths)) => {
                assert_eq!(paths, absolute(dir.path(), &["a.txt"]));
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    /// Host filesystem, except listing one poisoned directory fails.
    struct PoisonedList {
        inner: OsFilesystem,
        poison: PathBuf,
    }

    impl Filesystem for PoisonedList {
        fn stat(&self, path: &Path) -> io::Result<Option<FileKind>> {
            self.inner.stat(path)
        }

        fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
            if dir == self.poison {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "synthetic denial",
                ));
            }
            self.inner.list(dir)
        }

        fn read_attributes(&self, path: &Path) -> io::Result<FileKind> {
            self.inner.read_attributes(path)
        }
    }

    #[test]
    fn listing_failure_propagates_without_partial_results() {
        let dir = tempfile::tempdir().unwrap();
        plant(dir.path(), &["ok/a.txt", "bad/b.txt"]);
        let fs = Arc::new(PoisonedList {
            inner: OsFilesystem,
            poison: dir.path().join("bad"),
        });
        let globber = Globber::init(dir.path())
            .pattern("**/*.txt")
            .filesystem(fs)
            .build()
            .unwrap();
        match globber.glob() {
            Err(GlobError::Io(err)) => {
                assert!(err.to_string().contains("synthetic denial"));
            }
            other => panic!("expected an I/O failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        use std::os::unix::fs::symlink;

        #[test]
        fn symlinked_file_matches_under_its_link_name() {
            let dir = tempfile::tempdir().unwrap();
            plant(dir.path(), &["sub/c.txt"]);
            symlink(dir.path().join("sub/c.txt"), dir.path().join("link.txt")).unwrap();
            assert_eq!(
                run(dir.path(), &["*.txt"]),
                absolute(dir.path(), &["link.txt"])
            );
        }

        #[test]
        fn symlinked_directory_is_descended() {
            let dir = tempfile::tempdir().unwrap();
            plant(dir.path(), &["real/inner.txt"]);
            symlink(dir.path().join("real"), dir.path().join("aka")).unwrap();
            // Through a literal segment...
            assert_eq!(
                run(dir.path(), &["aka/inner.txt"]),
                absolute(dir.path(), &["aka/inner.txt"])
            );
            // ...and through a wildcard one.
            assert_eq!(
                run(dir.path(), &["*/inner.txt"]),
                absolute(dir.path(), &["aka/inner.txt", "real/inner.txt"])
            );
        }

        #[test]
        fn dangling_symlink_is_silently_ignored() {
            let dir = tempfile::tempdir().unwrap();
            plant(dir.path(), &["a.txt"]);
            symlink(dir.path().join("nowhere"), dir.path().join("broken.txt")).unwrap();
            assert_eq!(
                run(dir.path(), &["*.txt"]),
                absolute(dir.path(), &["a.txt"])
            );
        }

        fn mkfifo(path: &Path) {
            let cpath = std::ffi::CString::new(path.as_os_str().as_bytes()).unwrap();
            assert_eq!(unsafe { libc::mkfifo(cpath.as_ptr(), 0o644) }, 0);
        }

        #[test]
        fn fifo_is_skipped_by_wildcards_but_found_by_name() {
            let dir = tempfile::tempdir().unwrap();
            plant(dir.path(), &["plain"]);
            mkfifo(&dir.path().join("pipe"));
            // Listed children that are neither file, directory nor symlink
            // never match a wildcard...
            assert_eq!(run(dir.path(), &["*"]), absolute(dir.path(), &["plain"]));
            // ...but naming one outright resolves it.
            assert_eq!(run(dir.path(), &["pipe"]), absolute(dir.path(), &["pipe"]));
        }

        #[test]
        fn non_utf8_names_still_match() {
            let dir = tempfile::tempdir().unwrap();
            let weird = dir.path().join(OsStr::from_bytes(b"we\xffird.txt"));
            std::fs::write(&weird, b"").unwrap();
            let paths = run(dir.path(), &["*.txt"]);
            assert_eq!(paths, vec![weird]);
        }
    }
}
