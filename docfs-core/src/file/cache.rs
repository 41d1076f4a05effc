use std::path::Path;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use crate::file::path::FilePath;
use crate::git::{GitError, GitObjectReader};

/// Content of a git blob, shared between every reader of the same file.
pub type Blob = Arc<[u8]>;

/// What a single git read produced. `Ok(None)` means the object does not
/// exist, which is cached like any other result.
pub type BlobOutcome = Result<Option<Blob>, Arc<GitError>>;

/// Memoizes git object reads for one build session.
///
/// Each distinct [`FilePath`] is read from git at most once, even when many
/// threads ask for it at the same time: the first caller performs the read
/// and everyone else waits on that same read. Reads of different files never
/// wait on each other. Entries are never evicted.
pub struct BlobCache {
    git: Arc<dyn GitObjectReader>,
    entries: DashMap<FilePath, Arc<OnceLock<BlobOutcome>>>,
}

impl BlobCache {
    pub fn new(git: Arc<dyn GitObjectReader>) -> Self {
        Self {
            git,
            entries: DashMap::new(),
        }
    }

    /// Bytes of `file`, reading `relative_path` at `commit` from the
    /// repository at `base_path` on first access.
    pub fn get_bytes(
        &self,
        file: &FilePath,
        base_path: &Path,
        relative_path: &str,
        commit: &str,
    ) -> BlobOutcome {
        // Only hold the shard lock long enough to get the cell, so the read
        // below never blocks unrelated files.
        let cell = self
            .entries
            .entry(file.clone())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();

        cell.get_or_init(|| {
            debug!("Blob cache miss for {file}, reading {relative_path} at {commit}");
            self.git
                .read_bytes(base_path, relative_path, commit)
                .map(|bytes| bytes.map(Blob::from))
                .map_err(Arc::new)
        })
        .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, Condvar, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct CountingReader {
        reads: AtomicUsize,
    }

    impl GitObjectReader for CountingReader {
        fn read_bytes(
            &self,
            _repo: &Path,
            path: &str,
            _commit: &str,
        ) -> Result<Option<Vec<u8>>, GitError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            // Widen the window for racing callers.
            thread::sleep(Duration::from_millis(20));
            match path {
                "missing.md" => Ok(None),
                "broken.md" => Err(GitError::Internal {
                    message: "corrupt pack".to_string(),
                }),
                _ => Ok(Some(path.as_bytes().to_vec())),
            }
        }

        fn list_tree(&self, _repo: &Path, _commit: &str) -> Result<Vec<String>, GitError> {
            Ok(Vec::new())
        }
    }

    fn cache() -> (Arc<CountingReader>, BlobCache) {
        let reader = Arc::new(CountingReader::default());
        let cache = BlobCache::new(reader.clone());
        (reader, cache)
    }

    fn get(cache: &BlobCache, path: &str) -> BlobOutcome {
        let file = FilePath::default_origin(path).with_commit("abc");
        cache.get_bytes(&file, Path::new("/repo"), path, "abc")
    }

    #[test]
    fn test_hit_after_miss() {
        let (reader, cache) = cache();
        assert_eq!(b"a.md".as_slice(), &*get(&cache, "a.md").unwrap().unwrap());
        assert_eq!(b"a.md".as_slice(), &*get(&cache, "a.md").unwrap().unwrap());
        assert_eq!(1, reader.reads.load(Ordering::SeqCst));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn test_missing_is_cached() {
        let (reader, cache) = cache();
        assert!(get(&cache, "missing.md").unwrap().is_none());
        assert!(get(&cache, "missing.md").unwrap().is_none());
        assert_eq!(1, reader.reads.load(Ordering::SeqCst));
    }

    #[test]
    fn test_error_is_cached() {
        let (reader, cache) = cache();
        assert!(get(&cache, "broken.md").is_err());
        let err = get(&cache, "broken.md").unwrap_err();
        assert!(err.to_string().contains("corrupt pack"));
        assert_eq!(1, reader.reads.load(Ordering::SeqCst));
    }

    #[test]
    fn test_distinct_files_read_separately() {
        let (reader, cache) = cache();
        get(&cache, "a.md").unwrap();
        get(&cache, "b.md").unwrap();
        assert_eq!(2, reader.reads.load(Ordering::SeqCst));
    }

    #[test]
    fn test_concurrent_same_key_reads_once() {
        let (reader, cache) = cache();
        let barrier = Barrier::new(50);

        thread::scope(|scope| {
            for _ in 0..50 {
                scope.spawn(|| {
                    barrier.wait();
                    let bytes = get(&cache, "a.md").unwrap().unwrap();
                    assert_eq!(b"a.md".as_slice(), &*bytes);
                });
            }
        });

        assert_eq!(1, reader.reads.load(Ordering::SeqCst));
    }

    /// Every read blocks until `expected` reads are in flight at once, and
    /// fails if that does not happen in time.
    struct RendezvousReader {
        expected: usize,
        in_flight: Mutex<usize>,
        arrived: Condvar,
    }

    impl GitObjectReader for RendezvousReader {
        fn read_bytes(
            &self,
            _repo: &Path,
            path: &str,
            _commit: &str,
        ) -> Result<Option<Vec<u8>>, GitError> {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight += 1;
            self.arrived.notify_all();
            let (in_flight, timeout) = self
                .arrived
                .wait_timeout_while(in_flight, Duration::from_secs(5), |n| *n < self.expected)
                .unwrap();
            drop(in_flight);
            if timeout.timed_out() {
                return Err(GitError::Internal {
                    message: format!("read of {path} ran alone"),
                });
            }
            Ok(Some(path.as_bytes().to_vec()))
        }

        fn list_tree(&self, _repo: &Path, _commit: &str) -> Result<Vec<String>, GitError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_concurrent_different_keys_do_not_serialize() {
        let cache = BlobCache::new(Arc::new(RendezvousReader {
            expected: 2,
            in_flight: Mutex::new(0),
            arrived: Condvar::new(),
        }));

        thread::scope(|scope| {
            let handles: Vec<_> = ["a.md", "b.md"]
                .into_iter()
                .map(|path| {
                    let cache = &cache;
                    scope.spawn(move || get(cache, path))
                })
                .collect();
            for handle in handles {
                // Both reads only finish if they were in flight together.
                let bytes = handle.join().unwrap().unwrap().unwrap();
                assert!(bytes.ends_with(b".md"));
            }
        });

        assert_eq!(2, cache.len());
    }
}
