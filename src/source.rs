//! Thread-safe sources of input file paths for the worker pool.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A serialized producer of input paths. `Ok(None)` is the clean end of
/// input; an `Err` means the producer itself failed, and every later
/// call fails too so all workers stop.
pub trait PathSource: Send + Sync {
    fn next_path(&self) -> io::Result<Option<PathBuf>>;
}

/// A fixed list of paths handed out in order, each exactly once.
pub struct PathList {
    state: Mutex<(usize, Vec<PathBuf>)>,
}

impl PathList {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        PathList {
            state: Mutex::new((0, paths)),
        }
    }
}

impl PathSource for PathList {
    fn next_path(&self) -> io::Result<Option<PathBuf>> {
        let mut state = self.state.lock().unwrap();
        let (pos, paths) = &mut *state;
        if *pos >= paths.len() {
            return Ok(None);
        }
        let path = paths[*pos].clone();
        *pos += 1;
        Ok(Some(path))
    }
}

/// Lazily expands a list of directories, one directory at a time, into
/// their entries. Directories are exhausted in listed order; entries
/// within a directory are sorted. A listing failure is sticky.
pub struct DirWalk {
    state: Mutex<DirWalkState>,
}

struct DirWalkState {
    dirs: Vec<PathBuf>,
    next_dir: usize,
    pending: VecDeque<PathBuf>,
    failed: bool,
}

impl DirWalk {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        DirWalk {
            state: Mutex::new(DirWalkState {
                dirs,
                next_dir: 0,
                pending: VecDeque::new(),
                failed: false,
            }),
        }
    }

    fn load_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<_>>()?;
        entries.sort();
        Ok(entries)
    }
}

impl PathSource for DirWalk {
    fn next_path(&self) -> io::Result<Option<PathBuf>> {
        let mut state = self.state.lock().unwrap();
        if state.failed {
            return Err(io::Error::other("directory source already failed"));
        }
        loop {
            if let Some(path) = state.pending.pop_front() {
                return Ok(Some(path));
            }
            if state.next_dir >= state.dirs.len() {
                return Ok(None);
            }
            let dir = state.dirs[state.next_dir].clone();
            state.next_dir += 1;
            match Self::load_dir(&dir) {
                Ok(entries) => state.pending.extend(entries),
                Err(e) => {
                    state.failed = true;
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_path_list_exactly_once_across_threads() {
        let paths: Vec<PathBuf> = (0..500).map(|i| PathBuf::from(format!("f{}", i))).collect();
        let source = Arc::new(PathList::new(paths.clone()));

        let mut collected: Vec<PathBuf> = Vec::new();
        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..8 {
                let source = source.clone();
                handles.push(scope.spawn(move || {
                    let mut mine = Vec::new();
                    while let Some(path) = source.next_path().unwrap() {
                        mine.push(path);
                    }
                    mine
                }));
            }
            for handle in handles {
                collected.extend(handle.join().unwrap());
            }
        });

        assert_eq!(collected.len(), paths.len());
        let seen: HashSet<_> = collected.iter().collect();
        assert_eq!(seen.len(), paths.len());
        let expected: HashSet<_> = paths.iter().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_path_list_end_is_sticky() {
        let source = PathList::new(vec![PathBuf::from("only")]);
        assert!(source.next_path().unwrap().is_some());
        assert!(source.next_path().unwrap().is_none());
        assert!(source.next_path().unwrap().is_none());
    }

    #[test]
    fn test_dir_walk_in_listed_order() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::write(dir_a.path().join("b.mrt"), b"").unwrap();
        std::fs::write(dir_a.path().join("a.mrt"), b"").unwrap();
        std::fs::write(dir_b.path().join("c.mrt"), b"").unwrap();

        let source = DirWalk::new(vec![
            dir_a.path().to_path_buf(),
            dir_b.path().to_path_buf(),
        ]);

        let mut names = Vec::new();
        while let Some(path) = source.next_path().unwrap() {
            names.push(path.file_name().unwrap().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["a.mrt", "b.mrt", "c.mrt"]);
    }

    #[test]
    fn test_dir_walk_failure_is_sticky() {
        let source = DirWalk::new(vec![PathBuf::from("/definitely/not/a/dir")]);
        assert!(source.next_path().is_err());
        assert!(source.next_path().is_err());
    }
}
