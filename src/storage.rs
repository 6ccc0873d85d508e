// Persistent storage behind a minimal trait: enough for the append-only
// history log and the 30-day index scan, nothing more. Absence of storage
// degrades gracefully - callers log and skip the cycle.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub trait Storage {
    fn exists(&self, path: &str) -> bool;

    fn size(&self, path: &str) -> Result<u64>;

    /// Open, append and close within the call; the file handle never
    /// outlives one tick.
    fn append(&self, path: &str, data: &[u8]) -> Result<()>;

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek>>;
}

/// Storage rooted in a host directory. Paths use the device convention of a
/// leading slash ("/2026.json") and resolve inside the root.
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path.trim_start_matches('/')))
    }
}

impl Storage for DirStorage {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn size(&self, path: &str) -> Result<u64> {
        let resolved = self.resolve(path);
        let meta = std::fs::metadata(&resolved)
            .with_context(|| format!("stat {}", resolved.display()))?;
        Ok(meta.len())
    }

    fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let resolved = self.resolve(path);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&resolved)
            .with_context(|| format!("open {} for append", resolved.display()))?;
        file.write_all(data)
            .with_context(|| format!("append to {}", resolved.display()))?;
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek>> {
        let resolved = self.resolve(path);
        let file = std::fs::File::open(&resolved)
            .with_context(|| format!("open {}", resolved.display()))?;
        Ok(Box::new(file))
    }
}

/// In-memory storage for tests and the simulation harness.
pub struct MemStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(path.to_string(), data.into());
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemStorage {
    fn exists(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn size(&self, path: &str) -> Result<u64> {
        let files = self.files.lock().unwrap();
        let data = files
            .get(path)
            .with_context(|| format!("no such file: {path}"))?;
        Ok(data.len() as u64)
    }

    fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        files.entry(path.to_string()).or_default().extend_from_slice(data);
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadSeek>> {
        let files = self.files.lock().unwrap();
        let data = files
            .get(path)
            .with_context(|| format!("no such file: {path}"))?;
        Ok(Box::new(Cursor::new(data.clone())))
    }
}
