//! Raw-container reader capability
//!
//! The pipeline never touches container files directly. Everything
//! it needs from a read (raw signal, move table, basecalled sequence,
//! format metadata) goes through [`SquiggleSource`], so any container
//! format can be plugged in. Two implementations ship with the crate:
//! [`JsonSource`] for `.json` container exports and [`MemorySource`]
//! for embedding and tests.

use dashmap::DashMap;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SourceError;

pub const JSON_EXTENSION: &str = "json";
pub const FILE_TYPE: &str = "file_type";
pub const MULTI_READ: &str = "multi-read";

/// A (file, read) pair. Single-read containers carry no read id;
/// the container's only read is implied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadHandle {
    pub file: PathBuf,
    pub read_id: Option<String>,
}

impl ReadHandle {
    pub fn single(file: PathBuf) -> Self {
        Self {
            file,
            read_id: None,
        }
    }

    pub fn multi(file: PathBuf, read_id: String) -> Self {
        Self {
            file,
            read_id: Some(read_id),
        }
    }

    /// Read id if known, file stem otherwise
    pub fn display_id(&self) -> String {
        match &self.read_id {
            Some(id) => id.clone(),
            None => self
                .file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| self.file.display().to_string()),
        }
    }
}

/// Dataset names and attributes attached to a read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMetadata {
    #[serde(default)]
    pub datasets: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ReadMetadata {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }

    pub fn has_dataset(&self, pattern: &str) -> bool {
        self.datasets.iter().any(|d| d.contains(pattern))
    }
}

/// Everything a container stores for one read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRead {
    pub read_id: String,
    pub signal: Vec<i16>,
    pub moves: Vec<u8>,
    pub stride: usize,
    pub first_sample: usize,
    pub sequence: String,
    #[serde(default)]
    pub metadata: ReadMetadata,
}

pub trait SquiggleSource: Send + Sync {
    /// Whether `path` is a container this source can open
    fn accepts(&self, path: &Path) -> bool;

    /// Every container under `root`, searched recursively
    fn containers(&self, root: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let mut found = Vec::new();
        walk(root, &mut |path| {
            if self.accepts(path) {
                found.push(path.to_path_buf());
            }
        })?;

        found.sort_unstable();
        Ok(found)
    }

    fn read_ids(&self, container: &Path) -> Result<Vec<String>, SourceError>;

    fn metadata(&self, handle: &ReadHandle) -> Result<ReadMetadata, SourceError>;

    fn fetch(&self, handle: &ReadHandle) -> Result<RawRead, SourceError>;

    /// Drops whatever was cached while serving the current chunk.
    /// Called by the scheduler once a chunk has drained.
    fn release(&self) {}
}

fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) -> Result<(), SourceError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, visit)?;
        } else {
            visit(&path);
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Container {
    #[serde(default)]
    file_type: Option<String>,
    reads: Vec<RawRead>,
}

impl Container {
    fn take(&self, handle: &ReadHandle) -> Result<RawRead, SourceError> {
        let mut read = match &handle.read_id {
            Some(id) => self.reads.iter().find(|r| &r.read_id == id),
            None => self.reads.first(),
        }
        .cloned()
        .ok_or_else(|| SourceError::MissingRead {
            path: handle.file.clone(),
            read_id: handle.display_id(),
        })?;

        if let Some(file_type) = self.file_type.clone() {
            read.metadata
                .attributes
                .entry(FILE_TYPE.to_string())
                .or_insert(file_type);
        }

        Ok(read)
    }
}

/// Reads `.json` container exports: `{"file_type": .., "reads": [..]}`.
///
/// Multi-read containers are decoded once and kept until [`release`]
/// is called, so a chunk touching n reads of one container decodes it
/// once instead of n times. Single-read containers are never cached.
///
/// [`release`]: SquiggleSource::release
#[derive(Debug, Clone, Default)]
pub struct JsonSource {
    cache: DashMap<PathBuf, Arc<Container>>,
}

impl JsonSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, path: &Path) -> Result<Arc<Container>, SourceError> {
        if let Some(container) = self.cache.get(path) {
            return Ok(Arc::clone(container.value()));
        }

        let reader = BufReader::new(File::open(path)?);
        let container: Arc<Container> = Arc::new(serde_json::from_reader(reader)?);
        if container.reads.len() > 1 {
            self.cache.insert(path.to_path_buf(), Arc::clone(&container));
        }

        Ok(container)
    }
}

impl SquiggleSource for JsonSource {
    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == JSON_EXTENSION)
    }

    fn read_ids(&self, container: &Path) -> Result<Vec<String>, SourceError> {
        let container = self.open(container)?;
        Ok(container.reads.iter().map(|r| r.read_id.clone()).collect())
    }

    fn metadata(&self, handle: &ReadHandle) -> Result<ReadMetadata, SourceError> {
        Ok(self.fetch(handle)?.metadata)
    }

    fn fetch(&self, handle: &ReadHandle) -> Result<RawRead, SourceError> {
        self.open(&handle.file)?.take(handle)
    }

    fn release(&self) {
        self.cache.clear();
    }
}

/// In-memory containers keyed by their (virtual) path
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    containers: HashMap<PathBuf, Container>,
    unreadable: HashSet<PathBuf>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, reads: Vec<RawRead>) {
        let file_type = (reads.len() > 1).then(|| MULTI_READ.to_string());
        self.containers.insert(
            path.into(),
            Container {
                file_type,
                reads,
            },
        );
    }

    /// Registers a container that is listed but cannot be opened
    pub fn insert_unreadable(&mut self, path: impl Into<PathBuf>, reads: Vec<RawRead>) {
        let path = path.into();
        self.unreadable.insert(path.clone());
        self.insert(path, reads);
    }

    fn container(&self, path: &Path) -> Result<&Container, SourceError> {
        if self.unreadable.contains(path) {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("cannot open {}", path.display()),
            )));
        }

        self.containers.get(path).ok_or_else(|| {
            SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ))
        })
    }
}

impl SquiggleSource for MemorySource {
    fn accepts(&self, path: &Path) -> bool {
        self.containers.contains_key(path)
    }

    fn containers(&self, root: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let mut found: Vec<PathBuf> = self
            .containers
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect();

        found.sort_unstable();
        Ok(found)
    }

    fn read_ids(&self, container: &Path) -> Result<Vec<String>, SourceError> {
        // INFO: listing works even for unreadable containers
        self.containers
            .get(container)
            .map(|c| c.reads.iter().map(|r| r.read_id.clone()).collect())
            .ok_or_else(|| SourceError::MissingDataset(container.display().to_string()))
    }

    fn metadata(&self, handle: &ReadHandle) -> Result<ReadMetadata, SourceError> {
        Ok(self.fetch(handle)?.metadata)
    }

    fn fetch(&self, handle: &ReadHandle) -> Result<RawRead, SourceError> {
        self.container(&handle.file)?.take(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw(id: &str) -> RawRead {
        RawRead {
            read_id: id.to_string(),
            signal: vec![1, 2, 3],
            moves: vec![1, 1],
            stride: 1,
            first_sample: 0,
            sequence: "AC".to_string(),
            metadata: ReadMetadata::default(),
        }
    }

    #[test]
    fn test_json_source_walks_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("pass").join("batch_0");
        std::fs::create_dir_all(&nested).unwrap();

        for (path, id) in [
            (dir.path().join("a.json"), "r1"),
            (nested.join("b.json"), "r2"),
        ] {
            let mut file = File::create(path).unwrap();
            let container = Container {
                file_type: None,
                reads: vec![raw(id)],
            };
            write!(file, "{}", serde_json::to_string(&container).unwrap()).unwrap();
        }
        File::create(nested.join("notes.txt")).unwrap();

        let source = JsonSource::new();
        let found = source.containers(dir.path()).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(source.read_ids(&found[1]).unwrap(), vec!["r2".to_string()]);

        let read = source.fetch(&ReadHandle::single(found[0].clone())).unwrap();
        assert_eq!(read.read_id, "r1");
    }

    #[test]
    fn test_json_source_surfaces_corrupt_containers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let mut file = File::create(&path).unwrap();
        write!(file, "{{\"reads\": [").unwrap();

        let source = JsonSource::new();
        assert!(matches!(
            source.fetch(&ReadHandle::single(path)),
            Err(SourceError::Json(_))
        ));
    }

    #[test]
    fn test_json_source_decodes_multi_read_containers_once_per_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        let container = serde_json::json!({
            "file_type": MULTI_READ,
            "reads": [raw("r1"), raw("r2")],
        });
        std::fs::write(&path, container.to_string()).unwrap();

        let source = JsonSource::new();
        let first = source.fetch(&ReadHandle::multi(path.clone(), "r1".into())).unwrap();
        assert_eq!(first.read_id, "r1");

        std::fs::remove_file(&path).unwrap();
        let second = source.fetch(&ReadHandle::multi(path.clone(), "r2".into())).unwrap();
        assert_eq!(second.read_id, "r2");

        source.release();
        assert!(matches!(
            source.fetch(&ReadHandle::multi(path, "r2".into())),
            Err(SourceError::Io(_))
        ));
    }

    #[test]
    fn test_memory_source_multi_read_lookup() {
        let mut source = MemorySource::new();
        source.insert("/runs/x/batch.json", vec![raw("r1"), raw("r2")]);

        let handle = ReadHandle::multi("/runs/x/batch.json".into(), "r2".into());
        let read = source.fetch(&handle).unwrap();

        assert_eq!(read.read_id, "r2");
        assert_eq!(read.metadata.attribute(FILE_TYPE), Some(MULTI_READ));

        let missing = ReadHandle::multi("/runs/x/batch.json".into(), "r9".into());
        assert!(matches!(
            source.fetch(&missing),
            Err(SourceError::MissingRead { .. })
        ));
    }

    #[test]
    fn test_handle_display_id_falls_back_to_stem() {
        let handle = ReadHandle::single("/runs/x/read_42.json".into());
        assert_eq!(handle.display_id(), "read_42");
    }
}
