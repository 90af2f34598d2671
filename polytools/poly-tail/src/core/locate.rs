use std::path::Path;

use crate::{
    error::{FormatError, SourceError},
    record::Layout,
    source::{ReadHandle, SquiggleSource},
};

/// Every read under the input root as a flat list of handles.
///
/// A multi-read container that cannot be listed is kept as a single
/// file handle, so it still surfaces as an NA row downstream.
///
/// # Example
///
/// ```rust, ignore
/// let index = ReadIndex::build(&source, &root, Layout::Multi)?;
/// for handle in index.as_slice() {
///     println!("{:?}", handle);
/// }
/// ```
#[derive(Debug, Default)]
pub struct ReadIndex {
    handles: Vec<ReadHandle>,
}

impl ReadIndex {
    pub fn build(
        source: &dyn SquiggleSource,
        root: &Path,
        layout: Layout,
    ) -> Result<Self, SourceError> {
        let files = source.containers(root)?;
        let mut index = ReadIndex::default();

        match layout {
            Layout::Single => {
                index.handles = files.into_iter().map(ReadHandle::single).collect();
            }
            Layout::Multi => {
                for file in files {
                    match source.read_ids(&file) {
                        Ok(ids) => index
                            .handles
                            .extend(ids.into_iter().map(|id| ReadHandle::multi(file.clone(), id))),
                        Err(e) => {
                            log::warn!(
                                "WARN: cannot list {}: {}; reporting it as one NA read",
                                file.display(),
                                e
                            );
                            index.handles.push(ReadHandle::single(file));
                        }
                    }
                }
            }
        }

        log::info!(
            "INFO: Located {} reads in {}",
            index.handles.len(),
            root.display()
        );

        Ok(index)
    }

    pub fn as_slice(&self) -> &[ReadHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// First read of the first container under `root`, used for probing
pub fn sample_handle(source: &dyn SquiggleSource, root: &Path) -> Result<ReadHandle, FormatError> {
    for file in source.containers(root)? {
        match source.read_ids(&file) {
            Ok(ids) => match ids.into_iter().next() {
                Some(id) => return Ok(ReadHandle::multi(file, id)),
                None => continue,
            },
            Err(e) => log::warn!("WARN: cannot list {}: {}", file.display(), e),
        }
    }

    Err(FormatError::NoReads(root.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{JsonSource, MemorySource, RawRead, ReadMetadata};

    fn raw(id: &str) -> RawRead {
        RawRead {
            read_id: id.to_string(),
            signal: vec![0; 4],
            moves: vec![1],
            stride: 1,
            first_sample: 0,
            sequence: "A".to_string(),
            metadata: ReadMetadata::default(),
        }
    }

    #[test]
    fn test_multi_layout_indexes_every_read() {
        let mut source = MemorySource::new();
        source.insert("/run/b0.json", vec![raw("r1"), raw("r2")]);
        source.insert("/run/sub/b1.json", vec![raw("r3"), raw("r4"), raw("r5")]);
        source.insert("/other/b2.json", vec![raw("r6"), raw("r7")]);

        let index = ReadIndex::build(&source, Path::new("/run"), Layout::Multi).unwrap();

        assert_eq!(index.len(), 5);
        assert!(index
            .as_slice()
            .contains(&ReadHandle::multi("/run/sub/b1.json".into(), "r4".into())));
        assert!(index.as_slice().iter().all(|h| h.file.starts_with("/run")));
    }

    #[test]
    fn test_unlistable_container_keeps_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let container = serde_json::json!({
            "file_type": "multi-read",
            "reads": [raw("r1"), raw("r2")],
        });
        std::fs::write(dir.path().join("a.json"), container.to_string()).unwrap();
        std::fs::write(dir.path().join("b.json"), "{\"reads\": [{\"read_id\"").unwrap();

        let index = ReadIndex::build(&JsonSource::new(), dir.path(), Layout::Multi).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.as_slice()[2],
            ReadHandle::single(dir.path().join("b.json"))
        );
    }

    #[test]
    fn test_single_layout_uses_file_handles() {
        let mut source = MemorySource::new();
        source.insert("/run/a.json", vec![raw("r1")]);
        source.insert("/run/b.json", vec![raw("r2")]);

        let index = ReadIndex::build(&source, Path::new("/run"), Layout::Single).unwrap();

        assert_eq!(index.len(), 2);
        assert!(index.as_slice().iter().all(|h| h.read_id.is_none()));
    }

    #[test]
    fn test_sample_handle_on_empty_root() {
        let source = MemorySource::new();
        assert!(matches!(
            sample_handle(&source, Path::new("/run")),
            Err(FormatError::NoReads(_))
        ));
    }
}
