use dashmap::DashMap;
use log::info;
use rayon::prelude::*;

use config::get_progress_bar;

use crate::{
    core::locate::{sample_handle, ReadIndex},
    core::probe::probe_format,
    core::read::{process_read, ReadContext},
    error::{FormatError, RunError},
    params::TailConfig,
    record::{ExperimentProfile, TailRecord},
    source::{ReadHandle, SquiggleSource},
    trace::{NoopSink, TraceSink},
};

/// Position of a read in the index. A duplicate item repeats the work
/// of a real one and its result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub index: usize,
    pub duplicate: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub profile: ExperimentProfile,
    pub records: Vec<TailRecord>,
}

/// Unordered collector shared by the workers of a run
#[derive(Debug, Default)]
struct ParallelAccumulator {
    records: DashMap<WorkItem, TailRecord>,
}

impl ParallelAccumulator {
    fn add(&self, item: WorkItem, record: TailRecord) {
        self.records.insert(item, record);
    }

    fn finish(self) -> Vec<TailRecord> {
        self.records
            .into_iter()
            .filter(|(item, _)| !item.duplicate)
            .map(|(_, record)| record)
            .collect()
    }
}

/// Splits `n` reads into `ceil(n / chunk_size)` chunks.
///
/// A final chunk holding a single read gets a duplicate of that read,
/// so every dispatched chunk carries at least two items.
///
/// # Example
///
/// ```rust, ignore
/// let chunks = plan_chunks(4001, 4000);
/// assert_eq!(chunks.len(), 2);
/// assert!(chunks[1][1].duplicate);
/// ```
pub fn plan_chunks(n: usize, chunk_size: usize) -> Vec<Vec<WorkItem>> {
    let items: Vec<WorkItem> = (0..n)
        .map(|index| WorkItem {
            index,
            duplicate: false,
        })
        .collect();

    let mut chunks: Vec<Vec<WorkItem>> = items
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect();

    if let Some(last) = chunks.last_mut() {
        if last.len() == 1 {
            let index = last[0].index;
            last.push(WorkItem {
                index,
                duplicate: true,
            });
        }
    }

    chunks
}

/// Processes every handle, one chunk at a time.
///
/// Reads inside a chunk run in parallel on `pool`; the next chunk
/// starts only once the current one has drained. Records come back
/// in no particular order, exactly one per handle. Duplicate items
/// never emit traces.
pub fn run_chunks(
    pool: &rayon::ThreadPool,
    ctx: &ReadContext<'_>,
    handles: &[ReadHandle],
    chunk_size: usize,
) -> Vec<TailRecord> {
    let chunks = plan_chunks(handles.len(), chunk_size);
    let acc = ParallelAccumulator::default();
    let untraced = ReadContext {
        sink: &NoopSink,
        ..*ctx
    };
    info!(
        "INFO: Processing {} reads in {} chunks of up to {}",
        handles.len(),
        chunks.len(),
        chunk_size
    );

    for (i, chunk) in chunks.iter().enumerate() {
        let pb = get_progress_bar(
            chunk.len() as u64,
            &format!("Chunk {}/{}...", i + 1, chunks.len()),
        );

        pool.install(|| {
            chunk.par_iter().for_each(|item| {
                let ctx = if item.duplicate { &untraced } else { ctx };
                let record = process_read(ctx, &handles[item.index]);
                acc.add(*item, record);
                pb.inc(1);
            })
        });

        pb.finish_and_clear();
        ctx.source.release();
        info!(
            "INFO: Finished chunk {}/{} ({} reads)",
            i + 1,
            chunks.len(),
            chunk.iter().filter(|item| !item.duplicate).count()
        );
    }

    acc.finish()
}

/// Probes the run, indexes every read and estimates all tails.
///
/// The worker pool is built first and dropped on every exit path,
/// including an early abort from the format probe.
///
/// # Arguments
///
/// * `config` - run configuration
/// * `source` - container reader
/// * `sink` - receiver of diagnostic traces
///
/// # Example
///
/// ```rust, ignore
/// let summary = run(&config, &JsonSource::new(), &NoopSink)?;
/// println!("{} reads", summary.records.len());
/// ```
pub fn run(
    config: &TailConfig,
    source: &dyn SquiggleSource,
    sink: &dyn TraceSink,
) -> Result<RunSummary, RunError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("poly-tail-{}", i))
        .build()?;

    let handle = sample_handle(source, &config.input)?;
    let profile = probe_format(source, &handle)?;
    info!("INFO: Detected profile: {:?}", profile);

    let index = ReadIndex::build(source, &config.input, profile.layout).map_err(FormatError::from)?;
    if index.is_empty() {
        return Err(FormatError::NoReads(config.input.clone()).into());
    }

    let ctx = ReadContext {
        source,
        profile: &profile,
        config,
        sink,
    };

    let records = run_chunks(&pool, &ctx, index.as_slice(), config.chunk_size);

    let count = |state: Option<bool>| records.iter().filter(|r| r.tail_is_valid == state).count();
    info!(
        "INFO: Valid tails: {}, no tail: {}, NA: {}",
        count(Some(true)),
        count(Some(false)),
        count(None)
    );

    Ok(RunSummary { profile, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{JsonSource, MemorySource, RawRead, ReadMetadata};
    use crate::trace::SignalTrace;

    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    fn raw(id: &str, experiment: &str) -> RawRead {
        RawRead {
            read_id: id.to_string(),
            signal: vec![800; 8],
            moves: vec![1, 1, 1, 1],
            stride: 2,
            first_sample: 0,
            sequence: "ACGT".to_string(),
            metadata: ReadMetadata {
                datasets: vec![],
                attributes: BTreeMap::from([("experiment_type".to_string(), experiment.to_string())]),
            },
        }
    }

    fn source(n: usize) -> MemorySource {
        let mut source = MemorySource::new();
        for i in 0..n {
            source.insert(format!("/run/r{:03}.json", i), vec![raw(&format!("r{:03}", i), "dna")]);
        }
        source
    }

    fn tail_config(chunk_size: usize) -> TailConfig {
        let mut config = TailConfig::new("/run".into());
        config.workers = 2;
        config.chunk_size = chunk_size;
        config
    }

    fn ids(records: &[TailRecord]) -> Vec<String> {
        let mut ids: Vec<String> = records.iter().map(|r| r.read_id.clone()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_plan_duplicates_single_leftover() {
        let chunks = plan_chunks(4001, 4000);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4000);
        assert_eq!(
            chunks[1],
            vec![
                WorkItem {
                    index: 4000,
                    duplicate: false
                },
                WorkItem {
                    index: 4000,
                    duplicate: true
                }
            ]
        );

        let distinct: HashSet<usize> = chunks
            .iter()
            .flatten()
            .filter(|item| !item.duplicate)
            .map(|item| item.index)
            .collect();
        assert_eq!(distinct.len(), 4001);
    }

    #[test]
    fn test_plan_without_leftover() {
        let chunks = plan_chunks(8000, 4000);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().flatten().all(|item| !item.duplicate));
        assert!(plan_chunks(0, 4000).is_empty());
    }

    #[test]
    fn test_run_yields_one_record_per_read() {
        let source = source(5);

        let summary = run(&tail_config(2), &source, &NoopSink).unwrap();

        assert_eq!(summary.records.len(), 5);
        assert_eq!(
            ids(&summary.records),
            (0..5).map(|i| format!("r{:03}", i)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unreadable_container_is_reported_as_na() {
        let mut source = source(3);
        source.insert_unreadable("/run/z.json", vec![raw("z", "dna")]);

        let summary = run(&tail_config(4000), &source, &NoopSink).unwrap();

        assert_eq!(summary.records.len(), 4);
        let broken = summary
            .records
            .iter()
            .find(|r| r.read_id == "z")
            .unwrap();
        assert_eq!(broken.tail_is_valid, None);
        assert!(summary
            .records
            .iter()
            .filter(|r| r.read_id != "z")
            .all(|r| r.tail_is_valid == Some(false)));
    }

    #[test]
    fn test_unlistable_multi_read_container_is_reported_as_na() {
        let dir = tempfile::tempdir().unwrap();
        let container = serde_json::json!({
            "file_type": "multi-read",
            "reads": [raw("r1", "dna"), raw("r2", "dna")],
        });
        std::fs::write(dir.path().join("a.json"), container.to_string()).unwrap();
        std::fs::write(dir.path().join("b.json"), "{\"reads\": [").unwrap();

        let mut config = tail_config(4000);
        config.input = dir.path().to_path_buf();

        let summary = run(&config, &JsonSource::new(), &NoopSink).unwrap();

        assert_eq!(ids(&summary.records), vec!["b", "r1", "r2"]);
        let broken = summary
            .records
            .iter()
            .find(|r| r.read_id == "b")
            .unwrap();
        assert_eq!(broken, &TailRecord::na("b", dir.path().join("b.json")));
    }

    #[derive(Default)]
    struct CountingSink {
        seen: Mutex<Vec<String>>,
    }

    impl TraceSink for CountingSink {
        fn accept(&self, trace: &SignalTrace<'_>) -> std::io::Result<()> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(trace.read_id.to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_leftover_read_is_traced_once() {
        let source = source(3);
        let mut config = tail_config(2);
        config.emit_traces = true;
        let sink = CountingSink::default();

        let summary = run(&config, &source, &sink).unwrap();

        assert_eq!(summary.records.len(), 3);
        let mut seen = sink.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec!["r000", "r001", "r002"]);
    }

    #[test]
    fn test_repeated_runs_agree() {
        let source = source(7);
        let config = tail_config(3);

        let mut first = run(&config, &source, &NoopSink).unwrap().records;
        let mut second = run(&config, &source, &NoopSink).unwrap().records;
        first.sort_by(|a, b| a.read_id.cmp(&b.read_id));
        second.sort_by(|a, b| a.read_id.cmp(&b.read_id));

        assert_eq!(first, second);
    }

    #[test]
    fn test_multi_strand_sample_aborts_run() {
        let mut read = raw("r0", "dna");
        read.metadata.datasets.push("Basecall_2D_000".to_string());
        let mut source = MemorySource::new();
        source.insert("/run/a.json", vec![read]);

        let result = run(&tail_config(4000), &source, &NoopSink);

        assert!(matches!(
            result,
            Err(RunError::Format(FormatError::NotSingleStrand(_)))
        ));
    }

    #[test]
    fn test_empty_root_has_no_reads() {
        let result = run(&tail_config(4000), &MemorySource::new(), &NoopSink);

        assert!(matches!(
            result,
            Err(RunError::Format(FormatError::NoReads(_)))
        ));
    }
}
