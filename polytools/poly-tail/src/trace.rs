//! Optional diagnostic traces for an external plotting step.
//! Sink failures are logged and never change a read's result.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::record::{CrudeBoundary, PreciseBoundary};

pub struct SignalTrace<'a> {
    pub read_id: &'a str,
    pub samples: &'a [i16],
    pub crude: Option<CrudeBoundary>,
    pub precise: Option<PreciseBoundary>,
}

pub trait TraceSink: Send + Sync {
    fn accept(&self, trace: &SignalTrace<'_>) -> std::io::Result<()>;
}

/// Discards every trace
#[derive(Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn accept(&self, _: &SignalTrace<'_>) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<read_id>.tsv`: boundary comments, then one sample per line
#[derive(Debug)]
pub struct TsvTraceSink {
    dir: PathBuf,
}

impl TsvTraceSink {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl TraceSink for TsvTraceSink {
    fn accept(&self, trace: &SignalTrace<'_>) -> std::io::Result<()> {
        let path = self.dir.join(format!("{}.tsv", file_stem(trace.read_id)));
        let mut writer = BufWriter::new(File::create(path)?);

        if let Some(crude) = trace.crude {
            writeln!(
                writer,
                "# crude\t{}\t{}",
                crude.start_sample, crude.end_sample
            )?;
        }
        if let Some(precise) = trace.precise {
            writeln!(
                writer,
                "# precise\t{}\t{}\t{}",
                precise.start_sample, precise.end_sample, precise.is_precise
            )?;
        }

        writeln!(writer, "sample\tvalue")?;
        for (i, value) in trace.samples.iter().enumerate() {
            writeln!(writer, "{}\t{}", i, value)?;
        }

        writer.flush()
    }
}

/// Keeps a read id usable as a single path component
fn file_stem(read_id: &str) -> String {
    read_id
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}
