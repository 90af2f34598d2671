use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{MIN_CHUNK_SIZE, MIN_THREADS};

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write any collection of lines to a file, header first
pub fn write_collection(header: &str, data: &[String], fname: &Path) -> std::io::Result<()> {
    log::info!(
        "INFO: Records in {}: {:?}. Writing...",
        fname.display(),
        data.len()
    );
    let mut writer = BufWriter::new(File::create(fname)?);

    writeln!(writer, "{}", header)?;
    for line in data.iter() {
        writeln!(writer, "{}", line)?;
    }

    writer.flush()
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        validate_dir(self.get_input())?;

        if self.get_threads() < MIN_THREADS {
            let err = format!("ERROR: --threads must be at least {}", MIN_THREADS);
            return Err(CliError::InvalidInput(err));
        }

        if self.get_chunk_size() < MIN_CHUNK_SIZE {
            let err = format!("ERROR: --chunk-size must be at least {}", MIN_CHUNK_SIZE);
            return Err(CliError::InvalidInput(err));
        }

        match self.get_params() {
            Some(params) => validate_file(params, "json")?,
            None => log::warn!("WARN: No calibration file provided. Using defaults..."),
        }

        Ok(())
    }

    fn get_input(&self) -> &PathBuf;
    fn get_params(&self) -> Option<&PathBuf>;
    fn get_threads(&self) -> usize;
    fn get_chunk_size(&self) -> usize;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// input directory validation
pub fn validate_dir(arg: &Path) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a directory",
            arg
        )));
    }

    Ok(())
}

/// file validation against an expected extension
pub fn validate_file(arg: &Path, extension: &str) -> Result<(), CliError> {
    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    match arg.extension() {
        Some(ext) if ext == extension => (),
        _ => {
            return Err(CliError::InvalidInput(format!(
                "ERROR: file {:?} is not a .{} file",
                arg, extension
            )))
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct TestArgs {
        input: PathBuf,
        params: Option<PathBuf>,
        threads: usize,
        chunk_size: usize,
    }

    impl ArgCheck for TestArgs {
        fn get_input(&self) -> &PathBuf {
            &self.input
        }

        fn get_params(&self) -> Option<&PathBuf> {
            self.params.as_ref()
        }

        fn get_threads(&self) -> usize {
            self.threads
        }

        fn get_chunk_size(&self) -> usize {
            self.chunk_size
        }
    }

    #[test]
    fn test_validate_dir_rejects_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(validate_dir(file.path()).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(validate_dir(dir.path()).is_ok());
    }

    #[test]
    fn test_validate_file_checks_extension_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("params.json");
        File::create(&empty).unwrap();
        assert!(validate_file(&empty, "json").is_err());

        let mut full = File::create(dir.path().join("params.txt")).unwrap();
        write!(full, "{{}}").unwrap();
        assert!(validate_file(&dir.path().join("params.txt"), "json").is_err());

        let mut good = File::create(dir.path().join("good.json")).unwrap();
        write!(good, "{{}}").unwrap();
        assert!(validate_file(&dir.path().join("good.json"), "json").is_ok());
    }

    #[test]
    fn test_arg_check_rejects_zero_threads() {
        let dir = tempfile::tempdir().unwrap();
        let args = TestArgs {
            input: dir.path().to_path_buf(),
            params: None,
            threads: 0,
            chunk_size: 10,
        };

        assert!(args.check().is_err());

        let args = TestArgs { threads: 2, ..args };
        assert!(args.check().is_ok());
    }

    #[test]
    fn test_write_collection_puts_header_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let lines = vec!["a\t1".to_string(), "b\t2".to_string()];

        write_collection("name\tvalue", &lines, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "name\tvalue\na\t1\nb\t2\n");
    }
}
