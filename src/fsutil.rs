use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when a single-value sysfs/procfs file cannot be read or parsed.
#[derive(Debug, thiserror::Error)]
#[error("failed to read value from `{path}`: {source}")]
pub struct ReadValueError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cgperf::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads the first line of a file with surrounding whitespace removed.
///
/// Kernel attribute files (`/sys/class/powercap/*/name`, `/proc/sys/kernel/hostname`)
/// hold a single newline-terminated value.
pub fn read_trimmed(path: impl AsRef<Path>) -> Result<String, ReadValueError> {
    let path = path.as_ref();
    let err = |source| ReadValueError {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(err)?);
    let mut line = String::with_capacity(32);
    reader.read_line(&mut line).map_err(err)?;
    Ok(line.trim().to_owned())
}

/// Reads a single unsigned integer from a file such as `energy_uj`.
pub fn read_u64(path: impl AsRef<Path>) -> Result<u64, ReadValueError> {
    let path = path.as_ref();
    let raw = read_trimmed(path)?;
    raw.parse::<u64>().map_err(|e| ReadValueError {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}
