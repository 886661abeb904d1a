use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to enumerate powercap zones in `{path}`: {source}")]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no RAPL package found in `{path}`")]
    NoPackagesFound { path: PathBuf },
    #[error("failed to initialize RAPL package {package} at `{path}`: {source}")]
    PackageInit {
        package: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Read(#[from] fsutil::ReadValueError),
}

impl Error {
    pub(super) fn package_init(package: u32, err: fsutil::ReadValueError) -> Self {
        Error::PackageInit {
            package,
            path: err.path,
            source: err.source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
