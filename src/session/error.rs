use crate::cgroup::{self, CgroupName};
use crate::perf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidName(#[from] cgroup::Error),
    #[error("no active session for cgroup `{0}`")]
    NotFound(String),
    #[error("cgroup `{cgroup}`: {source}")]
    Perf {
        cgroup: CgroupName,
        #[source]
        source: perf::Error,
    },
}

impl Error {
    /// Returns true if the failed call may succeed when repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Perf { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
