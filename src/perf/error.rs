use std::path::PathBuf;

/// Errors raised while opening or reading a counter group.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no known metric in spec `{spec}`")]
    EmptySelection { spec: String },

    #[error("no metric selected")]
    NoMetrics,

    #[error("metric index {index} is not in the catalog")]
    UnknownMetric { index: usize },

    #[error("failed to open cgroup `{path}`: {source}")]
    CgroupOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open counter `{metric}` on cpu {cpu}: {source}")]
    CounterOpen {
        metric: &'static str,
        cpu: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to detect online cpu count: {0}")]
    CoreCount(#[source] std::io::Error),

    #[error("failed to read counter `{metric}` on cpu {cpu}: {source}")]
    Read {
        metric: &'static str,
        cpu: usize,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns true if the failed call may succeed when repeated later.
    ///
    /// Only reads qualify: the group is left intact and was not reset.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Read { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
