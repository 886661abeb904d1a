#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid cgroup name: {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
