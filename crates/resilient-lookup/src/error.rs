use thiserror::Error;

/// Errors raised while assembling a [`ResilientClient`](crate::ResilientClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientBuildError {
    #[error("no directory configured")]
    MissingDirectory,

    #[error("no remote store configured")]
    MissingStore,

    /// A registered service name was empty.
    #[error("invalid service name {0:?}")]
    InvalidServiceName(String),
}
