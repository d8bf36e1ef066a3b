use thiserror::Error;

/// Fatal error returned by the simulation engine.
///
/// Exactly one of these surfaces from a run; there is no degraded
/// continuation. Each variant corresponds to one failure class so the caller
/// can map them to diagnostics and exit codes.
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected run parameters, detected before any I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The broker could not be reached, or refused the connection, after the
    /// connect phase's bounded attempts.
    #[error("broker connection failed: {0}")]
    Connection(lapin::Error),

    /// A delivery was rejected or the connection was lost mid-run and the
    /// retry budget is exhausted.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The output document could not be written. Only reachable after a fully
    /// successful run; the atomic write leaves any prior file untouched.
    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),

    /// A reading could not be encoded to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The process received an interrupt signal mid-run. The broker
    /// connection is released before this surfaces.
    #[error("simulation interrupted")]
    Interrupted,
}

impl SimError {
    /// Process exit code for this failure class, used by the CLI front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::Config(_) => 2,
            SimError::Connection(_) => 3,
            SimError::Publish(_) => 4,
            SimError::Io(_) => 5,
            SimError::Serialization(_) => 6,
            SimError::Interrupted => 130,
        }
    }
}
