use thiserror::Error;

/// Error taxonomy for the parameter-server core.
///
/// Contract violations (bad row index, conflicting embedding schema) are not
/// represented here — those panic at the violation site instead of being
/// threaded through `Result`, per the design's "fatal, SHOULD panic" rule.
#[derive(Error, Debug)]
pub enum PsError {
    #[error("size mismatch: gradient has {grad_len} elements, target has {target_len}")]
    SizeMismatch { grad_len: usize, target_len: usize },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("model has not been initialized by a PushModel call yet")]
    Uninitialized,

    #[error("unknown optimizer kind: {0}")]
    UnknownOptimizer(String),

    #[error("unknown embedding initializer: {0}")]
    UnknownInitializer(String),

    #[error("embedding table {name} already registered with dim {existing}, got {requested}")]
    ConflictingEmbeddingSchema {
        name: String,
        existing: i64,
        requested: i64,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PsResult<T> = Result<T, PsError>;
