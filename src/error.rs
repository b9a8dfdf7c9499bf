/// Error type for every fallible operation in the crate.
///
/// All variants are terminal for a training run: nothing in the crate retries.
#[derive(Debug, thiserror::Error)]
pub enum SlideError {
    /// Missing or out-of-range configuration field.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A data record that could not be tokenized.
    #[error("malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// A parsed example that does not fit the network (index out of range, no labels, ...).
    #[error("invalid example: {0}")]
    InvalidExample(String),

    /// Injected weights whose shape disagrees with the configured topology.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type SlideResult<T> = Result<T, SlideError>;
