use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuflerError {
    #[error("Script generation failed on attempt {attempt}: {reason}")]
    GenerationFailed { attempt: u32, reason: String },

    #[error("Generator returned unparseable script: {reason}")]
    ScriptParse { reason: String },

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SuflerError>;
