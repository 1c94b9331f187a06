use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("CSV error while {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to decode audio '{}': {message}", path.display())]
    Audio { path: PathBuf, message: String },
    #[error(
        "sample rate mismatch for '{}': real {actual}, config {expected}",
        path.display()
    )]
    SampleRateMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },
    #[error("resampling {from} Hz -> {to} Hz failed: {message}")]
    Resample { from: u32, to: u32, message: String },
    #[error("transcript file not found: {}", path.display())]
    MissingTranscript { path: PathBuf },
    #[error("invalid configuration: {message}")]
    Config { message: String },
    #[error("0 data found for {split}")]
    EmptySplit { split: String },
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("collate: {message}")]
    Collate { message: String },
    #[error("upstream '{name}': {message}")]
    Upstream { name: String, message: String },
}

impl DatasetError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn audio(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Audio {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn upstream(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            name: name.into(),
            message: err.to_string(),
        }
    }
}
