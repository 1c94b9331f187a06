use serde::{Deserialize, Serialize};

/// One row of a precomputed duration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationEntry {
    /// Path relative to the audio root, e.g. `train-clean-100/103/1240/103-1240-0000.flac`.
    pub file_path: String,
    pub length: u64,
}

impl DurationEntry {
    pub fn new(file_path: impl Into<String>, length: u64) -> Self {
        Self {
            file_path: file_path.into(),
            length,
        }
    }

    /// Utterance key: the file name up to its first `.`.
    pub fn key(&self) -> &str {
        utterance_key(&self.file_path)
    }
}

/// `a/b/103-1240-0000.flac` -> `103-1240-0000`.
pub fn utterance_key(file_path: &str) -> &str {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);
    name.split('.').next().unwrap_or(name)
}

/// File references drawn consecutively from the duration-sorted table.
pub type Bucket = Vec<String>;

/// Output of the bucketing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketPlan {
    pub buckets: Vec<Bucket>,
    /// Table entries skipped because their key is not usable, in table order.
    pub skipped: Vec<String>,
    /// Number of full batches that were halved for exceeding the length threshold.
    pub halved: usize,
}

/// Keys dropped by the audio/transcript intersection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub usable: usize,
    /// In the duration tables but without a transcript.
    pub audio_only: Vec<String>,
    /// Transcribed but absent from the duration tables.
    pub transcript_only: Vec<String>,
}

impl KeyReport {
    pub fn dropped(&self) -> usize {
        self.audio_only.len() + self.transcript_only.len()
    }
}

/// A single waveform with its encoded label.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub wav: Vec<f32>,
    pub label: Vec<u32>,
}

/// Parallel waveform and label sequences of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub wavs: Vec<Vec<f32>>,
    pub labels: Vec<Vec<u32>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.wavs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavs.is_empty()
    }
}
