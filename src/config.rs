use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Sample rate every training waveform is expected to have.
pub const SAMPLE_RATE: u32 = 16_000;
/// Batches whose longest member exceeds this length are split in two.
pub const HALF_BATCHSIZE_TIME: u64 = 2000;
/// Native sample rate of the fixed-manifest recordings.
pub const HIDDEN_SAMPLE_RATE: u32 = 44_100;
/// File name of the dictionary snapshot inside a bucket directory.
pub const DICTIONARY_SNAPSHOT: &str = "dict.json";
pub const DEFAULT_MANIFEST_FILE: &str = "scripta.csv";

/// Construction parameters for the length-bucketed dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDatasetConfig {
    /// Key into `split_sets` naming the sub-splits to merge.
    pub split: String,
    pub bucket_size: usize,
    pub libri_root: PathBuf,
    /// Directory holding one `<sub-split>.csv` duration table per sub-split.
    pub bucket_file: PathBuf,
    #[serde(default)]
    pub split_sets: HashMap<String, Vec<String>>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_half_batch_threshold")]
    pub half_batch_threshold: u64,
    #[serde(default = "default_true")]
    pub append_eos: bool,
}

impl SequenceDatasetConfig {
    pub fn new(
        split: impl Into<String>,
        bucket_size: usize,
        libri_root: impl Into<PathBuf>,
        bucket_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            split: split.into(),
            bucket_size,
            libri_root: libri_root.into(),
            bucket_file: bucket_file.into(),
            split_sets: HashMap::new(),
            sample_rate: SAMPLE_RATE,
            half_batch_threshold: HALF_BATCHSIZE_TIME,
            append_eos: true,
        }
    }

    pub fn with_split_set(mut self, key: impl Into<String>, sub_splits: Vec<String>) -> Self {
        self.split_sets.insert(key.into(), sub_splits);
        self
    }

    /// Sub-split names configured for `self.split`.
    pub fn sub_splits(&self) -> Result<&[String], DatasetError> {
        self.split_sets
            .get(&self.split)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                DatasetError::config(format!("no sub-splits configured for split '{}'", self.split))
            })
    }

    pub(crate) fn validate(&self) -> Result<(), DatasetError> {
        if self.bucket_size == 0 {
            return Err(DatasetError::config("bucket_size must be >= 1"));
        }
        if self.sample_rate == 0 {
            return Err(DatasetError::config("sample_rate must be > 0"));
        }
        if !self.bucket_file.is_dir() {
            return Err(DatasetError::config(format!(
                "bucket_file '{}' is not a directory; generate duration tables first (asr_data duration-table)",
                self.bucket_file.display()
            )));
        }
        Ok(())
    }
}

/// Construction parameters for the fixed-manifest dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDatasetConfig {
    pub hidden_root: PathBuf,
    pub bucket_file: PathBuf,
    #[serde(default)]
    pub dict_path: Option<PathBuf>,
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default = "default_hidden_sample_rate")]
    pub source_sample_rate: u32,
    #[serde(default = "default_sample_rate")]
    pub target_sample_rate: u32,
    #[serde(default = "default_true")]
    pub append_eos: bool,
}

impl ManifestDatasetConfig {
    pub fn new(hidden_root: impl Into<PathBuf>, bucket_file: impl Into<PathBuf>) -> Self {
        Self {
            hidden_root: hidden_root.into(),
            bucket_file: bucket_file.into(),
            dict_path: None,
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            source_sample_rate: HIDDEN_SAMPLE_RATE,
            target_sample_rate: SAMPLE_RATE,
            append_eos: true,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.hidden_root.join(&self.manifest_file)
    }

    /// Explicit `dict_path`, or the snapshot stored next to the duration tables.
    pub fn dictionary_path(&self) -> PathBuf {
        self.dict_path
            .clone()
            .unwrap_or_else(|| self.bucket_file.join(DICTIONARY_SNAPSHOT))
    }
}

/// Top-level data configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub sequence: SequenceDatasetConfig,
    #[serde(default)]
    pub hidden: Option<ManifestDatasetConfig>,
}

impl DataConfig {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::io(format!("read {}", path.display()), e))?;
        serde_json::from_str(&data)
            .map_err(|e| DatasetError::json(format!("parse {}", path.display()), e))
    }
}

fn default_sample_rate() -> u32 {
    SAMPLE_RATE
}
fn default_hidden_sample_rate() -> u32 {
    HIDDEN_SAMPLE_RATE
}
fn default_half_batch_threshold() -> u64 {
    HALF_BATCHSIZE_TIME
}
fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_config_defaults_from_json() {
        let json = r#"{
            "split": "train",
            "bucket_size": 12,
            "libri_root": "/data/LibriSpeech",
            "bucket_file": "/data/len_for_bucket",
            "split_sets": {"train": ["train-clean-100", "train-clean-360"]}
        }"#;
        let config: SequenceDatasetConfig = serde_json::from_str(json).expect("valid config json");
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.half_batch_threshold, 2000);
        assert!(config.append_eos);
        assert_eq!(
            config.sub_splits().unwrap(),
            ["train-clean-100", "train-clean-360"]
        );
    }

    #[test]
    fn missing_split_key_is_config_error() {
        let config = SequenceDatasetConfig::new("dev-clean", 4, "/root", "/buckets");
        let err = config.sub_splits().unwrap_err();
        assert!(matches!(err, DatasetError::Config { .. }));
    }

    #[test]
    fn zero_bucket_size_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SequenceDatasetConfig::new("train", 0, dir.path(), dir.path());
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_bucket_dir_rejected() {
        let config = SequenceDatasetConfig::new("train", 2, "/root", "/nonexistent/len_for_bucket");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duration-table"));
    }

    #[test]
    fn manifest_dictionary_path_falls_back_to_bucket_dir() {
        let mut config = ManifestDatasetConfig::new("/hidden", "/buckets");
        assert_eq!(config.dictionary_path(), PathBuf::from("/buckets/dict.json"));
        config.dict_path = Some(PathBuf::from("/elsewhere/dict.json"));
        assert_eq!(config.dictionary_path(), PathBuf::from("/elsewhere/dict.json"));
        assert_eq!(config.manifest_path(), PathBuf::from("/hidden/scripta.csv"));
        assert_eq!(config.source_sample_rate, 44_100);
    }

    #[test]
    fn data_config_load_round_trips_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{"sequence": {"split": "dev", "bucket_size": 2, "libri_root": "a", "bucket_file": "b"}}"#,
        )
        .expect("write config");
        let config = DataConfig::load(&path).expect("load config");
        assert_eq!(config.sequence.bucket_size, 2);
        assert!(config.hidden.is_none());
        assert!(DataConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
