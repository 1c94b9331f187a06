use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::audio::{read_audio, resample, AudioClip};
use crate::config::ManifestDatasetConfig;
use crate::corpus::normalize_transcript;
use crate::dataset::traits::Dataset;
use crate::dictionary::{Dictionary, WhitespaceTokenizer};
use crate::error::DatasetError;
use crate::types::{Batch, Sample};

#[derive(Debug, Deserialize)]
struct ManifestRow {
    utterance_id: String,
    utterance_text: String,
}

/// Flat `(utterance, transcript)` dataset read from a manifest table.
///
/// Labels are encoded with a finalized dictionary snapshot and tokens the
/// dictionary does not know are dropped. Audio is stored at
/// `source_sample_rate`, downmixed to mono and resampled on load.
pub struct ManifestDataset {
    config: ManifestDatasetConfig,
    dictionary: Arc<Dictionary>,
    wav_paths: Vec<PathBuf>,
    transcripts: Vec<String>,
    labels: Vec<Vec<u32>>,
}

impl ManifestDataset {
    /// Loads the dictionary snapshot from `dict_path` or `<bucket_file>/dict.json`.
    pub fn new(config: ManifestDatasetConfig) -> Result<Self, DatasetError> {
        let dict_path = config.dictionary_path();
        if !dict_path.is_file() {
            return Err(DatasetError::config(format!(
                "dictionary snapshot not found: {}",
                dict_path.display()
            )));
        }
        let dictionary = Arc::new(Dictionary::load(&dict_path)?);
        Self::with_dictionary(config, dictionary)
    }

    pub fn with_dictionary(
        config: ManifestDatasetConfig,
        dictionary: Arc<Dictionary>,
    ) -> Result<Self, DatasetError> {
        let manifest_path = config.manifest_path();
        let context = || format!("read manifest {}", manifest_path.display());
        let mut reader =
            csv::Reader::from_path(&manifest_path).map_err(|e| DatasetError::csv(context(), e))?;

        let mut wav_paths = Vec::new();
        let mut transcripts = Vec::new();
        for row in reader.deserialize::<ManifestRow>() {
            let row = row.map_err(|e| DatasetError::csv(context(), e))?;
            wav_paths.push(config.hidden_root.join(format!("{}.wav", row.utterance_id)));
            transcripts.push(normalize_transcript(&row.utterance_text));
        }

        let unk = dictionary.unk_index();
        let labels: Vec<Vec<u32>> = transcripts
            .iter()
            .map(|text| {
                dictionary
                    .encode_line(text, &WhitespaceTokenizer, config.append_eos)
                    .into_iter()
                    .filter(|&id| id != unk)
                    .collect()
            })
            .collect();

        tracing::info!(
            manifest = %manifest_path.display(),
            utterances = wav_paths.len(),
            "manifest dataset: loaded"
        );
        Ok(Self {
            config,
            dictionary,
            wav_paths,
            transcripts,
            labels,
        })
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    pub fn wav_path(&self, index: usize) -> Option<&Path> {
        self.wav_paths.get(index).map(PathBuf::as_path)
    }

    /// Normalized transcript before encoding.
    pub fn transcript(&self, index: usize) -> Option<&str> {
        self.transcripts.get(index).map(String::as_str)
    }

    pub fn label(&self, index: usize) -> Option<&[u32]> {
        self.labels.get(index).map(Vec::as_slice)
    }

    fn check_rate(&self, path: &Path, clip: AudioClip) -> Result<AudioClip, DatasetError> {
        if clip.sample_rate != self.config.source_sample_rate {
            return Err(DatasetError::SampleRateMismatch {
                path: path.to_path_buf(),
                expected: self.config.source_sample_rate,
                actual: clip.sample_rate,
            });
        }
        Ok(clip)
    }

    /// Reads `path`, or its two `_(1)`/`_(2)` segment files when the primary
    /// file cannot be decoded, then downmixes and resamples.
    fn load_wav(&self, path: &Path) -> Result<Vec<f32>, DatasetError> {
        let clip = match read_audio(path) {
            Ok(clip) => self.check_rate(path, clip)?,
            Err(err) => {
                let (first, second) = segment_paths(path);
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "manifest dataset: primary load failed, joining segments"
                );
                let head = self.check_rate(&first, read_audio(&first)?)?;
                let tail = self.check_rate(&second, read_audio(&second)?)?;
                head.concat(tail)?
            }
        };

        resample(
            &clip.downmix(),
            self.config.source_sample_rate,
            self.config.target_sample_rate,
        )
    }
}

/// `dir/utt.wav` -> (`dir/utt_(1).wav`, `dir/utt_(2).wav`).
pub fn segment_paths(path: &Path) -> (PathBuf, PathBuf) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let segment = |n: u8| {
        let name = match path.extension() {
            Some(ext) => format!("{stem}_({n}).{}", ext.to_string_lossy()),
            None => format!("{stem}_({n})"),
        };
        path.with_file_name(name)
    };
    (segment(1), segment(2))
}

impl Dataset for ManifestDataset {
    type Item = Sample;

    fn len(&self) -> usize {
        self.wav_paths.len()
    }

    fn get(&self, index: usize) -> Result<Sample, DatasetError> {
        let path = self.wav_paths.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.wav_paths.len(),
        })?;
        Ok(Sample {
            wav: self.load_wav(path)?,
            label: self.labels[index].clone(),
        })
    }

    fn collate(&self, items: Vec<Sample>) -> Result<Batch, DatasetError> {
        let (wavs, labels) = items.into_iter().map(|s| (s.wav, s.label)).unzip();
        Ok(Batch { wavs, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_paths_insert_suffix_before_extension() {
        let (a, b) = segment_paths(Path::new("/hidden/42.wav"));
        assert_eq!(a, PathBuf::from("/hidden/42_(1).wav"));
        assert_eq!(b, PathBuf::from("/hidden/42_(2).wav"));
    }

    #[test]
    fn segment_paths_without_extension() {
        let (a, _) = segment_paths(Path::new("/hidden/42"));
        assert_eq!(a, PathBuf::from("/hidden/42_(1)"));
    }
}
