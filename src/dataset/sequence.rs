use std::sync::Arc;

use crate::audio::read_audio;
use crate::config::SequenceDatasetConfig;
use crate::corpus::{BucketIndex, CorpusIndex};
use crate::dataset::traits::Dataset;
use crate::dictionary::{Dictionary, FinalizeOptions, WhitespaceTokenizer};
use crate::error::DatasetError;
use crate::types::{Batch, Bucket, KeyReport};

/// Length-bucketed LibriSpeech dataset: item `k` is the whole bucket `k`.
pub struct SequenceDataset {
    config: SequenceDatasetConfig,
    dictionary: Arc<Dictionary>,
    index: BucketIndex,
}

impl SequenceDataset {
    /// Encode-only mode: labels use a shared, already finalized dictionary.
    pub fn new(
        config: SequenceDatasetConfig,
        dictionary: Arc<Dictionary>,
    ) -> Result<Self, DatasetError> {
        let index = BucketIndex::build(&config, &dictionary)?;
        Ok(Self {
            config,
            dictionary,
            index,
        })
    }

    /// Construction mode: the dictionary is built from this split's usable
    /// transcripts and finalized with `options`.
    pub fn with_built_dictionary(
        config: SequenceDatasetConfig,
        options: FinalizeOptions,
    ) -> Result<Self, DatasetError> {
        config.validate()?;
        let corpus = CorpusIndex::load(
            &config.split,
            &config.libri_root,
            &config.bucket_file,
            config.sub_splits()?,
        )?;
        let dictionary = Arc::new(Dictionary::build_from_transcripts(
            corpus.sorted_transcripts(),
            &WhitespaceTokenizer,
            options,
        ));
        let index = BucketIndex::from_corpus(&config, &corpus, &dictionary);
        Ok(Self {
            config,
            dictionary,
            index,
        })
    }

    pub fn config(&self) -> &SequenceDatasetConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    pub fn bucket_count(&self) -> usize {
        self.index.plan.buckets.len()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.index.plan.buckets
    }

    pub fn key_report(&self) -> &KeyReport {
        &self.index.report
    }

    pub fn index(&self) -> &BucketIndex {
        &self.index
    }

    fn load_wav(&self, file_path: &str) -> Result<Vec<f32>, DatasetError> {
        let path = self.config.libri_root.join(file_path);
        let clip = read_audio(&path)?;
        if clip.sample_rate != self.config.sample_rate {
            return Err(DatasetError::SampleRateMismatch {
                path,
                expected: self.config.sample_rate,
                actual: clip.sample_rate,
            });
        }
        Ok(clip.flatten())
    }
}

impl Dataset for SequenceDataset {
    type Item = Batch;

    fn len(&self) -> usize {
        self.bucket_count()
    }

    fn get(&self, index: usize) -> Result<Batch, DatasetError> {
        let bucket = self
            .index
            .plan
            .buckets
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.bucket_count(),
            })?;

        let mut batch = Batch {
            wavs: Vec::with_capacity(bucket.len()),
            labels: Vec::with_capacity(bucket.len()),
        };
        for file_path in bucket {
            let label = self.index.label_for(file_path).ok_or_else(|| {
                DatasetError::config(format!("no encoded label for '{file_path}'"))
            })?;
            batch.wavs.push(self.load_wav(file_path)?);
            batch.labels.push(label.to_vec());
        }
        tracing::debug!(bucket = index, size = batch.len(), "sequence dataset: bucket loaded");
        Ok(batch)
    }

    /// Buckets are already batches: exactly one must be requested per step.
    fn collate(&self, items: Vec<Batch>) -> Result<Batch, DatasetError> {
        if items.len() != 1 {
            return Err(DatasetError::Collate {
                message: format!("expected exactly one bucket per step, got {}", items.len()),
            });
        }
        Ok(items.into_iter().next().unwrap_or_default())
    }
}
