//! Length-bucketed batching over duration tables.
//!
//! Entries are sorted longest first and grouped greedily into buckets of
//! `bucket_size`. A full batch whose longest member exceeds the length
//! threshold becomes two half-size buckets. A trailing partial batch survives
//! only when it holds more than one entry.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::config::SequenceDatasetConfig;
use crate::corpus::duration_table::{load_duration_tables, sort_by_length_desc};
use crate::corpus::transcript::{load_transcripts, TranscriptIndex};
use crate::dictionary::{Dictionary, WhitespaceTokenizer};
use crate::error::DatasetError;
use crate::types::{utterance_key, BucketPlan, DurationEntry, KeyReport};


/// Groups duration-sorted `entries` into buckets, skipping unusable keys.
pub fn plan_buckets(
    entries: &[DurationEntry],
    usable: &HashSet<String>,
    bucket_size: usize,
    half_batch_threshold: u64,
) -> BucketPlan {
    let mut plan = BucketPlan::default();
    if bucket_size == 0 {
        return plan;
    }

    let mut batch: Vec<&DurationEntry> = Vec::with_capacity(bucket_size);
    for entry in entries {
        if !usable.contains(entry.key()) {
            plan.skipped.push(entry.file_path.clone());
            continue;
        }
        batch.push(entry);
        if batch.len() < bucket_size {
            continue;
        }

        let max_len = batch.iter().map(|e| e.length).max().unwrap_or(0);
        let paths: Vec<String> = batch.drain(..).map(|e| e.file_path.clone()).collect();
        if bucket_size >= 2 && max_len > half_batch_threshold {
            let half = bucket_size / 2;
            tracing::debug!(
                bucket = plan.buckets.len(),
                max_len,
                half_batch_threshold,
                "bucketing: halving long batch"
            );
            plan.buckets.push(paths[..half].to_vec());
            plan.buckets.push(paths[half..].to_vec());
            plan.halved += 1;
        } else {
            plan.buckets.push(paths);
        }
    }

    // A single leftover entry is dropped, not emitted as a batch of one.
    if batch.len() > 1 {
        plan.buckets
            .push(batch.into_iter().map(|e| e.file_path.clone()).collect());
    }
    plan
}

/// Duration tables joined with transcripts, before any labels are encoded.
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    entries: Vec<DurationEntry>,
    transcripts: HashMap<String, String>,
    usable: HashSet<String>,
    report: KeyReport,
}

impl CorpusIndex {
    /// Reads duration tables for `sub_splits` under `bucket_dir` and the
    /// transcripts they reference under `root`.
    pub fn load(
        split: &str,
        root: &Path,
        bucket_dir: &Path,
        sub_splits: &[String],
    ) -> Result<Self, DatasetError> {
        let entries = load_duration_tables(bucket_dir, sub_splits)?;
        if entries.is_empty() {
            return Err(DatasetError::EmptySplit {
                split: split.to_string(),
            });
        }
        let transcripts = load_transcripts(root, entries.iter().map(|e| e.file_path.as_str()))?;
        Self::from_parts(split, entries, transcripts)
    }

    /// Intersects table keys with transcript keys. Keys on only one side are
    /// dropped and reported through [`CorpusIndex::key_report`].
    pub fn from_parts(
        split: &str,
        mut entries: Vec<DurationEntry>,
        transcripts: TranscriptIndex,
    ) -> Result<Self, DatasetError> {
        sort_by_length_desc(&mut entries);

        let audio_keys: BTreeSet<&str> = entries.iter().map(DurationEntry::key).collect();
        let usable: HashSet<String> = audio_keys
            .iter()
            .filter(|key| transcripts.contains(key))
            .map(|key| key.to_string())
            .collect();
        if usable.is_empty() {
            return Err(DatasetError::EmptySplit {
                split: split.to_string(),
            });
        }

        let audio_only = audio_keys
            .iter()
            .filter(|key| !usable.contains(**key))
            .map(|key| key.to_string())
            .collect();
        let mut transcript_only: Vec<String> = transcripts
            .keys()
            .filter(|key| !audio_keys.contains(key))
            .map(str::to_string)
            .collect();
        transcript_only.sort();
        let report = KeyReport {
            usable: usable.len(),
            audio_only,
            transcript_only,
        };
        if report.dropped() > 0 {
            tracing::warn!(
                split,
                usable = report.usable,
                audio_only = report.audio_only.len(),
                transcript_only = report.transcript_only.len(),
                "corpus: keys without a counterpart were dropped"
            );
        }

        let mut transcripts = transcripts.into_records();
        transcripts.retain(|key, _| usable.contains(key));

        Ok(Self {
            entries,
            transcripts,
            usable,
            report,
        })
    }

    /// Table entries, longest first.
    pub fn entries(&self) -> &[DurationEntry] {
        &self.entries
    }

    pub fn usable_keys(&self) -> &HashSet<String> {
        &self.usable
    }

    pub fn key_report(&self) -> &KeyReport {
        &self.report
    }

    pub fn transcript(&self, key: &str) -> Option<&str> {
        self.transcripts.get(key).map(String::as_str)
    }

    /// Usable transcripts sorted by key.
    pub fn sorted_transcripts(&self) -> Vec<&str> {
        let mut pairs: Vec<(&String, &String)> = self.transcripts.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.into_iter().map(|(_, v)| v.as_str()).collect()
    }

    pub fn encode_labels(&self, dictionary: &Dictionary, append_eos: bool) -> HashMap<String, Vec<u32>> {
        self.transcripts
            .iter()
            .map(|(key, text)| {
                (
                    key.clone(),
                    dictionary.encode_line(text, &WhitespaceTokenizer, append_eos),
                )
            })
            .collect()
    }

    pub fn plan(&self, bucket_size: usize, half_batch_threshold: u64) -> BucketPlan {
        plan_buckets(&self.entries, &self.usable, bucket_size, half_batch_threshold)
    }
}

/// What the bucketed dataset keeps: encoded labels and the bucket plan.
#[derive(Debug, Clone)]
pub struct BucketIndex {
    pub labels: HashMap<String, Vec<u32>>,
    pub plan: BucketPlan,
    pub report: KeyReport,
}

impl BucketIndex {
    pub fn build(
        config: &SequenceDatasetConfig,
        dictionary: &Dictionary,
    ) -> Result<Self, DatasetError> {
        config.validate()?;
        let corpus = CorpusIndex::load(
            &config.split,
            &config.libri_root,
            &config.bucket_file,
            config.sub_splits()?,
        )?;
        Ok(Self::from_corpus(config, &corpus, dictionary))
    }

    pub fn from_corpus(
        config: &SequenceDatasetConfig,
        corpus: &CorpusIndex,
        dictionary: &Dictionary,
    ) -> Self {
        let labels = corpus.encode_labels(dictionary, config.append_eos);
        let plan = corpus.plan(config.bucket_size, config.half_batch_threshold);
        tracing::info!(
            split = config.split.as_str(),
            entries = corpus.entries().len(),
            usable = corpus.usable_keys().len(),
            buckets = plan.buckets.len(),
            halved = plan.halved,
            "bucketing: index built"
        );
        Self {
            labels,
            plan,
            report: corpus.key_report().clone(),
        }
    }

    pub fn label_for(&self, file_path: &str) -> Option<&[u32]> {
        self.labels.get(utterance_key(file_path)).map(Vec::as_slice)
    }
}
