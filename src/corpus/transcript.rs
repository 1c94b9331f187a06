use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::DatasetError;

/// Word boundary token of character-level transcripts.
pub const BOUNDARY: char = '|';
const TRANSCRIPT_SUFFIX: &str = ".trans.txt";

/// Uppercases `text` and spells it out one character token at a time, with
/// [`BOUNDARY`] between words and after the last word.
///
/// `"the cat"` becomes `"T H E | C A T |"`.
pub fn normalize_transcript(text: &str) -> String {
    let upper = text.to_uppercase();
    let mut out = String::with_capacity(upper.len() * 2 + 2);
    for (word_idx, word) in upper.split_whitespace().enumerate() {
        if word_idx > 0 {
            push_token(&mut out, BOUNDARY);
        }
        for c in word.chars() {
            push_token(&mut out, c);
        }
    }
    push_token(&mut out, BOUNDARY);
    out
}

fn push_token(out: &mut String, c: char) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push(c);
}

/// Normalized transcripts keyed by utterance id.
#[derive(Debug, Clone, Default)]
pub struct TranscriptIndex {
    records: HashMap<String, String>,
    duplicates: Vec<String>,
}

impl TranscriptIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys seen more than once; the first occurrence was kept.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Inserts unless `key` is already present (first write wins).
    pub fn insert(&mut self, key: String, transcript: String) -> bool {
        if self.records.contains_key(&key) {
            tracing::warn!(key = key.as_str(), "transcripts: duplicate utterance key, keeping first");
            self.duplicates.push(key);
            return false;
        }
        self.records.insert(key, transcript);
        true
    }

    pub(crate) fn into_records(self) -> HashMap<String, String> {
        self.records
    }

    /// Parses `<key> <WORDS...>` lines; blank lines are skipped.
    pub fn parse_into(&mut self, contents: &str) {
        for line in contents.lines() {
            let mut parts = line.split_whitespace();
            let Some(key) = parts.next() else {
                continue;
            };
            let words = parts.collect::<Vec<_>>().join(" ");
            self.insert(key.to_string(), normalize_transcript(&words));
        }
    }
}

/// `<root>/<dir>/<speaker>-<chapter>.trans.txt` for `dir = .../<speaker>/<chapter>`.
pub fn transcript_file_for_dir(root: &Path, dir: &str) -> std::path::PathBuf {
    let mut parts = dir.rsplit('/');
    let chapter = parts.next().unwrap_or_default();
    let speaker = parts.next().unwrap_or_default();
    root.join(dir)
        .join(format!("{speaker}-{chapter}{TRANSCRIPT_SUFFIX}"))
}

/// Loads the transcripts of every speaker/chapter directory referenced by
/// `file_paths` (paths relative to `root`). Directories are visited in sorted
/// order so duplicate resolution is deterministic.
pub fn load_transcripts<'a>(
    root: &Path,
    file_paths: impl IntoIterator<Item = &'a str>,
) -> Result<TranscriptIndex, DatasetError> {
    let dirs: BTreeSet<&str> = file_paths
        .into_iter()
        .map(|path| path.rsplit_once('/').map_or("", |(dir, _)| dir))
        .collect();

    let mut index = TranscriptIndex::default();
    for dir in &dirs {
        let path = transcript_file_for_dir(root, dir);
        if !path.is_file() {
            return Err(DatasetError::MissingTranscript { path });
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| DatasetError::io(format!("read transcript {}", path.display()), e))?;
        index.parse_into(&contents);
    }

    tracing::info!(
        directories = dirs.len(),
        utterances = index.len(),
        duplicates = index.duplicates().len(),
        "transcripts: loaded"
    );
    Ok(index)
}
