//! Symbol <-> id mapping for transcript tokens.
//!
//! A dictionary is either grown from transcripts and then [`Dictionary::finalize`]d,
//! or loaded from a snapshot. Once handed to a dataset it is shared behind an
//! `Arc` and only read.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

mod tokenizer;

pub use tokenizer::{LineTokenizer, WhitespaceTokenizer};

pub const BOS: &str = "<s>";
pub const PAD: &str = "<pad>";
pub const EOS: &str = "</s>";
pub const UNK: &str = "<unk>";
const MADEUP_WORD_PREFIX: &str = "madeupword";

/// Default `padding_factor` used when a dictionary is built from transcripts.
pub const DEFAULT_PADDING_FACTOR: usize = 8;

/// Pruning parameters for [`Dictionary::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOptions {
    /// Minimum usage count; `0` keeps everything.
    pub threshold: u64,
    /// Maximum vocabulary size including reserved symbols; `None` or `Some(0)`
    /// means unbounded.
    pub nwords: Option<usize>,
    pub padding_factor: usize,
}

impl Default for FinalizeOptions {
    fn default() -> Self {
        Self {
            threshold: 0,
            nwords: None,
            padding_factor: DEFAULT_PADDING_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    symbols: Vec<String>,
    counts: Vec<u64>,
    indices: HashMap<String, u32>,
    bos_index: u32,
    pad_index: u32,
    eos_index: u32,
    unk_index: u32,
    nspecial: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct DictionarySnapshot {
    symbols: Vec<String>,
    counts: Vec<u64>,
    bos_index: u32,
    pad_index: u32,
    eos_index: u32,
    unk_index: u32,
    nspecial: usize,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    /// Empty dictionary holding only the reserved symbols.
    pub fn new() -> Self {
        let mut dict = Self {
            symbols: Vec::new(),
            counts: Vec::new(),
            indices: HashMap::new(),
            bos_index: 0,
            pad_index: 0,
            eos_index: 0,
            unk_index: 0,
            nspecial: 0,
        };
        dict.bos_index = dict.add_symbol(BOS, 1);
        dict.pad_index = dict.add_symbol(PAD, 1);
        dict.eos_index = dict.add_symbol(EOS, 1);
        dict.unk_index = dict.add_symbol(UNK, 1);
        dict.nspecial = dict.symbols.len();
        dict
    }

    /// Counts every token of every transcript, then finalizes.
    pub fn build_from_transcripts<'a>(
        transcripts: impl IntoIterator<Item = &'a str>,
        tokenizer: &dyn LineTokenizer,
        options: FinalizeOptions,
    ) -> Self {
        let mut dict = Self::new();
        dict.add_transcripts(transcripts, tokenizer);
        dict.finalize(options.threshold, options.nwords, options.padding_factor);
        tracing::info!(
            symbols = dict.len(),
            padding_factor = options.padding_factor,
            "dictionary: built from transcripts"
        );
        dict
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn nspecial(&self) -> usize {
        self.nspecial
    }

    pub fn bos_index(&self) -> u32 {
        self.bos_index
    }

    pub fn pad_index(&self) -> u32 {
        self.pad_index
    }

    pub fn eos_index(&self) -> u32 {
        self.eos_index
    }

    pub fn unk_index(&self) -> u32 {
        self.unk_index
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn count(&self, index: u32) -> Option<u64> {
        self.counts.get(index as usize).copied()
    }

    pub fn symbol(&self, index: u32) -> Option<&str> {
        self.symbols.get(index as usize).map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.indices.contains_key(symbol)
    }

    /// Id of `symbol`, or the unknown id.
    pub fn index(&self, symbol: &str) -> u32 {
        self.indices.get(symbol).copied().unwrap_or(self.unk_index)
    }

    /// Inserts `word` or bumps its count by `n`.
    pub fn add_symbol(&mut self, word: &str, n: u64) -> u32 {
        if let Some(&idx) = self.indices.get(word) {
            self.counts[idx as usize] += n;
            return idx;
        }
        let idx = self.symbols.len() as u32;
        self.indices.insert(word.to_string(), idx);
        self.symbols.push(word.to_string());
        self.counts.push(n);
        idx
    }

    /// Counts every token of every transcript plus one end-of-sequence per line.
    pub fn add_transcripts<'a>(
        &mut self,
        transcripts: impl IntoIterator<Item = &'a str>,
        tokenizer: &dyn LineTokenizer,
    ) {
        for line in transcripts {
            for token in tokenizer.tokenize(line) {
                self.add_symbol(&token, 1);
            }
            self.add_symbol(EOS, 1);
        }
    }

    /// Encode-only: tokens missing from the vocabulary map to [`Self::unk_index`].
    pub fn encode_line(
        &self,
        line: &str,
        tokenizer: &dyn LineTokenizer,
        append_eos: bool,
    ) -> Vec<u32> {
        let tokens = tokenizer.tokenize(line);
        let mut ids = Vec::with_capacity(tokens.len() + usize::from(append_eos));
        ids.extend(tokens.iter().map(|t| self.index(t)));
        if append_eos {
            ids.push(self.eos_index);
        }
        ids
    }

    /// Encodes while inserting unseen tokens (`add_if_not_exist`).
    pub fn encode_line_mut(
        &mut self,
        line: &str,
        tokenizer: &dyn LineTokenizer,
        append_eos: bool,
    ) -> Vec<u32> {
        let tokens = tokenizer.tokenize(line);
        let mut ids = Vec::with_capacity(tokens.len() + usize::from(append_eos));
        for token in &tokens {
            ids.push(self.add_symbol(token, 1));
        }
        if append_eos {
            ids.push(self.eos_index);
        }
        ids
    }

    /// Space-joined symbols, skipping begin, padding and end-of-sequence ids.
    pub fn string(&self, ids: &[u32]) -> String {
        let mut out = String::new();
        for &id in ids {
            if id == self.bos_index || id == self.pad_index || id == self.eos_index {
                continue;
            }
            let symbol = self.symbol(id).unwrap_or(UNK);
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(symbol);
        }
        out
    }

    /// Prunes and pads the vocabulary in place.
    ///
    /// Reserved symbols keep their ids. The rest are ordered by count
    /// (descending, ties by symbol), cut at the first count below `threshold`
    /// and at `nwords` total entries (`None` or `0` for no limit), then padded with `madeupwordNNNN`
    /// fillers to a multiple of `padding_factor`.
    pub fn finalize(&mut self, threshold: u64, nwords: Option<usize>, padding_factor: usize) {
        let nwords = nwords.filter(|&n| n > 0).unwrap_or(self.len());
        let keep = nwords.saturating_sub(self.nspecial);

        let mut rest: Vec<(String, u64)> = self.symbols[self.nspecial..]
            .iter()
            .cloned()
            .zip(self.counts[self.nspecial..].iter().copied())
            .collect();
        rest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        self.symbols.truncate(self.nspecial);
        self.counts.truncate(self.nspecial);
        self.indices.retain(|_, idx| (*idx as usize) < self.nspecial);

        for (symbol, count) in rest.into_iter().take(keep) {
            if count < threshold {
                break;
            }
            self.indices.insert(symbol.clone(), self.symbols.len() as u32);
            self.symbols.push(symbol);
            self.counts.push(count);
        }

        self.pad_to_multiple(padding_factor);
    }

    fn pad_to_multiple(&mut self, padding_factor: usize) {
        if padding_factor <= 1 {
            return;
        }
        let mut i = 0;
        while self.len() % padding_factor != 0 {
            let symbol = format!("{MADEUP_WORD_PREFIX}{i:04}");
            self.add_symbol(&symbol, 0);
            i += 1;
        }
    }

    /// Loads a JSON snapshot written by [`Dictionary::save`].
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::io(format!("read dictionary {}", path.display()), e))?;
        let snapshot: DictionarySnapshot = serde_json::from_str(&data)
            .map_err(|e| DatasetError::json(format!("parse dictionary {}", path.display()), e))?;
        Self::from_snapshot(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let snapshot = DictionarySnapshot {
            symbols: self.symbols.clone(),
            counts: self.counts.clone(),
            bos_index: self.bos_index,
            pad_index: self.pad_index,
            eos_index: self.eos_index,
            unk_index: self.unk_index,
            nspecial: self.nspecial,
        };
        let data = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| DatasetError::json("serialize dictionary", e))?;
        std::fs::write(path, data)
            .map_err(|e| DatasetError::io(format!("write dictionary {}", path.display()), e))
    }

    fn from_snapshot(snapshot: DictionarySnapshot) -> Result<Self, DatasetError> {
        if snapshot.symbols.len() != snapshot.counts.len() {
            return Err(DatasetError::config(format!(
                "dictionary snapshot has {} symbols but {} counts",
                snapshot.symbols.len(),
                snapshot.counts.len()
            )));
        }
        let len = snapshot.symbols.len();
        let specials = [
            snapshot.bos_index,
            snapshot.pad_index,
            snapshot.eos_index,
            snapshot.unk_index,
        ];
        if snapshot.nspecial > len || specials.iter().any(|&idx| idx as usize >= len) {
            return Err(DatasetError::config(
                "dictionary snapshot reserved index out of range",
            ));
        }

        let mut indices = HashMap::with_capacity(len);
        for (idx, symbol) in snapshot.symbols.iter().enumerate() {
            if indices.insert(symbol.clone(), idx as u32).is_some() {
                return Err(DatasetError::config(format!(
                    "dictionary snapshot repeats symbol '{symbol}'"
                )));
            }
        }

        Ok(Self {
            symbols: snapshot.symbols,
            counts: snapshot.counts,
            indices,
            bos_index: snapshot.bos_index,
            pad_index: snapshot.pad_index,
            eos_index: snapshot.eos_index,
            unk_index: snapshot.unk_index,
            nspecial: snapshot.nspecial,
        })
    }

    /// Loads the plain `<symbol> <count>` format; reserved symbols are implicit.
    pub fn load_text(path: &Path) -> Result<Self, DatasetError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::io(format!("read dictionary {}", path.display()), e))?;
        let mut dict = Self::new();
        for (line_no, raw) in data.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }
            let Some((symbol, count)) = line.rsplit_once(' ') else {
                return Err(DatasetError::config(format!(
                    "{}:{}: expected '<symbol> <count>'",
                    path.display(),
                    line_no + 1
                )));
            };
            let count: u64 = count.parse().map_err(|_| {
                DatasetError::config(format!(
                    "{}:{}: invalid count '{count}'",
                    path.display(),
                    line_no + 1
                ))
            })?;
            if dict.contains(symbol) {
                return Err(DatasetError::config(format!(
                    "{}:{}: duplicate symbol '{symbol}'",
                    path.display(),
                    line_no + 1
                )));
            }
            dict.add_symbol(symbol, count);
        }
        Ok(dict)
    }

    pub fn save_text(&self, path: &Path) -> Result<(), DatasetError> {
        let mut out = String::new();
        for (symbol, count) in self.symbols[self.nspecial..]
            .iter()
            .zip(&self.counts[self.nspecial..])
        {
            let _ = writeln!(out, "{symbol} {count}");
        }
        std::fs::write(path, out)
            .map_err(|e| DatasetError::io(format!("write dictionary {}", path.display()), e))
    }
}
