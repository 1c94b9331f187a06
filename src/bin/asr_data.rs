use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use asr_dataset::config::DICTIONARY_SNAPSHOT;
use asr_dataset::corpus::{collect_audio_files, probe_durations, write_duration_table};
use asr_dataset::{
    BucketIndex, CorpusIndex, DataConfig, Dictionary, FinalizeOptions, KeyReport,
    WhitespaceTokenizer,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "asr_data")]
#[command(about = "Prepare and inspect length-bucketed ASR training data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a corpus subset and write `<out>/<subset>.csv` with per-file lengths.
    DurationTable {
        #[arg(long, env = "ASR_DATA_LIBRI_ROOT")]
        libri_root: PathBuf,
        #[arg(long)]
        subset: String,
        #[arg(long, env = "ASR_DATA_BUCKET_DIR", default_value = "data/len_for_bucket")]
        out: PathBuf,
    },
    /// Build a finalized dictionary from the configured split's transcripts.
    BuildDict {
        #[arg(long, env = "ASR_DATA_CONFIG")]
        config: PathBuf,
        /// Defaults to `<bucket_file>/dict.json`.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        threshold: u64,
        #[arg(long)]
        nwords: Option<usize>,
        #[arg(long, default_value_t = asr_dataset::dictionary::DEFAULT_PADDING_FACTOR)]
        padding_factor: usize,
    },
    /// Build the bucket index and write a JSON summary.
    Inspect {
        #[arg(long, env = "ASR_DATA_CONFIG")]
        config: PathBuf,
        #[arg(long, env = "ASR_DATA_REPORT_OUT")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct BucketReport {
    generated_at: String,
    split: String,
    bucket_size: usize,
    buckets: usize,
    halved: usize,
    /// bucket length -> number of buckets with that length
    size_histogram: BTreeMap<usize, usize>,
    skipped_entries: usize,
    keys: KeyReport,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("asr_dataset=info")),
        )
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    match args.command {
        Command::DurationTable {
            libri_root,
            subset,
            out,
        } => duration_table(&libri_root, &subset, &out),
        Command::BuildDict {
            config,
            out,
            threshold,
            nwords,
            padding_factor,
        } => build_dict(
            &config,
            out,
            FinalizeOptions {
                threshold,
                nwords,
                padding_factor,
            },
        ),
        Command::Inspect { config, out } => inspect(&config, out),
    }
}

fn duration_table(libri_root: &Path, subset: &str, out_dir: &Path) -> Result<(), String> {
    let subset_dir = libri_root.join(subset);
    require_path_exists(&subset_dir, "Missing subset directory under corpus root.")?;

    let files = collect_audio_files(&subset_dir).map_err(|err| err.to_string())?;
    if files.is_empty() {
        return Err(format!(
            "No .flac or .wav files found in '{}'.",
            subset_dir.display()
        ));
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .map_err(|err| format!("Invalid progress template: {err}"))?
        .progress_chars("=> "),
    );
    progress.set_message(subset.to_string());
    let entries = probe_durations(libri_root, &files, |_| progress.inc(1))
        .map_err(|err| err.to_string())?;
    progress.finish_and_clear();

    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create '{}': {err}", out_dir.display()))?;
    let out_path = out_dir.join(format!("{subset}.csv"));
    write_duration_table(&out_path, &entries).map_err(|err| err.to_string())?;
    tracing::info!(
        rows = entries.len(),
        out = %out_path.display(),
        "duration table written"
    );
    Ok(())
}

fn build_dict(config_path: &Path, out: Option<PathBuf>, options: FinalizeOptions) -> Result<(), String> {
    let config = DataConfig::load(config_path).map_err(|err| err.to_string())?.sequence;
    let sub_splits = config.sub_splits().map_err(|err| err.to_string())?;
    let corpus = CorpusIndex::load(
        &config.split,
        &config.libri_root,
        &config.bucket_file,
        sub_splits,
    )
    .map_err(|err| err.to_string())?;

    let dictionary =
        Dictionary::build_from_transcripts(corpus.sorted_transcripts(), &WhitespaceTokenizer, options);
    let out_path = out.unwrap_or_else(|| config.bucket_file.join(DICTIONARY_SNAPSHOT));
    dictionary.save(&out_path).map_err(|err| err.to_string())?;
    tracing::info!(
        symbols = dictionary.len(),
        out = %out_path.display(),
        "dictionary snapshot written"
    );
    Ok(())
}

fn inspect(config_path: &Path, out: Option<PathBuf>) -> Result<(), String> {
    let config = DataConfig::load(config_path).map_err(|err| err.to_string())?.sequence;
    let sub_splits = config.sub_splits().map_err(|err| err.to_string())?;
    let corpus = CorpusIndex::load(
        &config.split,
        &config.libri_root,
        &config.bucket_file,
        sub_splits,
    )
    .map_err(|err| err.to_string())?;

    let snapshot = config.bucket_file.join(DICTIONARY_SNAPSHOT);
    let dictionary = if snapshot.is_file() {
        Dictionary::load(&snapshot).map_err(|err| err.to_string())?
    } else {
        tracing::warn!(
            snapshot = %snapshot.display(),
            "no dictionary snapshot, building one from transcripts"
        );
        Dictionary::build_from_transcripts(
            corpus.sorted_transcripts(),
            &WhitespaceTokenizer,
            FinalizeOptions::default(),
        )
    };
    let index = BucketIndex::from_corpus(&config, &corpus, &dictionary);

    let mut size_histogram = BTreeMap::new();
    for bucket in &index.plan.buckets {
        *size_histogram.entry(bucket.len()).or_insert(0) += 1;
    }
    let report = BucketReport {
        generated_at: Utc::now().to_rfc3339(),
        split: config.split.clone(),
        bucket_size: config.bucket_size,
        buckets: index.plan.buckets.len(),
        halved: index.plan.halved,
        size_histogram,
        skipped_entries: index.plan.skipped.len(),
        keys: index.report,
    };

    let out_path = resolve_out_path(out);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create '{}': {err}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("Failed to serialize report: {err}"))?;
    fs::write(&out_path, json)
        .map_err(|err| format!("Failed to write '{}': {err}", out_path.display()))?;
    tracing::info!(
        buckets = report.buckets,
        out = %out_path.display(),
        "bucket report written"
    );
    Ok(())
}

fn resolve_out_path(out: Option<PathBuf>) -> PathBuf {
    if let Some(path) = out {
        return path;
    }
    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
    PathBuf::from("target")
        .join("bucket_reports")
        .join(format!("bucket-report-{run_id}.json"))
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Path: '{}'", path.display()))
}
