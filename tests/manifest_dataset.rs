mod common;

use std::path::Path;
use std::sync::Arc;

use asr_dataset::{
    Dataset, DatasetError, Dictionary, FinalizeOptions, ManifestDataset, ManifestDatasetConfig,
    WhitespaceTokenizer,
};
use common::write_wav;

fn hello_dictionary() -> Dictionary {
    Dictionary::build_from_transcripts(
        ["H E L L O | W O R L D |"],
        &WhitespaceTokenizer,
        FinalizeOptions::default(),
    )
}

fn write_manifest(hidden_root: &Path, rows: &str) {
    std::fs::create_dir_all(hidden_root).expect("create hidden root");
    std::fs::write(
        hidden_root.join("scripta.csv"),
        format!("utterance_id,utterance_text\n{rows}"),
    )
    .expect("write manifest");
}

#[test]
fn unknown_tokens_are_dropped_from_labels() {
    let hidden = tempfile::tempdir().expect("tempdir");
    let buckets = tempfile::tempdir().expect("tempdir");
    write_manifest(hidden.path(), "1,hello world\n2,the cat\n");
    hello_dictionary()
        .save(&buckets.path().join("dict.json"))
        .expect("save dictionary");

    let dataset =
        ManifestDataset::new(ManifestDatasetConfig::new(hidden.path(), buckets.path()))
            .expect("dataset");
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.wav_path(0), Some(hidden.path().join("1.wav").as_path()));
    assert_eq!(dataset.transcript(1), Some("T H E | C A T |"));

    let dict = dataset.dictionary();
    let known = dataset.label(0).expect("label 0");
    assert_eq!(dict.string(known), "H E L L O | W O R L D |");

    let pruned = dataset.label(1).expect("label 1");
    assert!(!pruned.contains(&dict.unk_index()));
    assert_eq!(
        pruned,
        [
            dict.index("H"),
            dict.index("E"),
            dict.index("|"),
            dict.index("|"),
            dict.eos_index()
        ]
    );
    assert!(pruned.len() < 8);
}

#[test]
fn loads_downmixes_and_resamples() {
    let hidden = tempfile::tempdir().expect("tempdir");
    write_manifest(hidden.path(), "1,hello\n");
    write_wav(&hidden.path().join("1.wav"), 44_100, 2, 4410, 2000);

    let dataset = ManifestDataset::with_dictionary(
        ManifestDatasetConfig::new(hidden.path(), hidden.path()),
        Arc::new(hello_dictionary()),
    )
    .expect("dataset");
    let sample = dataset.get(0).expect("sample");
    assert_eq!(sample.wav.len(), 1600);
    assert_eq!(sample.label, dataset.label(0).expect("label"));
}

#[test]
fn missing_primary_file_joins_two_segments() {
    let hidden = tempfile::tempdir().expect("tempdir");
    write_manifest(hidden.path(), "7,world\n");
    write_wav(&hidden.path().join("7_(1).wav"), 44_100, 1, 2205, 100);
    write_wav(&hidden.path().join("7_(2).wav"), 44_100, 1, 2205, 100);

    let dataset = ManifestDataset::with_dictionary(
        ManifestDatasetConfig::new(hidden.path(), hidden.path()),
        Arc::new(hello_dictionary()),
    )
    .expect("dataset");
    let sample = dataset.get(0).expect("sample");
    assert_eq!(sample.wav.len(), 1600);

    let batch = dataset
        .collate(vec![sample.clone(), sample])
        .expect("collate");
    assert_eq!(batch.wavs.len(), 2);
    assert_eq!(batch.labels.len(), 2);
}

#[test]
fn segment_rate_mismatch_is_fatal() {
    let hidden = tempfile::tempdir().expect("tempdir");
    write_manifest(hidden.path(), "7,world\n");
    write_wav(&hidden.path().join("7_(1).wav"), 44_100, 1, 100, 100);
    write_wav(&hidden.path().join("7_(2).wav"), 22_050, 1, 100, 100);

    let dataset = ManifestDataset::with_dictionary(
        ManifestDatasetConfig::new(hidden.path(), hidden.path()),
        Arc::new(hello_dictionary()),
    )
    .expect("dataset");
    assert!(matches!(
        dataset.get(0),
        Err(DatasetError::SampleRateMismatch { actual: 22_050, .. })
    ));
}

#[test]
fn primary_rate_mismatch_does_not_fall_back() {
    let hidden = tempfile::tempdir().expect("tempdir");
    write_manifest(hidden.path(), "3,go\n");
    write_wav(&hidden.path().join("3.wav"), 16_000, 1, 100, 100);
    write_wav(&hidden.path().join("3_(1).wav"), 44_100, 1, 100, 100);
    write_wav(&hidden.path().join("3_(2).wav"), 44_100, 1, 100, 100);

    let dataset = ManifestDataset::with_dictionary(
        ManifestDatasetConfig::new(hidden.path(), hidden.path()),
        Arc::new(hello_dictionary()),
    )
    .expect("dataset");
    assert!(matches!(
        dataset.get(0),
        Err(DatasetError::SampleRateMismatch { actual: 16_000, .. })
    ));
}

#[test]
fn missing_dictionary_snapshot_is_config_error() {
    let hidden = tempfile::tempdir().expect("tempdir");
    write_manifest(hidden.path(), "1,hello\n");
    let result = ManifestDataset::new(ManifestDatasetConfig::new(hidden.path(), hidden.path()));
    assert!(matches!(result, Err(DatasetError::Config { .. })));
}
