#![allow(dead_code)]

use std::path::Path;

use asr_dataset::corpus::write_duration_table;
use asr_dataset::DurationEntry;

pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, value: i16) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav dir");
    }
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for _ in 0..frames * channels as usize {
        writer.write_sample(value).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

pub struct Utterance {
    pub rel_path: &'static str,
    pub frames: usize,
    pub transcript: Option<&'static str>,
}

/// Lays out `<root>/<subset>/<spk>/<chapter>/*.wav` with per-chapter
/// `.trans.txt` files and a duration table in `bucket_dir`.
pub fn write_corpus(root: &Path, bucket_dir: &Path, subset: &str, utterances: &[Utterance]) {
    let mut entries = Vec::new();
    let mut transcripts: std::collections::BTreeMap<String, String> = Default::default();
    for utt in utterances {
        write_wav(&root.join(utt.rel_path), 16_000, 1, utt.frames, 1000);
        entries.push(DurationEntry::new(utt.rel_path, utt.frames as u64));

        let (dir, file) = utt.rel_path.rsplit_once('/').expect("nested path");
        let mut parts = dir.rsplit('/');
        let chapter = parts.next().expect("chapter");
        let speaker = parts.next().expect("speaker");
        let trans_path = format!("{dir}/{speaker}-{chapter}.trans.txt");
        let body = transcripts.entry(trans_path).or_default();
        if let Some(text) = utt.transcript {
            let key = file.split('.').next().expect("key");
            body.push_str(&format!("{key} {text}\n"));
        }
    }
    for (rel, body) in transcripts {
        std::fs::write(root.join(rel), body).expect("write transcript");
    }
    std::fs::create_dir_all(bucket_dir).expect("create bucket dir");
    write_duration_table(&bucket_dir.join(format!("{subset}.csv")), &entries)
        .expect("write duration table");
}
