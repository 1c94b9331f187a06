pub mod bucketing;
pub mod duration_table;
pub mod transcript;

pub use bucketing::{plan_buckets, BucketIndex, CorpusIndex};
pub use duration_table::{
    collect_audio_files, load_duration_tables, probe_durations, read_duration_table,
    sort_by_length_desc, write_duration_table,
};
pub use transcript::{load_transcripts, normalize_transcript, TranscriptIndex, BOUNDARY};
