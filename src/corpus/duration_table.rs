use std::path::{Path, PathBuf};

use crate::audio;
use crate::error::DatasetError;
use crate::types::DurationEntry;

/// Reads a `file_path,length` table. Extra columns are ignored.
pub fn read_duration_table(path: &Path) -> Result<Vec<DurationEntry>, DatasetError> {
    let context = || format!("read duration table {}", path.display());
    let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::csv(context(), e))?;
    reader
        .deserialize::<DurationEntry>()
        .map(|row| row.map_err(|e| DatasetError::csv(context(), e)))
        .collect()
}

pub fn write_duration_table(path: &Path, entries: &[DurationEntry]) -> Result<(), DatasetError> {
    let context = || format!("write duration table {}", path.display());
    let mut writer = csv::Writer::from_path(path).map_err(|e| DatasetError::csv(context(), e))?;
    for entry in entries {
        writer
            .serialize(entry)
            .map_err(|e| DatasetError::csv(context(), e))?;
    }
    writer
        .flush()
        .map_err(|e| DatasetError::io(context(), e))
}

/// Concatenates `<bucket_dir>/<name>.csv` for every sub-split, in the given
/// order. Absent tables are logged and skipped.
pub fn load_duration_tables(
    bucket_dir: &Path,
    sub_splits: &[String],
) -> Result<Vec<DurationEntry>, DatasetError> {
    let mut entries = Vec::new();
    for name in sub_splits {
        let path = bucket_dir.join(format!("{name}.csv"));
        if !path.is_file() {
            tracing::warn!(
                sub_split = name.as_str(),
                bucket_file = %bucket_dir.display(),
                "duration table not found, skipping it"
            );
            continue;
        }
        let table = read_duration_table(&path)?;
        tracing::debug!(sub_split = name.as_str(), rows = table.len(), "duration table loaded");
        entries.extend(table);
    }
    Ok(entries)
}

/// Longest first. Stable, so equal lengths keep table order.
pub fn sort_by_length_desc(entries: &mut [DurationEntry]) {
    entries.sort_by(|a, b| b.length.cmp(&a.length));
}

/// Recursively gathers `.flac` and `.wav` files under `dir`, sorted.
pub fn collect_audio_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files = Vec::new();
    collect_into(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DatasetError> {
    let context = || format!("read directory {}", dir.display());
    for entry in std::fs::read_dir(dir).map_err(|e| DatasetError::io(context(), e))? {
        let path = entry.map_err(|e| DatasetError::io(context(), e))?.path();
        if path.is_dir() {
            collect_into(&path, out)?;
            continue;
        }
        if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("flac") || ext.eq_ignore_ascii_case("wav"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Probes every file and returns its entry with `file_path` relative to
/// `root`, using `/` separators. `on_file` runs once per probed file.
pub fn probe_durations(
    root: &Path,
    files: &[PathBuf],
    mut on_file: impl FnMut(&Path),
) -> Result<Vec<DurationEntry>, DatasetError> {
    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let (length, _) = audio::probe_length(path)?;
        let relative = path.strip_prefix(root).map_err(|_| {
            DatasetError::config(format!(
                "audio path {} is not under {}",
                path.display(),
                root.display()
            ))
        })?;
        let file_path = relative.to_string_lossy().replace('\\', "/");
        entries.push(DurationEntry::new(file_path, length));
        on_file(path);
    }
    sort_by_length_desc(&mut entries);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_ignores_extra_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dev-clean.csv");
        std::fs::write(
            &path,
            ",file_path,length,label\n0,dev-clean/1/2/1-2-0000.flac,500,x\n1,dev-clean/1/2/1-2-0001.flac,20,y\n",
        )
        .expect("write");
        let table = read_duration_table(&path).expect("read");
        assert_eq!(
            table,
            vec![
                DurationEntry::new("dev-clean/1/2/1-2-0000.flac", 500),
                DurationEntry::new("dev-clean/1/2/1-2-0001.flac", 20),
            ]
        );
    }

    #[test]
    fn malformed_length_is_csv_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "file_path,length\na.flac,long\n").expect("write");
        assert!(matches!(
            read_duration_table(&path),
            Err(DatasetError::Csv { .. })
        ));
    }

    #[test]
    fn missing_sub_split_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_duration_table(
            &dir.path().join("a.csv"),
            &[DurationEntry::new("a/1/2/1-2-0000.flac", 7)],
        )
        .expect("write");
        let entries =
            load_duration_tables(dir.path(), &["a".to_string(), "missing".to_string()])
                .expect("load");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].length, 7);
    }

    fn write_wav(path: &Path, frames: usize) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        for _ in 0..frames {
            writer.write_sample(0_i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn scan_probes_flac_and_wav_longest_first() {
        let root = tempfile::tempdir().expect("tempdir");
        let subset = root.path().join("dev-clean");
        write_wav(&subset.join("1/10/1-10-0000.wav"), 5);
        write_wav(&subset.join("1/10/1-10-0001.wav"), 40);
        std::fs::write(subset.join("1/10/1-10.trans.txt"), "").expect("write");
        std::fs::create_dir_all(subset.join("2/20")).expect("mkdir");
        std::fs::copy(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/stereo_16k_16bit.flac"),
            subset.join("2/20/2-20-0000.flac"),
        )
        .expect("copy flac");

        let files = collect_audio_files(&subset).expect("collect");
        assert_eq!(files.len(), 3);
        let mut probed = 0;
        let entries = probe_durations(root.path(), &files, |_| probed += 1).expect("probe");
        assert_eq!(probed, 3);
        assert_eq!(
            entries,
            vec![
                DurationEntry::new("dev-clean/1/10/1-10-0001.wav", 40),
                DurationEntry::new("dev-clean/2/20/2-20-0000.flac", 16),
                DurationEntry::new("dev-clean/1/10/1-10-0000.wav", 5),
            ]
        );
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut entries = vec![
            DurationEntry::new("a", 5),
            DurationEntry::new("b", 9),
            DurationEntry::new("c", 5),
        ];
        sort_by_length_desc(&mut entries);
        let order: Vec<_> = entries.iter().map(|e| e.file_path.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }
}
