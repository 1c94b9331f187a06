//! Waveform decoding and the small amount of signal plumbing the datasets need.

use std::path::Path;

use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::DatasetError;

const RESAMPLE_CHUNK: usize = 1024;

/// Decoded audio in planar layout: `channels[c][t]`, samples in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioClip {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Channel-major concatenation into one 1-D sequence.
    pub fn flatten(self) -> Vec<f32> {
        if self.channels.len() == 1 {
            return self.channels.into_iter().next().unwrap_or_default();
        }
        self.channels.concat()
    }

    /// Per-frame mean over channels.
    pub fn downmix(&self) -> Vec<f32> {
        let n = self.num_channels();
        if n <= 1 {
            return self.channels.first().cloned().unwrap_or_default();
        }
        (0..self.frames())
            .map(|t| self.channels.iter().map(|ch| ch[t]).sum::<f32>() / n as f32)
            .collect()
    }

    /// Appends `other` along the time axis.
    pub fn concat(mut self, other: AudioClip) -> Result<Self, DatasetError> {
        if self.num_channels() != other.num_channels() || self.sample_rate != other.sample_rate {
            return Err(DatasetError::config(format!(
                "cannot concatenate {}ch@{}Hz with {}ch@{}Hz",
                self.num_channels(),
                self.sample_rate,
                other.num_channels(),
                other.sample_rate
            )));
        }
        for (dst, src) in self.channels.iter_mut().zip(other.channels) {
            dst.extend(src);
        }
        Ok(self)
    }
}

/// Decodes a FLAC or WAV file, chosen by extension.
pub fn read_audio(path: &Path) -> Result<AudioClip, DatasetError> {
    match extension(path).as_deref() {
        Some("flac") => read_flac(path),
        Some("wav") => read_wav(path),
        _ => Err(DatasetError::audio(path, "unsupported audio extension")),
    }
}

/// Frames per channel and sample rate, read from the header only.
pub fn probe_length(path: &Path) -> Result<(u64, u32), DatasetError> {
    match extension(path).as_deref() {
        Some("flac") => {
            let reader = FlacReader::open(path).map_err(|e| DatasetError::audio(path, e))?;
            let info = reader.streaminfo();
            let frames = info
                .samples
                .ok_or_else(|| DatasetError::audio(path, "FLAC header has no sample count"))?;
            Ok((frames, info.sample_rate))
        }
        Some("wav") => {
            let reader = WavReader::open(path).map_err(|e| DatasetError::audio(path, e))?;
            Ok((u64::from(reader.duration()), reader.spec().sample_rate))
        }
        _ => Err(DatasetError::audio(path, "unsupported audio extension")),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn deinterleave(interleaved: Vec<f32>, channels: usize) -> Vec<Vec<f32>> {
    if channels == 1 {
        return vec![interleaved];
    }
    let frames = interleaved.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &sample) in planar.iter_mut().zip(frame) {
            ch.push(sample);
        }
    }
    planar
}

fn read_flac(path: &Path) -> Result<AudioClip, DatasetError> {
    let mut reader = FlacReader::open(path).map_err(|e| DatasetError::audio(path, e))?;
    let info = reader.streaminfo();
    let channels = info.channels as usize;
    if channels == 0 {
        return Err(DatasetError::audio(path, "FLAC has zero channels"));
    }
    let bits_per_sample = info.bits_per_sample as i32;
    let scale = if bits_per_sample > 1 {
        ((1_i64 << (bits_per_sample - 1)) - 1) as f32
    } else {
        1.0
    };

    let mut interleaved = Vec::new();
    for sample in reader.samples() {
        let sample = sample.map_err(|e| DatasetError::audio(path, e))?;
        interleaved.push(sample as f32 / scale);
    }
    Ok(AudioClip {
        sample_rate: info.sample_rate,
        channels: deinterleave(interleaved, channels),
    })
}

fn read_wav(path: &Path) -> Result<AudioClip, DatasetError> {
    let mut reader = WavReader::open(path).map_err(|e| DatasetError::audio(path, e))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(DatasetError::audio(path, "WAV has zero channels"));
    }

    let interleaved = match spec.sample_format {
        SampleFormat::Int => {
            let scale = ((1_i64 << (spec.bits_per_sample.max(2) - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / scale))
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| DatasetError::audio(path, e))?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|e| DatasetError::audio(path, e))?,
    };

    Ok(AudioClip {
        sample_rate: spec.sample_rate,
        channels: deinterleave(interleaved, spec.channels as usize),
    })
}

/// Band-limited sinc resampling of a mono signal.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, DatasetError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let resample_err = |e: &dyn std::fmt::Display| DatasetError::Resample {
        from,
        to,
        message: e.to_string(),
    };

    let ratio = to as f64 / from as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| resample_err(&e))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
    let mut chunk = vec![0.0f32; RESAMPLE_CHUNK];
    let mut pos = 0;

    // Zero-padded chunks keep flowing until the filter delay is flushed.
    while out.len() < expected + delay {
        let end = (pos + RESAMPLE_CHUNK).min(samples.len());
        chunk.fill(0.0);
        chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        pos = end;
        let frames = resampler
            .process(&[chunk.as_slice()], None)
            .map_err(|e| resample_err(&e))?;
        out.extend_from_slice(&frames[0]);
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    #[test]
    fn reads_stereo_wav_as_planar() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 8000, 2, &[i16::MAX, 0, 0, i16::MAX, i16::MAX, i16::MAX]);
        let clip = read_audio(&path).expect("read");
        assert_eq!(clip.sample_rate, 8000);
        assert_eq!(clip.num_channels(), 2);
        assert_eq!(clip.frames(), 3);
        assert!((clip.channels[0][0] - 1.0).abs() < 1e-6);
        assert_eq!(clip.channels[1][0], 0.0);
        assert_eq!(clip.downmix(), vec![0.5, 0.5, 1.0]);
        assert_eq!(probe_length(&path).expect("probe"), (3, 8000));
    }

    #[test]
    fn reads_stereo_flac_as_planar_and_scaled() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/stereo_16k_16bit.flac");
        let clip = read_audio(&path).expect("read flac");
        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.num_channels(), 2);
        assert_eq!(clip.frames(), 16);
        assert!((clip.channels[0][0] - 1.0).abs() < 1e-6);
        assert!((clip.channels[0][1] - 2048.0 / 32767.0).abs() < 1e-6);
        assert_eq!(clip.channels[1][0], 0.0);
        assert!((clip.channels[1][15] + 30720.0 / 32767.0).abs() < 1e-6);
        assert_eq!(probe_length(&path).expect("probe"), (16, 16_000));
    }

    #[test]
    fn flatten_is_channel_major() {
        let clip = AudioClip {
            sample_rate: 1,
            channels: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        };
        assert_eq!(clip.flatten(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn concat_appends_along_time() {
        let a = AudioClip::mono(10, vec![1.0, 2.0]);
        let b = AudioClip::mono(10, vec![3.0]);
        assert_eq!(a.concat(b).expect("concat").channels, vec![vec![1.0, 2.0, 3.0]]);

        let a = AudioClip::mono(10, vec![1.0]);
        let b = AudioClip::mono(20, vec![1.0]);
        assert!(a.concat(b).is_err());
    }

    #[test]
    fn unsupported_extension_is_audio_error() {
        let err = read_audio(Path::new("clip.mp3")).unwrap_err();
        assert!(matches!(err, DatasetError::Audio { .. }));
    }

    #[test]
    fn resample_scales_length() {
        let samples: Vec<f32> = (0..44_100).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let out = resample(&samples, 44_100, 16_000).expect("resample");
        assert_eq!(out.len(), 16_000);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000).expect("resample"), samples);
    }
}
