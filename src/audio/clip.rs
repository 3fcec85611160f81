//! Audio clips: WAV loading, mono mixdown, resampling and tail trimming.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("WAV file contains no samples")]
    Empty,
}

/// A mono clip at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Clip {
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Open a WAV file and convert it to mono at `target_rate`.
    pub fn load(path: &Path, target_rate: u32) -> Result<Self, ClipError> {
        let file = File::open(path).map_err(hound::Error::from)?;
        Self::from_wav(BufReader::new(file), target_rate)
    }

    /// Decode WAV data, averaging channels to mono and resampling linearly
    /// when the file rate differs from `target_rate`.
    pub fn from_wav<R: Read + Seek>(reader: R, target_rate: u32) -> Result<Self, ClipError> {
        let wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();
        let channels = usize::from(spec.channels.max(1));

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let full_scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
                wav.into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Float => wav.into_samples::<f32>().collect::<Result<_, _>>()?,
        };
        if raw.is_empty() {
            return Err(ClipError::Empty);
        }

        let mono: Vec<f32> = raw
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        let samples = if spec.sample_rate == target_rate {
            mono
        } else {
            resample_linear(&mono, spec.sample_rate, target_rate)
        };
        Ok(Self {
            samples,
            sample_rate: target_rate,
        })
    }

    /// Drop the last `secs` seconds. A clip shorter than that becomes empty.
    pub fn trim_tail(&mut self, secs: f32) {
        let cut = (secs.max(0.0) * self.sample_rate as f32).round() as usize;
        let keep = self.samples.len().saturating_sub(cut);
        self.samples.truncate(keep);
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Linear-interpolation resampling from `source_rate` to `target_rate`.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if input.len() < 2 || source_rate == 0 || target_rate == 0 {
        return input.to_vec();
    }

    let ratio = f64::from(source_rate) / f64::from(target_rate);
    let output_len = (input.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (input.get(idx), input.get(idx + 1)) {
                (Some(&a), Some(&b)) => a * (1.0 - frac) + b * frac,
                (Some(&a), None) => a,
                _ => input[input.len() - 1],
            }
        })
        .collect()
}
