//! Offline rendering: one clip per emitted entry, concatenated per staff.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::clip::Clip;
use super::limiter::Limiter;
use crate::config::Config;
use crate::notation::ParsedScore;

pub const OUTPUT_FA: &str = "output_fa.wav";
pub const OUTPUT_SOL: &str = "output_sol.wav";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("cannot remove previous {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub music_dir: PathBuf,
    pub output_dir: PathBuf,
    pub sample_rate: u32,
    pub tail_trim_secs: f32,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            music_dir: config.music_dir.clone(),
            output_dir: config.output_dir.clone(),
            sample_rate: config.sample_rate,
            tail_trim_secs: config.tail_trim_secs,
        }
    }
}

/// Rendered staves, plus the files written for them.
#[derive(Debug, Clone, Default)]
pub struct RenderedScore {
    pub fa: Vec<f32>,
    pub sol: Vec<f32>,
    pub sample_rate: u32,
    pub fa_path: Option<PathBuf>,
    pub sol_path: Option<PathBuf>,
}

impl RenderedScore {
    /// Both staves played together, limited for playback.
    pub fn mixed(&self) -> Vec<f32> {
        mix(&self.fa, &self.sol, Limiter::default())
    }
}

/// Loads clips from the music directory and concatenates them.
/// Each clip is read at most once per renderer.
pub struct Renderer {
    settings: RenderSettings,
    cache: HashMap<String, Option<Clip>>,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            cache: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn clip_path(&self, entry: &str) -> PathBuf {
        self.settings.music_dir.join(format!("{entry}.wav"))
    }

    /// The trimmed clip for `entry`, or `None` if it cannot be loaded.
    pub fn clip(&mut self, entry: &str) -> Option<&Clip> {
        if !self.cache.contains_key(entry) {
            let path = self.clip_path(entry);
            let clip = match Clip::load(&path, self.settings.sample_rate) {
                Ok(mut clip) => {
                    clip.trim_tail(self.settings.tail_trim_secs);
                    debug!(entry, samples = clip.len(), "loaded clip");
                    Some(clip)
                }
                Err(e) => {
                    warn!(path = %path.display(), "skipping clip: {e}");
                    None
                }
            };
            self.cache.insert(entry.to_string(), clip);
        }
        self.cache.get(entry).and_then(Option::as_ref)
    }

    /// Concatenate the clips of `entries` in order, skipping unloadable ones.
    pub fn render_sequence(&mut self, entries: &[String]) -> Vec<f32> {
        let mut out = Vec::new();
        for entry in entries {
            if let Some(clip) = self.clip(entry) {
                out.extend_from_slice(clip.samples());
            }
        }
        out
    }

    /// Render both staves and write them to the output directory.
    pub fn render(&mut self, score: &ParsedScore) -> Result<RenderedScore, RenderError> {
        let output_dir = self.settings.output_dir.clone();
        std::fs::create_dir_all(&output_dir).map_err(|source| RenderError::CreateDir {
            path: output_dir.clone(),
            source,
        })?;

        let rate = self.settings.sample_rate;
        let fa = self.render_sequence(&score.fa_notes);
        let sol = self.render_sequence(&score.sol_notes);

        let fa_path = write_staff(&output_dir.join(OUTPUT_FA), &fa, rate)?;
        let sol_path = write_staff(&output_dir.join(OUTPUT_SOL), &sol, rate)?;

        Ok(RenderedScore {
            fa,
            sol,
            sample_rate: rate,
            fa_path,
            sol_path,
        })
    }
}

fn write_staff(path: &Path, samples: &[f32], rate: u32) -> Result<Option<PathBuf>, RenderError> {
    if samples.is_empty() {
        // Output files always reflect the latest render.
        match std::fs::remove_file(path) {
            Ok(()) => warn!(path = %path.display(), "no audio for staff, removed previous output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no audio for staff, nothing written")
            }
            Err(source) => {
                return Err(RenderError::RemoveStale {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        return Ok(None);
    }
    write_wav(path, samples, rate)?;
    info!(
        path = %path.display(),
        secs = samples.len() as f32 / rate as f32,
        "wrote staff"
    );
    Ok(Some(path.to_path_buf()))
}

/// Write 16-bit mono PCM.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), RenderError> {
    let wav_err = |source| RenderError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let limiter = Limiter::full_scale();
    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_err)?;
    for &s in samples {
        writer.write_sample(limiter.to_i16(s)).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)
}

/// Sum two signals sample by sample; the shorter one is padded with silence.
pub fn mix(a: &[f32], b: &[f32], limiter: Limiter) -> Vec<f32> {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let s = a.get(i).copied().unwrap_or(0.0) + b.get(i).copied().unwrap_or(0.0);
            limiter.process(s)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn write_clip(dir: &Path, name: &str, value: i16, frames: usize, rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dir.join(format!("{name}.wav")), spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn settings(music: &Path, output: &Path) -> RenderSettings {
        RenderSettings {
            music_dir: music.to_path_buf(),
            output_dir: output.to_path_buf(),
            sample_rate: 100,
            tail_trim_secs: 0.5,
        }
    }

    fn entries(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn concatenates_trimmed_clips_in_order() {
        let music = tempfile::tempdir().unwrap();
        write_clip(music.path(), "A", 16384, 100, 100);
        write_clip(music.path(), "B", -16384, 80, 100);

        let mut renderer = Renderer::new(settings(music.path(), music.path()));
        let out = renderer.render_sequence(&entries(&["A", "B", "A"]));
        // 100 - 50 and 80 - 50 frames.
        assert_eq!(out.len(), 50 + 30 + 50);
        assert_approx_eq!(out[0], 0.5, 1e-4);
        assert_approx_eq!(out[50], -0.5, 1e-4);
        assert_approx_eq!(out[80], 0.5, 1e-4);
    }

    #[test]
    fn missing_clips_are_skipped() {
        let music = tempfile::tempdir().unwrap();
        write_clip(music.path(), "PAUSE", 0, 60, 100);

        let mut renderer = Renderer::new(settings(music.path(), music.path()));
        let out = renderer.render_sequence(&entries(&["NOPE", "PAUSE", "NOPE"]));
        assert_eq!(out.len(), 10);
        assert!(renderer.clip("NOPE").is_none());
    }

    #[test]
    fn render_writes_both_staves() {
        let music = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let out_dir = output.path().join("nested");
        write_clip(music.path(), "FA_TOKEN_DO_L_Piano", 8192, 70, 100);
        write_clip(music.path(), "SOL_TOKEN_DO_H_Piano", -8192, 90, 100);

        let score = ParsedScore {
            fa_notes: entries(&["FA_TOKEN_DO_L_Piano"]),
            sol_notes: entries(&["SOL_TOKEN_DO_H_Piano", "SOL_TOKEN_DO_H_Piano"]),
            ..ParsedScore::default()
        };
        let mut renderer = Renderer::new(settings(music.path(), &out_dir));
        let rendered = renderer.render(&score).unwrap();

        assert_eq!(rendered.fa.len(), 20);
        assert_eq!(rendered.sol.len(), 80);
        let fa_path = rendered.fa_path.clone().unwrap();
        assert_eq!(fa_path, out_dir.join(OUTPUT_FA));

        let reader = hound::WavReader::open(&fa_path).unwrap();
        let spec = reader.spec();
        assert_eq!((spec.channels, spec.sample_rate, spec.bits_per_sample), (1, 100, 16));
        assert_eq!(reader.len(), 20);

        let mixed = rendered.mixed();
        assert_eq!(mixed.len(), 80);
        assert_approx_eq!(mixed[0], 0.0, 1e-3);
        assert_approx_eq!(mixed[40], -0.25, 1e-3);
    }

    #[test]
    fn empty_staff_writes_no_file() {
        let music = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(settings(music.path(), output.path()));
        let rendered = renderer.render(&ParsedScore::default()).unwrap();
        assert!(rendered.fa_path.is_none());
        assert!(rendered.sol_path.is_none());
        assert!(!output.path().join(OUTPUT_SOL).exists());
    }

    #[test]
    fn empty_staff_removes_previous_output() {
        let music = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_clip(music.path(), "SOL_TOKEN_DO_H_Piano", 8192, 70, 100);
        write_clip(music.path(), "FA_TOKEN_DO_L_Piano", 8192, 70, 100);
        let mut renderer = Renderer::new(settings(music.path(), output.path()));

        let both = ParsedScore {
            fa_notes: entries(&["FA_TOKEN_DO_L_Piano"]),
            sol_notes: entries(&["SOL_TOKEN_DO_H_Piano"]),
            ..ParsedScore::default()
        };
        renderer.render(&both).unwrap();
        assert!(output.path().join(OUTPUT_FA).exists());

        let treble_only = ParsedScore {
            sol_notes: entries(&["SOL_TOKEN_DO_H_Piano"]),
            ..ParsedScore::default()
        };
        let rendered = renderer.render(&treble_only).unwrap();
        assert!(rendered.fa_path.is_none());
        assert!(!output.path().join(OUTPUT_FA).exists());
        assert!(output.path().join(OUTPUT_SOL).exists());
    }

    #[test]
    fn mix_pads_and_limits() {
        let out = mix(&[0.9, 0.9, 0.1], &[0.9], Limiter::default());
        assert_eq!(out, vec![0.95, 0.9, 0.1]);
    }

    #[test]
    fn written_samples_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.wav");
        write_wav(&path, &[2.0, -2.0, 0.0], 8000).unwrap();
        let samples: Vec<i16> = hound::WavReader::open(&path)
            .unwrap()
            .into_samples::<i16>()
            .map(Result::unwrap)
            .collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX, 0]);
    }
}
