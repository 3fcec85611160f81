//! Audio: clip rendering to WAV files, and live playback of a render.
//!
//! Playback owns a cpal output stream fed through a lock-free ring buffer:
//! the main thread pushes [`AudioCommand`]s, the audio thread drains them in
//! its callback.

pub mod callback;
pub mod clip;
pub mod command;
pub mod limiter;
pub mod render;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Observer, Producer, Split},
    HeapRb,
};
use thiserror::Error;
use tracing::{error, info};

pub use clip::{Clip, ClipError};
pub use command::AudioCommand;
pub use limiter::Limiter;
pub use render::{RenderError, RenderSettings, RenderedScore, Renderer};

use callback::AudioCallback;

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 64;

/// Frames per `Frames` command when streaming a render.
const BLOCK_FRAMES: usize = 4096;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    #[error("audio command ring buffer is full")]
    BufferFull,
}

/// Owns the cpal stream and the producer side of the command queue.
pub struct AudioEngine {
    /// Playback stops when the stream is dropped.
    _stream: cpal::Stream,
    producer: ringbuf::HeapProd<AudioCommand>,
    played: Arc<AtomicUsize>,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Open the default output device with its default configuration.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels(),
            sample_rate: config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY).split();
        let played = Arc::new(AtomicUsize::new(0));
        let mut audio_callback =
            AudioCallback::new(consumer, stream_config.channels, Arc::clone(&played));

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    audio_callback.process(data);
                },
                |err: cpal::StreamError| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            producer,
            played,
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
        })
    }

    /// Queue mono frames at the device rate.
    pub fn send_frames(&mut self, frames: Vec<f32>) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Frames(frames))
            .map_err(|_| AudioError::BufferFull)
    }

    /// Master volume for everything played from now on.
    pub fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::SetVolume(volume))
            .map_err(|_| AudioError::BufferFull)
    }

    /// Drop everything queued on the audio thread.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Stop)
            .map_err(|_| AudioError::BufferFull)
    }

    /// Frames the device has played so far.
    pub fn frames_played(&self) -> usize {
        self.played.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Play mono `samples` recorded at `sample_rate` to completion, or until
    /// `stop` is raised.
    pub fn play_blocking(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        stop: &AtomicBool,
    ) -> Result<(), AudioError> {
        let frames = if sample_rate == self.sample_rate {
            samples.to_vec()
        } else {
            clip::resample_linear(samples, sample_rate, self.sample_rate)
        };
        let start = self.frames_played();
        let total = frames.len();
        info!(
            secs = total as f32 / self.sample_rate as f32,
            device_rate = self.sample_rate,
            "playing"
        );

        let mut blocks = frames.chunks(BLOCK_FRAMES);
        let mut pending = blocks.next();
        while !stop.load(Ordering::Relaxed) {
            // Keep the queue topped up without overflowing it.
            while let Some(block) = pending {
                if self.producer.is_full() {
                    break;
                }
                self.send_frames(block.to_vec())?;
                pending = blocks.next();
            }
            if pending.is_none() && self.frames_played() - start >= total {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }

        info!("playback interrupted");
        self.stop()
    }
}

/// Play a render through the default output device, both staves together,
/// at `volume`.
pub fn play_mix(
    rendered: &RenderedScore,
    volume: f32,
    stop: &AtomicBool,
) -> Result<(), AudioError> {
    let mut engine = AudioEngine::new()?;
    engine.set_volume(volume)?;
    engine.play_blocking(&rendered.mixed(), rendered.sample_rate, stop)
}
