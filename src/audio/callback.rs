//! Audio callback: runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer and spreads queued mono frames over
//! every output channel, through volume and the limiter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::command::AudioCommand;
use super::limiter::Limiter;

/// Consumed frames are compacted out of the queue past this point.
const COMPACT_THRESHOLD: usize = 8192;

/// State that lives on the audio thread.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    queue: Vec<f32>,
    read_pos: usize,
    volume: f32,
    limiter: Limiter,
    channels: usize,
    /// Frames played since the stream started, read by the main thread.
    played: Arc<AtomicUsize>,
}

impl AudioCallback {
    pub fn new(consumer: HeapCons<AudioCommand>, channels: u16, played: Arc<AtomicUsize>) -> Self {
        Self {
            consumer,
            queue: Vec::new(),
            read_pos: 0,
            volume: 1.0,
            limiter: Limiter::default(),
            channels: usize::from(channels.max(1)),
            played,
        }
    }

    /// Fill one interleaved output buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Frames(frames) => self.queue.extend_from_slice(&frames),
                AudioCommand::SetVolume(v) => self.volume = v.clamp(0.0, 1.0),
                AudioCommand::Stop => {
                    self.queue.clear();
                    self.read_pos = 0;
                }
            }
        }

        let mut written = 0;
        for frame in output.chunks_mut(self.channels) {
            let sample = match self.queue.get(self.read_pos) {
                Some(&s) => {
                    self.read_pos += 1;
                    written += 1;
                    self.limiter.process(s * self.volume)
                }
                None => 0.0,
            };
            frame.fill(sample);
        }
        if written > 0 {
            self.played.fetch_add(written, Ordering::Release);
        }

        if self.read_pos >= COMPACT_THRESHOLD {
            self.queue.drain(..self.read_pos);
            self.read_pos = 0;
        }
    }
}
