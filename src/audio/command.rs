//! Commands sent from the main thread to the audio thread via ring buffer.

#[derive(Debug)]
pub enum AudioCommand {
    /// Append mono frames to the playback queue.
    Frames(Vec<f32>),
    /// Master volume, clamped to 0.0..=1.0 on the audio thread.
    SetVolume(f32),
    /// Drop everything queued.
    Stop,
}
