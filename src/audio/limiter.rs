//! Output limiter: hard clamp and 16-bit quantization.

/// Ceiling used when both staves are mixed for playback.
pub const PLAYBACK_CEILING: f32 = 0.95;

/// Hard limiter that clamps samples to `[-ceiling, ceiling]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limiter {
    ceiling: f32,
}

impl Limiter {
    /// `ceiling` is taken as an absolute value and capped at full scale.
    pub fn new(ceiling: f32) -> Self {
        Self {
            ceiling: ceiling.abs().min(1.0),
        }
    }

    /// Full-scale clamp for file output.
    pub fn full_scale() -> Self {
        Self { ceiling: 1.0 }
    }

    #[inline]
    pub fn process(&self, sample: f32) -> f32 {
        if sample.is_nan() {
            return 0.0;
        }
        sample.clamp(-self.ceiling, self.ceiling)
    }

    pub fn process_block(&self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Limit then convert to a signed 16-bit sample.
    #[inline]
    pub fn to_i16(&self, sample: f32) -> i16 {
        (self.process(sample) * f32::from(i16::MAX)).round() as i16
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            ceiling: PLAYBACK_CEILING,
        }
    }
}
