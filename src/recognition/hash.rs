//! 64-bit average hash (aHash).

use std::fmt;
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

const HASH_SIZE: u32 = 8;

/// Perceptual fingerprint of an image: one bit per cell of an 8×8 grayscale
/// thumbnail, set where the cell is brighter than the thumbnail's mean.
/// Bits are row-major, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(u64);

impl ImageHash {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn average(image: &DynamicImage) -> Self {
        let thumb = image
            .grayscale()
            .resize_exact(HASH_SIZE, HASH_SIZE, FilterType::Lanczos3)
            .to_luma8();

        let pixels: Vec<f64> = thumb.pixels().map(|p| f64::from(p.0[0])).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;

        let bits = pixels
            .iter()
            .fold(0u64, |acc, &v| (acc << 1) | u64::from(v > mean));
        Self(bits)
    }

    /// Decode an image file and hash it. The format is sniffed from the
    /// content, so the extension does not have to match.
    pub fn open(path: &Path) -> image::ImageResult<Self> {
        let image = image::io::Reader::open(path)?
            .with_guessed_format()?
            .decode()?;
        Ok(Self::average(&image))
    }

    /// Hamming distance.
    pub fn distance(self, other: ImageHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
