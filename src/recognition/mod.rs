//! Picture recognition: matches cell images against the reference symbol set.

pub mod hash;

pub use hash::ImageHash;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notation::source::{ImageHandle, SymbolMatcher};
use crate::notation::symbol::ReferenceSymbol;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("cannot read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no reference images found in {dir}")]
    NoReferences { dir: PathBuf },
}

/// Hashes of the reference images, in reference-set order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: Vec<(ReferenceSymbol, ImageHash)>,
}

impl ReferenceSet {
    /// Load `<dir>/<symbol file name>` for every reference symbol.
    ///
    /// Missing or undecodable references are skipped with a warning.
    pub fn load(dir: &Path) -> Result<Self, RecognitionError> {
        let mut entries = Vec::with_capacity(ReferenceSymbol::ALL.len());
        for symbol in ReferenceSymbol::ALL {
            let path = dir.join(symbol.file_name());
            if !path.exists() {
                warn!(path = %path.display(), "reference image not found");
                continue;
            }
            match ImageHash::open(&path) {
                Ok(hash) => entries.push((symbol, hash)),
                Err(e) => warn!(path = %path.display(), "skipping reference image: {e}"),
            }
        }

        if entries.is_empty() {
            return Err(RecognitionError::NoReferences {
                dir: dir.to_path_buf(),
            });
        }
        info!(count = entries.len(), dir = %dir.display(), "loaded reference images");
        Ok(Self { entries })
    }

    pub fn from_hashes(entries: impl IntoIterator<Item = (ReferenceSymbol, ImageHash)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = ReferenceSymbol> + '_ {
        self.entries.iter().map(|(symbol, _)| *symbol)
    }

    /// The reference closest to `hash`. The earliest reference wins a tie.
    pub fn nearest(&self, hash: ImageHash) -> Option<(ReferenceSymbol, u32)> {
        let mut best: Option<(ReferenceSymbol, u32)> = None;
        for &(symbol, reference) in &self.entries {
            let distance = hash.distance(reference);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((symbol, distance));
            }
        }
        best
    }

    /// Hash an image file and find its nearest reference.
    pub fn identify(&self, path: &Path) -> Result<Option<ReferenceSymbol>, RecognitionError> {
        let hash = ImageHash::open(path).map_err(|source| RecognitionError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let matched = self.nearest(hash);
        if let Some((symbol, distance)) = matched {
            debug!(path = %path.display(), %symbol, distance, "matched image");
        }
        Ok(matched.map(|(symbol, _)| symbol))
    }
}

impl SymbolMatcher for ReferenceSet {
    fn best_match(&self, image: &ImageHandle) -> Option<ReferenceSymbol> {
        match image {
            ImageHandle::Known(symbol) => Some(*symbol),
            ImageHandle::File(path) => match self.identify(path) {
                Ok(Some(symbol)) => Some(symbol),
                Ok(None) => {
                    warn!(path = %path.display(), "no match found for image");
                    None
                }
                Err(e) => {
                    warn!("{e}");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::symbol::PitchPosition;
    use image::{DynamicImage, GrayImage, Luma};

    /// An 8×8 picture whose average hash is exactly `bits`.
    fn picture(bits: u64) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(8, 8, |x, y| {
            let bit = 63 - (y * 8 + x);
            Luma([if bits >> bit & 1 == 1 { 255 } else { 0 }])
        }))
    }

    fn save(dir: &Path, name: &str, bits: u64) -> PathBuf {
        let path = dir.join(name);
        picture(bits)
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn picture_helper_hashes_to_its_bits() {
        let bits = 0xFF00_0F0F_3C3C_0001;
        assert_eq!(ImageHash::average(&picture(bits)).bits(), bits);
    }

    #[test]
    fn load_skips_missing_references() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), "Note_CLE_SOL.JPG", 0xFFFF_0000_0000_0000);
        save(dir.path(), "BATON_MESURE.JPG", 0x0000_0000_FFFF_FFFF);
        std::fs::write(dir.path().join("Note_H1.JPG"), b"not an image").unwrap();

        let set = ReferenceSet::load(dir.path()).unwrap();
        assert_eq!(set.len(), 2);
        // Reference-set order, not file order.
        assert_eq!(
            set.symbols().collect::<Vec<_>>(),
            vec![ReferenceSymbol::MeasureBar, ReferenceSymbol::ClefSol]
        );
    }

    #[test]
    fn load_empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReferenceSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, RecognitionError::NoReferences { .. }));
    }

    #[test]
    fn nearest_by_hamming_distance() {
        let set = ReferenceSet::from_hashes([
            (ReferenceSymbol::ClefSol, ImageHash::from_bits(0xFF)),
            (ReferenceSymbol::ClefFa, ImageHash::from_bits(0xFF00)),
        ]);
        assert_eq!(
            set.nearest(ImageHash::from_bits(0x7F00)),
            Some((ReferenceSymbol::ClefFa, 1))
        );
        assert_eq!(ReferenceSet::default().nearest(ImageHash::from_bits(0)), None);
    }

    #[test]
    fn tie_goes_to_earliest_reference() {
        let set = ReferenceSet::from_hashes([
            (ReferenceSymbol::Pause, ImageHash::from_bits(0b01)),
            (ReferenceSymbol::HalfPause, ImageHash::from_bits(0b10)),
        ]);
        assert_eq!(
            set.nearest(ImageHash::from_bits(0b00)),
            Some((ReferenceSymbol::Pause, 1))
        );
    }

    #[test]
    fn matches_image_files() {
        let refs = tempfile::tempdir().unwrap();
        let h5 = ReferenceSymbol::Pitch(PitchPosition::new(4).unwrap());
        save(refs.path(), "Note_H5.JPG", 0x0000_0000_0000_FFFF);
        save(refs.path(), "Note_PAUSE.JPG", 0xFFFF_FFFF_0000_0000);
        let set = ReferenceSet::load(refs.path()).unwrap();

        let cells = tempfile::tempdir().unwrap();
        let cell = save(cells.path(), "cell.png", 0x0000_0000_0001_FFFF);
        assert_eq!(set.best_match(&ImageHandle::File(cell)), Some(h5));

        let missing = cells.path().join("missing.png");
        assert_eq!(set.best_match(&ImageHandle::File(missing)), None);

        assert_eq!(
            set.best_match(&ImageHandle::Known(ReferenceSymbol::Sharp)),
            Some(ReferenceSymbol::Sharp)
        );
    }
}
