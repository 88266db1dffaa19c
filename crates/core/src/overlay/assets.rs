//! Baked-in overlay images.
//!
//! The app ships a small fixed set of overlay images; one is selected
//! at a time and applied to every face uniformly. Selection is global
//! state changed by a UI trigger, never per-face.

use image::RgbaImage;

/// Stable key for a decoded overlay image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssetId(usize);

impl AssetId {
    /// Position within the library's fixed ordering.
    pub fn index(self) -> usize {
        self.0
    }
}

struct OverlayAsset {
    name: &'static str,
    image: RgbaImage,
}

/// The decoded built-in overlay images plus the next-asset ordering.
pub struct AssetLibrary {
    assets: Vec<OverlayAsset>,
}

impl AssetLibrary {
    /// Decode the embedded overlay images. The first entry is the
    /// startup default.
    pub fn builtin() -> Result<Self, image::ImageError> {
        let sources: &[(&'static str, &'static [u8])] = &[
            ("red_nose", include_bytes!("../../assets/red_nose.png")),
            ("mustache", include_bytes!("../../assets/mustache.png")),
        ];

        let mut assets = Vec::with_capacity(sources.len());
        for (name, bytes) in sources {
            let image = image::load_from_memory(bytes)?.to_rgba8();
            assets.push(OverlayAsset { name, image });
        }
        Ok(Self { assets })
    }

    /// The startup default: the first built-in asset.
    pub fn default_asset(&self) -> AssetId {
        AssetId(0)
    }

    /// The asset after `current`, wrapping around.
    pub fn next_after(&self, current: AssetId) -> AssetId {
        AssetId((current.0 + 1) % self.assets.len())
    }

    pub fn image(&self, id: AssetId) -> &RgbaImage {
        &self.assets[id.0 % self.assets.len()].image
    }

    pub fn name(&self, id: AssetId) -> &'static str {
        self.assets[id.0 % self.assets.len()].name
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_decodes() {
        let lib = AssetLibrary::builtin().unwrap();
        assert!(lib.len() >= 2);
        assert!(!lib.is_empty());
    }

    #[test]
    fn test_default_is_first() {
        let lib = AssetLibrary::builtin().unwrap();
        assert_eq!(lib.name(lib.default_asset()), "red_nose");
    }

    #[test]
    fn test_next_after_cycles() {
        let lib = AssetLibrary::builtin().unwrap();
        let mut id = lib.default_asset();
        for _ in 0..lib.len() {
            id = lib.next_after(id);
        }
        assert_eq!(id, lib.default_asset());
    }

    #[test]
    fn test_images_nonempty() {
        let lib = AssetLibrary::builtin().unwrap();
        let img = lib.image(lib.default_asset());
        assert!(img.width() > 0 && img.height() > 0);
    }
}
