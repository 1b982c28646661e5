use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};

/// Turns an image file into pixels.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DynamicImage>;
}

impl<T: ImageDecoder + ?Sized> ImageDecoder for &T {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        (**self).decode(path)
    }
}

/// Decodes from disk with the `image` crate, sniffing the format from content.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        ImageReader::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("sniffing format of {}", path.display()))?
            .decode()
            .with_context(|| format!("decoding {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("facesift-decode-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_decode_png_regardless_of_extension() {
        // A PNG saved under a .jpg name still decodes
        let png = scratch("really_png.png");
        GrayImage::from_pixel(12, 7, Luma([200])).save(&png).unwrap();
        let misnamed = scratch("really_png.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let img = FileDecoder.decode(&misnamed).unwrap();
        assert_eq!((img.width(), img.height()), (12, 7));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let path = scratch("garbage.jpeg");
        std::fs::write(&path, b"not an image at all").unwrap();
        assert!(FileDecoder.decode(&path).is_err());
    }

    #[test]
    fn test_decode_missing_file_fails() {
        assert!(FileDecoder.decode(&scratch("absent.png")).is_err());
    }
}
