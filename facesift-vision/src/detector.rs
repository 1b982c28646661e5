use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::Session;

use crate::face::{self, FaceRect};

/// Minimum YuNet confidence for a grid cell to count as a face.
pub const SCORE_THRESHOLD: f32 = 0.6;
/// IoU above which overlapping boxes are merged.
pub const NMS_THRESHOLD: f32 = 0.3;

/// Frontal face detection over a decoded image.
///
/// Implementations convert to grayscale themselves; the returned rectangles are
/// in the pixel space of `image`.
pub trait FaceDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<FaceRect>>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for &mut T {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<FaceRect>> {
        (**self).detect(image)
    }
}

/// Pretrained YuNet model running on ONNX Runtime.
pub struct YuNetDetector {
    session: Session,
}

impl YuNetDetector {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn from_file(model_path: &Path) -> Result<Self> {
        Ok(Self::new(crate::model::detector_session(model_path)?))
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<FaceRect>> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let detections =
            face::detect_faces(&mut self.session, &gray, SCORE_THRESHOLD, NMS_THRESHOLD)
                .context("detecting faces")?;
        log::debug!("{} face(s) in {}x{} image", detections.len(), width, height);

        Ok(detections
            .iter()
            .map(|d| d.to_rect(width, height))
            .collect())
    }
}
