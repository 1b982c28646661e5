use anyhow::Result;
use facesift_vision::{FaceDetector, YuNetDetector};
use image::{DynamicImage, GrayImage, Luma};
use std::path::Path;

const MODEL: &str = "../models/face_detection_yunet_2023mar.onnx";

/// A flat image must not produce faces. Needs the YuNet model on disk.
#[test]
fn test_blank_image_has_no_faces() -> Result<()> {
    env_logger::try_init().ok();

    let model = Path::new(MODEL);
    if !model.exists() {
        eprintln!("Skipping: {} not found", MODEL);
        return Ok(());
    }

    let mut detector = YuNetDetector::from_file(model)?;
    let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(320, 240, Luma([128])));
    let faces = detector.detect(&blank)?;

    assert!(faces.is_empty(), "expected no faces, got {:?}", faces);
    Ok(())
}

#[test]
fn test_missing_model_is_an_error() {
    let result = YuNetDetector::from_file(Path::new("no/such/model.onnx"));
    assert!(result.is_err());
}
