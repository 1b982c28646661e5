use crate::yunet;
use anyhow::Result;
use image::{imageops, GrayImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// YuNet expects a fixed [1, 3, 640, 640] input.
pub const INPUT_SIZE: u32 = 640;

/// Detection result from YuNet, in source image pixels
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
}

/// Face bounding box with integer corners in source image pixels.
///
/// Corners are ordered: `right >= left` and `bottom >= top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl FaceRect {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i64 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.bottom - self.top).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }
}

impl Detection {
    /// Round to whole pixels and clip to a `width` x `height` image.
    ///
    /// NaN coordinates collapse onto the nearest bound instead of panicking.
    pub fn to_rect(&self, width: u32, height: u32) -> FaceRect {
        let (w, h) = (width as f32, height as f32);
        let left = self.bbox[0].max(0.0).min(w);
        let top = self.bbox[1].max(0.0).min(h);
        let right = (self.bbox[0] + self.bbox[2]).max(left).min(w);
        let bottom = (self.bbox[1] + self.bbox[3]).max(top).min(h);
        FaceRect::new(
            left.round() as i64,
            top.round() as i64,
            right.round() as i64,
            bottom.round() as i64,
        )
    }
}

/// Aspect-preserving fit of a source image into the square detector canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Letterbox {
    pub fn fit(src_width: u32, src_height: u32, target: u32) -> Self {
        let max_dim = src_width.max(src_height).max(1);
        let scale = target as f32 / max_dim as f32;
        let width = ((src_width as f32 * scale) as u32).clamp(1, target);
        let height = ((src_height as f32 * scale) as u32).clamp(1, target);
        Self {
            scale,
            width,
            height,
            offset_x: (target - width) / 2,
            offset_y: (target - height) / 2,
        }
    }

    /// Map an (x, y, w, h) box from canvas pixels back to source pixels.
    pub fn to_source(&self, bbox: [f32; 4]) -> [f32; 4] {
        [
            (bbox[0] - self.offset_x as f32) / self.scale,
            (bbox[1] - self.offset_y as f32) / self.scale,
            bbox[2] / self.scale,
            bbox[3] / self.scale,
        ]
    }
}

/// Detect faces in a grayscale image using the YuNet detector
pub fn detect_faces(
    session: &mut Session,
    gray: &GrayImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let (orig_width, orig_height) = gray.dimensions();
    if orig_width == 0 || orig_height == 0 {
        anyhow::bail!("cannot detect faces in an empty {}x{} image", orig_width, orig_height);
    }

    // Pad to square to avoid distortion
    let letterbox = Letterbox::fit(orig_width, orig_height, INPUT_SIZE);
    let resized = imageops::resize(
        gray,
        letterbox.width,
        letterbox.height,
        imageops::FilterType::Triangle,
    );
    let mut canvas = GrayImage::new(INPUT_SIZE, INPUT_SIZE);
    imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.offset_x as i64,
        letterbox.offset_y as i64,
    );

    // Intensity goes into all three BGR planes
    let plane: Vec<f32> = canvas.as_raw().iter().map(|&p| p as f32).collect();
    let mut input_data = Vec::with_capacity(3 * plane.len());
    for _ in 0..3 {
        input_data.extend_from_slice(&plane);
    }

    let side = INPUT_SIZE as usize;
    let input_array = Array4::from_shape_vec((1, 3, side, side), input_data)?;
    let input_tensor = Value::from_array(input_array)?;

    let outputs = session.run(ort::inputs![input_tensor])?;

    let mut output_data: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        output_data.push((shape.iter().copied().collect(), data.to_vec()));
    }
    let output_refs: Vec<(&[i64], &[f32])> = output_data
        .iter()
        .map(|(s, d)| (s.as_slice(), d.as_slice()))
        .collect();

    let strides = yunet::parse_yunet_outputs(&output_refs, side)?;
    let raw = yunet::decode_detections(&strides, score_threshold, side);

    let mut detections: Vec<Detection> = raw
        .into_iter()
        .map(|d| Detection {
            bbox: letterbox.to_source(d.bbox),
            score: d.score,
        })
        .filter(|d| d.bbox.iter().all(|v| v.is_finite()))
        .collect();

    if nms_threshold < 1.0 {
        detections = nms(&detections, nms_threshold);
    }

    Ok(detections)
}

/// Apply non-maximum suppression to remove overlapping detections
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }

    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    let area_a = a[2] * a[3];
    let area_b = b[2] * b[3];
    inter / (area_a + area_b - inter)
}
