//! YuNet detector post-processing
//!
//! YuNet is an anchor-free face detector that predicts directly from grid locations.
//! For each stride (8, 16, 32) the graph emits:
//! - cls: [1, H*W, 1] - classification scores
//! - obj: [1, H*W, 1] - objectness scores
//! - bbox: [1, H*W, 4] - box regression (dx, dy, log dw, log dh)
//! - kps: [1, H*W, 10] - landmark regression (unused here)
//!
//! Decoding, in input-canvas pixels:
//! cx = (grid_x + dx) * stride
//! cy = (grid_y + dy) * stride
//! w = exp(dw) * stride
//! h = exp(dh) * stride

use anyhow::Result;
use ndarray::Array2;

pub const STRIDES: [usize; 3] = [8, 16, 32];

#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x, y, w, h (input canvas pixels)
    pub score: f32,
}

/// Tensors of one stride that take part in box decoding.
#[derive(Debug, Clone)]
pub struct StrideOutput {
    pub stride: usize,
    pub cls: Array2<f32>,
    pub obj: Array2<f32>,
    pub bbox: Array2<f32>,
}

/// Split the raw session outputs into per-stride tensors.
///
/// Output order: cls_8, cls_16, cls_32, obj_8, obj_16, obj_32, bbox_8, bbox_16, bbox_32,
/// kps_8, kps_16, kps_32. Landmark tensors are ignored.
pub fn parse_yunet_outputs(
    outputs: &[(&[i64], &[f32])],
    input_size: usize,
) -> Result<Vec<StrideOutput>> {
    let needed = 3 * STRIDES.len();
    if outputs.len() < needed {
        anyhow::bail!(
            "YuNet produced {} output tensors, expected at least {}",
            outputs.len(),
            needed
        );
    }

    STRIDES
        .iter()
        .enumerate()
        .map(|(idx, &stride)| {
            let cells = (input_size / stride) * (input_size / stride);
            Ok(StrideOutput {
                stride,
                cls: tensor_rows(outputs[idx], cells, 1, "cls")?,
                obj: tensor_rows(outputs[idx + 3], cells, 1, "obj")?,
                bbox: tensor_rows(outputs[idx + 6], cells, 4, "bbox")?,
            })
        })
        .collect()
}

fn tensor_rows(
    (shape, data): (&[i64], &[f32]),
    rows: usize,
    cols: usize,
    label: &str,
) -> Result<Array2<f32>> {
    let expected = [1, rows as i64, cols as i64];
    if shape != expected.as_slice() {
        anyhow::bail!(
            "Unexpected {} shape {:?}, expected {:?}",
            label,
            shape,
            expected
        );
    }
    Ok(Array2::from_shape_vec((rows, cols), data.to_vec())?)
}

/// Combined face confidence as computed by the reference YuNet post-processing.
pub fn face_score(cls: f32, obj: f32) -> f32 {
    (cls.clamp(0.0, 1.0) * obj.clamp(0.0, 1.0)).sqrt()
}

/// Decode every grid cell whose score reaches `score_threshold`.
pub fn decode_detections(
    outputs: &[StrideOutput],
    score_threshold: f32,
    input_size: usize,
) -> Vec<RawDetection> {
    let mut detections = Vec::new();

    for out in outputs {
        let columns = input_size / out.stride;
        let stride = out.stride as f32;

        for idx in 0..out.cls.nrows() {
            let score = face_score(out.cls[[idx, 0]], out.obj[[idx, 0]]);
            if score < score_threshold {
                continue;
            }

            let grid_y = (idx / columns) as f32;
            let grid_x = (idx % columns) as f32;

            let cx = (grid_x + out.bbox[[idx, 0]]) * stride;
            let cy = (grid_y + out.bbox[[idx, 1]]) * stride;
            let w = out.bbox[[idx, 2]].exp() * stride;
            let h = out.bbox[[idx, 3]].exp() * stride;

            let bbox = [cx - w / 2.0, cy - h / 2.0, w, h];
            if !bbox.iter().all(|v| v.is_finite()) {
                log::debug!("dropping non-finite box at stride {} cell {}", out.stride, idx);
                continue;
            }
            detections.push(RawDetection { bbox, score });
        }
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_stride(stride: usize, input_size: usize) -> StrideOutput {
        let cells = (input_size / stride) * (input_size / stride);
        StrideOutput {
            stride,
            cls: Array2::zeros((cells, 1)),
            obj: Array2::zeros((cells, 1)),
            bbox: Array2::zeros((cells, 4)),
        }
    }

    #[test]
    fn test_face_score() {
        assert!((face_score(0.81, 1.0) - 0.9).abs() < 1e-6);
        assert_eq!(face_score(-0.5, 0.9), 0.0);
        assert!((face_score(1.7, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_grid_based() {
        let input_size = 640;
        let mut outputs: Vec<StrideOutput> = STRIDES
            .iter()
            .map(|&s| empty_stride(s, input_size))
            .collect();

        // One confident cell on the stride-32 grid at row 10, column 10
        let idx = 10 * 20 + 10;
        let coarse = &mut outputs[2];
        coarse.cls[[idx, 0]] = 0.9;
        coarse.obj[[idx, 0]] = 0.9;
        coarse.bbox[[idx, 0]] = 0.5;
        coarse.bbox[[idx, 1]] = 0.25;
        coarse.bbox[[idx, 2]] = 4.0f32.ln();
        coarse.bbox[[idx, 3]] = 4.0f32.ln();

        let detections = decode_detections(&outputs, 0.6, input_size);
        assert_eq!(detections.len(), 1);

        // cx = 10.5 * 32 = 336, cy = 10.25 * 32 = 328, w = h = 4 * 32 = 128
        let det = &detections[0];
        assert!((det.bbox[0] - 272.0).abs() < 1e-3);
        assert!((det.bbox[1] - 264.0).abs() < 1e-3);
        assert!((det.bbox[2] - 128.0).abs() < 1e-3);
        assert!((det.bbox[3] - 128.0).abs() < 1e-3);
        assert!((det.score - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_decode_drops_non_finite_boxes() {
        let input_size = 640;
        let mut outputs: Vec<StrideOutput> = STRIDES
            .iter()
            .map(|&s| empty_stride(s, input_size))
            .collect();

        let fine = &mut outputs[0];
        fine.cls[[0, 0]] = 1.0;
        fine.obj[[0, 0]] = 1.0;
        fine.bbox[[0, 0]] = f32::INFINITY;
        fine.cls[[1, 0]] = 1.0;
        fine.obj[[1, 0]] = 1.0;
        fine.bbox[[1, 2]] = 200.0; // exp overflows to inf
        fine.cls[[2, 0]] = 1.0;
        fine.obj[[2, 0]] = 1.0;

        let detections = decode_detections(&outputs, 0.6, input_size);
        assert_eq!(detections.len(), 1);
        assert!(detections[0].bbox.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        let cls = vec![0.0f32; 4];
        let shape: [i64; 3] = [1, 4, 1];
        let outputs = vec![(&shape[..], &cls[..]); 9];
        assert!(parse_yunet_outputs(&outputs, 640).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_tensors() {
        let outputs: Vec<(&[i64], &[f32])> = Vec::new();
        assert!(parse_yunet_outputs(&outputs, 640).is_err());
    }
}
