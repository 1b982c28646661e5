//! Folder scan and keep/skip decisions.
//!
//! Each supported image is decoded, run through the detector and judged face by
//! face. The first face whose share of the image exceeds the threshold gets the
//! image copied and ends evaluation for that image; every face before it logs a
//! low-ratio event.

use anyhow::{Context, Result};
use image::GenericImageView;
use log::{debug, warn};
use std::ffi::OsStr;
use std::path::Path;

use crate::config::Config;
use crate::events::{Event, EventSink};
use crate::output;
use crate::{FaceDetector, FaceRect, ImageDecoder};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Case-insensitive extension match on `png`, `jpg` and `jpeg`.
pub fn is_supported_image(file_name: impl AsRef<Path>) -> bool {
    file_name
        .as_ref()
        .extension()
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Share of a `width` x `height` image covered by `face`.
pub fn face_ratio(face: &FaceRect, width: u32, height: u32) -> f64 {
    let image_area = width as f64 * height as f64;
    face.area() as f64 / image_area
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Dominant { ratio: f64 },
    LowRatio { ratio: f64 },
}

/// Judge faces in detector order, stopping after the first dominant one.
pub fn classify(faces: &[FaceRect], width: u32, height: u32, threshold: f64) -> Vec<Verdict> {
    let mut verdicts = Vec::with_capacity(faces.len());
    for face in faces {
        let ratio = face_ratio(face, width, height);
        if ratio > threshold {
            verdicts.push(Verdict::Dominant { ratio });
            break;
        }
        verdicts.push(Verdict::LowRatio { ratio });
    }
    verdicts
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub kept: usize,
    pub low_ratio_events: usize,
    pub no_face: usize,
    pub decode_failures: usize,
}

pub struct FaceFilter<'a, D, F, S> {
    config: &'a Config,
    decoder: D,
    detector: F,
    sink: S,
}

impl<'a, D, F, S> FaceFilter<'a, D, F, S>
where
    D: ImageDecoder,
    F: FaceDetector,
    S: EventSink,
{
    pub fn new(config: &'a Config, decoder: D, detector: F, sink: S) -> Self {
        Self {
            config,
            decoder,
            detector,
            sink,
        }
    }

    /// Walk the input folder once. Listing, detection, copy and sink failures abort the run.
    pub fn run(&mut self) -> Result<RunSummary> {
        let config = self.config;
        let folder = &config.image_folder_path;
        let entries = std::fs::read_dir(folder)
            .with_context(|| format!("listing image folder {}", folder.display()))?;

        let mut summary = RunSummary::default();
        for entry in entries {
            let entry =
                entry.with_context(|| format!("reading entry of {}", folder.display()))?;
            let file_name = entry.file_name();
            if !is_supported_image(&file_name) {
                debug!("skipping {:?}: not a supported image", file_name);
                continue;
            }
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                debug!("skipping directory {:?}", file_name);
                continue;
            }

            summary.scanned += 1;
            self.process(&entry.path(), &file_name, &mut summary)?;
        }

        Ok(summary)
    }

    fn process(&mut self, path: &Path, file_name: &OsStr, summary: &mut RunSummary) -> Result<()> {
        let display_name = file_name.to_string_lossy();
        let decoded = self.decoder.decode(path).and_then(|image| {
            if image.width() == 0 || image.height() == 0 {
                anyhow::bail!("{} decoded to an empty image", path.display());
            }
            Ok(image)
        });
        let image = match decoded {
            Ok(image) => image,
            Err(e) => {
                warn!("{:#}", e);
                summary.decode_failures += 1;
                return self.sink.record(&Event::DecodeFailed(display_name.into_owned()));
            }
        };

        let (width, height) = image.dimensions();
        let faces = self
            .detector
            .detect(&image)
            .with_context(|| format!("running detector on {}", path.display()))?;
        if faces.is_empty() {
            debug!("{}: no faces", display_name);
            summary.no_face += 1;
            return Ok(());
        }

        for verdict in classify(&faces, width, height, self.config.face_ratio_threshold) {
            match verdict {
                Verdict::Dominant { ratio } => {
                    debug!("{}: dominant face, ratio {:.3}", display_name, ratio);
                    self.sink.record(&Event::Predominant(display_name.to_string()))?;
                    output::copy_into(path, &self.config.output_folder_path, file_name)?;
                    summary.kept += 1;
                }
                Verdict::LowRatio { ratio } => {
                    debug!("{}: face ratio {:.3}", display_name, ratio);
                    self.sink.record(&Event::LowRatio(display_name.to_string()))?;
                    summary.low_ratio_events += 1;
                }
            }
        }
        Ok(())
    }
}
